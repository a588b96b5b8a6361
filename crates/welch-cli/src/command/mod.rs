use std::io;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{cdf::CdfArg, ttest::TestArg};

mod cdf;
mod ttest;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log filter directive (overrides RUST_LOG), e.g. `debug` or `welch_stats=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run Welch's t-test on two group summaries
    Test(#[clap(flatten)] TestArg),
    /// Evaluate the Student's t cumulative distribution function
    Cdf(#[clap(flatten)] CdfArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.log_level.as_deref())?;
    match args.mode {
        Mode::Test(arg) => ttest::run(&arg)?,
        Mode::Cdf(arg) => cdf::run(&arg)?,
    }
    Ok(())
}

fn init_tracing(log_level: Option<&str>) -> anyhow::Result<()> {
    let filter = match log_level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("Invalid log filter: {directive}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install log subscriber")
}
