use std::path::PathBuf;

use anyhow::bail;
use chrono::Utc;
use welch_stats::{
    summary::StatisticsSummary,
    ttest::{TTestConfig, TTestResult, VarianceMode, WelchTTest},
};

use crate::{
    schema::report::TestReport,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TestArg {
    /// JSON file with `group_one` and `group_two` summaries
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// First group as LABEL:MEAN:STDDEV:COUNT (overrides the input file)
    #[arg(long, value_parser = parse_summary, allow_hyphen_values = true)]
    pub group_one: Option<StatisticsSummary>,
    /// Second group as LABEL:MEAN:STDDEV:COUNT (overrides the input file)
    #[arg(long, value_parser = parse_summary, allow_hyphen_values = true)]
    pub group_two: Option<StatisticsSummary>,
    /// JSON engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// How standard deviations enter the formulas: `stddev` or `variance`
    #[arg(long)]
    pub variance_mode: Option<VarianceMode>,
    /// Iteration cap of the incomplete beta evaluation
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Convergence tolerance of the incomplete beta evaluation
    #[arg(long)]
    pub tolerance: Option<f64>,
    /// Significance level for the two-tailed verdict
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,
    /// Report format: `text` or `json`
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
    /// Output file path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TestArg) -> anyhow::Result<()> {
    let config = load_config(arg)?;
    let (group_one, group_two) = load_groups(arg)?;

    let engine = WelchTTest::new(config);
    let result = engine.compute(&group_one, &group_two).map_err(|e| {
        let kind = if e.is_domain() {
            "invalid input"
        } else {
            "numerical failure"
        };
        anyhow::Error::new(e).context(format!("Welch's t-test failed ({kind})"))
    })?;

    let mut output = Output::from_output_path(arg.output.as_deref())?;
    match arg.format {
        OutputFormat::Text => output.write_text(&render_text(&result, arg.alpha))?,
        OutputFormat::Json => {
            output.write_json(&TestReport::new(&result, arg.alpha, Utc::now()))?;
        }
    }
    tracing::info!(output = %output.display_path(), "report written");

    Ok(())
}

fn load_config(arg: &TestArg) -> anyhow::Result<TTestConfig> {
    let mut config = match &arg.config {
        Some(path) => util::read_config_file(path)?,
        None => TTestConfig::default(),
    };
    if let Some(mode) = arg.variance_mode {
        config.variance_mode = mode;
    }
    if let Some(max_iterations) = arg.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(tolerance) = arg.tolerance {
        config.tolerance = tolerance;
    }
    tracing::debug!(?config, "engine configuration");
    Ok(config)
}

fn load_groups(arg: &TestArg) -> anyhow::Result<(StatisticsSummary, StatisticsSummary)> {
    let from_file = arg.input.as_ref().map(util::read_input_file).transpose()?;
    let (file_one, file_two) = match from_file {
        Some(input) => (Some(input.group_one), Some(input.group_two)),
        None => (None, None),
    };
    let group_one = arg.group_one.clone().or(file_one);
    let group_two = arg.group_two.clone().or(file_two);
    match (group_one, group_two) {
        (Some(one), Some(two)) => Ok((one, two)),
        _ => bail!("Two groups are required: pass --input or both --group-one and --group-two"),
    }
}

fn parse_summary(s: &str) -> Result<StatisticsSummary, String> {
    let mut fields = s.rsplitn(4, ':');
    let (Some(count), Some(std_dev), Some(mean), Some(label)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected LABEL:MEAN:STDDEV:COUNT, got '{s}'"));
    };
    let number = |name: &str, value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {name} '{value}': {e}"))
    };
    Ok(StatisticsSummary::new(
        label,
        number("mean", mean)?,
        number("standard deviation", std_dev)?,
        number("count", count)?,
    ))
}

fn render_text(result: &TTestResult, alpha: f64) -> String {
    let verdict = if result.is_significant(alpha) {
        "significant"
    } else {
        "not significant"
    };
    format!(
        "{}\n{result}\n\nVariance mode: {}\nTwo-tailed p-value: {:.6} ({verdict} at alpha = {alpha})",
        result.name(),
        result.variance_mode(),
        result.two_tailed_p_value(),
    )
}
