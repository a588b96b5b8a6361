use welch_stats::{
    special::{self, Convergence},
    student_t::StudentsT,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CdfArg {
    /// Value at which to evaluate the CDF
    #[arg(long, allow_negative_numbers = true)]
    pub t: f64,
    /// Degrees of freedom (need not be an integer)
    #[arg(long)]
    pub df: f64,
    /// Iteration cap of the incomplete beta evaluation
    #[arg(long, default_value_t = special::DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    /// Convergence tolerance of the incomplete beta evaluation
    #[arg(long, default_value_t = special::DEFAULT_TOLERANCE)]
    pub tolerance: f64,
}

pub(crate) fn run(arg: &CdfArg) -> anyhow::Result<()> {
    let p = evaluate(arg)?;
    println!("{p}");
    Ok(())
}

fn evaluate(arg: &CdfArg) -> anyhow::Result<f64> {
    let convergence = Convergence {
        max_iterations: arg.max_iterations,
        tolerance: arg.tolerance,
    };
    let dist = StudentsT::new(arg.df)?.with_convergence(convergence);
    let p = dist.cdf(arg.t)?;
    tracing::debug!(t = arg.t, df = arg.df, p, "evaluated Student's t CDF");
    Ok(p)
}
