//! Welch's two-sample t-test over summary statistics.
//!
//! This crate compares the means of two independently sampled groups without
//! assuming equal variances. It works purely on per-group summaries (mean,
//! standard deviation, count); how those summaries are produced from a dataset
//! is left to an [`aggregation::AggregationProvider`].
//!
//! - **Summaries** ([`summary::StatisticsSummary`]): immutable per-group input records
//! - **Welch's test** ([`ttest::WelchTTest`]): t-statistic, Welch–Satterthwaite
//!   degrees of freedom and the cumulative probability at the statistic
//! - **Student's t distribution** ([`student_t::StudentsT`]): CDF evaluation
//! - **Special functions** ([`special`]): regularized incomplete beta function
//! - **Aggregation boundary** ([`aggregation`]): interface to dataset grouping
//!
//! # Examples
//!
//! ## Running a test
//!
//! ```
//! use welch_stats::{
//!     summary::StatisticsSummary,
//!     ttest::{TTestConfig, VarianceMode, WelchTTest},
//! };
//!
//! let a = StatisticsSummary::new("a", 10.0, 2.0, 30.0);
//! let b = StatisticsSummary::new("b", 8.0, 3.0, 25.0);
//!
//! let engine = WelchTTest::new(TTestConfig {
//!     variance_mode: VarianceMode::Variance,
//!     ..TTestConfig::default()
//! });
//! let result = engine.compute(&a, &b).unwrap();
//! assert!((result.t_statistic() - 2.8475).abs() < 1e-3);
//! assert!((result.degrees_of_freedom() - 40.475).abs() < 1e-2);
//! assert!(result.probability() > 0.99);
//! ```
//!
//! ## Evaluating the Student's t CDF
//!
//! ```
//! use welch_stats::student_t::cumulative_probability;
//!
//! let p = cumulative_probability(0.0, 7.5).unwrap();
//! assert!((p - 0.5).abs() < 1e-12);
//! ```
//!
//! ## Distinguishing failures
//!
//! ```
//! use welch_stats::{summary::StatisticsSummary, ttest::welch_t_test};
//!
//! let a = StatisticsSummary::new("a", 1.0, 0.5, 1.0);
//! let b = StatisticsSummary::new("b", 2.0, 0.5, 10.0);
//! let err = welch_t_test(&a, &b).unwrap_err();
//! assert!(err.is_domain());
//! ```

pub mod aggregation;
pub mod special;
pub mod student_t;
pub mod summary;
pub mod ttest;

/// Invalid or degenerate input.
///
/// Recoverable by the caller supplying corrected input.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DomainError {
    #[display("count must exceed 1 for both groups (group '{label}' has count {count})")]
    InsufficientCount { label: String, count: f64 },
    #[display("standard deviation must be non-negative (group '{label}' has {std_dev})")]
    NegativeStdDev { label: String, std_dev: f64 },
    #[display("{field} of group '{label}' is not finite")]
    NonFiniteInput { label: String, field: &'static str },
    #[display("zero combined variance")]
    ZeroCombinedVariance,
    #[display("degrees of freedom must be positive and finite (got {df})")]
    NonPositiveDegreesOfFreedom { df: f64 },
    #[display("t-statistic is NaN")]
    NanStatistic,
    #[display("invalid incomplete beta argument: {reason}")]
    InvalidBetaArgument { reason: &'static str },
}

/// Failure of a numerical routine despite valid domain input.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum NumericalError {
    #[display("did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
    #[display("non-finite intermediate value in {stage}")]
    NonFinite { stage: &'static str },
}

/// Any failure of a t-test computation.
///
/// Displays as the wrapped error and has no separate source, so a report
/// chain prints the cause once.
#[derive(
    Debug,
    Clone,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::From,
    derive_more::IsVariant,
)]
pub enum TTestError {
    #[display("{_0}")]
    Domain(#[error(not(source))] DomainError),
    #[display("{_0}")]
    Numerical(#[error(not(source))] NumericalError),
}
