//! Boundary between dataset grouping and the t-test.
//!
//! Grouping a dataset by a binary attribute and summarizing a numeric column
//! per group is the job of an [`AggregationProvider`]. The engine only consumes
//! the two resulting [`StatisticsSummary`] records.

use std::error::Error;

use crate::{
    TTestError,
    summary::StatisticsSummary,
    ttest::{TTestResult, WelchTTest},
};

/// Produces the two per-group summaries a t-test needs.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use welch_stats::{
///     aggregation::{AggregationProvider, run_with_provider},
///     summary::StatisticsSummary,
///     ttest::WelchTTest,
/// };
///
/// struct Precomputed;
///
/// impl AggregationProvider for Precomputed {
///     type Dataset = [(bool, f64)];
///     type Error = Infallible;
///
///     fn aggregate(
///         &self,
///         dataset: &Self::Dataset,
///         _group_key: &str,
///         _column: &str,
///     ) -> Result<(StatisticsSummary, StatisticsSummary), Self::Error> {
///         let group = |flag: bool| {
///             let values = dataset.iter().filter(|(g, _)| *g == flag).map(|(_, v)| *v);
///             StatisticsSummary::from_values(flag.to_string(), values).unwrap()
///         };
///         Ok((group(true), group(false)))
///     }
/// }
///
/// let data = [(true, 1.0), (true, 2.0), (true, 3.0), (false, 6.0), (false, 8.0)];
/// let result = run_with_provider(&Precomputed, &data[..], "flag", "value", &WelchTTest::default()).unwrap();
/// assert!(result.t_statistic() < 0.0);
/// ```
pub trait AggregationProvider {
    /// The data the provider reads from.
    type Dataset: ?Sized;
    /// Failure to produce summaries (missing column, not exactly two groups, ...).
    type Error;

    /// Groups `dataset` by `group_key` and summarizes `column` within each group.
    ///
    /// Must return exactly two summaries; the first becomes group one of the test.
    fn aggregate(
        &self,
        dataset: &Self::Dataset,
        group_key: &str,
        column: &str,
    ) -> Result<(StatisticsSummary, StatisticsSummary), Self::Error>;
}

/// Failure of [`run_with_provider`].
#[derive(Debug, derive_more::Display, derive_more::IsVariant)]
pub enum ProviderTestError<E> {
    #[display("aggregation failed: {_0}")]
    Aggregation(E),
    #[display("t-test failed: {_0}")]
    Test(TTestError),
}

impl<E> Error for ProviderTestError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Aggregation(e) => Some(e),
            Self::Test(e) => Some(e),
        }
    }
}

/// Aggregates `dataset` with `provider` and runs `engine` on the two groups.
pub fn run_with_provider<P>(
    provider: &P,
    dataset: &P::Dataset,
    group_key: &str,
    column: &str,
    engine: &WelchTTest,
) -> Result<TTestResult, ProviderTestError<P::Error>>
where
    P: AggregationProvider + ?Sized,
{
    let (group_one, group_two) = provider
        .aggregate(dataset, group_key, column)
        .map_err(ProviderTestError::Aggregation)?;
    tracing::debug!(
        group_key,
        column,
        group_one = %group_one.label,
        group_two = %group_two.label,
        "aggregated groups"
    );
    engine
        .compute(&group_one, &group_two)
        .map_err(ProviderTestError::Test)
}
