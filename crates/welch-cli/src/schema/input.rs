use serde::{Deserialize, Serialize};
use welch_stats::summary::StatisticsSummary;

/// The two groups to compare, as read from an input file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestInput {
    pub group_one: StatisticsSummary,
    pub group_two: StatisticsSummary,
}
