use chrono::{DateTime, Utc};
use serde::Serialize;
use welch_stats::ttest::TTestResult;

/// JSON report of one t-test run.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport<'a> {
    pub name: &'static str,
    pub computed_at: DateTime<Utc>,
    pub alpha: f64,
    pub two_tailed_p_value: f64,
    pub significant: bool,
    pub result: &'a TTestResult,
}

impl<'a> TestReport<'a> {
    pub fn new(result: &'a TTestResult, alpha: f64, computed_at: DateTime<Utc>) -> Self {
        Self {
            name: result.name(),
            computed_at,
            alpha,
            two_tailed_p_value: result.two_tailed_p_value(),
            significant: result.is_significant(alpha),
            result,
        }
    }
}
