//! Welch's unequal-variance t-test.
//!
//! The test statistic is
//!
//! ```text
//! t = (x1 - x2) / sqrt(v1/n1 + v2/n2)
//! ```
//!
//! and the degrees of freedom follow the Welch–Satterthwaite approximation
//!
//! ```text
//! df = (v1/n1 + v2/n2)^2 / (v1^2 / (n1^2 (n1 - 1)) + v2^2 / (n2^2 (n2 - 1)))
//! ```
//!
//! where `v_i` is the per-group dispersion term selected by [`VarianceMode`].

use serde::{Deserialize, Serialize};

use crate::{
    DomainError, NumericalError, TTestError,
    special::{self, Convergence},
    student_t::StudentsT,
    summary::StatisticsSummary,
};

/// How a summary's standard deviation enters the variance slots of the formulas.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum VarianceMode {
    /// The standard deviation is used as-is in place of the variance.
    ///
    /// This reproduces the historical behavior of the operator this engine
    /// replaces.
    #[default]
    #[display("stddev")]
    #[serde(alias = "stddev")]
    StdDev,
    /// The standard deviation is squared first, giving the textbook Welch test.
    #[display("variance")]
    Variance,
}

impl VarianceMode {
    /// Returns the value used as `v_i` for `summary`.
    #[must_use]
    pub fn dispersion(self, summary: &StatisticsSummary) -> f64 {
        match self {
            Self::StdDev => summary.std_dev,
            Self::Variance => summary.variance(),
        }
    }

    /// Returns `sqrt(v_i / n_i)` for `summary`.
    ///
    /// In variance mode the standard deviation is never squared, so this stays
    /// representable for any finite summary.
    #[must_use]
    pub fn standard_error(self, summary: &StatisticsSummary) -> f64 {
        match self {
            Self::StdDev => (summary.std_dev / summary.count).sqrt(),
            Self::Variance => summary.std_dev / summary.count.sqrt(),
        }
    }
}

/// Engine configuration.
///
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TTestConfig {
    pub variance_mode: VarianceMode,
    /// Iteration cap of the incomplete beta continued fraction.
    pub max_iterations: usize,
    /// Convergence tolerance of the incomplete beta continued fraction.
    pub tolerance: f64,
}

impl Default for TTestConfig {
    fn default() -> Self {
        Self {
            variance_mode: VarianceMode::default(),
            max_iterations: special::DEFAULT_MAX_ITERATIONS,
            tolerance: special::DEFAULT_TOLERANCE,
        }
    }
}

impl TTestConfig {
    #[must_use]
    pub fn convergence(&self) -> Convergence {
        Convergence {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}

/// Welch's t-test over two group summaries.
#[derive(Debug, Default, Clone)]
pub struct WelchTTest {
    config: TTestConfig,
}

impl WelchTTest {
    #[must_use]
    pub fn new(config: TTestConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TTestConfig {
        &self.config
    }

    /// Runs the test on two groups.
    ///
    /// When both groups have zero dispersion the statistic is undefined.
    /// If the means are also exactly equal the groups are indistinguishable
    /// and the result has `t = 0`, `df = n1 + n2 - 2` and probability `0.5`;
    /// otherwise the test fails.
    ///
    /// # Errors
    ///
    /// * [`DomainError`] - if either summary is invalid (see
    ///   [`StatisticsSummary::validate`]) or the combined variance is zero
    ///   while the means differ
    /// * [`NumericalError`] - if the statistic overflows or the probability
    ///   evaluation fails
    ///
    /// # Examples
    ///
    /// ```
    /// use welch_stats::{summary::StatisticsSummary, ttest::WelchTTest};
    ///
    /// let a = StatisticsSummary::new("a", 5.0, 1.0, 12.0);
    /// let result = WelchTTest::default().compute(&a, &a).unwrap();
    /// assert_eq!(result.t_statistic(), 0.0);
    /// assert!((result.probability() - 0.5).abs() < 1e-15);
    /// ```
    pub fn compute(
        &self,
        group_one: &StatisticsSummary,
        group_two: &StatisticsSummary,
    ) -> Result<TTestResult, TTestError> {
        group_one.validate()?;
        group_two.validate()?;

        let mode = self.config.variance_mode;
        let no_spread =
            mode.standard_error(group_one) == 0.0 && mode.standard_error(group_two) == 0.0;

        let (t, df) = if no_spread {
            #[expect(clippy::float_cmp)]
            let same_mean = group_one.mean == group_two.mean;
            if !same_mean {
                return Err(DomainError::ZeroCombinedVariance.into());
            }
            (0.0, group_one.count + group_two.count - 2.0)
        } else {
            (
                t_statistic(group_one, group_two, mode),
                degrees_of_freedom(group_one, group_two, mode),
            )
        };
        if !t.is_finite() {
            return Err(NumericalError::NonFinite {
                stage: "t statistic",
            }
            .into());
        }
        if !df.is_finite() {
            return Err(NumericalError::NonFinite {
                stage: "degrees of freedom",
            }
            .into());
        }

        let probability = StudentsT::new(df)?
            .with_convergence(self.config.convergence())
            .cdf(t)?;

        tracing::debug!(
            t,
            df,
            probability,
            %mode,
            group_one = %group_one.label,
            group_two = %group_two.label,
            "computed Welch's t-test"
        );

        Ok(TTestResult {
            t_statistic: t,
            degrees_of_freedom: df,
            probability,
            variance_mode: mode,
            group_one: group_one.clone(),
            group_two: group_two.clone(),
        })
    }
}

/// Runs Welch's t-test with the default configuration.
///
/// See [`WelchTTest::compute`].
pub fn welch_t_test(
    group_one: &StatisticsSummary,
    group_two: &StatisticsSummary,
) -> Result<TTestResult, TTestError> {
    WelchTTest::default().compute(group_one, group_two)
}

/// Welch's t-statistic.
///
/// Inputs are not validated; use [`WelchTTest::compute`] for checked evaluation.
#[must_use]
pub fn t_statistic(
    group_one: &StatisticsSummary,
    group_two: &StatisticsSummary,
    mode: VarianceMode,
) -> f64 {
    let numerator = group_one.mean - group_two.mean;
    let denominator = mode
        .standard_error(group_one)
        .hypot(mode.standard_error(group_two));
    numerator / denominator
}

/// Welch–Satterthwaite degrees of freedom.
///
/// Both `v_i / n_i` terms are divided by the larger one before squaring, so
/// the result does not depend on the scale of the data.
///
/// Inputs are not validated; use [`WelchTTest::compute`] for checked evaluation.
#[must_use]
pub fn degrees_of_freedom(
    group_one: &StatisticsSummary,
    group_two: &StatisticsSummary,
    mode: VarianceMode,
) -> f64 {
    let se_one = mode.standard_error(group_one);
    let se_two = mode.standard_error(group_two);
    let scale = se_one.max(se_two);
    let r_one = (se_one / scale).powi(2);
    let r_two = (se_two / scale).powi(2);
    (r_one + r_two).powi(2)
        / (r_one.powi(2) / (group_one.count - 1.0) + r_two.powi(2) / (group_two.count - 1.0))
}

/// Outcome of Welch's t-test.
///
/// `probability` is the Student's t CDF at the statistic, i.e. the one-sided
/// probability of observing a statistic no larger than `t` under the null
/// hypothesis of equal means.
#[derive(Debug, Clone, PartialEq, Serialize, derive_more::Display)]
#[display(
    "T: {t_statistic} DF: {degrees_of_freedom} prob: {probability}\n\nGroup one statistics:\n\t{group_one}\nGroup two statistics:\n\t{group_two}"
)]
pub struct TTestResult {
    t_statistic: f64,
    degrees_of_freedom: f64,
    probability: f64,
    variance_mode: VarianceMode,
    group_one: StatisticsSummary,
    group_two: StatisticsSummary,
}

impl TTestResult {
    #[must_use]
    pub fn name(&self) -> &'static str {
        "T-Test"
    }

    #[must_use]
    pub fn t_statistic(&self) -> f64 {
        self.t_statistic
    }

    #[must_use]
    pub fn degrees_of_freedom(&self) -> f64 {
        self.degrees_of_freedom
    }

    /// `P(T <= t)` under the null hypothesis.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    #[must_use]
    pub fn variance_mode(&self) -> VarianceMode {
        self.variance_mode
    }

    #[must_use]
    pub fn group_one(&self) -> &StatisticsSummary {
        &self.group_one
    }

    #[must_use]
    pub fn group_two(&self) -> &StatisticsSummary {
        &self.group_two
    }

    /// Two-sided p-value, `2 * min(p, 1 - p)`.
    #[must_use]
    pub fn two_tailed_p_value(&self) -> f64 {
        (2.0 * self.probability.min(1.0 - self.probability)).clamp(0.0, 1.0)
    }

    /// Whether the two-sided test rejects equal means at level `alpha`.
    #[must_use]
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.two_tailed_p_value() < alpha
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64;

    use super::*;

    fn fixture() -> (StatisticsSummary, StatisticsSummary) {
        (
            StatisticsSummary::new("a", 10.0, 2.0, 30.0),
            StatisticsSummary::new("b", 8.0, 3.0, 25.0),
        )
    }

    fn engine(variance_mode: VarianceMode) -> WelchTTest {
        WelchTTest::new(TTestConfig {
            variance_mode,
            ..TTestConfig::default()
        })
    }

    #[test]
    fn test_fixture_variance_mode() {
        let (a, b) = fixture();
        let result = engine(VarianceMode::Variance).compute(&a, &b).unwrap();
        assert!((result.t_statistic() - 2.847_473_987_257_497).abs() < 1e-9);
        assert!((result.degrees_of_freedom() - 40.475_086_020_135_08).abs() < 1e-9);
        assert!((result.probability() - 0.996_554_286_647_483_9).abs() < 1e-9);
        assert_eq!(result.variance_mode(), VarianceMode::Variance);
    }

    #[test]
    fn test_fixture_std_dev_mode() {
        let (a, b) = fixture();
        let result = engine(VarianceMode::StdDev).compute(&a, &b).unwrap();
        assert!((result.t_statistic() - 4.629_100_498_862_757).abs() < 1e-9);
        assert!((result.degrees_of_freedom() - 46.258_392_675_483_21).abs() < 1e-9);
        assert!((result.probability() - 0.999_985_056_773_936).abs() < 1e-9);
    }

    #[test]
    fn test_default_mode_is_std_dev() {
        let (a, b) = fixture();
        let default = welch_t_test(&a, &b).unwrap();
        let literal = engine(VarianceMode::StdDev).compute(&a, &b).unwrap();
        assert_eq!(default, literal);
    }

    #[test]
    fn test_swapping_groups() {
        let (a, b) = fixture();
        for mode in [VarianceMode::StdDev, VarianceMode::Variance] {
            let ab = engine(mode).compute(&a, &b).unwrap();
            let ba = engine(mode).compute(&b, &a).unwrap();
            assert_eq!(ab.t_statistic(), -ba.t_statistic());
            assert_eq!(ab.degrees_of_freedom(), ba.degrees_of_freedom());
            assert!((ab.probability() + ba.probability() - 1.0).abs() < 1e-12);
            assert_eq!(ab.group_one(), ba.group_two());
        }
    }

    #[test]
    fn test_identical_groups() {
        let a = StatisticsSummary::new("x", 3.25, 1.5, 17.0);
        let b = StatisticsSummary::new("y", 3.25, 1.5, 17.0);
        let result = welch_t_test(&a, &b).unwrap();
        assert_eq!(result.t_statistic(), 0.0);
        assert!((result.probability() - 0.5).abs() < 1e-15);
        assert!(!result.is_significant(0.05));
        assert!((result.two_tailed_p_value() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_count_of_one_fails() {
        let (a, _) = fixture();
        let single = StatisticsSummary::new("single", 8.0, 3.0, 1.0);
        for (one, two) in [(&a, &single), (&single, &a)] {
            let err = welch_t_test(one, two).unwrap_err();
            assert!(matches!(
                err,
                TTestError::Domain(DomainError::InsufficientCount { .. })
            ));
        }
    }

    #[test]
    fn test_zero_variance_equal_means() {
        let a = StatisticsSummary::new("a", 4.0, 0.0, 5.0);
        let b = StatisticsSummary::new("b", 4.0, 0.0, 7.0);
        let result = welch_t_test(&a, &b).unwrap();
        assert_eq!(result.t_statistic(), 0.0);
        assert_eq!(result.degrees_of_freedom(), 10.0);
        assert!((result.probability() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_zero_variance_unequal_means() {
        let a = StatisticsSummary::new("a", 4.0, 0.0, 5.0);
        let b = StatisticsSummary::new("b", 4.5, 0.0, 7.0);
        assert_eq!(
            welch_t_test(&a, &b),
            Err(TTestError::Domain(DomainError::ZeroCombinedVariance))
        );
    }

    #[test]
    fn test_one_zero_variance_group() {
        // Only the second group contributes, so df collapses to n2 - 1.
        let a = StatisticsSummary::new("a", 4.0, 0.0, 5.0);
        let b = StatisticsSummary::new("b", 5.0, 2.0, 9.0);
        let result = engine(VarianceMode::Variance).compute(&a, &b).unwrap();
        assert!((result.degrees_of_freedom() - 8.0).abs() < 1e-12);
        assert!((result.t_statistic() + 1.5).abs() < 1e-12);
        assert!(result.probability() < 0.5);
    }

    #[test]
    fn test_standard_error() {
        let s = StatisticsSummary::new("s", 0.0, 3.0, 4.0);
        assert_eq!(VarianceMode::StdDev.dispersion(&s), 3.0);
        assert_eq!(VarianceMode::Variance.dispersion(&s), 9.0);
        assert!((VarianceMode::StdDev.standard_error(&s) - 0.75_f64.sqrt()).abs() < 1e-15);
        assert_eq!(VarianceMode::Variance.standard_error(&s), 1.5);
    }

    #[test]
    fn test_invariant_under_rescaling() {
        let (a, b) = fixture();
        for mode in [VarianceMode::StdDev, VarianceMode::Variance] {
            let expected = engine(mode).compute(&a, &b).unwrap();
            for scale in [1e-170, 1e-90, 1e-20, 1e20, 1e160] {
                // Keep `mean / sqrt(v)` fixed: in stddev mode `v` is the std dev itself.
                let mean_scale = match mode {
                    VarianceMode::StdDev => f64::sqrt(scale),
                    VarianceMode::Variance => scale,
                };
                let rescale = |s: &StatisticsSummary| {
                    StatisticsSummary::new(
                        s.label.clone(),
                        s.mean * mean_scale,
                        s.std_dev * scale,
                        s.count,
                    )
                };
                let result = engine(mode).compute(&rescale(&a), &rescale(&b)).unwrap();
                let rel = |x: f64, y: f64| ((x - y) / y).abs();
                assert!(
                    rel(result.t_statistic(), expected.t_statistic()) < 1e-12,
                    "{mode} x{scale}: t = {}",
                    result.t_statistic()
                );
                assert!(
                    rel(result.degrees_of_freedom(), expected.degrees_of_freedom()) < 1e-12,
                    "{mode} x{scale}: df = {}",
                    result.degrees_of_freedom()
                );
                assert!((result.probability() - expected.probability()).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_degrees_of_freedom_extreme_scale_is_positive() {
        for scale in [1e-300, 1e300] {
            let a = StatisticsSummary::new("a", 0.0, 2.0 * scale, 30.0);
            let b = StatisticsSummary::new("b", 0.0, 3.0 * scale, 25.0);
            for mode in [VarianceMode::StdDev, VarianceMode::Variance] {
                let df = degrees_of_freedom(&a, &b, mode);
                assert!(df.is_finite() && df > 0.0, "{mode} x{scale}: df = {df}");
            }
        }
    }

    #[test]
    fn test_overflowing_statistic_is_numerical() {
        let a = StatisticsSummary::new("a", f64::MAX, 1.0, 10.0);
        let b = StatisticsSummary::new("b", -f64::MAX, 1.0, 10.0);
        assert_eq!(
            welch_t_test(&a, &b),
            Err(TTestError::Numerical(NumericalError::NonFinite {
                stage: "t statistic"
            }))
        );
    }

    #[test]
    fn test_degrees_of_freedom_not_rounded() {
        let (a, b) = fixture();
        let df = degrees_of_freedom(&a, &b, VarianceMode::Variance);
        assert!(df.fract() != 0.0);
    }

    #[test]
    fn test_convergence_failure_propagates() {
        let (a, b) = fixture();
        let engine = WelchTTest::new(TTestConfig {
            max_iterations: 1,
            ..TTestConfig::default()
        });
        assert_eq!(
            engine.compute(&a, &b),
            Err(TTestError::Numerical(NumericalError::DidNotConverge {
                iterations: 1
            }))
        );
    }

    #[test]
    fn test_random_summaries_probability_in_range() {
        let mut rng = Pcg64::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let mut summary = |label: &str| {
                StatisticsSummary::new(
                    label,
                    rng.random_range(-100.0..100.0),
                    rng.random_range(0.01..50.0),
                    f64::from(rng.random_range(2_u32..500)),
                )
            };
            let (a, b) = (summary("a"), summary("b"));
            for mode in [VarianceMode::StdDev, VarianceMode::Variance] {
                let ab = engine(mode).compute(&a, &b).unwrap();
                let ba = engine(mode).compute(&b, &a).unwrap();
                assert!((0.0..=1.0).contains(&ab.probability()));
                assert!(ab.degrees_of_freedom() > 0.0);
                assert!((ab.probability() + ba.probability() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_sampled_groups_with_shifted_means() {
        let mut rng = Pcg64::seed_from_u64(42);
        let low = Normal::new(10.0, 2.0).unwrap();
        let high = Normal::new(14.0, 4.0).unwrap();
        let a = StatisticsSummary::from_values("low", low.sample_iter(&mut rng).take(200)).unwrap();
        let b =
            StatisticsSummary::from_values("high", high.sample_iter(&mut rng).take(150)).unwrap();

        let result = engine(VarianceMode::Variance).compute(&a, &b).unwrap();
        assert!(result.t_statistic() < 0.0);
        assert!(result.probability() < 1e-6);
        assert!(result.is_significant(0.01));
        // Welch df lies between min(n) - 1 and n1 + n2 - 2.
        assert!(result.degrees_of_freedom() > 149.0);
        assert!(result.degrees_of_freedom() < 348.0);
    }

    #[test]
    fn test_display() {
        let a = StatisticsSummary::new("true", 4.0, 0.0, 5.0);
        let b = StatisticsSummary::new("false", 4.0, 0.0, 7.0);
        let result = welch_t_test(&a, &b).unwrap();
        assert_eq!(
            result.to_string(),
            "T: 0 DF: 10 prob: 0.5\n\nGroup one statistics:\n\tName: true Average: 4 Standard Deviation: 0 Count: 5\nGroup two statistics:\n\tName: false Average: 4 Standard Deviation: 0 Count: 7"
        );
        assert_eq!(result.name(), "T-Test");
    }

    #[test]
    fn test_variance_mode_parse() {
        assert_eq!("stddev".parse::<VarianceMode>().unwrap(), VarianceMode::StdDev);
        assert_eq!(
            "variance".parse::<VarianceMode>().unwrap(),
            VarianceMode::Variance
        );
        assert!("pooled".parse::<VarianceMode>().is_err());
        assert_eq!(VarianceMode::Variance.to_string(), "variance");
    }

    #[test]
    fn test_config_partial_json() {
        let config: TTestConfig = serde_json::from_str(r#"{"variance_mode": "variance"}"#).unwrap();
        assert_eq!(config.variance_mode, VarianceMode::Variance);
        assert_eq!(config.max_iterations, special::DEFAULT_MAX_ITERATIONS);

        let config: TTestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TTestConfig::default());
    }

    #[test]
    fn test_result_serializes() {
        let (a, b) = fixture();
        let result = welch_t_test(&a, &b).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["variance_mode"], "std_dev");
        assert_eq!(json["group_two"]["label"], "b");
        assert!(json["probability"].as_f64().unwrap() > 0.99);
    }
}
