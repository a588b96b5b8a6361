use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Summary statistics of one group of observations.
///
/// This is the input record of the t-test: the mean, sample standard deviation
/// and number of observations of the measured attribute within one group,
/// together with a label identifying the group (typically the value of the
/// grouping attribute).
///
/// # Examples
///
/// ```
/// use welch_stats::summary::StatisticsSummary;
///
/// let summary = StatisticsSummary::new("true", 10.0, 2.0, 30.0);
/// assert_eq!(summary.variance(), 4.0);
/// assert!(summary.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[display("Name: {label} Average: {mean} Standard Deviation: {std_dev} Count: {count}")]
pub struct StatisticsSummary {
    /// Identifies the group this summary belongs to.
    pub label: String,
    /// The arithmetic mean of the group.
    #[serde(alias = "average")]
    pub mean: f64,
    /// The sample standard deviation of the group (not the variance).
    #[serde(alias = "standard_deviation")]
    pub std_dev: f64,
    /// The number of observations. Semantically an integer of at least 2.
    pub count: f64,
}

impl StatisticsSummary {
    /// Creates a summary from already aggregated values.
    ///
    /// No validation is performed here; see [`StatisticsSummary::validate`].
    #[must_use]
    pub fn new(label: impl Into<String>, mean: f64, std_dev: f64, count: f64) -> Self {
        Self {
            label: label.into(),
            mean,
            std_dev,
            count,
        }
    }

    /// Computes a summary from raw observations.
    ///
    /// The standard deviation uses the `n - 1` denominator. A single
    /// observation yields a standard deviation of zero.
    ///
    /// # Returns
    ///
    /// * `Some(StatisticsSummary)` - if there is at least one value
    /// * `None` - if `values` is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use welch_stats::summary::StatisticsSummary;
    /// let summary = StatisticsSummary::from_values("g", [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert_eq!(summary.mean, 5.0);
    /// assert_eq!(summary.count, 8.0);
    /// assert!((summary.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_values<I>(label: impl Into<String>, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = if values.len() > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        Some(Self::new(label, mean, variance.sqrt(), n))
    }

    /// Returns the squared standard deviation.
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Checks that this summary can take part in a t-test.
    ///
    /// All fields must be finite, the standard deviation non-negative and
    /// the count strictly greater than one.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("mean", self.mean),
            ("standard deviation", self.std_dev),
            ("count", self.count),
        ] {
            if !value.is_finite() {
                return Err(DomainError::NonFiniteInput {
                    label: self.label.clone(),
                    field,
                });
            }
        }
        if self.std_dev < 0.0 {
            return Err(DomainError::NegativeStdDev {
                label: self.label.clone(),
                std_dev: self.std_dev,
            });
        }
        if self.count <= 1.0 {
            return Err(DomainError::InsufficientCount {
                label: self.label.clone(),
                count: self.count,
            });
        }
        Ok(())
    }
}
