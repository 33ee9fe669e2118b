//! Benford's Law digit-frequency analysis.
//!
//! The leading digit of naturally occurring amounts follows
//! `P(d) = log10(1 + 1/d)`; later digit positions are treated as uniform
//! over `0..=9`. A chi-squared goodness-of-fit test measures how far the
//! observed digit counts depart from that expectation.
//!
//! Digits are read from each value's shortest round-trip decimal rendering
//! with the decimal point removed, so `0.05` reads as `005` and `100.0` as
//! `100`.

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::special::chi_squared_sf;

/// Options for [`benford_analysis_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenfordConfig {
    /// 1-based digit position: 1 is the leading digit.
    pub digit_position: usize,
}

impl Default for BenfordConfig {
    fn default() -> Self {
        Self { digit_position: 1 }
    }
}

impl BenfordConfig {
    /// Sets the 1-based digit position to analyze.
    pub fn with_digit_position(mut self, digit_position: usize) -> Self {
        self.digit_position = digit_position;
        self
    }

    /// Digits that can appear at the configured position.
    pub fn digits(&self) -> std::ops::RangeInclusive<u8> {
        if self.digit_position == 1 {
            1..=9
        } else {
            0..=9
        }
    }

    /// Expected relative frequency of `digit` at the configured position.
    pub fn expected_frequency(&self, digit: u8) -> f64 {
        if self.digit_position == 1 {
            (1.0 + 1.0 / f64::from(digit)).log10()
        } else {
            0.1
        }
    }
}

/// Observed against expected figures for one digit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitFrequency {
    /// Digit value.
    pub digit: u8,
    /// Share of counted values carrying this digit.
    pub observed_freq: f64,
    /// Share predicted by Benford's Law.
    pub expected_freq: f64,
    /// Number of counted values carrying this digit.
    pub observed_count: u64,
    /// `expected_freq × total`.
    pub expected_count: f64,
    /// `(observed − expected)² / expected`.
    pub chi_square_component: f64,
}

/// Result of a Benford analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenfordReport {
    /// One row per digit in ascending order.
    pub rows: Vec<DigitFrequency>,
    /// Sum of the per-digit components.
    pub chi_square_statistic: f64,
    /// Upper tail of χ² with `rows.len() − 1` degrees of freedom.
    pub p_value: f64,
    /// Position that was analyzed.
    pub digit_position: usize,
    /// Number of digits counted.
    pub total: u64,
}

impl BenfordReport {
    /// Degrees of freedom of the goodness-of-fit test.
    pub fn degrees_of_freedom(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// Benford analysis at `digit_position` (1 = leading digit).
///
/// # Examples
/// ```
/// use u_audit::benford::benford_analysis;
/// let values: Vec<f64> = (0..900).map(|i| 10f64.powf(i as f64 / 300.0)).collect();
/// let report = benford_analysis(&values, 1).unwrap();
/// assert_eq!(report.rows.len(), 9);
/// assert!(report.p_value > 0.99);
/// ```
pub fn benford_analysis(values: &[f64], digit_position: usize) -> Result<BenfordReport> {
    benford_analysis_with(values, &BenfordConfig { digit_position })
}

/// Benford analysis with explicit options.
///
/// Values that are not finite or not positive are discarded, as are values
/// with fewer digits than the requested position. A leading `0` (from
/// values below 1) is outside the first-digit domain and is not counted.
///
/// # Errors
/// - `InvalidArgument` if the digit position is 0.
/// - `InsufficientData` if no digit was counted.
pub fn benford_analysis_with(values: &[f64], config: &BenfordConfig) -> Result<BenfordReport> {
    let position = config.digit_position;
    if position == 0 {
        return Err(AuditError::invalid_argument(
            "digit_position",
            position,
            "positions start at 1",
        ));
    }

    let mut counts = [0_u64; 10];
    let mut skipped = 0_usize;
    for &v in values {
        if !(v.is_finite() && v > 0.0) {
            skipped += 1;
            continue;
        }
        match digit_at(v, position) {
            Some(d) if config.digits().contains(&d) => counts[usize::from(d)] += 1,
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, position, "values without a qualifying digit");
    }

    let total: u64 = config.digits().map(|d| counts[usize::from(d)]).sum();
    if total == 0 {
        return Err(AuditError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let n = total as f64;
    let rows: Vec<DigitFrequency> = config
        .digits()
        .map(|digit| {
            let observed_count = counts[usize::from(digit)];
            let expected_freq = config.expected_frequency(digit);
            let expected_count = expected_freq * n;
            let diff = observed_count as f64 - expected_count;
            DigitFrequency {
                digit,
                observed_freq: observed_count as f64 / n,
                expected_freq,
                observed_count,
                expected_count,
                chi_square_component: diff * diff / expected_count,
            }
        })
        .collect();

    let chi_square_statistic: f64 = rows.iter().map(|r| r.chi_square_component).sum();
    let df = (rows.len() - 1) as f64;

    Ok(BenfordReport {
        p_value: chi_squared_sf(chi_square_statistic, df),
        chi_square_statistic,
        digit_position: position,
        total,
        rows,
    })
}

/// Digit at 1-based `position` of the rendered value, ignoring the sign
/// and decimal point.
fn digit_at(value: f64, position: usize) -> Option<u8> {
    let rendered = value.to_string();
    let b = rendered
        .bytes()
        .filter(|b| b.is_ascii_digit())
        .nth(position - 1)?;
    Some(b - b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_uniform(n: usize, decades: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 10f64.powf(i as f64 * decades / n as f64))
            .collect()
    }

    #[test]
    fn test_expected_frequencies_sum_to_one() {
        let config = BenfordConfig::default();
        let sum: f64 = config.digits().map(|d| config.expected_frequency(d)).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((config.expected_frequency(1) - 0.30103).abs() < 1e-5);
    }

    #[test]
    fn test_conforming_data() {
        let report = benford_analysis(&log_uniform(3000, 3.0), 1).unwrap();
        assert_eq!(report.total, 3000);
        assert_eq!(report.degrees_of_freedom(), 8);
        assert!(report.p_value > 0.99, "p = {}", report.p_value);
        let observed: u64 = report.rows.iter().map(|r| r.observed_count).sum();
        assert_eq!(observed, report.total);
    }

    #[test]
    fn test_fabricated_data_rejected() {
        let values: Vec<f64> = (0..500).map(|i| 500.0 + i as f64 * 0.5).collect();
        let report = benford_analysis(&values, 1).unwrap();
        assert!(report.p_value < 1e-6);
        assert!(report.rows[4].observed_count > 0);
    }

    #[test]
    fn test_second_digit() {
        // 7 has no second digit and is skipped
        let report = benford_analysis(&[12.0, 13.0, 150.0, 7.0], 2).unwrap();
        assert_eq!(report.rows.len(), 10);
        assert_eq!(report.total, 3);
        assert_eq!(report.rows[2].observed_count, 1);
        assert_eq!(report.rows[3].observed_count, 1);
        assert_eq!(report.rows[5].observed_count, 1);
        assert!((report.rows[0].expected_freq - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_rendering_rules() {
        // 100.0 renders as "100", 2.5 as "25"
        let report = benford_analysis(&[100.0, 2.5], 3).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.rows[0].observed_count, 1);
        let second = benford_analysis(&[2.5], 2).unwrap();
        assert_eq!(second.rows[5].observed_count, 1);
    }

    #[test]
    fn test_filtering() {
        let values = [-15.0, 0.0, f64::NAN, f64::INFINITY, 0.05, 2.0];
        let report = benford_analysis(&values, 1).unwrap();
        // Only 2.0 qualifies; 0.05 has a leading zero
        assert_eq!(report.total, 1);
        assert_eq!(report.rows[1].observed_count, 1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            benford_analysis(&[1.0], 0),
            Err(AuditError::InvalidArgument { .. })
        ));
        assert!(matches!(
            benford_analysis(&[-1.0, 0.0], 1),
            Err(AuditError::InsufficientData { .. })
        ));
        assert!(matches!(
            benford_analysis(&[5.0], 4),
            Err(AuditError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_config_serde() {
        let config: BenfordConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BenfordConfig::default());
        let report = benford_analysis_with(&[12.0, 34.0], &config.with_digit_position(2)).unwrap();
        assert_eq!(report.digit_position, 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn counts_add_up(
            values in prop::collection::vec(1.0_f64..1e6, 1..200),
            position in 1_usize..4,
        ) {
            if let Ok(report) = benford_analysis(&values, position) {
                let observed: u64 = report.rows.iter().map(|r| r.observed_count).sum();
                prop_assert_eq!(observed, report.total);
                let freq: f64 = report.rows.iter().map(|r| r.observed_freq).sum();
                prop_assert!((freq - 1.0).abs() < 1e-9);
                prop_assert!((0.0..=1.0).contains(&report.p_value));
            }
        }
    }
}
