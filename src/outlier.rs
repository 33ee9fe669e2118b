//! Outlier detection.
//!
//! | Method | Flags `x` when |
//! |---|---|
//! | IQR | `x < Q1 − k·IQR` or `x > Q3 + k·IQR` (R-7 quartiles) |
//! | z-score | `|x − mean| / σ > k`, σ the population standard deviation |
//! | modified z-score | `|0.6745 (x − median) / MAD| > k` |
//!
//! Missing values are skipped, but reported indices always refer to the
//! caller's original positions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check_non_negative, AuditError, Result};
use crate::stats;
use crate::table::Table;

/// Default threshold `k`.
pub const DEFAULT_THRESHOLD: f64 = 1.5;

/// Scale factor making the MAD consistent with σ under normality.
const MODIFIED_Z_SCALE: f64 = 0.6745;

/// Outlier detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    #[serde(rename = "zscore")]
    ZScore,
    #[serde(rename = "modified_zscore")]
    ModifiedZScore,
}

impl OutlierMethod {
    /// Short name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Iqr => "iqr",
            Self::ZScore => "zscore",
            Self::ModifiedZScore => "modified_zscore",
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutlierMethod {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" | "z-score" | "z_score" => Ok(Self::ZScore),
            "modified_zscore" | "modified-zscore" | "modified_z_score" => Ok(Self::ModifiedZScore),
            other => Err(AuditError::invalid_argument(
                "method",
                other,
                "expected one of: iqr, zscore, modified_zscore",
            )),
        }
    }
}

/// Outliers found in a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub threshold: f64,
    pub n_outliers: usize,
    /// Original positions of the outliers, ascending.
    pub outlier_indices: Vec<usize>,
    /// Outlier values, aligned with `outlier_indices`.
    pub outlier_values: Vec<f64>,
    /// One flag per input position; missing positions are `false`.
    pub mask: Vec<bool>,
}

/// Detects outliers in `values`, treating NaN as missing.
///
/// # Errors
/// - `InvalidArgument` if `threshold` is negative or not finite.
/// - `InsufficientData` if no value is present.
///
/// # Examples
/// ```
/// use u_audit::outlier::{detect_outliers, OutlierMethod, DEFAULT_THRESHOLD};
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
/// let report = detect_outliers(&data, OutlierMethod::Iqr, DEFAULT_THRESHOLD).unwrap();
/// assert_eq!(report.outlier_indices, vec![9]);
/// ```
pub fn detect_outliers(
    values: &[f64],
    method: OutlierMethod,
    threshold: f64,
) -> Result<OutlierReport> {
    let cells: Vec<Option<f64>> = values.iter().map(|&v| Some(v)).collect();
    detect(&cells, method, threshold)
}

/// Detects outliers in a numeric column of `table`.
///
/// # Errors
/// `ColumnNotFound`, `NonNumericColumn`, plus those of [`detect_outliers`].
pub fn detect_column_outliers(
    table: &Table,
    column: &str,
    method: OutlierMethod,
    threshold: f64,
) -> Result<OutlierReport> {
    detect(table.numeric_column(column)?, method, threshold)
}

fn detect(cells: &[Option<f64>], method: OutlierMethod, threshold: f64) -> Result<OutlierReport> {
    check_non_negative("threshold", threshold)?;

    let present: Vec<(usize, f64)> = cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .collect();
    if present.is_empty() {
        return Err(AuditError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let values: Vec<f64> = present.iter().map(|&(_, x)| x).collect();
    let is_outlier = rule(&values, method, threshold)?;

    let mut mask = vec![false; cells.len()];
    let mut outlier_indices = Vec::new();
    let mut outlier_values = Vec::new();
    for &(i, x) in &present {
        if is_outlier(x) {
            mask[i] = true;
            outlier_indices.push(i);
            outlier_values.push(x);
        }
    }

    Ok(OutlierReport {
        method,
        threshold,
        n_outliers: outlier_indices.len(),
        outlier_indices,
        outlier_values,
        mask,
    })
}

/// Builds the flagging predicate for `method` from the present values.
fn rule(values: &[f64], method: OutlierMethod, k: f64) -> Result<Box<dyn Fn(f64) -> bool>> {
    let sorted = stats::sorted(values)
        .ok_or_else(|| AuditError::degenerate("values contain NaN"))?;
    let at = |p: f64| stats::quantile_sorted(&sorted, p).unwrap_or(f64::NAN);

    let predicate: Box<dyn Fn(f64) -> bool> = match method {
        OutlierMethod::Iqr => {
            let (q1, q3) = (at(0.25), at(0.75));
            let iqr = q3 - q1;
            let (lower, upper) = (q1 - k * iqr, q3 + k * iqr);
            Box::new(move |x| x < lower || x > upper)
        }
        OutlierMethod::ZScore => {
            let mean = stats::mean(values).unwrap_or(f64::NAN);
            let sd = stats::population_std_dev(values).unwrap_or(0.0);
            if sd > 0.0 {
                Box::new(move |x| ((x - mean) / sd).abs() > k)
            } else {
                // Every z-score is undefined without spread.
                Box::new(|_| false)
            }
        }
        OutlierMethod::ModifiedZScore => {
            let median = at(0.5);
            let deviations: Vec<f64> = values.iter().map(|x| (x - median).abs()).collect();
            let mad = stats::median(&deviations).unwrap_or(0.0);
            if mad > 0.0 {
                Box::new(move |x| (MODIFIED_Z_SCALE * (x - median) / mad).abs() > k)
            } else {
                // Infinite score for anything off the median.
                Box::new(move |x| x != median)
            }
        }
    };
    Ok(predicate)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn outliers_are_subset(
            data in prop::collection::vec(-1e6_f64..1e6, 1..100),
            k in 0.0_f64..4.0,
        ) {
            let methods = [
                OutlierMethod::Iqr,
                OutlierMethod::ZScore,
                OutlierMethod::ModifiedZScore,
            ];
            for method in methods {
                let r = detect_outliers(&data, method, k).unwrap();
                prop_assert_eq!(r.n_outliers, r.outlier_indices.len());
                prop_assert!(r.outlier_indices.windows(2).all(|w| w[0] < w[1]));
                for (&i, &v) in r.outlier_indices.iter().zip(&r.outlier_values) {
                    prop_assert_eq!(data[i], v);
                }
            }
        }
    }
}
