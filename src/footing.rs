//! Footing and agreeing.
//!
//! *Footing* sums a column; *agreeing* compares that sum to the total the
//! client reported. Missing values are skipped and the sum is compensated,
//! so a ledger of many small postings foots to the same total regardless of
//! row order.

use serde::Serialize;

use crate::error::{AuditError, Result};
use crate::stats::neumaier_sum;
use crate::table::{present, Table};

/// Largest absolute difference at which a footed total agrees.
pub const AGREEMENT_TOLERANCE: f64 = 1e-10;

/// What to foot.
#[derive(Debug, Clone, Copy)]
pub enum FootingSource<'a> {
    /// Plain values; NaN counts as missing.
    Values(&'a [f64]),
    /// Cells with explicit missing values.
    Series(&'a [Option<f64>]),
    /// A table; the column is named in the call.
    Table(&'a Table),
}

impl<'a> From<&'a [f64]> for FootingSource<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::Values(values)
    }
}

impl<'a> From<&'a [Option<f64>]> for FootingSource<'a> {
    fn from(cells: &'a [Option<f64>]) -> Self {
        Self::Series(cells)
    }
}

impl<'a> From<&'a Table> for FootingSource<'a> {
    fn from(table: &'a Table) -> Self {
        Self::Table(table)
    }
}

/// Footed total, with the agreement verdict when an expected total was
/// given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgreementResult {
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agrees: Option<bool>,
    /// `total − expected_total`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
}

/// Foots `source` and, if `expected_total` is given, agrees it.
///
/// `column` is required for a table source and ignored otherwise.
///
/// # Errors
/// - `InvalidArgument` for a table source without a column name, or a
///   non-finite expected total.
/// - `ColumnNotFound` / `NonNumericColumn` for a bad column.
///
/// # Examples
/// ```
/// use u_audit::footing::{foot_and_agree, FootingSource};
/// use u_audit::table::Table;
///
/// let table = Table::new().with_column("amount", vec![100.0, 200.0, 300.0]).unwrap();
/// let result = foot_and_agree(FootingSource::Table(&table), Some("amount"), Some(600.0)).unwrap();
/// assert_eq!(result.total, 600.0);
/// assert_eq!(result.agrees, Some(true));
/// assert_eq!(result.difference, Some(0.0));
/// ```
pub fn foot_and_agree(
    source: FootingSource<'_>,
    column: Option<&str>,
    expected_total: Option<f64>,
) -> Result<AgreementResult> {
    let total = match source {
        FootingSource::Values(values) => {
            let kept: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
            neumaier_sum(&kept)
        }
        FootingSource::Series(cells) => neumaier_sum(&present(cells)),
        FootingSource::Table(table) => {
            let name = column.ok_or_else(|| {
                AuditError::invalid_argument(
                    "column",
                    "None",
                    "a column name is required when footing a table",
                )
            })?;
            foot_total(table, name)?
        }
    };

    let Some(expected) = expected_total else {
        return Ok(AgreementResult {
            total,
            agrees: None,
            difference: None,
        });
    };
    if !expected.is_finite() {
        return Err(AuditError::invalid_argument(
            "expected_total",
            expected,
            "must be finite",
        ));
    }
    let difference = total - expected;
    Ok(AgreementResult {
        total,
        agrees: Some(difference.abs() < AGREEMENT_TOLERANCE),
        difference: Some(difference),
    })
}

/// Sum of the present values of a numeric column.
///
/// # Errors
/// `ColumnNotFound` or `NonNumericColumn`.
pub fn foot_total(table: &Table, column: &str) -> Result<f64> {
    Ok(neumaier_sum(&present(table.numeric_column(column)?)))
}
