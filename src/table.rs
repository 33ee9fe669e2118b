//! Materialized tabular data.
//!
//! A [`Table`] is the hand-off point from whatever loads transaction data
//! (CSV, spreadsheet, database query) to the analytics in this crate. Columns
//! keep their insertion order and all have the same number of rows. Missing
//! cells are `None`; a NaN in a numeric column is also treated as missing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{AuditError, Result};

/// A single column of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// `true` if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` for a numeric column.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Numeric cells, or `None` for a text column.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Text cells, or `None` for a numeric column.
    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            Self::Numeric(_) => None,
            Self::Text(v) => Some(v),
        }
    }

    /// Present numeric values in row order; empty for a text column.
    pub fn present_values(&self) -> Vec<f64> {
        match self {
            Self::Numeric(v) => present(v),
            Self::Text(_) => Vec::new(),
        }
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        match self {
            Self::Numeric(v) => v.iter().filter(|c| !is_present(c)).count(),
            Self::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Number of distinct present values. Numeric values compare by bit
    /// pattern after folding `-0.0` into `0.0`.
    pub fn distinct_count(&self) -> usize {
        match self {
            Self::Numeric(v) => v
                .iter()
                .filter_map(|c| c.filter(|x| !x.is_nan()))
                .map(|x| if x == 0.0 { 0.0_f64.to_bits() } else { x.to_bits() })
                .collect::<BTreeSet<_>>()
                .len(),
            Self::Text(v) => v.iter().flatten().collect::<BTreeSet<_>>().len(),
        }
    }

    /// New column holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Self::Numeric(v) => Self::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Self::Text(v) => Self::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

fn is_present(cell: &Option<f64>) -> bool {
    matches!(cell, Some(x) if !x.is_nan())
}

/// Present values of a numeric series, dropping `None` and NaN.
pub fn present(cells: &[Option<f64>]) -> Vec<f64> {
    cells.iter().copied().flatten().filter(|x| !x.is_nan()).collect()
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::Numeric(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Self::Numeric(values)
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Self::Text(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Self::Text(values.into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Self {
        Self::Text(values)
    }
}

impl From<Vec<Option<&str>>> for Column {
    fn from(values: Vec<Option<&str>>) -> Self {
        Self::Text(values.into_iter().map(|s| s.map(str::to_owned)).collect())
    }
}

/// Named columns of equal length, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    /// Creates a table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Table::insert`].
    ///
    /// # Examples
    /// ```
    /// use u_audit::table::Table;
    /// let table = Table::new()
    ///     .with_column("vendor", vec!["a", "b"]).unwrap()
    ///     .with_column("amount", vec![10.0, 20.0]).unwrap();
    /// assert_eq!(table.n_rows(), 2);
    /// assert_eq!(table.column_names(), vec!["vendor", "amount"]);
    /// ```
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> Result<Self> {
        self.insert(name, column)?;
        Ok(self)
    }

    /// Adds a column, replacing any column of the same name in place.
    ///
    /// # Errors
    /// `InvalidArgument` if the column length differs from the table's row
    /// count.
    pub fn insert(&mut self, name: impl Into<String>, column: impl Into<Column>) -> Result<()> {
        let name = name.into();
        let column = column.into();
        let others = self.columns.iter().filter(|(n, _)| *n != name);
        if let Some((other, existing)) = others.map(|(n, c)| (n, c.len())).next() {
            if existing != column.len() {
                return Err(AuditError::invalid_argument(
                    "column",
                    format!("{name} ({} rows)", column.len()),
                    format!("table has {existing} rows (column '{other}')"),
                ));
            }
        }
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = column,
            None => self.columns.push((name, column)),
        }
        Ok(())
    }

    /// Number of rows; 0 for a table without columns.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// `true` if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates `(name, column)` pairs in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Looks up a column by name.
    ///
    /// # Errors
    /// `ColumnNotFound` if no column has that name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| AuditError::column_not_found(name))
    }

    /// Looks up a numeric column by name.
    ///
    /// # Errors
    /// `ColumnNotFound` or `NonNumericColumn`.
    pub fn numeric_column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)?
            .as_numeric()
            .ok_or_else(|| AuditError::non_numeric_column(name))
    }

    /// New table holding the rows at `indices` of every column.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(indices)))
                .collect(),
        }
    }

    /// New table without the named column.
    pub fn without_column(&self, name: &str) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|(n, _)| n != name)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new()
            .with_column("vendor", vec![Some("a"), None, Some("b"), Some("a")])
            .unwrap()
            .with_column("amount", vec![Some(1.0), Some(f64::NAN), None, Some(1.0)])
            .unwrap()
    }

    #[test]
    fn test_insertion_order_and_lookup() {
        let t = sample();
        assert_eq!(t.column_names(), vec!["vendor", "amount"]);
        assert_eq!(t.n_rows(), 4);
        assert_eq!(t.n_columns(), 2);
        assert!(t.column("amount").unwrap().is_numeric());
        assert!(matches!(t.column("missing"), Err(AuditError::ColumnNotFound { .. })));
        assert!(matches!(
            t.numeric_column("vendor"),
            Err(AuditError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = sample().with_column("extra", vec![1.0, 2.0]);
        assert!(matches!(result, Err(AuditError::InvalidArgument { .. })));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut t = sample();
        t.insert("vendor", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.column_names(), vec!["vendor", "amount"]);
        assert!(t.column("vendor").unwrap().is_numeric());
    }

    #[test]
    fn test_replace_single_column_may_change_length() {
        let mut t = Table::new().with_column("x", vec![1.0]).unwrap();
        t.insert("x", vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.n_rows(), 3);
    }

    #[test]
    fn test_missing_and_distinct() {
        let t = sample();
        let amount = t.column("amount").unwrap();
        assert_eq!(amount.missing_count(), 2);
        assert_eq!(amount.distinct_count(), 1);
        assert_eq!(amount.present_values(), vec![1.0, 1.0]);
        let vendor = t.column("vendor").unwrap();
        assert_eq!(vendor.missing_count(), 1);
        assert_eq!(vendor.distinct_count(), 2);
        assert!(vendor.present_values().is_empty());
    }

    #[test]
    fn test_take_rows_and_drop_column() {
        let t = sample().take_rows(&[3, 0]);
        assert_eq!(t.n_rows(), 2);
        assert_eq!(
            t.column("vendor").unwrap().as_text().unwrap(),
            &[Some("a".to_owned()), Some("a".to_owned())]
        );
        let dropped = t.without_column("vendor");
        assert_eq!(dropped.column_names(), vec!["amount"]);
    }

    #[test]
    fn test_empty_table() {
        let t = Table::new();
        assert!(t.is_empty());
        assert_eq!(t.n_rows(), 0);
    }
}
