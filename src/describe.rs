//! Summary statistics of a [`Table`].
//!
//! Three levels of detail:
//!
//! | Level | Columns | Statistics |
//! |---|---|---|
//! | `Basic` | numeric | count, mean, std, min, q25, median, q75, max |
//! | `Extended` | numeric | Basic + skewness, kurtosis, sum |
//! | `All` | every column | n, missing, distinct; numeric adds mean, std, min, q05, q25, median, q75, q95, max |
//!
//! Missing cells are dropped before any statistic is computed. Standard
//! deviation uses `n − 1`; quantiles use R-7 interpolation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats;
use crate::table::{Column, Table};

/// Level of detail of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescribeLevel {
    #[default]
    Basic,
    Extended,
    All,
}

/// Statistics of one column. Fields not computed at the chosen level, or
/// undefined for the data (e.g. std of a single value), are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Number of present values.
    pub count: usize,
    /// Number of rows, present or not (`All` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<usize>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q05: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q95: Option<f64>,
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurtosis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}

/// Summary of a table, one entry per described column in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub level: DescribeLevel,
    pub columns: Vec<ColumnSummary>,
}

impl Summary {
    /// Summary of the named column, if it was described.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Summary of the rows sharing one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub rows: usize,
    pub summary: Summary,
}

/// Summaries per group, in ascending key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSummary {
    pub group_by: String,
    pub groups: Vec<GroupSummary>,
}

impl GroupedSummary {
    /// Looks up the group with the rendered key `key`.
    pub fn group(&self, key: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.key == key)
    }
}

/// Describes every column of `table` at `level`.
///
/// # Examples
/// ```
/// use u_audit::describe::{describe, DescribeLevel};
/// use u_audit::table::Table;
///
/// let table = Table::new().with_column("amount", vec![100.0, 200.0, 300.0]).unwrap();
/// let summary = describe(&table, DescribeLevel::Basic);
/// let amount = summary.column("amount").unwrap();
/// assert_eq!(amount.count, 3);
/// assert_eq!(amount.median, Some(200.0));
/// ```
pub fn describe(table: &Table, level: DescribeLevel) -> Summary {
    let columns = table
        .columns()
        .filter(|(_, col)| level == DescribeLevel::All || col.is_numeric())
        .map(|(name, col)| summarize(name, col, level))
        .collect();
    Summary { level, columns }
}

/// Describes `table` separately for each distinct value of the column
/// `group_by`.
///
/// Text keys are ordered lexically. Numeric keys, such as account codes,
/// are ordered by value and rendered with `Display` (`4010.0` becomes
/// `"4010"`). Rows with a missing or NaN key are dropped. The grouping
/// column itself is not described.
///
/// # Errors
/// `ColumnNotFound` if `group_by` does not exist.
///
/// # Examples
/// ```
/// use u_audit::describe::{describe_grouped, DescribeLevel};
/// use u_audit::table::Table;
///
/// let table = Table::new()
///     .with_column("account", vec![4010.0, 1200.0, 4010.0])
///     .unwrap()
///     .with_column("amount", vec![10.0, 20.0, 30.0])
///     .unwrap();
/// let grouped = describe_grouped(&table, "account", DescribeLevel::Basic).unwrap();
/// assert_eq!(grouped.groups[0].key, "1200");
/// assert_eq!(grouped.groups[1].rows, 2);
/// ```
pub fn describe_grouped(
    table: &Table,
    group_by: &str,
    level: DescribeLevel,
) -> Result<GroupedSummary> {
    let keyed_rows = match table.column(group_by)? {
        Column::Text(keys) => text_groups(keys),
        Column::Numeric(keys) => numeric_groups(keys),
    };

    let rest = table.without_column(group_by);
    let groups = keyed_rows
        .into_iter()
        .map(|(key, rows)| GroupSummary {
            key,
            rows: rows.len(),
            summary: describe(&rest.take_rows(&rows), level),
        })
        .collect();

    Ok(GroupedSummary {
        group_by: group_by.to_owned(),
        groups,
    })
}

fn text_groups(keys: &[Option<String>]) -> Vec<(String, Vec<usize>)> {
    let mut rows_by_key: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            rows_by_key.entry(key.as_str()).or_default().push(row);
        }
    }
    rows_by_key
        .into_iter()
        .map(|(key, rows)| (key.to_owned(), rows))
        .collect()
}

fn numeric_groups(keys: &[Option<f64>]) -> Vec<(String, Vec<usize>)> {
    let mut keyed: Vec<(f64, usize)> = keys
        .iter()
        .enumerate()
        .filter_map(|(row, &key)| key.filter(|k| !k.is_nan()).map(|k| (k, row)))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for (key, row) in keyed {
        match groups.last_mut() {
            // -0.0 and 0.0 sort next to each other and form one group
            Some((last, rows)) if *last == key => rows.push(row),
            _ => groups.push((key, vec![row])),
        }
    }
    groups
        .into_iter()
        .map(|(key, rows)| (key.to_string(), rows))
        .collect()
}

fn summarize(name: &str, column: &Column, level: DescribeLevel) -> ColumnSummary {
    let values = column.present_values();
    let mut summary = ColumnSummary {
        column: name.to_owned(),
        count: column.len() - column.missing_count(),
        ..ColumnSummary::default()
    };

    if level == DescribeLevel::All {
        summary.n = Some(column.len());
        summary.missing = Some(column.missing_count());
        summary.distinct = Some(column.distinct_count());
        if !column.is_numeric() {
            return summary;
        }
    }

    let sorted = stats::sorted(&values).unwrap_or_default();
    let q = |p: f64| stats::quantile_sorted(&sorted, p);

    summary.mean = stats::mean(&values);
    summary.std = stats::std_dev(&values);
    summary.min = sorted.first().copied();
    summary.q25 = q(0.25);
    summary.median = q(0.5);
    summary.q75 = q(0.75);
    summary.max = sorted.last().copied();

    match level {
        DescribeLevel::Basic => {}
        DescribeLevel::Extended => {
            summary.skewness = stats::skewness(&values);
            summary.kurtosis = stats::kurtosis(&values);
            summary.sum = Some(stats::neumaier_sum(&values));
        }
        DescribeLevel::All => {
            summary.q05 = q(0.05);
            summary.q95 = q(0.95);
        }
    }
    summary
}
