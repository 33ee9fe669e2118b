//! Error types for audit calculations.

/// Result type alias for u-audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur in audit calculations.
///
/// Every variant carries enough context (parameter name and offending
/// value, or the column involved) to diagnose the failure without
/// re-running the calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AuditError {
    /// An input lies outside the domain of the calculation.
    #[error("invalid argument `{name}` = {value}: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Column not found in the table.
    #[error("column '{name}' not found")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// A numeric operation was requested on a text column.
    #[error("column '{name}' is not numeric")]
    NonNumericColumn {
        /// The name of the offending column.
        name: String,
    },

    /// Too few usable values after filtering.
    #[error("insufficient data: need at least {required} values, got {actual}")]
    InsufficientData {
        /// Minimum number of values the calculation needs.
        required: usize,
        /// Number of values actually available.
        actual: usize,
    },

    /// The data admits no meaningful result (e.g. zero spread).
    #[error("degenerate data: {reason}")]
    DegenerateData {
        /// Description of the degeneracy.
        reason: String,
    },
}

impl AuditError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a column-not-found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a non-numeric-column error.
    pub fn non_numeric_column(name: impl Into<String>) -> Self {
        Self::NonNumericColumn { name: name.into() }
    }

    /// Create a degenerate-data error.
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateData {
            reason: reason.into(),
        }
    }
}

/// Checks that `value` lies in the open unit interval `(0, 1)`.
pub(crate) fn check_open_unit(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(AuditError::invalid_argument(
            name,
            value,
            "must be between 0 and 1 (exclusive)",
        ))
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AuditError::invalid_argument(
            name,
            value,
            "must be finite and greater than 0",
        ))
    }
}

/// Checks that `value` is finite and not negative.
pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AuditError::invalid_argument(
            name,
            value,
            "must be finite and not negative",
        ))
    }
}
