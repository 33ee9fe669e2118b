//! # u-audit
//!
//! Statistical parameters for financial-audit sampling and anomaly
//! detection.
//!
//! Every operation is a pure function of its inputs: no I/O, no global
//! state. Loading ledgers is the caller's job; the loaded data is handed
//! over as a [`table::Table`].
//!
//! ## Modules
//!
//! - [`sampling`] — Discovery, attribute, acceptance and monetary-unit sample sizes
//! - [`power`] — One-sample t-test power search behind the attribute sizes
//! - [`stratified`] — Neyman allocation across strata
//! - [`benford`] — Benford's Law digit-frequency analysis
//! - [`describe`] — Summary statistics, optionally per group
//! - [`normality`] — Shapiro-Wilk, Kolmogorov-Smirnov, Anderson-Darling
//! - [`outlier`] — IQR, z-score and modified z-score outlier detection
//! - [`footing`] — Footing a column and agreeing it to a reported total
//! - [`table`] — Materialized tabular data
//! - [`stats`] — Descriptive statistics with numerical stability guarantees
//! - [`special`] — Normal, Student t, non-central t and chi-squared functions
//! - [`error`] — Error type shared by all modules
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Neumaier summation for totals
//! - **Bounded searches**: the power search reports exhaustion instead of
//!   looping or failing silently
//! - **Property-based testing**: Mathematical invariants verified via proptest
//!
//! ## Logging
//!
//! Diagnostic events are emitted through [`tracing`]. The crate never
//! installs a subscriber.

pub mod benford;
pub mod describe;
pub mod error;
pub mod footing;
pub mod normality;
pub mod outlier;
pub mod power;
pub mod sampling;
pub mod special;
pub mod stats;
pub mod stratified;
pub mod table;

pub use error::{AuditError, Result};
