//! Power search for one-sample t-test sample sizes.
//!
//! Finds the smallest sample size at which a one-sample t-test of the
//! given effect size reaches a target power. Attribute and acceptance
//! sample sizes are both built on this search.
//!
//! # Algorithm
//!
//! Linear scan upward from [`SolverConfig::min_n`]. At each `n`:
//!
//! 1. `df = n − 1`
//! 2. critical value from the central t quantile, per [`Alternative`]
//! 3. non-centrality `δ = effect × √n`
//! 4. achieved power from the non-central t CDF at the critical value
//!
//! The scan is bounded by [`SolverConfig::max_n`]. Running into the bound
//! is not an error: it yields [`SolverStatus::Exhausted`] so the caller can
//! tell a degenerate search from a converged one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{check_open_unit, AuditError, Result};
use crate::special::{non_central_t_cdf, t_distribution_quantile};

/// Alternative hypothesis of the one-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Upper-tail test: the error rate exceeds the tolerable rate.
    #[default]
    Greater,
    /// Lower-tail test. Power is only attainable for negative effect sizes.
    Less,
    /// Two-tailed test.
    TwoSided,
}

impl Alternative {
    /// Get the conventional name (`greater`, `less`, `two-sided`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Greater => "greater",
            Self::Less => "less",
            Self::TwoSided => "two-sided",
        }
    }

    /// Critical t value for significance level `alpha` at `df` degrees of
    /// freedom.
    pub fn critical_value(self, alpha: f64, df: f64) -> f64 {
        match self {
            Self::Greater => t_distribution_quantile(1.0 - alpha, df),
            Self::Less => t_distribution_quantile(alpha, df),
            Self::TwoSided => t_distribution_quantile(1.0 - alpha / 2.0, df),
        }
    }

    /// Probability of rejecting the null at critical value `crit` when the
    /// statistic follows a non-central t with `df` and `ncp`.
    pub fn rejection_probability(self, crit: f64, df: f64, ncp: f64) -> f64 {
        match self {
            Self::Greater => 1.0 - non_central_t_cdf(crit, df, ncp),
            Self::Less => non_central_t_cdf(crit, df, ncp),
            Self::TwoSided => {
                1.0 - non_central_t_cdf(crit, df, ncp) + non_central_t_cdf(-crit, df, ncp)
            }
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Alternative {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greater" => Ok(Self::Greater),
            "less" => Ok(Self::Less),
            "two-sided" | "two.sided" | "two_sided" => Ok(Self::TwoSided),
            other => Err(AuditError::invalid_argument(
                "alternative",
                other,
                "expected one of: greater, less, two-sided",
            )),
        }
    }
}

/// Bounds of the sample-size scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// First sample size evaluated (at least 2, so that `df ≥ 1`).
    pub min_n: u64,
    /// Exclusive upper bound of the scan; reported as the sample size
    /// when the search is exhausted.
    pub max_n: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            min_n: 10,
            max_n: 10_000,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.min_n < 2 {
            return Err(AuditError::invalid_argument(
                "min_n",
                self.min_n,
                "must be at least 2",
            ));
        }
        if self.max_n <= self.min_n {
            return Err(AuditError::invalid_argument(
                "max_n",
                self.max_n,
                format!("must exceed min_n ({})", self.min_n),
            ));
        }
        Ok(())
    }
}

/// Outcome of the power search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// The target power was reached.
    Converged,
    /// The scan hit [`SolverConfig::max_n`] without reaching the target.
    Exhausted,
}

/// Sample size found by the power search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSolution {
    /// Smallest sample size meeting the target, or the scan bound when
    /// exhausted.
    pub sample_size: u64,
    /// Power achieved at the last evaluated sample size.
    pub achieved_power: f64,
    /// Whether the target was reached.
    pub status: SolverStatus,
}

impl PowerSolution {
    /// Returns `true` if the target power was reached.
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

/// Power of a one-sample t-test with `n` observations.
///
/// # Examples
/// ```
/// use u_audit::power::{achieved_power, Alternative};
/// let p = achieved_power(1.0, 10, 0.05, Alternative::Greater);
/// assert!((p - 0.8975).abs() < 0.005);
/// ```
pub fn achieved_power(
    effect_size: f64,
    n: u64,
    significance_level: f64,
    alternative: Alternative,
) -> f64 {
    let df = (n as f64) - 1.0;
    let crit = alternative.critical_value(significance_level, df);
    let ncp = effect_size * (n as f64).sqrt();
    alternative.rejection_probability(crit, df, ncp)
}

/// Smallest sample size reaching `power`, scanning the default bounds.
///
/// See [`solve_sample_size_with`].
pub fn solve_sample_size(
    effect_size: f64,
    significance_level: f64,
    power: f64,
    alternative: Alternative,
) -> Result<PowerSolution> {
    solve_sample_size_with(
        effect_size,
        significance_level,
        power,
        alternative,
        &SolverConfig::default(),
    )
}

/// Smallest sample size reaching `power` within the bounds of `config`.
///
/// # Errors
/// `InvalidArgument` if `significance_level` or `power` is outside `(0, 1)`,
/// the effect size is not finite, or the bounds are inconsistent.
///
/// # Examples
/// ```
/// use u_audit::power::{solve_sample_size, Alternative};
/// let solution = solve_sample_size(0.5, 0.05, 0.8, Alternative::Greater).unwrap();
/// assert!(solution.converged());
/// assert!((25..=28).contains(&solution.sample_size));
/// ```
pub fn solve_sample_size_with(
    effect_size: f64,
    significance_level: f64,
    power: f64,
    alternative: Alternative,
    config: &SolverConfig,
) -> Result<PowerSolution> {
    if !effect_size.is_finite() {
        return Err(AuditError::invalid_argument(
            "effect_size",
            effect_size,
            "must be finite",
        ));
    }
    check_open_unit("significance_level", significance_level)?;
    check_open_unit("power", power)?;
    config.validate()?;

    let mut last_power = f64::NAN;
    for n in config.min_n..config.max_n {
        last_power = achieved_power(effect_size, n, significance_level, alternative);
        if last_power >= power {
            tracing::debug!(
                n,
                achieved_power = last_power,
                effect_size,
                %alternative,
                "power search converged"
            );
            return Ok(PowerSolution {
                sample_size: n,
                achieved_power: last_power,
                status: SolverStatus::Converged,
            });
        }
    }

    tracing::warn!(
        max_n = config.max_n,
        achieved_power = last_power,
        target_power = power,
        effect_size,
        %alternative,
        "power search exhausted without reaching target"
    );
    Ok(PowerSolution {
        sample_size: config.max_n,
        achieved_power: last_power,
        status: SolverStatus::Exhausted,
    })
}
