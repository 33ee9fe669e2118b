//! Audit sample-size calculators.
//!
//! - [`discovery_sample_size`]: closed form, at least one error is seen
//!   with the given confidence when the error rate reaches the intolerable
//!   rate.
//! - [`attribute_sample_size`], [`attribute_sample_size_amount`],
//!   [`acceptance_sample_size`]: t-test power search via
//!   [`crate::power`].
//! - [`attribute_sample_size_normal`]: closed-form normal approximation of
//!   the occurrence calculation.
//! - [`monetary_unit_sample_size`]: zero-expected-error MUS risk factor.
//!
//! Parameters with defaults live in config structs. Defaults that depend on
//! another field are `Option`s resolved when the calculation runs.

use serde::{Deserialize, Serialize};

use crate::error::{check_non_negative, check_open_unit, check_positive, AuditError, Result};
use crate::power::{solve_sample_size_with, Alternative, PowerSolution, SolverConfig};
use crate::special::inverse_normal_cdf;

/// Default detectable error rate.
pub const DEFAULT_DELTA_RATE: f64 = 0.05;
/// Default significance level.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Default target power.
pub const DEFAULT_POWER: f64 = 0.8;
/// Default spread of the occurrence calculation, as a fraction of size.
pub const DEFAULT_SIGMA_FRACTION: f64 = 0.3;
/// Default spread of transaction amounts.
pub const DEFAULT_AMOUNT_SIGMA: f64 = 30.0;
/// Default MUS confidence.
pub const DEFAULT_MUS_CONFIDENCE: f64 = 0.95;

fn default_delta_rate() -> f64 {
    DEFAULT_DELTA_RATE
}

fn default_significance_level() -> f64 {
    DEFAULT_SIGNIFICANCE_LEVEL
}

fn default_power() -> f64 {
    DEFAULT_POWER
}

fn default_amount_sigma() -> f64 {
    DEFAULT_AMOUNT_SIGMA
}

fn default_mus_confidence() -> f64 {
    DEFAULT_MUS_CONFIDENCE
}

/// Sample sizes of an attribute-sampling plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleSizeResult {
    /// Sample size for testing the occurrence of errors.
    pub occurrence: u64,
    /// Sample size for testing error amounts, when requested.
    pub amount: Option<u64>,
    /// `false` if any power search hit its bound.
    pub converged: bool,
}

/// Discovery sample size.
///
/// `n = ceil(ln(1 − confidence) / ln(1 − intolerable_rate))`: the number of
/// draws after which at least one error is observed with probability
/// `confidence` when the population error rate equals `intolerable_rate`.
///
/// # Errors
/// `InvalidArgument` unless both arguments lie strictly between 0 and 1,
/// or when the rate is so small that the size does not fit in a `u64`.
///
/// # Examples
/// ```
/// use u_audit::sampling::discovery_sample_size;
/// assert_eq!(discovery_sample_size(0.95, 0.05).unwrap(), 59);
/// ```
pub fn discovery_sample_size(confidence: f64, intolerable_rate: f64) -> Result<u64> {
    check_open_unit("intolerable_rate", intolerable_rate)?;
    check_open_unit("confidence", confidence)?;
    // ln_1p keeps tiny rates from rounding `1 − rate` to 1
    let n = ((-confidence).ln_1p() / (-intolerable_rate).ln_1p()).ceil();
    if !n.is_finite() || n >= u64::MAX as f64 {
        return Err(AuditError::invalid_argument(
            "intolerable_rate",
            intolerable_rate,
            "too small for a representable sample size",
        ));
    }
    Ok(n as u64)
}

/// Parameters of the occurrence calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    /// Number of transactions in the population.
    pub size: u64,
    /// Detectable error rate.
    #[serde(default = "default_delta_rate")]
    pub delta_rate: f64,
    /// Spread of the error count; `0.3 × size` when unset.
    #[serde(default)]
    pub sigma_rate: Option<f64>,
    /// Significance level of the test.
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
    /// Target power.
    #[serde(default = "default_power")]
    pub power: f64,
    /// Alternative hypothesis.
    #[serde(default)]
    pub alternative: Alternative,
    /// Bounds of the power search.
    #[serde(default)]
    pub solver: SolverConfig,
}

impl AttributeConfig {
    /// Create a config for a population of `size` transactions with all
    /// other parameters at their defaults.
    pub fn new(size: u64) -> Self {
        Self {
            size,
            delta_rate: DEFAULT_DELTA_RATE,
            sigma_rate: None,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            power: DEFAULT_POWER,
            alternative: Alternative::default(),
            solver: SolverConfig::default(),
        }
    }

    /// Sets the detectable error rate.
    pub fn with_delta_rate(mut self, delta_rate: f64) -> Self {
        self.delta_rate = delta_rate;
        self
    }

    /// Sets the spread of the error count explicitly.
    pub fn with_sigma_rate(mut self, sigma_rate: f64) -> Self {
        self.sigma_rate = Some(sigma_rate);
        self
    }

    /// Sets the significance level.
    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.significance_level = significance_level;
        self
    }

    /// Sets the target power.
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Sets the alternative hypothesis.
    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    /// Sets the bounds of the power search.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Spread used by the calculation, resolving the size-dependent default.
    pub fn resolved_sigma(&self) -> f64 {
        self.sigma_rate.unwrap_or(DEFAULT_SIGMA_FRACTION * self.size as f64)
    }

    fn effect_size(&self) -> Result<f64> {
        if self.size == 0 {
            return Err(AuditError::invalid_argument(
                "size",
                self.size,
                "must be greater than 0",
            ));
        }
        check_finite("delta_rate", self.delta_rate)?;
        let sigma = self.resolved_sigma();
        check_positive("sigma_rate", sigma)?;
        Ok(self.delta_rate * self.size as f64 / sigma)
    }
}

/// Parameters of the amount and acceptance calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountConfig {
    /// Total amount of the population (the account balance for
    /// acceptance sampling).
    pub total_amount: f64,
    /// Average transaction value.
    pub mean_transaction: f64,
    /// Detectable error rate (materiality for acceptance sampling).
    #[serde(default = "default_delta_rate")]
    pub delta_rate: f64,
    /// Spread of transaction amounts.
    #[serde(default = "default_amount_sigma")]
    pub sigma: f64,
    /// Significance level of the test.
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
    /// Target power.
    #[serde(default = "default_power")]
    pub power: f64,
    /// Alternative hypothesis.
    #[serde(default)]
    pub alternative: Alternative,
    /// Bounds of the power search.
    #[serde(default)]
    pub solver: SolverConfig,
}

impl AmountConfig {
    /// Create a config with all optional parameters at their defaults.
    pub fn new(total_amount: f64, mean_transaction: f64) -> Self {
        Self {
            total_amount,
            mean_transaction,
            delta_rate: DEFAULT_DELTA_RATE,
            sigma: DEFAULT_AMOUNT_SIGMA,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            power: DEFAULT_POWER,
            alternative: Alternative::default(),
            solver: SolverConfig::default(),
        }
    }

    /// Sets the detectable error rate.
    pub fn with_delta_rate(mut self, delta_rate: f64) -> Self {
        self.delta_rate = delta_rate;
        self
    }

    /// Sets the standard deviation of transaction amounts.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Sets the significance level.
    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.significance_level = significance_level;
        self
    }

    /// Sets the target power.
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Sets the alternative hypothesis.
    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    /// Sets the bounds of the power search.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    fn effect_size(&self) -> Result<f64> {
        check_positive("total_amount", self.total_amount)?;
        check_positive("mean_transaction", self.mean_transaction)?;
        check_finite("delta_rate", self.delta_rate)?;
        check_positive("sigma", self.sigma)?;
        Ok(self.delta_rate * self.mean_transaction / self.sigma)
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AuditError::invalid_argument(name, value, "must be finite"))
    }
}

/// Occurrence sample size for estimating a transaction error rate.
///
/// `effect = delta_rate × size / sigma`, solved by the t-test power search.
/// `amount` is left empty; see [`attribute_sample_sizes`].
///
/// # Errors
/// `InvalidArgument` for a zero size, a non-positive spread, or test
/// parameters outside `(0, 1)`.
///
/// # Examples
/// ```
/// use u_audit::sampling::{attribute_sample_size, AttributeConfig};
/// let result = attribute_sample_size(&AttributeConfig::new(1000)).unwrap();
/// assert!(result.converged);
/// assert!(result.occurrence > 0);
/// assert_eq!(result.amount, None);
/// ```
pub fn attribute_sample_size(config: &AttributeConfig) -> Result<SampleSizeResult> {
    let solution = solve_attribute(config)?;
    Ok(SampleSizeResult {
        occurrence: solution.sample_size,
        amount: None,
        converged: solution.converged(),
    })
}

fn solve_attribute(config: &AttributeConfig) -> Result<PowerSolution> {
    let effect = config.effect_size()?;
    solve_sample_size_with(
        effect,
        config.significance_level,
        config.power,
        config.alternative,
        &config.solver,
    )
}

/// Amount sample size for estimating monetary error.
///
/// `effect = delta_rate × mean_transaction / sigma`, solved by the t-test
/// power search. The total amount is validated but does not enter the
/// effect size.
///
/// # Errors
/// `InvalidArgument` for non-positive amounts or spread, or test parameters
/// outside `(0, 1)`.
pub fn attribute_sample_size_amount(config: &AmountConfig) -> Result<PowerSolution> {
    let effect = config.effect_size()?;
    solve_sample_size_with(
        effect,
        config.significance_level,
        config.power,
        config.alternative,
        &config.solver,
    )
}

/// Acceptance sample size for substantive testing of an account balance.
///
/// Identical to [`attribute_sample_size_amount`] with the account balance
/// in [`AmountConfig::total_amount`].
pub fn acceptance_sample_size(config: &AmountConfig) -> Result<PowerSolution> {
    attribute_sample_size_amount(config)
}

/// Occurrence and amount sample sizes of one plan.
pub fn attribute_sample_sizes(
    occurrence: &AttributeConfig,
    amount: &AmountConfig,
) -> Result<SampleSizeResult> {
    let occ = solve_attribute(occurrence)?;
    let amt = attribute_sample_size_amount(amount)?;
    Ok(SampleSizeResult {
        occurrence: occ.sample_size,
        amount: Some(amt.sample_size),
        converged: occ.converged() && amt.converged(),
    })
}

/// Closed-form normal approximation of the occurrence sample size.
///
/// `n = ceil(((z₁₋α + z_power) / effect)²)` with
/// `effect = delta_rate / sigma_rate`; both rates are fractions of `size`,
/// which therefore cancels. Smaller than the t-based search by the
/// small-sample correction.
///
/// # Examples
/// ```
/// use u_audit::sampling::attribute_sample_size_normal;
/// assert_eq!(attribute_sample_size_normal(1000, 0.05, 0.3, 0.05, 0.8).unwrap(), 223);
/// ```
pub fn attribute_sample_size_normal(
    size: u64,
    delta_rate: f64,
    sigma_rate: f64,
    significance_level: f64,
    power: f64,
) -> Result<u64> {
    if size == 0 {
        return Err(AuditError::invalid_argument(
            "size",
            size,
            "must be greater than 0",
        ));
    }
    check_positive("delta_rate", delta_rate)?;
    check_positive("sigma_rate", sigma_rate)?;
    check_open_unit("significance_level", significance_level)?;
    check_open_unit("power", power)?;

    let effect = delta_rate / sigma_rate;
    let z = inverse_normal_cdf(1.0 - significance_level) + inverse_normal_cdf(power);
    let n = (z / effect).powi(2).ceil();
    Ok(n.max(1.0) as u64)
}

/// Parameters of the monetary-unit sample size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetaryUnitConfig {
    /// Total monetary value of the population.
    pub population_value: f64,
    /// Maximum tolerable misstatement.
    pub tolerable_error: f64,
    /// Confidence level.
    #[serde(default = "default_mus_confidence")]
    pub confidence: f64,
    /// Expected error rate; widens the risk factor when positive.
    #[serde(default)]
    pub expected_error_rate: f64,
}

impl MonetaryUnitConfig {
    /// Configuration at 95 % confidence with no expected errors.
    pub fn new(population_value: f64, tolerable_error: f64) -> Self {
        Self {
            population_value,
            tolerable_error,
            confidence: DEFAULT_MUS_CONFIDENCE,
            expected_error_rate: 0.0,
        }
    }

    /// Sets the confidence level.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets the expected error rate.
    pub fn with_expected_error_rate(mut self, rate: f64) -> Self {
        self.expected_error_rate = rate;
        self
    }

    /// Reliability factor `−ln(1 − confidence)`, scaled by
    /// `1 + expected_error_rate` when errors are expected.
    pub fn risk_factor(&self) -> f64 {
        let r = -(1.0 - self.confidence).ln();
        if self.expected_error_rate > 0.0 {
            r * (1.0 + self.expected_error_rate)
        } else {
            r
        }
    }
}

/// Monetary-unit sample size `ceil(population_value × r / tolerable_error)`.
///
/// A zero-valued population needs no sample.
///
/// # Examples
/// ```
/// use u_audit::sampling::{monetary_unit_sample_size, MonetaryUnitConfig};
/// let config = MonetaryUnitConfig::new(1_000_000.0, 50_000.0);
/// assert_eq!(monetary_unit_sample_size(&config).unwrap(), 60);
/// ```
pub fn monetary_unit_sample_size(config: &MonetaryUnitConfig) -> Result<u64> {
    check_non_negative("population_value", config.population_value)?;
    check_positive("tolerable_error", config.tolerable_error)?;
    check_open_unit("confidence", config.confidence)?;
    check_non_negative("expected_error_rate", config.expected_error_rate)?;

    let n = config.population_value * config.risk_factor() / config.tolerable_error;
    Ok(n.ceil() as u64)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn discovery_monotone_in_confidence(
            c in 0.5_f64..0.98,
            step in 0.001_f64..0.01,
            rate in 0.01_f64..0.3,
        ) {
            let lo = discovery_sample_size(c, rate).unwrap();
            let hi = discovery_sample_size(c + step, rate).unwrap();
            prop_assert!(hi >= lo);
        }

        #[test]
        fn discovery_covers_confidence(c in 0.5_f64..0.99, rate in 0.01_f64..0.5) {
            let n = discovery_sample_size(c, rate).unwrap();
            // Probability of seeing at least one error in n draws
            let detect = 1.0 - (1.0 - rate).powi(n as i32);
            prop_assert!(detect >= c - 1e-9);
        }

        #[test]
        fn mus_monotone_in_tolerable_error(value in 1e3_f64..1e7, tol in 100.0_f64..1e4) {
            let loose =
                monetary_unit_sample_size(&MonetaryUnitConfig::new(value, tol * 2.0)).unwrap();
            let tight = monetary_unit_sample_size(&MonetaryUnitConfig::new(value, tol)).unwrap();
            prop_assert!(tight >= loose);
        }
    }
}
