//! Normality tests.
//!
//! # Tests
//!
//! - **Shapiro-Wilk**: W statistic with Royston's coefficient and p-value
//!   approximations, valid for `3 ≤ n ≤ 5000`.
//!   Reference: Royston (1995), "Remark AS R94", *Applied Statistics*
//!   44(4), pp. 547–551.
//! - **Kolmogorov-Smirnov**: one-sample D against the standard normal
//!   N(0, 1). The data is not standardized first. The p-value is the
//!   asymptotic Kolmogorov distribution with Stephens' small-sample
//!   correction.
//! - **Anderson-Darling**: A² against a normal fitted with the sample mean
//!   and sample standard deviation, reported with the tabulated critical
//!   values instead of a p-value.
//!   Reference: Stephens (1974), "EDF Statistics for Goodness of Fit",
//!   *JASA* 69(347), pp. 730–737.
//!
//! Missing values (NaN) are dropped before testing.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::special::{inverse_normal_cdf, standard_normal_cdf, standard_normal_log_cdf};
use crate::stats;

/// Significance level below which a p-value rejects normality.
pub const NORMALITY_ALPHA: f64 = 0.05;

/// Anderson-Darling significance levels (%) of [`AD_CRITICAL_VALUES`].
pub const AD_SIGNIFICANCE_LEVELS: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];

/// Anderson-Darling critical values for the normal case with estimated
/// mean and variance, before the small-sample adjustment.
pub const AD_CRITICAL_VALUES: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

/// Which normality test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTest {
    #[default]
    ShapiroWilk,
    KolmogorovSmirnov,
    AndersonDarling,
}

impl NormalityTest {
    /// Display name of the test.
    pub fn name(self) -> &'static str {
        match self {
            Self::ShapiroWilk => "Shapiro-Wilk",
            Self::KolmogorovSmirnov => "Kolmogorov-Smirnov",
            Self::AndersonDarling => "Anderson-Darling",
        }
    }
}

impl fmt::Display for NormalityTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalityTest {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shapiro" | "shapiro-wilk" | "shapiro_wilk" => Ok(Self::ShapiroWilk),
            "ks" | "kolmogorov-smirnov" | "kolmogorov_smirnov" => Ok(Self::KolmogorovSmirnov),
            "anderson" | "anderson-darling" | "anderson_darling" => Ok(Self::AndersonDarling),
            other => Err(AuditError::invalid_argument(
                "method",
                other,
                "expected one of: shapiro, ks, anderson",
            )),
        }
    }
}

/// Result of a normality test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityResult {
    pub test: NormalityTest,
    pub statistic: f64,
    /// Absent for Anderson-Darling.
    pub p_value: Option<f64>,
    /// `p_value > 0.05`; absent for Anderson-Darling.
    pub is_normal: Option<bool>,
    /// Anderson-Darling critical values, aligned with `significance_levels`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance_levels: Option<Vec<f64>>,
    /// Number of values tested.
    pub n: usize,
}

impl NormalityResult {
    fn with_p_value(test: NormalityTest, statistic: f64, p_value: f64, n: usize) -> Self {
        Self {
            test,
            statistic,
            p_value: Some(p_value),
            is_normal: Some(p_value > NORMALITY_ALPHA),
            critical_values: None,
            significance_levels: None,
            n,
        }
    }
}

/// Runs `test` on the non-NaN entries of `values`.
///
/// # Errors
/// - `InsufficientData` if too few values remain (3 for Shapiro-Wilk,
///   1 for Kolmogorov-Smirnov, 4 for Anderson-Darling).
/// - `InvalidArgument` for Shapiro-Wilk with more than 5000 values.
/// - `DegenerateData` if all values are equal (Shapiro-Wilk,
///   Anderson-Darling).
///
/// # Examples
/// ```
/// use u_audit::normality::{test_normality, NormalityTest};
/// use u_audit::special::inverse_normal_cdf;
///
/// let n = 40;
/// let data: Vec<f64> = (1..=n).map(|i| inverse_normal_cdf((i as f64 - 0.5) / n as f64)).collect();
/// let result = test_normality(&data, NormalityTest::ShapiroWilk).unwrap();
/// assert_eq!(result.is_normal, Some(true));
/// ```
pub fn test_normality(values: &[f64], test: NormalityTest) -> Result<NormalityResult> {
    let mut data: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    data.sort_unstable_by(f64::total_cmp);
    match test {
        NormalityTest::ShapiroWilk => shapiro_wilk(&data),
        NormalityTest::KolmogorovSmirnov => kolmogorov_smirnov(&data),
        NormalityTest::AndersonDarling => anderson_darling(&data),
    }
}

// ---------------------------------------------------------------------------
// Shapiro-Wilk
// ---------------------------------------------------------------------------

const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];
const SW_MAX_N: usize = 5000;

/// `c[0] + c[1]·x + c[2]·x² + …`
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Royston's approximation of the Shapiro-Wilk coefficients for the lower
/// half of the sample (`a[i]` pairs `x[n−1−i] − x[i]`).
fn shapiro_wilk_coefficients(n: usize) -> Vec<f64> {
    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| inverse_normal_cdf((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let mut a = vec![0.0; half];
    let a1 = poly(&SW_C1, rsn) - m[0] / ssumm2;
    let (first_scaled, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&SW_C2, rsn);
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        a[1] = a2;
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };
    a[0] = a1;
    for i in first_scaled..half {
        a[i] = -m[i] / fac;
    }
    a
}

fn shapiro_wilk(sorted: &[f64]) -> Result<NormalityResult> {
    let n = sorted.len();
    if n < 3 {
        return Err(AuditError::InsufficientData {
            required: 3,
            actual: n,
        });
    }
    if n > SW_MAX_N {
        return Err(AuditError::invalid_argument(
            "values",
            format!("{n} values"),
            format!("Shapiro-Wilk supports at most {SW_MAX_N} values"),
        ));
    }
    let range = sorted[n - 1] - sorted[0];
    if range <= 0.0 || !range.is_finite() {
        return Err(AuditError::degenerate("values have zero range"));
    }

    // Scale by the range so that large amounts do not overflow the squares.
    let x: Vec<f64> = sorted.iter().map(|v| v / range).collect();
    let a = shapiro_wilk_coefficients(n);
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let mean = stats::neumaier_sum(&x) / n as f64;
    let ss: f64 = x.iter().map(|v| (v - mean) * (v - mean)).sum();
    let w = (numerator * numerator / ss).min(1.0);

    let p = shapiro_wilk_p_value(w, n);
    Ok(NormalityResult::with_p_value(NormalityTest::ShapiroWilk, w, p, n))
}

fn shapiro_wilk_p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        let p = (6.0 / PI) * (w.sqrt().asin() - PI / 3.0);
        return p.clamp(0.0, 1.0);
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&SW_G, an);
        if y >= gamma {
            return 1e-99;
        }
        y = -(gamma - y).ln();
        (poly(&SW_C3, an), poly(&SW_C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };
    // Upper tail of N(0, 1)
    standard_normal_cdf(-(y - m) / s)
}

// ---------------------------------------------------------------------------
// Kolmogorov-Smirnov
// ---------------------------------------------------------------------------

fn kolmogorov_smirnov(sorted: &[f64]) -> Result<NormalityResult> {
    let n = sorted.len();
    if n == 0 {
        return Err(AuditError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let nf = n as f64;
    let d = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = standard_normal_cdf(x);
            let above = (i + 1) as f64 / nf - f;
            let below = f - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);

    let en = nf.sqrt();
    let p = kolmogorov_upper_tail(d * (en + 0.12 + 0.11 / en));
    Ok(NormalityResult::with_p_value(
        NormalityTest::KolmogorovSmirnov,
        d,
        p,
        n,
    ))
}

/// `P(K > z)` for the Kolmogorov distribution.
///
/// Below `z = 1.18` the alternating series converges slowly, so the CDF
/// `√(2π)/z Σ exp(−(2k−1)²π²/(8z²))` is used there instead; above it,
/// `2 Σ_{k≥1} (−1)^(k−1) exp(−2k²z²)`.
fn kolmogorov_upper_tail(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z < 1.18 {
        let y = (-PI * PI / (8.0 * z * z)).exp();
        let cdf = (2.0 * PI).sqrt() / z * (y + y.powi(9) + y.powi(25) + y.powi(49));
        return (1.0 - cdf).clamp(0.0, 1.0);
    }
    let z_sq = z * z;
    let mut sum = 0.0;
    for k in 1..=100 {
        let k_f = f64::from(k);
        let term = (-1.0_f64).powi(k - 1) * (-2.0 * k_f * k_f * z_sq).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Anderson-Darling
// ---------------------------------------------------------------------------

fn anderson_darling(sorted: &[f64]) -> Result<NormalityResult> {
    let n = sorted.len();
    if n < 4 {
        return Err(AuditError::InsufficientData {
            required: 4,
            actual: n,
        });
    }
    let (Some(mean), Some(sd)) = (stats::mean(sorted), stats::std_dev(sorted)) else {
        return Err(AuditError::degenerate("values are not finite"));
    };
    if sd <= 0.0 {
        return Err(AuditError::degenerate("values have zero spread"));
    }

    let nf = n as f64;
    let w: Vec<f64> = sorted.iter().map(|x| (x - mean) / sd).collect();
    let s: f64 = (0..n)
        .map(|i| {
            let weight = (2 * i + 1) as f64;
            weight * (standard_normal_log_cdf(w[i]) + standard_normal_log_cdf(-w[n - 1 - i]))
        })
        .sum();
    let a2 = -nf - s / nf;

    let adjust = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    let critical_values = AD_CRITICAL_VALUES.iter().map(|c| c / adjust).collect();

    Ok(NormalityResult {
        test: NormalityTest::AndersonDarling,
        statistic: a2,
        p_value: None,
        is_normal: None,
        critical_values: Some(critical_values),
        significance_levels: Some(AD_SIGNIFICANCE_LEVELS.to_vec()),
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Normal scores: an idealized normal sample.
    fn normal_scores(n: usize) -> Vec<f64> {
        (1..=n)
            .map(|i| inverse_normal_cdf((i as f64 - 0.5) / n as f64))
            .collect()
    }

    fn exponential_sample(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let u: f64 = rng.random_range(1e-12..1.0);
                -u.ln()
            })
            .collect()
    }

    #[test]
    fn test_method_names() {
        assert_eq!("shapiro".parse::<NormalityTest>().unwrap(), NormalityTest::ShapiroWilk);
        assert_eq!("ks".parse::<NormalityTest>().unwrap(), NormalityTest::KolmogorovSmirnov);
        assert_eq!("anderson".parse::<NormalityTest>().unwrap(), NormalityTest::AndersonDarling);
        assert!("lilliefors".parse::<NormalityTest>().is_err());
        assert_eq!(NormalityTest::AndersonDarling.to_string(), "Anderson-Darling");
    }

    #[test]
    fn test_coefficients_normalized() {
        for n in [4, 5, 6, 11, 12, 50, 500] {
            let a = shapiro_wilk_coefficients(n);
            let norm: f64 = 2.0 * a.iter().map(|v| v * v).sum::<f64>();
            assert!((norm - 1.0).abs() < 1e-10, "n = {n}: {norm}");
            assert!(a.windows(2).all(|w| w[0] >= w[1]), "n = {n}: {a:?}");
        }
    }

    #[test]
    fn test_shapiro_three_points() {
        // W = 27/28; p = (6/π)(asin √W − π/3)
        let r = test_normality(&[1.0, 2.0, 4.0], NormalityTest::ShapiroWilk).unwrap();
        assert!((r.statistic - 27.0 / 28.0).abs() < 1e-12);
        assert!((r.p_value.unwrap() - 0.6369).abs() < 2e-3);

        let even = test_normality(&[1.0, 2.0, 3.0], NormalityTest::ShapiroWilk).unwrap();
        assert!((even.statistic - 1.0).abs() < 1e-12);
        assert!((even.p_value.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shapiro_accepts_normal_scores() {
        for n in [8, 30, 200] {
            let r = test_normality(&normal_scores(n), NormalityTest::ShapiroWilk).unwrap();
            assert!(r.statistic > 0.95, "n = {n}: W = {}", r.statistic);
            assert_eq!(r.is_normal, Some(true), "n = {n}: p = {:?}", r.p_value);
        }
    }

    #[test]
    fn test_shapiro_rejects_exponential() {
        let r = test_normality(&exponential_sample(300, 7), NormalityTest::ShapiroWilk).unwrap();
        assert!(r.statistic < 0.95);
        assert!(r.p_value.unwrap() < 1e-6);
        assert_eq!(r.is_normal, Some(false));
    }

    #[test]
    fn test_shapiro_is_scale_invariant() {
        let data = exponential_sample(50, 3);
        let scaled: Vec<f64> = data.iter().map(|x| 1e6 * x + 42.0).collect();
        let a = test_normality(&data, NormalityTest::ShapiroWilk).unwrap();
        let b = test_normality(&scaled, NormalityTest::ShapiroWilk).unwrap();
        assert!((a.statistic - b.statistic).abs() < 1e-9);
    }

    #[test]
    fn test_shapiro_errors() {
        assert!(matches!(
            test_normality(&[1.0, f64::NAN, 2.0], NormalityTest::ShapiroWilk),
            Err(AuditError::InsufficientData { required: 3, actual: 2 })
        ));
        assert!(matches!(
            test_normality(&[5.0; 10], NormalityTest::ShapiroWilk),
            Err(AuditError::DegenerateData { .. })
        ));
        let big = normal_scores(5001);
        assert!(matches!(
            test_normality(&big, NormalityTest::ShapiroWilk),
            Err(AuditError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_ks_standard_normal() {
        let r = test_normality(&normal_scores(100), NormalityTest::KolmogorovSmirnov).unwrap();
        // Normal scores sit at the midpoints of the steps
        assert!((r.statistic - 0.005).abs() < 1e-6);
        assert!(r.p_value.unwrap() > 0.99);
        assert_eq!(r.is_normal, Some(true));
    }

    #[test]
    fn test_ks_does_not_standardize() {
        let shifted: Vec<f64> = normal_scores(100).iter().map(|x| x + 5.0).collect();
        let r = test_normality(&shifted, NormalityTest::KolmogorovSmirnov).unwrap();
        assert!(r.statistic > 0.99);
        assert!(r.p_value.unwrap() < 1e-10);
        assert_eq!(r.is_normal, Some(false));
    }

    #[test]
    fn test_kolmogorov_tail() {
        assert_eq!(kolmogorov_upper_tail(0.0), 1.0);
        assert!((kolmogorov_upper_tail(0.05) - 1.0).abs() < 1e-12);
        // Both branches agree at the switch point
        let below = 1.0 - (2.0 * PI).sqrt() / 1.18 * {
            let y = (-PI * PI / (8.0 * 1.18 * 1.18)).exp();
            y + y.powi(9) + y.powi(25)
        };
        assert!((kolmogorov_upper_tail(1.18) - below).abs() < 1e-9);
        // Tabulated: P(K > 1.36) ≈ 0.05
        assert!((kolmogorov_upper_tail(1.36) - 0.0494).abs() < 1e-3);
        assert!(kolmogorov_upper_tail(5.0) < 1e-20);
    }

    #[test]
    fn test_anderson_darling() {
        let r = test_normality(&normal_scores(100), NormalityTest::AndersonDarling).unwrap();
        let crit = r.critical_values.clone().unwrap();
        assert_eq!(crit.len(), 5);
        assert_eq!(r.significance_levels.as_deref(), Some(&AD_SIGNIFICANCE_LEVELS[..]));
        assert!(r.statistic < crit[0], "A² = {}", r.statistic);
        assert!(r.p_value.is_none() && r.is_normal.is_none());
        // 1 + 4/100 − 25/10000 = 1.0375
        assert!((crit[2] - 0.787 / 1.0375).abs() < 1e-12);

        let skewed =
            test_normality(&exponential_sample(200, 11), NormalityTest::AndersonDarling).unwrap();
        assert!(skewed.statistic > skewed.critical_values.unwrap()[4]);
    }

    #[test]
    fn test_anderson_darling_extreme_value_stays_finite() {
        // The standardized extreme lies near 55, where Φ(−55) underflows
        let mut data = normal_scores(3000);
        data.push(1e7);
        let r = test_normality(&data, NormalityTest::AndersonDarling).unwrap();
        assert!(r.statistic.is_finite(), "A² = {}", r.statistic);
        assert!(r.statistic > r.critical_values.unwrap()[4]);
    }

    #[test]
    fn test_anderson_errors() {
        assert!(test_normality(&[1.0, 2.0, 3.0], NormalityTest::AndersonDarling).is_err());
        assert!(matches!(
            test_normality(&[2.0; 6], NormalityTest::AndersonDarling),
            Err(AuditError::DegenerateData { .. })
        ));
    }
}
