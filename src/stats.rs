//! Descriptive statistics with numerical stability guarantees.
//!
//! These are the primitives behind the summary, outlier, footing and
//! allocation calculations. All functions handle edge cases explicitly
//! and use numerically stable algorithms so that large transaction
//! populations do not suffer catastrophic cancellation.
//!
//! # Algorithms
//!
//! - **Sum/Mean**: Neumaier compensated summation, O(ε) error independent of n.
//! - **Variance/StdDev/higher moments**: Welford's online algorithm.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Quantile**: R-7 linear interpolation (default in R, NumPy, pandas).
//!   Reference: Hyndman & Fan (1996), "Sample Quantiles in Statistical
//!   Packages", *The American Statistician* 50(4).

use std::cmp::Ordering;

/// Computes the arithmetic mean using compensated summation.
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_audit::stats::mean;
/// let v = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((mean(&v).unwrap() - 3.0).abs() < 1e-15);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    if !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(neumaier_sum(data) / data.len() as f64)
}

/// Computes the sample variance (denominator `n − 1`) with Welford's
/// algorithm.
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_audit::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    accumulate(data)?.sample_variance()
}

/// Computes the population variance (denominator `n`).
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
pub fn population_variance(data: &[f64]) -> Option<f64> {
    accumulate(data)?.population_variance()
}

/// Computes the sample standard deviation, `sqrt(variance(data))`.
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Computes the population standard deviation, as used for z-scores.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// Feeds `data` into a fresh accumulator, rejecting NaN/Inf.
fn accumulate(data: &[f64]) -> Option<WelfordAccumulator> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let mut acc = WelfordAccumulator::new();
    for &x in data {
        acc.update(x);
    }
    Some(acc)
}

/// Returns the minimum value in the slice.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN.
///
/// # Examples
/// ```
/// use u_audit::stats::min;
/// assert_eq!(min(&[3.0, 1.0, 4.0, 1.0, 5.0]), Some(1.0));
/// ```
pub fn min(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().copied().try_fold(f64::INFINITY, |acc, x| {
        if x.is_nan() {
            None
        } else {
            Some(acc.min(x))
        }
    })
}

/// Returns the maximum value in the slice.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN.
pub fn max(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter().copied().try_fold(f64::NEG_INFINITY, |acc, x| {
        if x.is_nan() {
            None
        } else {
            Some(acc.max(x))
        }
    })
}

/// Returns a sorted copy of `data`, or `None` if it contains NaN.
///
/// # Examples
/// ```
/// use u_audit::stats::sorted;
/// assert_eq!(sorted(&[3.0, 1.0, 2.0]), Some(vec![1.0, 2.0, 3.0]));
/// assert_eq!(sorted(&[1.0, f64::NAN]), None);
/// ```
pub fn sorted(data: &[f64]) -> Option<Vec<f64>> {
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut out = data.to_vec();
    out.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(out)
}

/// Computes the median of `data` without mutating the input.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN.
///
/// # Examples
/// ```
/// use u_audit::stats::median;
/// assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
/// ```
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let sorted = sorted(data)?;
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Computes the `p`-th quantile using the R-7 linear interpolation method.
///
/// # Algorithm
/// For sorted data `x[0..n]` and quantile `p ∈ [0, 1]`:
/// 1. Compute `h = (n − 1) × p`
/// 2. Let `j = ⌊h⌋` and `g = h − j`
/// 3. Return `(1 − g) × x[j] + g × x[j+1]`
///
/// Reference: Hyndman & Fan (1996), *The American Statistician* 50(4), pp. 361–365.
///
/// # Returns
/// - `None` if `data` is empty, `p` is outside `[0, 1]`, or data contains NaN.
///
/// # Examples
/// ```
/// use u_audit::stats::quantile;
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(quantile(&data, 0.0), Some(1.0));
/// assert_eq!(quantile(&data, 0.25), Some(2.0));
/// assert_eq!(quantile(&data, 1.0), Some(5.0));
/// ```
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    quantile_sorted(&sorted(data)?, p)
}

/// Computes the `p`-th quantile on **pre-sorted** data (R-7 method).
///
/// Avoids re-sorting when several quantiles are read from the same
/// column. The caller must guarantee that `sorted_data` is sorted in
/// non-decreasing order.
///
/// # Returns
/// - `None` if `sorted_data` is empty or `p` is outside `[0, 1]`.
pub fn quantile_sorted(sorted_data: &[f64], p: f64) -> Option<f64> {
    let n = sorted_data.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted_data[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted_data[n - 1])
    } else {
        Some((1.0 - g) * sorted_data[j] + g * sorted_data[j + 1])
    }
}

/// Computes Fisher's adjusted sample skewness (G₁) with bias correction.
///
/// Matches Excel `SKEW()` and pandas `Series.skew()`.
///
/// Reference: Joanes & Gill (1998), "Comparing measures of sample skewness
/// and kurtosis", *The Statistician* 47(1), pp. 183–189.
///
/// # Returns
/// - `None` if `data.len() < 3`, data contains NaN/Inf, or variance is zero.
///
/// # Examples
/// ```
/// use u_audit::stats::skewness;
/// assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap().abs() < 1e-14);
/// assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 50.0]).unwrap() > 0.0);
/// ```
pub fn skewness(data: &[f64]) -> Option<f64> {
    if data.len() < 3 {
        return None;
    }
    accumulate(data)?.skewness()
}

/// Computes Fisher's excess kurtosis (G₂) with bias correction.
///
/// Matches Excel `KURT()` and pandas `Series.kurtosis()`: 0 for a normal
/// distribution, positive for heavy tails.
///
/// # Returns
/// - `None` if `data.len() < 4`, data contains NaN/Inf, or variance is zero.
pub fn kurtosis(data: &[f64]) -> Option<f64> {
    if data.len() < 4 {
        return None;
    }
    accumulate(data)?.kurtosis()
}

// ---------------------------------------------------------------------------
// Compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// An improved variant of Kahan summation that also handles an addend
/// larger in magnitude than the running sum, which is common when a
/// ledger mixes a few large postings with many small ones.
///
/// Reference: Neumaier (1974), *Zeitschrift für Angewandte Mathematik
/// und Mechanik* 54(1), pp. 39–51.
///
/// # Examples
/// ```
/// use u_audit::stats::neumaier_sum;
/// assert_eq!(neumaier_sum(&[1e16, 1.0, -1e16]), 1.0);
/// ```
pub fn neumaier_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    // An infinite addend leaves NaN in the compensation term
    if sum.is_finite() {
        sum + c
    } else {
        sum
    }
}

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Streaming accumulator behind the variance and higher-moment functions.
///
/// Maintains central moment sums M₂, M₃, M₄ incrementally. The update
/// order (M₄ → M₃ → M₂) matters: each uses the *previous* values of the
/// lower moments.
///
/// References:
/// - Welford (1962), *Technometrics* 4(3), pp. 419–420.
/// - Pébay (2008), Sandia Report SAND2008-6212.
///
/// # Examples
/// ```
/// use u_audit::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.sample_variance().unwrap() - 4.571428571428571).abs() < 1e-10);
/// assert!(acc.skewness().unwrap() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl WelfordAccumulator {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean_acc: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
        }
    }

    /// Feeds a new sample into the accumulator.
    ///
    /// The first sample only initializes the mean, which avoids
    /// intermediate overflow when `delta²` would exceed `f64::MAX`.
    pub fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;

        if n1 == 0 {
            self.mean_acc = value;
            return;
        }

        let n = self.count as f64;
        let delta = value - self.mean_acc;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1 as f64;

        // M₄ before M₃ before M₂
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.mean_acc += delta_n;
    }

    /// Returns the sample variance (n − 1 denominator), or `None` if fewer
    /// than 2 samples have been added.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Returns the population variance (n denominator), or `None` if no
    /// samples have been added.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.m2 / self.count as f64)
        }
    }

    /// Returns Fisher's adjusted sample skewness (G₁), or `None` if
    /// fewer than 3 samples have been added or variance is zero.
    pub fn skewness(&self) -> Option<f64> {
        if self.count < 3 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        let g1 = n.sqrt() * self.m3 / self.m2.powf(1.5);
        let correction = (n * (n - 1.0)).sqrt() / (n - 2.0);
        Some(correction * g1)
    }

    /// Returns Fisher's excess kurtosis (G₂) with bias correction, or
    /// `None` if fewer than 4 samples have been added or variance is zero.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.count < 4 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        let g2 = n * self.m4 / (self.m2 * self.m2) - 3.0;
        let correction = (n - 1.0) / ((n - 2.0) * (n - 3.0));
        Some(correction * ((n + 1.0) * g2 + 6.0))
    }
}

impl Default for WelfordAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- mean ---

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
    }

    #[test]
    fn test_mean_empty_nan_inf() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, f64::NAN, 3.0]), None);
        assert_eq!(mean(&[1.0, f64::INFINITY, 3.0]), None);
    }

    // --- variance ---

    #[test]
    fn test_variance_basic() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
        assert!((population_variance(&v).unwrap() - 4.0).abs() < 1e-10);
        assert!((population_std_dev(&v).unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_variance_too_short() {
        assert_eq!(variance(&[1.0]), None);
        assert_eq!(variance(&[]), None);
        assert_eq!(population_variance(&[]), None);
    }

    #[test]
    fn test_std_dev_pandas_reference() {
        // pandas: Series([100, 200, 300, 400, 500]).std() == 158.11388300841898
        let sd = std_dev(&[100.0, 200.0, 300.0, 400.0, 500.0]).unwrap();
        assert!((sd - 158.11388300841898).abs() < 1e-9);
    }

    // --- min / max ---

    #[test]
    fn test_min_max() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        assert_eq!(min(&v), Some(1.0));
        assert_eq!(max(&v), Some(9.0));
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[1.0, f64::NAN]), None);
    }

    // --- quantiles ---

    #[test]
    fn test_quantile_r7_interpolation() {
        // numpy.percentile([1..=9, 100], 25) == 3.25, 75th == 7.75
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
        assert!((quantile(&data, 0.25).unwrap() - 3.25).abs() < 1e-12);
        assert!((quantile(&data, 0.75).unwrap() - 7.75).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_invalid() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[1.0], 1.5), None);
        assert_eq!(quantile(&[1.0, f64::NAN], 0.5), None);
        assert_eq!(quantile_sorted(&[7.0], 0.3), Some(7.0));
    }

    #[test]
    fn test_median_even_odd() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    // --- higher moments ---

    #[test]
    fn test_skewness_kurtosis_edge_cases() {
        assert_eq!(skewness(&[1.0, 2.0]), None);
        assert_eq!(skewness(&[3.0, 3.0, 3.0]), None);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), None);
        assert_eq!(kurtosis(&[3.0; 6]), None);
    }

    #[test]
    fn test_kurtosis_uniform_is_platykurtic() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!(kurtosis(&data).unwrap() < 0.0);
    }

    #[test]
    fn test_moments_of_skewed_ledger() {
        // pandas: Series(data).skew() and Series(data).kurtosis()
        let data = [12.5, 99.0, 3.25, 47.0, 47.0, 1200.0, 8.0];
        assert!((skewness(&data).unwrap() - 2.614801146629757).abs() < 1e-9);
        assert!((kurtosis(&data).unwrap() - 6.872078786087418).abs() < 1e-8);
    }

    // --- compensated sum ---

    #[test]
    fn test_neumaier_sum_non_finite() {
        assert_eq!(neumaier_sum(&[f64::INFINITY, 1.0]), f64::INFINITY);
        assert_eq!(neumaier_sum(&[1.0, f64::NEG_INFINITY, 2.0]), f64::NEG_INFINITY);
        assert!(neumaier_sum(&[f64::INFINITY, f64::NEG_INFINITY]).is_nan());
    }

    #[test]
    fn test_neumaier_sum_recovers_small_terms() {
        assert_eq!(neumaier_sum(&[1e16, 1.0, -1e16]), 1.0);
        let cents = vec![0.1; 10];
        assert!((neumaier_sum(&cents) - 1.0).abs() < 1e-15);
    }
}
