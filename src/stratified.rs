//! Neyman allocation of a sample across strata.
//!
//! Stratum `h` receives a share proportional to `N_h × σ_h`, its size
//! times its standard deviation. Shares are rounded half-to-even and the
//! rounding residual is reconciled so that the allocation sums exactly to
//! the requested total without any stratum going negative.

use crate::error::{AuditError, Result};

/// Allocates `total_sample_size` across strata by Neyman allocation.
///
/// The residual left by rounding goes to the stratum with the largest
/// allocation (the first one on ties). When that would make the stratum
/// negative, the residual is applied one unit at a time, each unit to the
/// currently largest stratum.
///
/// # Errors
/// `InvalidArgument` if the slices differ in length or are empty, if any
/// size or variance is negative or not finite, or if every weight is zero.
///
/// # Examples
/// ```
/// use u_audit::stratified::stratified_allocation;
/// let alloc = stratified_allocation(&[100.0, 200.0, 300.0], &[10.0, 20.0, 30.0], 60).unwrap();
/// assert_eq!(alloc, vec![7, 19, 34]);
/// ```
pub fn stratified_allocation(
    strata_sizes: &[f64],
    strata_variances: &[f64],
    total_sample_size: u64,
) -> Result<Vec<u64>> {
    if strata_sizes.len() != strata_variances.len() {
        return Err(AuditError::invalid_argument(
            "strata_variances",
            format!("{} entries", strata_variances.len()),
            format!("expected {} entries to match strata_sizes", strata_sizes.len()),
        ));
    }
    if strata_sizes.is_empty() {
        return Err(AuditError::invalid_argument(
            "strata_sizes",
            "[]",
            "at least one stratum is required",
        ));
    }
    if let Some(&bad) = strata_sizes.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        return Err(AuditError::invalid_argument(
            "strata_sizes",
            bad,
            "sizes must be finite and not negative",
        ));
    }
    if let Some(&bad) = strata_variances.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        return Err(AuditError::invalid_argument(
            "strata_variances",
            bad,
            "variances must be finite and not negative",
        ));
    }

    let weights: Vec<f64> = strata_sizes
        .iter()
        .zip(strata_variances)
        .map(|(&n, &var)| n * var.sqrt())
        .collect();
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(AuditError::invalid_argument(
            "strata_variances",
            "all weights zero",
            "at least one stratum needs a positive size and variance",
        ));
    }

    let total = total_sample_size as f64;
    let mut allocation: Vec<i64> = weights
        .iter()
        .map(|w| (w / weight_sum * total).round_ties_even() as i64)
        .collect();

    let diff = total_sample_size as i64 - allocation.iter().sum::<i64>();
    if diff != 0 {
        let idx = largest(&allocation);
        if allocation[idx] + diff >= 0 {
            allocation[idx] += diff;
        } else {
            let step = diff.signum();
            for _ in 0..diff.abs() {
                let idx = largest(&allocation);
                allocation[idx] += step;
            }
        }
        tracing::debug!(residual = diff, "reconciled stratified rounding residual");
    }

    // Every entry is non-negative after reconciliation.
    Ok(allocation.into_iter().map(|a| a.max(0) as u64).collect())
}

/// Index of the largest entry, the first one on ties.
fn largest(values: &[i64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
