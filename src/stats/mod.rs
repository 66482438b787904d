//! Numerically stable statistics used by the EM fitter.
//!
//! - [`logsumexp`]: `ln Σ exp(v_i)` without overflow or underflow
//! - [`cov_matrix`] / [`weighted_cov_matrix`]: biased (`1/n`) covariance
//!   estimators, the maximum-likelihood form used in the M-step

pub mod covariance;

pub use covariance::{cov_matrix, weighted_cov_matrix, weighted_mean};

/// Computes `ln Σ exp(v_i)` stably by factoring out the maximum.
///
/// Returns `-inf` for an empty slice or when every value is `-inf`.
///
/// # Examples
///
/// ```
/// use gaussmix::stats::logsumexp;
///
/// let v = [-1000.0, -1000.0];
/// let lse = logsumexp(&v);
/// assert!((lse - (-1000.0 + 2.0_f64.ln())).abs() < 1e-9);
/// ```
#[must_use]
pub fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max.is_infinite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}
