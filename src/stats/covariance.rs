//! Covariance computations.
//!
//! # Mathematical Background
//!
//! The maximum-likelihood covariance of a Gaussian divides by the total
//! weight rather than `n - 1`:
//!
//! ```text
//! Σ = (1/N) Σ_i w_i (x_i - μ)(x_i - μ)^T,   N = Σ_i w_i
//! ```
//!
//! With unit weights this is the biased sample covariance, which is exactly
//! what a single-component mixture converges to.
//!
//! # Examples
//!
//! ```
//! use gaussmix::primitives::Matrix;
//! use gaussmix::stats::cov_matrix;
//!
//! let data = Matrix::from_vec(3, 2, vec![
//!     1.0, 2.0,
//!     2.0, 4.0,
//!     3.0, 6.0,
//! ]).expect("Valid matrix");
//!
//! let cov = cov_matrix(&data).expect("Should compute covariance matrix");
//! assert_eq!(cov.shape(), (2, 2));
//! assert!((cov.get(0, 1) - 4.0 / 3.0).abs() < 1e-12);
//! ```

use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;

/// Biased covariance matrix (`1/n`) of a data matrix (n × p).
///
/// # Errors
///
/// Returns error if the data has no rows or no columns.
pub fn cov_matrix(data: &Matrix<f64>) -> Result<Matrix<f64>> {
    let (n, p) = data.shape();
    if n == 0 || p == 0 {
        return Err(GaussMixError::InvalidShape {
            context: "covariance input".to_string(),
            expected: "at least 1x1".to_string(),
            actual: format!("{n}x{p}"),
        });
    }

    let means = data.column_means();
    let weights = vec![1.0; n];
    Ok(weighted_cov_matrix(data, &weights, &means, n as f64))
}

/// Weighted mean of the rows: `Σ_i w_i x_i / norm`.
///
/// `weights` must have one entry per row.
#[must_use]
pub fn weighted_mean(data: &Matrix<f64>, weights: &[f64], norm: f64) -> Vec<f64> {
    debug_assert_eq!(weights.len(), data.n_rows());
    let mut mean = vec![0.0; data.n_cols()];
    for (row, &w) in data.rows().zip(weights) {
        for (m, &v) in mean.iter_mut().zip(row) {
            *m += w * v;
        }
    }
    mean.iter_mut().for_each(|m| *m /= norm);
    mean
}

/// Weighted scatter matrix around `mean`, divided by `norm`.
///
/// Only the lower triangle is accumulated; the result is exactly symmetric.
#[must_use]
pub fn weighted_cov_matrix(
    data: &Matrix<f64>,
    weights: &[f64],
    mean: &[f64],
    norm: f64,
) -> Matrix<f64> {
    debug_assert_eq!(weights.len(), data.n_rows());
    let p = data.n_cols();
    let mut cov = Matrix::zeros(p, p);
    let mut diff = vec![0.0; p];

    for (row, &w) in data.rows().zip(weights) {
        if w == 0.0 {
            continue;
        }
        for ((d, &v), &m) in diff.iter_mut().zip(row).zip(mean) {
            *d = v - m;
        }
        let acc = cov.as_mut_slice();
        for i in 0..p {
            let wi = w * diff[i];
            for j in 0..=i {
                acc[i * p + j] += wi * diff[j];
            }
        }
    }

    let acc = cov.as_mut_slice();
    for i in 0..p {
        for j in 0..=i {
            let v = acc[i * p + j] / norm;
            acc[i * p + j] = v;
            acc[j * p + i] = v;
        }
    }
    cov
}

#[cfg(test)]
#[path = "covariance_tests.rs"]
mod tests;
