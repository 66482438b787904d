//! Synthetic data generators.

use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Isotropic Gaussian blobs around the given centres.
///
/// Draws `n_per_center` points from `N(center, std²·I)` for every centre.
/// Rows are grouped by centre, in order, and the second value holds the
/// generating centre index of each row.
///
/// # Errors
///
/// Returns [`GaussMixError::InvalidShape`] when `centers` is empty or ragged
/// and [`GaussMixError::InvalidParameter`] when `std` is negative or not
/// finite.
///
/// # Examples
///
/// ```
/// use gaussmix::datasets::make_blobs;
///
/// let (x, labels) = make_blobs(&[vec![0.0, 0.0], vec![5.0, 5.0]], 10, 0.1, 0).unwrap();
/// assert_eq!(x.shape(), (20, 2));
/// assert_eq!(labels[0], 0);
/// assert_eq!(labels[19], 1);
/// ```
pub fn make_blobs(
    centers: &[Vec<f64>],
    n_per_center: usize,
    std: f64,
    seed: u64,
) -> Result<(Matrix<f64>, Vec<usize>)> {
    let n_features = centers.first().map_or(0, Vec::len);
    if n_features == 0 {
        return Err(GaussMixError::InvalidShape {
            context: "centers".to_string(),
            expected: "at least one non-empty centre".to_string(),
            actual: format!("{} centres", centers.len()),
        });
    }
    if let Some(bad) = centers.iter().find(|c| c.len() != n_features) {
        return Err(GaussMixError::dimension_mismatch(
            "center dimension",
            n_features,
            bad.len(),
        ));
    }
    if !(std >= 0.0) || !std.is_finite() {
        return Err(GaussMixError::invalid_parameter("std", std, ">= 0 and finite"));
    }
    let noise =
        Normal::new(0.0, std).map_err(|e| GaussMixError::invalid_parameter("std", e, ">= 0"))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(centers.len() * n_per_center * n_features);
    let mut labels = Vec::with_capacity(centers.len() * n_per_center);
    for (label, center) in centers.iter().enumerate() {
        for _ in 0..n_per_center {
            data.extend(center.iter().map(|&c| c + noise.sample(&mut rng)));
            labels.push(label);
        }
    }

    let x = Matrix::from_vec(labels.len(), n_features, data)?;
    Ok((x, labels))
}
