//! Covariance parameterisations and the per-component Gaussian densities
//! derived from them.

use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Covariance matrix types for Gaussian Mixture Models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// Each component has its own full covariance (most flexible, most parameters).
    #[default]
    Full,
    /// All components share one full covariance.
    Tied,
    /// Per-component diagonal covariance (assumes feature independence).
    Diagonal,
    /// Per-component scalar variance (isotropic, like K-Means).
    Spherical,
}

impl CovarianceType {
    /// Number of free covariance parameters for `k` components in `d` dimensions.
    #[must_use]
    pub fn n_parameters(self, n_components: usize, n_features: usize) -> usize {
        let full = n_features * (n_features + 1) / 2;
        match self {
            CovarianceType::Full => n_components * full,
            CovarianceType::Tied => full,
            CovarianceType::Diagonal => n_components * n_features,
            CovarianceType::Spherical => n_components,
        }
    }

    /// Smallest sample count that can support a non-degenerate fit.
    #[must_use]
    pub fn min_samples(self, n_components: usize, n_features: usize) -> usize {
        match self {
            CovarianceType::Full => n_components * (n_features + 1),
            CovarianceType::Tied => n_components + n_features,
            CovarianceType::Diagonal | CovarianceType::Spherical => 2 * n_components,
        }
    }
}

impl fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CovarianceType::Full => "full",
            CovarianceType::Tied => "tied",
            CovarianceType::Diagonal => "diag",
            CovarianceType::Spherical => "spherical",
        };
        f.write_str(name)
    }
}

impl FromStr for CovarianceType {
    type Err = GaussMixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(CovarianceType::Full),
            "tied" => Ok(CovarianceType::Tied),
            "diag" | "diagonal" => Ok(CovarianceType::Diagonal),
            "spherical" => Ok(CovarianceType::Spherical),
            other => Err(GaussMixError::invalid_parameter(
                "covariance_type",
                other,
                "one of full, tied, diag, spherical",
            )),
        }
    }
}

/// Fitted covariance parameters, one variant per [`CovarianceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Covariances {
    /// `k` full `d × d` matrices.
    Full(Vec<Matrix<f64>>),
    /// One shared `d × d` matrix.
    Tied(Matrix<f64>),
    /// `k × d` per-feature variances.
    Diagonal(Matrix<f64>),
    /// `k` scalar variances.
    Spherical(Vec<f64>),
}

impl Covariances {
    /// The parameterisation of these covariances.
    #[must_use]
    pub fn covariance_type(&self) -> CovarianceType {
        match self {
            Covariances::Full(_) => CovarianceType::Full,
            Covariances::Tied(_) => CovarianceType::Tied,
            Covariances::Diagonal(_) => CovarianceType::Diagonal,
            Covariances::Spherical(_) => CovarianceType::Spherical,
        }
    }

    /// Dense `d × d` covariance of component `j`.
    ///
    /// # Panics
    ///
    /// Panics if `j` is out of range.
    #[must_use]
    pub fn component_matrix(&self, j: usize, n_features: usize) -> Matrix<f64> {
        match self {
            Covariances::Full(covs) => covs[j].clone(),
            Covariances::Tied(cov) => cov.clone(),
            Covariances::Diagonal(vars) => Matrix::from_diagonal(vars.row(j)),
            Covariances::Spherical(vars) => Matrix::from_diagonal(&vec![vars[j]; n_features]),
        }
    }

    /// Checks the stored shapes against `k` components in `d` dimensions.
    pub(crate) fn check_shape(&self, n_components: usize, n_features: usize) -> Result<()> {
        let square = |m: &Matrix<f64>| m.shape() == (n_features, n_features);
        let ok = match self {
            Covariances::Full(covs) => covs.len() == n_components && covs.iter().all(square),
            Covariances::Tied(cov) => square(cov),
            Covariances::Diagonal(vars) => vars.shape() == (n_components, n_features),
            Covariances::Spherical(vars) => vars.len() == n_components,
        };
        if ok {
            Ok(())
        } else {
            Err(GaussMixError::InvalidShape {
                context: format!("{} covariances", self.covariance_type()),
                expected: format!("{n_components} components of dimension {n_features}"),
                actual: "mismatched covariance storage".to_string(),
            })
        }
    }

    /// Builds one density factor per component.
    ///
    /// Any variance (or Cholesky pivot) at or below `variance_floor` counts
    /// as singular. On failure returns the index of the first such component
    /// (always `0` for tied covariances).
    pub(crate) fn factorize(
        &self,
        n_components: usize,
        variance_floor: f64,
    ) -> std::result::Result<Vec<GaussianFactor>, usize> {
        match self {
            Covariances::Full(covs) => covs
                .iter()
                .enumerate()
                .map(|(j, cov)| GaussianFactor::full(cov, variance_floor).ok_or(j))
                .collect(),
            Covariances::Tied(cov) => {
                let factor = GaussianFactor::full(cov, variance_floor).ok_or(0_usize)?;
                Ok(vec![factor; n_components])
            }
            Covariances::Diagonal(vars) => vars
                .rows()
                .enumerate()
                .map(|(j, v)| GaussianFactor::diagonal(v, variance_floor).ok_or(j))
                .collect(),
            Covariances::Spherical(vars) => vars
                .iter()
                .enumerate()
                .map(|(j, &v)| GaussianFactor::spherical(v, variance_floor).ok_or(j))
                .collect(),
        }
    }
}

/// Precomputed factorisation of one component covariance, used to evaluate
/// `ln N(x; μ, Σ)` and to draw samples.
#[derive(Debug, Clone)]
pub(crate) enum GaussianFactor {
    /// Lower Cholesky factor `L` with `Σ = L L^T`.
    Full { chol: Matrix<f64>, log_det: f64 },
    Diagonal { variances: Vec<f64>, log_det: f64 },
    Spherical { variance: f64, log_variance: f64 },
}

impl GaussianFactor {
    fn full(cov: &Matrix<f64>, variance_floor: f64) -> Option<Self> {
        let chol = cov.cholesky()?;
        if chol.diagonal().iter().any(|&l| l * l <= variance_floor) {
            return None;
        }
        let log_det = 2.0 * chol.diagonal().iter().map(|v| v.ln()).sum::<f64>();
        Some(GaussianFactor::Full { chol, log_det })
    }

    fn diagonal(variances: &[f64], variance_floor: f64) -> Option<Self> {
        if variances
            .iter()
            .any(|&v| !(v > variance_floor.max(0.0)) || !v.is_finite())
        {
            return None;
        }
        let log_det = variances.iter().map(|v| v.ln()).sum();
        Some(GaussianFactor::Diagonal {
            variances: variances.to_vec(),
            log_det,
        })
    }

    fn spherical(variance: f64, variance_floor: f64) -> Option<Self> {
        if !(variance > variance_floor.max(0.0)) || !variance.is_finite() {
            return None;
        }
        Some(GaussianFactor::Spherical {
            variance,
            log_variance: variance.ln(),
        })
    }

    /// `ln N(x; mean, Σ)`.
    pub(crate) fn log_density(&self, x: &[f64], mean: &[f64]) -> f64 {
        let d = x.len() as f64;
        let (log_det, mahalanobis) = match self {
            GaussianFactor::Full { chol, log_det } => {
                let diff: Vec<f64> = x.iter().zip(mean).map(|(a, m)| a - m).collect();
                let z = chol.forward_substitute(&diff);
                (*log_det, z.iter().map(|v| v * v).sum::<f64>())
            }
            GaussianFactor::Diagonal { variances, log_det } => {
                let m = x
                    .iter()
                    .zip(mean)
                    .zip(variances)
                    .map(|((a, mu), var)| (a - mu) * (a - mu) / var)
                    .sum::<f64>();
                (*log_det, m)
            }
            GaussianFactor::Spherical {
                variance,
                log_variance,
            } => {
                let sq = x
                    .iter()
                    .zip(mean)
                    .map(|(a, mu)| (a - mu) * (a - mu))
                    .sum::<f64>();
                (d * log_variance, sq / variance)
            }
        };
        -0.5 * (d * (2.0 * PI).ln() + log_det + mahalanobis)
    }

    /// Maps a standard-normal draw `z` to `L z`, a draw from `N(0, Σ)`.
    pub(crate) fn scale(&self, z: &[f64]) -> Vec<f64> {
        match self {
            GaussianFactor::Full { chol, .. } => chol
                .rows()
                .map(|row| row.iter().zip(z).map(|(l, v)| l * v).sum())
                .collect(),
            GaussianFactor::Diagonal { variances, .. } => variances
                .iter()
                .zip(z)
                .map(|(var, v)| var.sqrt() * v)
                .collect(),
            GaussianFactor::Spherical { variance, .. } => {
                let sd = variance.sqrt();
                z.iter().map(|v| sd * v).collect()
            }
        }
    }
}
