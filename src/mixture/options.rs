//! Fitting options for [`GaussianMixture`](super::GaussianMixture).

use super::covariance::CovarianceType;
use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Initialization method for the first partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GmmInit {
    /// Hard partition from seeded k-means++ / Lloyd.
    #[default]
    KMeans,
    /// Random responsibilities, normalised per row.
    Random,
}

/// Options for fitting a Gaussian Mixture Model.
///
/// Every field has a default, so partial JSON configs deserialize cleanly:
///
/// ```
/// use gaussmix::mixture::{CovarianceType, GmmOptions};
///
/// let opts: GmmOptions =
///     serde_json::from_str(r#"{"n_components": 3, "covariance_type": "diagonal"}"#).unwrap();
/// assert_eq!(opts.n_components, 3);
/// assert_eq!(opts.covariance_type, CovarianceType::Diagonal);
/// assert_eq!(opts.max_iter, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmmOptions {
    /// Number of mixture components.
    pub n_components: usize,
    /// Covariance parameterisation.
    pub covariance_type: CovarianceType,
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the change in total log-likelihood.
    pub tol: f64,
    /// Regularization added to covariance diagonal.
    pub reg_covar: f64,
    /// Seed for every random choice made during the fit.
    pub seed: u64,
    /// Number of independent initialisations; the best fit is kept.
    pub n_init: usize,
    /// Initialization method.
    pub init: GmmInit,
    /// Component reinitialisations allowed per fit before giving up.
    pub max_reinit: usize,
}

impl Default for GmmOptions {
    fn default() -> Self {
        Self {
            n_components: 1,
            covariance_type: CovarianceType::Full,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            seed: 0,
            n_init: 1,
            init: GmmInit::KMeans,
            max_reinit: 10,
        }
    }
}

impl GmmOptions {
    /// Validates the hyperparameters on their own.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.n_components < 1 {
            return Err(GaussMixError::invalid_parameter(
                "n_components",
                self.n_components,
                ">= 1",
            ));
        }
        if !(self.tol > 0.0) || !self.tol.is_finite() {
            return Err(GaussMixError::invalid_parameter("tol", self.tol, "> 0"));
        }
        if !(self.reg_covar >= 0.0) || !self.reg_covar.is_finite() {
            return Err(GaussMixError::invalid_parameter(
                "reg_covar",
                self.reg_covar,
                ">= 0",
            ));
        }
        if self.max_iter < 1 {
            return Err(GaussMixError::invalid_parameter(
                "max_iter",
                self.max_iter,
                ">= 1",
            ));
        }
        if self.n_init < 1 {
            return Err(GaussMixError::invalid_parameter("n_init", self.n_init, ">= 1"));
        }
        Ok(())
    }

    /// Validates the hyperparameters together with the observation matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::InvalidParameter`] for bad options or
    /// non-finite data, and [`GaussMixError::InvalidShape`] when there are
    /// too few samples for the covariance style.
    pub fn validate_data(&self, x: &Matrix<f64>) -> Result<()> {
        self.validate()?;
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 || n_features == 0 {
            return Err(GaussMixError::InvalidShape {
                context: "observation matrix".to_string(),
                expected: "at least 1 row and 1 column".to_string(),
                actual: format!("{n_samples}x{n_features}"),
            });
        }
        let required = self
            .covariance_type
            .min_samples(self.n_components, n_features);
        if n_samples < required {
            return Err(GaussMixError::InvalidShape {
                context: format!(
                    "{} components with {} covariance in {} dimensions",
                    self.n_components, self.covariance_type, n_features
                ),
                expected: format!(">= {required} samples"),
                actual: format!("{n_samples} samples"),
            });
        }
        if !x.is_finite() {
            return Err(GaussMixError::invalid_parameter(
                "x",
                "non-finite values",
                "finite observations (filter missing values first)",
            ));
        }
        Ok(())
    }
}
