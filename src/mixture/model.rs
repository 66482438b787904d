//! Fitted mixture parameters and everything that can be computed from them.

use super::covariance::{CovarianceType, Covariances, GaussianFactor};
use super::em::Evaluator;
use super::selection::{aic, bic};
use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const WEIGHT_SUM_TOL: f64 = 1e-6;

/// A fitted Gaussian mixture: weights, means and covariances.
///
/// # Examples
///
/// ```
/// use gaussmix::mixture::{Covariances, MixtureModel};
/// use gaussmix::primitives::Matrix;
///
/// let model = MixtureModel::new(
///     vec![0.5, 0.5],
///     Matrix::from_vec(2, 1, vec![-5.0, 5.0]).unwrap(),
///     Covariances::Spherical(vec![1.0, 1.0]),
/// ).unwrap();
///
/// let x = Matrix::from_vec(2, 1, vec![-4.5, 6.0]).unwrap();
/// assert_eq!(model.predict(&x).unwrap(), vec![0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MixtureParts")]
pub struct MixtureModel {
    /// Mixing weights (sum to 1).
    weights: Vec<f64>,
    /// Component means (k × d).
    means: Matrix<f64>,
    /// Component covariances.
    covariances: Covariances,
}

/// Unvalidated serialized form of [`MixtureModel`].
#[derive(Deserialize)]
struct MixtureParts {
    weights: Vec<f64>,
    means: Matrix<f64>,
    covariances: Covariances,
}

impl TryFrom<MixtureParts> for MixtureModel {
    type Error = GaussMixError;

    fn try_from(parts: MixtureParts) -> Result<Self> {
        Self::new(parts.weights, parts.means, parts.covariances)
    }
}

impl MixtureModel {
    /// Builds a model from explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::InvalidShape`] when the parts disagree on
    /// `k` or `d`, [`GaussMixError::InvalidParameter`] when the weights are
    /// not a probability vector, and [`GaussMixError::NumericalDegeneracy`]
    /// when a covariance is not positive definite.
    pub fn new(weights: Vec<f64>, means: Matrix<f64>, covariances: Covariances) -> Result<Self> {
        let model = Self {
            weights,
            means,
            covariances,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let (k, d) = self.means.shape();
        if k == 0 || d == 0 {
            return Err(GaussMixError::InvalidShape {
                context: "means".to_string(),
                expected: "at least one component and one feature".to_string(),
                actual: format!("{k}x{d}"),
            });
        }
        if self.weights.len() != k {
            return Err(GaussMixError::dimension_mismatch(
                "weights",
                k,
                self.weights.len(),
            ));
        }
        if self.weights.iter().any(|&w| !(w > 0.0) || !w.is_finite()) {
            return Err(GaussMixError::invalid_parameter(
                "weights",
                format!("{:?}", self.weights),
                "all in (0, 1]",
            ));
        }
        let sum: f64 = self.weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(GaussMixError::invalid_parameter("sum(weights)", sum, "1"));
        }
        if !self.means.is_finite() {
            return Err(GaussMixError::invalid_parameter(
                "means",
                "non-finite values",
                "finite",
            ));
        }
        self.covariances.check_shape(k, d)?;
        self.factors().map(|_| ())
    }

    pub(crate) fn from_parts(weights: Vec<f64>, means: Matrix<f64>, covariances: Covariances) -> Self {
        Self {
            weights,
            means,
            covariances,
        }
    }

    /// Number of mixture components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    /// Dimension of the observations.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.n_cols()
    }

    /// Covariance parameterisation.
    #[must_use]
    pub fn covariance_type(&self) -> CovarianceType {
        self.covariances.covariance_type()
    }

    /// Mixing weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Component means (k × d).
    #[must_use]
    pub fn means(&self) -> &Matrix<f64> {
        &self.means
    }

    /// Component covariances in their stored form.
    #[must_use]
    pub fn covariances(&self) -> &Covariances {
        &self.covariances
    }

    /// Dense `d × d` covariance of component `j`.
    ///
    /// # Panics
    ///
    /// Panics if `j >= n_components()`.
    #[must_use]
    pub fn component_covariance(&self, j: usize) -> Matrix<f64> {
        self.covariances.component_matrix(j, self.n_features())
    }

    /// Number of free parameters: `(k - 1)` weights, `k·d` means and the
    /// covariance parameters of the style.
    #[must_use]
    pub fn n_parameters(&self) -> usize {
        let (k, d) = self.means.shape();
        (k - 1) + k * d + self.covariance_type().n_parameters(k, d)
    }

    fn factors(&self) -> Result<Vec<GaussianFactor>> {
        self.covariances
            .factorize(self.n_components(), 0.0)
            .map_err(|j| GaussMixError::NumericalDegeneracy {
                component: j,
                retries: 0,
                reason: "covariance not positive definite".to_string(),
            })
    }

    fn check_features(&self, x: &Matrix<f64>) -> Result<()> {
        if x.n_cols() != self.n_features() {
            return Err(GaussMixError::dimension_mismatch(
                "n_features",
                self.n_features(),
                x.n_cols(),
            ));
        }
        Ok(())
    }

    fn e_step(&self, x: &Matrix<f64>) -> Result<(Vec<f64>, Matrix<f64>)> {
        self.check_features(x)?;
        let factors = self.factors()?;
        Ok(Evaluator::new(&self.weights, &self.means, &factors).e_step(x))
    }

    /// Soft assignment: the `n × k` responsibility matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn predict_proba(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        Ok(self.e_step(x)?.1)
    }

    /// Hard assignment: the arg-max component of each row.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }

    /// Per-row log density `ln Σ_j w_j N(x_i; μ_j, Σ_j)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn score_samples(&self, x: &Matrix<f64>) -> Result<Vec<f64>> {
        Ok(self.e_step(x)?.0)
    }

    /// Total log-likelihood of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn log_likelihood(&self, x: &Matrix<f64>) -> Result<f64> {
        Ok(self.score_samples(x)?.iter().sum())
    }

    /// Mean per-sample log-likelihood of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty or has the wrong number of features.
    pub fn score(&self, x: &Matrix<f64>) -> Result<f64> {
        if x.n_rows() == 0 {
            return Err(GaussMixError::dimension_mismatch("n_samples (>= 1)", 1, 0));
        }
        Ok(self.log_likelihood(x)? / x.n_rows() as f64)
    }

    /// Akaike information criterion on `x`: `2p - 2 ln L`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn aic(&self, x: &Matrix<f64>) -> Result<f64> {
        Ok(aic(self.log_likelihood(x)?, self.n_parameters()))
    }

    /// Bayesian information criterion on `x`: `p ln n - 2 ln L`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong number of features.
    pub fn bic(&self, x: &Matrix<f64>) -> Result<f64> {
        Ok(bic(
            self.log_likelihood(x)?,
            self.n_parameters(),
            x.n_rows(),
        ))
    }

    /// Draws `n_samples` observations and their generating component.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored parameters are not a valid mixture
    /// (possible only for deserialized models).
    pub fn sample(&self, n_samples: usize, seed: u64) -> Result<(Matrix<f64>, Vec<usize>)> {
        let factors = self.factors()?;
        let chooser = WeightedIndex::new(&self.weights).map_err(|e| {
            GaussMixError::invalid_parameter("weights", e, "positive, finite weights")
        })?;
        let mut rng = StdRng::seed_from_u64(seed);
        let d = self.n_features();

        let mut samples = Matrix::zeros(n_samples, d);
        let mut labels = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            let j = chooser.sample(&mut rng);
            let z: Vec<f64> = (0..d).map(|_| StandardNormal.sample(&mut rng)).collect();
            let offset = factors[j].scale(&z);
            for ((out, &m), o) in samples.row_mut(i).iter_mut().zip(self.means.row(j)).zip(offset) {
                *out = m + o;
            }
            labels.push(j);
        }
        Ok((samples, labels))
    }

    /// Writes the model as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or serialization failure.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a model written by [`save`](Self::save), re-validating it.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, malformed JSON, or parameters that do
    /// not form a valid mixture.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let parts: MixtureParts = serde_json::from_str(&json)?;
        Self::try_from(parts)
    }
}

/// Arg-max column of every row (first index wins ties).
pub(crate) fn argmax_rows(m: &Matrix<f64>) -> Vec<usize> {
    m.rows()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (j, &v)| {
                    if v > best.1 {
                        (j, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}
