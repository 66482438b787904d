//! Gaussian Mixture Model estimator.
//!
//! Fits a mixture of Gaussians with Expectation-Maximization and exposes the
//! result either as a rich [`MixtureFit`] or through the
//! [`UnsupervisedEstimator`] interface.

use super::covariance::CovarianceType;
use super::em::{fit_single, FitStatus, FitWarning, SingleFit};
use super::model::{argmax_rows, MixtureModel};
use super::options::{GmmInit, GmmOptions};
use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything produced by one call to [`GaussianMixture::fit_detailed`].
#[derive(Debug, Clone)]
pub struct MixtureFit {
    /// Fitted parameters.
    pub model: MixtureModel,
    /// Final `n × k` responsibilities of the training data.
    pub responsibilities: Matrix<f64>,
    /// Total log-likelihood after initialisation and after every iteration.
    pub log_likelihood_history: Vec<f64>,
    /// Final total log-likelihood.
    pub log_likelihood: f64,
    /// How the iteration loop ended.
    pub status: FitStatus,
    /// EM iterations performed by the kept run.
    pub n_iter: usize,
    /// Recoverable events from the kept run.
    pub warnings: Vec<FitWarning>,
}

impl MixtureFit {
    /// Hard labels of the training data.
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        argmax_rows(&self.responsibilities)
    }

    /// Whether the log-likelihood change fell below `tol`.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }
}

/// Gaussian Mixture Model (GMM) for probabilistic clustering.
///
/// # Algorithm
///
/// 1. **Init**: k-means++ (or random) partition, then one M-step
/// 2. **E-step**: log-space responsibilities via log-sum-exp
/// 3. **M-step**: weights, means and covariances (+ `reg_covar`)
/// 4. Repeat until the log-likelihood changes by less than `tol`
///
/// # Examples
///
/// ```
/// use gaussmix::prelude::*;
///
/// let data = Matrix::from_vec(8, 2, vec![
///     1.0, 1.0, 1.1, 1.0, 1.0, 1.1, 1.2, 0.9,
///     5.0, 5.0, 5.1, 5.0, 5.0, 5.1, 4.9, 5.2,
/// ]).expect("valid matrix");
///
/// let gmm = GaussianMixture::new(2, CovarianceType::Spherical).with_seed(42);
/// let fit = gmm.fit_detailed(&data).expect("fit succeeds");
///
/// let labels = fit.labels();
/// assert_eq!(labels[0], labels[3]);
/// assert_ne!(labels[0], labels[4]);
///
/// let proba = fit.model.predict_proba(&data).expect("same feature count");
/// assert_eq!(proba.shape(), (8, 2));
/// ```
///
/// # Performance
///
/// - Time complexity: O(n·k·d²·i) for full covariances
/// - Space complexity: O(n·k + k·d²)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMixture {
    options: GmmOptions,
    model: Option<MixtureModel>,
    status: Option<FitStatus>,
    n_iter: usize,
    log_likelihood_history: Vec<f64>,
    warnings: Vec<FitWarning>,
}

impl Default for GaussianMixture {
    fn default() -> Self {
        Self::from_options(GmmOptions::default())
    }
}

impl GaussianMixture {
    /// Create new `GaussianMixture` with specified number of components and covariance type.
    #[must_use]
    pub fn new(n_components: usize, covariance_type: CovarianceType) -> Self {
        Self::from_options(GmmOptions {
            n_components,
            covariance_type,
            ..GmmOptions::default()
        })
    }

    /// Create an unfitted estimator from a full option set.
    #[must_use]
    pub fn from_options(options: GmmOptions) -> Self {
        Self {
            options,
            model: None,
            status: None,
            n_iter: 0,
            log_likelihood_history: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Set maximum number of EM iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.options.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.options.tol = tol;
        self
    }

    /// Set the value added to every covariance diagonal.
    #[must_use]
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.options.reg_covar = reg_covar;
        self
    }

    /// Set random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }

    /// Set the number of initialisations.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.options.n_init = n_init;
        self
    }

    /// Set the initialisation method.
    #[must_use]
    pub fn with_init(mut self, init: GmmInit) -> Self {
        self.options.init = init;
        self
    }

    /// Set how many component reinitialisations a fit tolerates.
    #[must_use]
    pub fn with_max_reinit(mut self, max_reinit: usize) -> Self {
        self.options.max_reinit = max_reinit;
        self
    }

    /// Options used by the next fit.
    #[must_use]
    pub fn options(&self) -> &GmmOptions {
        &self.options
    }

    /// Get number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.options.n_components
    }

    /// Get covariance type.
    #[must_use]
    pub fn covariance_type(&self) -> CovarianceType {
        self.options.covariance_type
    }

    /// Check if model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::NotFitted`] before a successful `fit`.
    pub fn model(&self) -> Result<&MixtureModel> {
        self.model.as_ref().ok_or(GaussMixError::NotFitted)
    }

    /// Status of the last successful fit.
    #[must_use]
    pub fn status(&self) -> Option<FitStatus> {
        self.status
    }

    /// Iterations performed by the last successful fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Log-likelihood trace of the last successful fit.
    #[must_use]
    pub fn log_likelihood_history(&self) -> &[f64] {
        &self.log_likelihood_history
    }

    /// Warnings raised by the last successful fit.
    #[must_use]
    pub fn warnings(&self) -> &[FitWarning] {
        &self.warnings
    }

    /// Soft assignment under the fitted model.
    ///
    /// # Errors
    ///
    /// Returns an error if unfitted or if the feature count differs.
    pub fn predict_proba(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        self.model()?.predict_proba(x)
    }

    /// Mean per-sample log-likelihood under the fitted model.
    ///
    /// # Errors
    ///
    /// Returns an error if unfitted or if the feature count differs.
    pub fn score(&self, x: &Matrix<f64>) -> Result<f64> {
        self.model()?.score(x)
    }

    /// AIC of `x` under the fitted model.
    ///
    /// # Errors
    ///
    /// Returns an error if unfitted or if the feature count differs.
    pub fn aic(&self, x: &Matrix<f64>) -> Result<f64> {
        self.model()?.aic(x)
    }

    /// BIC of `x` under the fitted model.
    ///
    /// # Errors
    ///
    /// Returns an error if unfitted or if the feature count differs.
    pub fn bic(&self, x: &Matrix<f64>) -> Result<f64> {
        self.model()?.bic(x)
    }

    /// Fits the mixture and returns the full record of the run.
    ///
    /// With `n_init > 1`, initialisation `i` is seeded with `seed + i` and
    /// the run with the highest final log-likelihood is kept. A run that
    /// fails on numerical degeneracy is skipped as long as another succeeds.
    ///
    /// # Errors
    ///
    /// - [`GaussMixError::InvalidParameter`] for bad options or non-finite data
    /// - [`GaussMixError::InvalidShape`] for too few samples
    /// - [`GaussMixError::NumericalDegeneracy`] when every run exhausts
    ///   its reinitialisation budget
    pub fn fit_detailed(&self, x: &Matrix<f64>) -> Result<MixtureFit> {
        let options = &self.options;
        options.validate_data(x)?;

        let mut best: Option<SingleFit> = None;
        let mut last_err = None;
        for i in 0..options.n_init {
            let seed = options.seed.wrapping_add(i as u64);
            match fit_single(x, options, seed) {
                Ok(run) => {
                    if best
                        .as_ref()
                        .map_or(true, |b| run.log_likelihood > b.log_likelihood)
                    {
                        best = Some(run);
                    }
                }
                Err(err @ GaussMixError::NumericalDegeneracy { .. }) => {
                    warn!(init = i, seed, error = %err, "initialisation abandoned");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let run = match (best, last_err) {
            (Some(run), _) => run,
            (None, Some(err)) => return Err(err),
            (None, None) => return Err(GaussMixError::NotFitted),
        };

        info!(
            n_components = options.n_components,
            covariance_type = %options.covariance_type,
            n_iter = run.n_iter,
            log_likelihood = run.log_likelihood,
            status = ?run.status,
            "Gaussian mixture fitted"
        );

        let SingleFit {
            params,
            responsibilities,
            history,
            log_likelihood,
            status,
            n_iter,
            warnings,
        } = run;

        Ok(MixtureFit {
            model: MixtureModel::from_parts(params.weights, params.means, params.covariances),
            responsibilities,
            log_likelihood_history: history,
            log_likelihood,
            status,
            n_iter,
            warnings,
        })
    }
}

impl UnsupervisedEstimator for GaussianMixture {
    type Labels = Vec<usize>;

    fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
        let fit = self.fit_detailed(x)?;
        self.model = Some(fit.model);
        self.status = Some(fit.status);
        self.n_iter = fit.n_iter;
        self.log_likelihood_history = fit.log_likelihood_history;
        self.warnings = fit.warnings;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<usize>> {
        self.model()?.predict(x)
    }
}
