//! Information criteria and choosing the number of components.

use super::gmm::GaussianMixture;
use super::model::MixtureModel;
use super::options::GmmOptions;
use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Akaike information criterion: `2p - 2 ln L`.
///
/// ```
/// assert_eq!(gaussmix::mixture::aic(-10.0, 3), 26.0);
/// ```
#[must_use]
pub fn aic(log_likelihood: f64, n_parameters: usize) -> f64 {
    2.0 * n_parameters as f64 - 2.0 * log_likelihood
}

/// Bayesian information criterion: `p ln n - 2 ln L`.
#[must_use]
pub fn bic(log_likelihood: f64, n_parameters: usize, n_samples: usize) -> f64 {
    n_parameters as f64 * (n_samples as f64).ln() - 2.0 * log_likelihood
}

/// Criterion minimised by [`select_n_components`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    /// Akaike information criterion.
    Aic,
    /// Bayesian information criterion.
    #[default]
    Bic,
}

/// One fitted candidate in a component-count sweep.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Number of components tried.
    pub n_components: usize,
    /// Final training log-likelihood.
    pub log_likelihood: f64,
    /// Free parameter count.
    pub n_parameters: usize,
    /// AIC on the training data.
    pub aic: f64,
    /// BIC on the training data.
    pub bic: f64,
    /// Whether EM met the tolerance.
    pub converged: bool,
    /// The fitted model.
    pub model: MixtureModel,
}

impl Candidate {
    fn value(&self, criterion: InformationCriterion) -> f64 {
        match criterion {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Bic => self.bic,
        }
    }
}

/// Outcome of [`select_n_components`].
#[derive(Debug, Clone)]
pub struct SelectionReport {
    /// Criterion used to rank candidates.
    pub criterion: InformationCriterion,
    /// Every candidate, in the order requested.
    pub candidates: Vec<Candidate>,
    /// Index into `candidates` of the lowest criterion value.
    pub best_index: usize,
}

impl SelectionReport {
    /// The winning candidate.
    #[must_use]
    pub fn best(&self) -> &Candidate {
        &self.candidates[self.best_index]
    }

    /// Component count of the winning candidate.
    #[must_use]
    pub fn best_n_components(&self) -> usize {
        self.best().n_components
    }
}

fn fit_candidate(x: &Matrix<f64>, options: &GmmOptions, k: usize) -> Result<Candidate> {
    let gmm = GaussianMixture::from_options(GmmOptions {
        n_components: k,
        ..options.clone()
    });
    let fit = gmm.fit_detailed(x)?;
    let n_parameters = fit.model.n_parameters();
    Ok(Candidate {
        n_components: k,
        log_likelihood: fit.log_likelihood,
        n_parameters,
        aic: aic(fit.log_likelihood, n_parameters),
        bic: bic(fit.log_likelihood, n_parameters, x.n_rows()),
        converged: fit.converged(),
        model: fit.model,
    })
}

/// Fits one mixture per entry of `candidates` (overriding
/// `options.n_components`) and ranks them by `criterion`.
///
/// Candidates are fitted independently, in parallel with the `parallel`
/// feature. Ties keep the smaller index.
///
/// # Errors
///
/// Returns [`GaussMixError::InvalidParameter`] for an empty candidate list,
/// otherwise the first error raised by any candidate fit.
///
/// # Examples
///
/// ```
/// use gaussmix::datasets::make_blobs;
/// use gaussmix::mixture::{select_n_components, GmmOptions, InformationCriterion};
///
/// let (x, _) = make_blobs(&[vec![0.0, 0.0], vec![12.0, 12.0]], 40, 0.5, 3).unwrap();
/// let report =
///     select_n_components(&x, &[1, 2, 3], &GmmOptions::default(), InformationCriterion::Bic)
///         .unwrap();
/// assert_eq!(report.best_n_components(), 2);
/// ```
pub fn select_n_components(
    x: &Matrix<f64>,
    candidates: &[usize],
    options: &GmmOptions,
    criterion: InformationCriterion,
) -> Result<SelectionReport> {
    if candidates.is_empty() {
        return Err(GaussMixError::invalid_parameter(
            "candidates",
            "[]",
            "at least one component count",
        ));
    }

    #[cfg(feature = "parallel")]
    let fitted: Result<Vec<Candidate>> = candidates
        .par_iter()
        .map(|&k| fit_candidate(x, options, k))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let fitted: Result<Vec<Candidate>> = candidates
        .iter()
        .map(|&k| fit_candidate(x, options, k))
        .collect();

    let candidates = fitted?;
    let best_index = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (i, c)| {
            if c.value(criterion) < candidates[best].value(criterion) {
                i
            } else {
                best
            }
        });

    let best = &candidates[best_index];
    info!(
        ?criterion,
        n_components = best.n_components,
        value = best.value(criterion),
        "component count selected"
    );

    Ok(SelectionReport {
        criterion,
        candidates,
        best_index,
    })
}
