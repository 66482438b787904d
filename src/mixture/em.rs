//! Expectation-Maximization core.
//!
//! One fit is: initial partition → M-step → repeat (E-step, convergence test,
//! M-step). Every M-step result passes through [`DegeneracyGuard`], which
//! reinitialises collapsed or singular components instead of failing.

use super::covariance::{CovarianceType, Covariances, GaussianFactor};
use super::init::initial_responsibilities;
use super::options::GmmOptions;
use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use crate::stats::{cov_matrix, logsumexp, weighted_cov_matrix, weighted_mean};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// Log-likelihood change fell below `tol`.
    Converged,
    /// `max_iter` iterations ran without meeting the tolerance.
    MaxIterReached,
}

/// Why a component had to be reinitialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegeneracyReason {
    /// Effective sample count collapsed to (numerically) zero.
    Collapsed,
    /// Covariance was not positive definite after regularisation.
    SingularCovariance,
}

/// Recoverable problems encountered while fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitWarning {
    /// A component was reset to a random observation and the global covariance.
    ComponentReinitialized {
        /// Component index
        component: usize,
        /// EM iteration (0 = initialisation)
        iteration: usize,
        /// What triggered the reset
        reason: DegeneracyReason,
    },
    /// The shared covariance was reset to the global covariance.
    TiedCovarianceReset {
        /// EM iteration (0 = initialisation)
        iteration: usize,
    },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::ComponentReinitialized {
                component,
                iteration,
                reason,
            } => write!(
                f,
                "component {component} reinitialized at iteration {iteration} ({reason:?})"
            ),
            FitWarning::TiedCovarianceReset { iteration } => {
                write!(f, "tied covariance reset at iteration {iteration}")
            }
        }
    }
}

/// Mixture parameters while fitting.
#[derive(Debug, Clone)]
pub(crate) struct Params {
    pub(crate) weights: Vec<f64>,
    pub(crate) means: Matrix<f64>,
    pub(crate) covariances: Covariances,
}

/// Result of one initialisation run.
#[derive(Debug)]
pub(crate) struct SingleFit {
    pub(crate) params: Params,
    pub(crate) responsibilities: Matrix<f64>,
    pub(crate) history: Vec<f64>,
    pub(crate) log_likelihood: f64,
    pub(crate) status: FitStatus,
    pub(crate) n_iter: usize,
    pub(crate) warnings: Vec<FitWarning>,
}

/// Log-space evaluator for a fixed set of parameters.
pub(crate) struct Evaluator<'a> {
    log_weights: Vec<f64>,
    means: &'a Matrix<f64>,
    factors: &'a [GaussianFactor],
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(weights: &[f64], means: &'a Matrix<f64>, factors: &'a [GaussianFactor]) -> Self {
        Self {
            log_weights: weights.iter().map(|w| w.ln()).collect(),
            means,
            factors,
        }
    }

    fn n_components(&self) -> usize {
        self.log_weights.len()
    }

    /// `out[j] = ln w_j + ln N(row; μ_j, Σ_j)`.
    fn weighted_log_prob_row(&self, row: &[f64], out: &mut [f64]) {
        for (j, o) in out.iter_mut().enumerate() {
            *o = self.log_weights[j] + self.factors[j].log_density(row, self.means.row(j));
        }
    }

    /// E-step: per-row log normalisers `ln Σ_j w_j N(x_i)` and the
    /// responsibility matrix.
    pub(crate) fn e_step(&self, x: &Matrix<f64>) -> (Vec<f64>, Matrix<f64>) {
        let k = self.n_components();
        let d = x.n_cols();
        let mut resp = Matrix::zeros(x.n_rows(), k);

        let normalise_row = |(row, out): (&[f64], &mut [f64])| -> f64 {
            self.weighted_log_prob_row(row, out);
            let norm = logsumexp(out);
            if norm.is_finite() {
                out.iter_mut().for_each(|v| *v = (*v - norm).exp());
            } else {
                out.iter_mut().for_each(|v| *v = 1.0 / k as f64);
            }
            norm
        };

        #[cfg(feature = "parallel")]
        let log_norm: Vec<f64> = x
            .as_slice()
            .par_chunks(d)
            .zip(resp.as_mut_slice().par_chunks_mut(k))
            .map(normalise_row)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let log_norm: Vec<f64> = x
            .as_slice()
            .chunks(d)
            .zip(resp.as_mut_slice().chunks_mut(k))
            .map(normalise_row)
            .collect();

        (log_norm, resp)
    }
}

/// Runs `f` for every component index, on the rayon pool when available.
fn per_component<T, F>(n_components: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..n_components).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n_components).map(f).collect()
    }
}

fn weighted_variances(x: &Matrix<f64>, weights: &[f64], mean: &[f64], norm: f64) -> Vec<f64> {
    let mut var = vec![0.0; x.n_cols()];
    for (row, &w) in x.rows().zip(weights) {
        for ((v, &a), &m) in var.iter_mut().zip(row).zip(mean) {
            *v += w * (a - m) * (a - m);
        }
    }
    var.iter_mut().for_each(|v| *v /= norm);
    var
}

/// M-step: maximum-likelihood parameters given responsibilities.
///
/// Returns the parameters and the effective count `N_j` of each component.
pub(crate) fn m_step(
    x: &Matrix<f64>,
    resp: &Matrix<f64>,
    covariance_type: CovarianceType,
    reg_covar: f64,
) -> (Params, Vec<f64>) {
    let (n_samples, n_features) = x.shape();
    let k = resp.n_cols();
    let columns: Vec<Vec<f64>> = (0..k).map(|j| resp.column(j)).collect();
    let counts: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>()).collect();
    let nk: Vec<f64> = counts.iter().map(|c| c + 10.0 * f64::EPSILON).collect();
    // Moments use the exact count so a zero-spread group gets exactly zero
    // variance; the floor only keeps empty components finite.
    let norm: Vec<f64> = counts
        .iter()
        .zip(&nk)
        .map(|(&c, &floored)| if c > 0.0 { c } else { floored })
        .collect();

    let mut means = Matrix::zeros(k, n_features);
    for j in 0..k {
        means
            .row_mut(j)
            .copy_from_slice(&weighted_mean(x, &columns[j], norm[j]));
    }

    let covariances = match covariance_type {
        CovarianceType::Full => Covariances::Full(per_component(k, |j| {
            let mut cov = weighted_cov_matrix(x, &columns[j], means.row(j), norm[j]);
            cov.add_to_diagonal(reg_covar);
            cov
        })),
        CovarianceType::Tied => {
            let scatters = per_component(k, |j| {
                weighted_cov_matrix(x, &columns[j], means.row(j), n_samples as f64)
            });
            let mut tied = Matrix::zeros(n_features, n_features);
            for scatter in &scatters {
                for (t, s) in tied.as_mut_slice().iter_mut().zip(scatter.as_slice()) {
                    *t += s;
                }
            }
            tied.add_to_diagonal(reg_covar);
            Covariances::Tied(tied)
        }
        CovarianceType::Diagonal => {
            let rows = per_component(k, |j| {
                weighted_variances(x, &columns[j], means.row(j), norm[j])
                    .into_iter()
                    .map(|v| v + reg_covar)
                    .collect::<Vec<f64>>()
            });
            let mut vars = Matrix::zeros(k, n_features);
            for (j, row) in rows.iter().enumerate() {
                vars.row_mut(j).copy_from_slice(row);
            }
            Covariances::Diagonal(vars)
        }
        CovarianceType::Spherical => Covariances::Spherical(per_component(k, |j| {
            let var = weighted_variances(x, &columns[j], means.row(j), norm[j]);
            var.iter().sum::<f64>() / n_features as f64 + reg_covar
        })),
    };

    let total: f64 = nk.iter().sum();
    let weights = nk.iter().map(|n| n / total).collect();

    (
        Params {
            weights,
            means,
            covariances,
        },
        nk,
    )
}

/// Squared rounding error of an `n`-term mean at the data's magnitude.
fn variance_floor(x: &Matrix<f64>) -> f64 {
    let scale = x.as_slice().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let noise = x.n_rows() as f64 * f64::EPSILON * scale;
    noise * noise
}

/// Applies the degenerate-covariance policy after each M-step.
struct DegeneracyGuard<'a> {
    x: &'a Matrix<f64>,
    /// Global data covariance plus `reg_covar`.
    fallback: Matrix<f64>,
    /// Variances at or below this are rounding noise.
    variance_floor: f64,
    rng: StdRng,
    max_reinit: usize,
    reinit_count: usize,
    warnings: Vec<FitWarning>,
}

impl<'a> DegeneracyGuard<'a> {
    fn new(x: &'a Matrix<f64>, options: &GmmOptions, rng: StdRng) -> Result<Self> {
        let mut fallback = cov_matrix(x)?;
        fallback.add_to_diagonal(options.reg_covar);
        Ok(Self {
            x,
            fallback,
            variance_floor: variance_floor(x),
            rng,
            max_reinit: options.max_reinit,
            reinit_count: 0,
            warnings: Vec::new(),
        })
    }

    /// Factorises the covariances, reinitialising components until every one
    /// is usable. Returns the factors and whether anything was reset.
    fn stabilize(
        &mut self,
        params: &mut Params,
        nk: &[f64],
        iteration: usize,
    ) -> Result<(Vec<GaussianFactor>, bool)> {
        let k = params.weights.len();
        let floor = 10.0 * f64::EPSILON * self.x.n_rows() as f64;
        let mut changed = false;

        for (j, &count) in nk.iter().enumerate() {
            if count < floor {
                self.reinitialize(params, j, iteration, DegeneracyReason::Collapsed)?;
                changed = true;
            }
        }

        loop {
            match params.covariances.factorize(k, self.variance_floor) {
                Ok(factors) => return Ok((factors, changed)),
                Err(j) => {
                    if matches!(params.covariances, Covariances::Tied(_)) {
                        self.reset_tied(params, iteration)?;
                    } else {
                        self.reinitialize(
                            params,
                            j,
                            iteration,
                            DegeneracyReason::SingularCovariance,
                        )?;
                    }
                    changed = true;
                }
            }
        }
    }

    fn charge(&mut self, component: usize, reason: &str) -> Result<()> {
        self.reinit_count += 1;
        if self.reinit_count > self.max_reinit {
            return Err(GaussMixError::NumericalDegeneracy {
                component,
                retries: self.max_reinit,
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    fn reinitialize(
        &mut self,
        params: &mut Params,
        j: usize,
        iteration: usize,
        reason: DegeneracyReason,
    ) -> Result<()> {
        let description = match reason {
            DegeneracyReason::Collapsed => "component weight collapsed to zero",
            DegeneracyReason::SingularCovariance => "covariance not positive definite",
        };
        self.charge(j, description)?;

        let k = params.weights.len();
        let idx = self.rng.gen_range(0..self.x.n_rows());
        params.means.row_mut(j).copy_from_slice(self.x.row(idx));

        match &mut params.covariances {
            Covariances::Full(covs) => covs[j] = self.fallback.clone(),
            Covariances::Diagonal(vars) => {
                vars.row_mut(j).copy_from_slice(&self.fallback.diagonal());
            }
            Covariances::Spherical(vars) => {
                let diag = self.fallback.diagonal();
                vars[j] = diag.iter().sum::<f64>() / diag.len() as f64;
            }
            Covariances::Tied(_) => {}
        }

        params.weights[j] = 1.0 / k as f64;
        let total: f64 = params.weights.iter().sum();
        params.weights.iter_mut().for_each(|w| *w /= total);

        let warning = FitWarning::ComponentReinitialized {
            component: j,
            iteration,
            reason,
        };
        warn!(component = j, iteration, observation = idx, "{warning}");
        self.warnings.push(warning);
        Ok(())
    }

    fn reset_tied(&mut self, params: &mut Params, iteration: usize) -> Result<()> {
        self.charge(0, "tied covariance not positive definite")?;
        params.covariances = Covariances::Tied(self.fallback.clone());
        let warning = FitWarning::TiedCovarianceReset { iteration };
        warn!(iteration, "{warning}");
        self.warnings.push(warning);
        Ok(())
    }
}

/// Runs EM from one seeded initialisation.
pub(crate) fn fit_single(x: &Matrix<f64>, options: &GmmOptions, seed: u64) -> Result<SingleFit> {
    let mut rng = StdRng::seed_from_u64(seed);
    let resp = initial_responsibilities(x, options.n_components, options.init, &mut rng)?;
    let mut guard = DegeneracyGuard::new(x, options, rng)?;

    let (mut params, nk) = m_step(x, &resp, options.covariance_type, options.reg_covar);
    let (mut factors, mut reinitialized) = guard.stabilize(&mut params, &nk, 0)?;

    let mut history: Vec<f64> = Vec::with_capacity(options.max_iter + 1);
    let mut status = FitStatus::MaxIterReached;
    let mut n_iter = 0;
    let mut converged: Option<(Matrix<f64>, f64)> = None;

    for iteration in 1..=options.max_iter {
        n_iter = iteration;
        let (log_norm, resp) = Evaluator::new(&params.weights, &params.means, &factors).e_step(x);
        let log_likelihood: f64 = log_norm.iter().sum();
        let change = history.last().map(|prev| log_likelihood - prev);
        history.push(log_likelihood);
        debug!(iteration, log_likelihood, change = ?change, "EM iteration");

        if !reinitialized && change.is_some_and(|c| c.abs() < options.tol) {
            status = FitStatus::Converged;
            converged = Some((resp, log_likelihood));
            break;
        }

        let (next, nk) = m_step(x, &resp, options.covariance_type, options.reg_covar);
        params = next;
        (factors, reinitialized) = guard.stabilize(&mut params, &nk, iteration)?;
    }

    let (responsibilities, log_likelihood) = match converged {
        Some(done) => done,
        None => {
            let (log_norm, resp) =
                Evaluator::new(&params.weights, &params.means, &factors).e_step(x);
            let log_likelihood: f64 = log_norm.iter().sum();
            history.push(log_likelihood);
            warn!(
                max_iter = options.max_iter,
                log_likelihood, "EM stopped before reaching tolerance"
            );
            (resp, log_likelihood)
        }
    };

    Ok(SingleFit {
        params,
        responsibilities,
        history,
        log_likelihood,
        status,
        n_iter,
        warnings: guard.warnings,
    })
}
