//! Gaussian Mixture Models fitted by Expectation-Maximization.
//!
//! # Covariance styles
//!
//! | Style | Stored as | Parameters |
//! |-------|-----------|------------|
//! | [`CovarianceType::Full`] | one `d × d` matrix per component | `k·d(d+1)/2` |
//! | [`CovarianceType::Tied`] | one shared `d × d` matrix | `d(d+1)/2` |
//! | [`CovarianceType::Diagonal`] | `k × d` variances | `k·d` |
//! | [`CovarianceType::Spherical`] | one variance per component | `k` |
//!
//! Densities are evaluated in log-space through a Cholesky factor, and each
//! E-step normalises with log-sum-exp. Components that collapse or whose
//! covariance stops being positive definite are reinitialised (see
//! [`FitWarning`]) up to `max_reinit` times per fit.
//!
//! # Example
//!
//! ```
//! use gaussmix::datasets::make_blobs;
//! use gaussmix::mixture::{CovarianceType, GaussianMixture};
//!
//! let centers = [vec![0.0, 0.0], vec![10.0, 0.0]];
//! let (x, _) = make_blobs(&centers, 50, 1.0, 7).unwrap();
//!
//! let fit = GaussianMixture::new(2, CovarianceType::Full)
//!     .with_seed(7)
//!     .fit_detailed(&x)
//!     .unwrap();
//!
//! let total: f64 = fit.model.weights().iter().sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! assert!(fit.model.bic(&x).unwrap().is_finite());
//! ```

mod covariance;
mod em;
mod gmm;
mod init;
mod model;
mod options;
mod selection;

pub use covariance::{CovarianceType, Covariances};
pub use em::{DegeneracyReason, FitStatus, FitWarning};
pub use gmm::{GaussianMixture, MixtureFit};
pub use model::MixtureModel;
pub use options::{GmmInit, GmmOptions};
pub use selection::{aic, bic, select_n_components, Candidate, InformationCriterion, SelectionReport};

#[cfg(test)]
#[path = "tests_gmm_contract.rs"]
mod tests_gmm_contract;
