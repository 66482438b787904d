//! Gaussmix: Gaussian Mixture Models fitted by Expectation-Maximization.
//!
//! Gaussmix fits mixtures with full, tied, diagonal or spherical
//! covariances, evaluates every density in log-space, and recovers from
//! collapsed or singular components instead of producing NaNs.
//!
//! # Quick Start
//!
//! ```
//! use gaussmix::prelude::*;
//!
//! let x = Matrix::from_vec(8, 1, vec![
//!     0.0, 0.2, -0.1, 0.1,
//!     9.0, 9.3, 8.8, 9.1,
//! ]).unwrap();
//!
//! let mut gmm = GaussianMixture::new(2, CovarianceType::Spherical).with_seed(1);
//! gmm.fit(&x).unwrap();
//!
//! let labels = gmm.predict(&x).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[4]);
//! assert_eq!(gmm.status(), Some(FitStatus::Converged));
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Dense row-major `Matrix` with Cholesky support
//! - [`stats`]: Log-sum-exp and (weighted) covariance estimators
//! - [`cluster`]: K-Means, used to seed EM
//! - [`mixture`]: Gaussian mixtures, EM, AIC/BIC model selection
//! - [`datasets`]: Synthetic Gaussian blobs
//!
//! # Features
//!
//! - `parallel` (default): E-step rows, per-component M-step work and
//!   component-count sweeps run on the rayon thread pool.

pub mod cluster;
pub mod datasets;
pub mod error;
pub mod mixture;
pub mod prelude;
pub mod primitives;
pub mod stats;
pub mod traits;

pub use error::{GaussMixError, Result};
pub use primitives::Matrix;
pub use traits::UnsupervisedEstimator;
