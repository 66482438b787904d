//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use gaussmix::prelude::*;
//! ```

pub use crate::cluster::KMeans;
pub use crate::error::{GaussMixError, Result};
pub use crate::mixture::{
    CovarianceType, FitStatus, GaussianMixture, GmmInit, GmmOptions, InformationCriterion,
    MixtureFit, MixtureModel,
};
pub use crate::primitives::Matrix;
pub use crate::traits::UnsupervisedEstimator;
