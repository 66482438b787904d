//! Clustering algorithms.
//!
//! Hard-partition clustering used on its own or to seed the EM fitter in
//! [`crate::mixture`].

mod kmeans;

pub use kmeans::KMeans;

#[cfg(test)]
#[path = "tests_kmeans_contract.rs"]
mod tests_kmeans_contract;
