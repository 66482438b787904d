//! Core compute primitives.
//!
//! Row-major [`Matrix`] storage with the small amount of dense linear
//! algebra the mixture fitter needs (Cholesky, triangular solves).

mod matrix;

pub use matrix::Matrix;

#[cfg(test)]
#[path = "tests_matrix_contract.rs"]
mod tests_matrix_contract;
