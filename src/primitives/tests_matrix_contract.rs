// =========================================================================
// FALSIFY-MX: Matrix primitives contract (gaussmix primitives)
//
// The Gaussian density path relies on transpose/matmul shape rules and on
// Cholesky factors reproducing their input; these tests pin both down.
//
// References:
//   - Golub & Van Loan (2013) "Matrix Computations"
// =========================================================================

use super::*;

/// FALSIFY-MX-001: Transpose involution: (A^T)^T = A
#[test]
fn falsify_mx_001_transpose_involution() {
    let a = Matrix::<f64>::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid");
    let att = a.transpose().transpose();

    assert_eq!(att, a, "FALSIFIED MX-001: (A^T)^T != A");
}

/// FALSIFY-MX-002: Matmul shape: (m×k) * (k×n) = (m×n)
#[test]
fn falsify_mx_002_matmul_shape() {
    let a = Matrix::<f64>::from_vec(2, 3, vec![1.0; 6]).expect("valid");
    let b = Matrix::<f64>::from_vec(3, 4, vec![1.0; 12]).expect("valid");
    let c = a.matmul(&b).expect("compatible dims");

    assert_eq!(
        c.shape(),
        (2, 4),
        "FALSIFIED MX-002: (2x3)*(3x4) shape={:?}, expected (2,4)",
        c.shape()
    );
}

/// FALSIFY-MX-003: Cholesky factor is lower triangular with positive diagonal
#[test]
fn falsify_mx_003_cholesky_lower_triangular() {
    let a = Matrix::<f64>::from_vec(3, 3, vec![2.0, 0.5, 0.1, 0.5, 1.5, 0.2, 0.1, 0.2, 1.0])
        .expect("valid");
    let l = a.cholesky().expect("SPD");

    for i in 0..3 {
        assert!(l.get(i, i) > 0.0, "FALSIFIED MX-003: L[{i},{i}] <= 0");
        for j in (i + 1)..3 {
            assert!(
                l.get(i, j) == 0.0,
                "FALSIFIED MX-003: L[{i},{j}]={} above diagonal",
                l.get(i, j)
            );
        }
    }
}

/// FALSIFY-MX-004: L L^T reproduces the input
#[test]
fn falsify_mx_004_cholesky_reconstruction() {
    let a = Matrix::<f64>::from_vec(2, 2, vec![3.0, 1.2, 1.2, 2.0]).expect("valid");
    let l = a.cholesky().expect("SPD");
    let rebuilt = l.matmul(&l.transpose()).expect("square");

    for i in 0..2 {
        for j in 0..2 {
            assert!(
                (rebuilt.get(i, j) - a.get(i, j)).abs() < 1e-12,
                "FALSIFIED MX-004: (LL^T)[{i},{j}] != A[{i},{j}]"
            );
        }
    }
}
