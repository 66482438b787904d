// =========================================================================
// FALSIFY-GM: Gaussian Mixture Model contract (gaussmix mixture)
//
// EM must keep the mixture a valid distribution at every step: weights on
// the simplex, covariances SPD, responsibilities normalised, likelihood
// monotone. The recovery and BIC tests pin down end-to-end behaviour on
// well-separated synthetic data.
//
// References:
//   - Dempster, Laird, Rubin (1977) "Maximum Likelihood from Incomplete Data via the EM Algorithm"
//   - Schwarz (1978) "Estimating the Dimension of a Model"
// =========================================================================

use super::*;
use crate::datasets::make_blobs;
use crate::error::GaussMixError;
use crate::primitives::Matrix;
use crate::stats::cov_matrix;
use crate::traits::UnsupervisedEstimator;

const STYLES: [CovarianceType; 4] = [
    CovarianceType::Full,
    CovarianceType::Tied,
    CovarianceType::Diagonal,
    CovarianceType::Spherical,
];

fn three_blobs() -> (Matrix<f64>, Vec<usize>, Vec<Vec<f64>>) {
    let centers = vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![0.0, 10.0]];
    let (x, labels) = make_blobs(&centers, 100, 1.0, 42).expect("valid centres");
    (x, labels, centers)
}

/// Best agreement between two labelings over all relabelings of 3 clusters.
fn agreement_up_to_permutation(truth: &[usize], predicted: &[usize]) -> f64 {
    const PERMS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    PERMS
        .iter()
        .map(|p| {
            truth
                .iter()
                .zip(predicted)
                .filter(|&(&t, &q)| p[q] == t)
                .count()
        })
        .max()
        .unwrap_or(0) as f64
        / truth.len() as f64
}

/// FALSIFY-GM-001: Mixing weights sum to 1.0 for every covariance style
#[test]
fn falsify_gm_001_weights_sum_to_one() {
    let (x, _, _) = three_blobs();
    for style in STYLES {
        let fit = GaussianMixture::new(3, style)
            .with_seed(42)
            .fit_detailed(&x)
            .expect("fit succeeds");
        let sum: f64 = fit.model.weights().iter().sum();
        assert!(
            (sum - 1.0).abs() < 1e-9,
            "FALSIFIED GM-001: {style} weights sum={sum}, expected 1.0"
        );
        assert!(
            fit.model.weights().iter().all(|&w| w > 0.0),
            "FALSIFIED GM-001: {style} has a non-positive weight"
        );
    }
}

/// FALSIFY-GM-002: Every implied covariance is symmetric positive-definite
#[test]
fn falsify_gm_002_covariances_spd() {
    let (x, _, _) = three_blobs();
    for style in STYLES {
        let fit = GaussianMixture::new(3, style)
            .with_seed(1)
            .fit_detailed(&x)
            .expect("fit succeeds");
        for j in 0..3 {
            let cov = fit.model.component_covariance(j);
            assert!(
                cov.is_symmetric(1e-12),
                "FALSIFIED GM-002: {style} component {j} not symmetric"
            );
            assert!(
                cov.cholesky().is_some(),
                "FALSIFIED GM-002: {style} component {j} not positive-definite"
            );
        }
    }
}

/// FALSIFY-GM-003: predict_proba rows sum to ~1.0 (responsibilities)
#[test]
fn falsify_gm_003_predict_proba_rows_sum_to_one() {
    let (x, _, _) = three_blobs();
    let fit = GaussianMixture::new(3, CovarianceType::Full)
        .with_seed(42)
        .fit_detailed(&x)
        .expect("fit succeeds");

    for (name, resp) in [
        ("training", fit.responsibilities.clone()),
        ("predict_proba", fit.model.predict_proba(&x).expect("same features")),
    ] {
        for (i, row) in resp.rows().enumerate() {
            let sum: f64 = row.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "FALSIFIED GM-003: {name} row {i} sums to {sum}"
            );
        }
    }
}

/// FALSIFY-GM-004: Log-likelihood never decreases when nothing was reinitialised
#[test]
fn falsify_gm_004_log_likelihood_monotone() {
    let (x, _, _) = three_blobs();
    for style in STYLES {
        let fit = GaussianMixture::new(3, style)
            .with_init(GmmInit::Random)
            .with_tol(1e-8)
            .with_seed(5)
            .fit_detailed(&x)
            .expect("fit succeeds");
        if !fit.warnings.is_empty() {
            continue;
        }
        for (t, w) in fit.log_likelihood_history.windows(2).enumerate() {
            assert!(
                w[1] >= w[0] - 1e-4 * w[0].abs().max(1.0),
                "FALSIFIED GM-004: {style} LL dropped at step {t}: {} -> {}",
                w[0],
                w[1]
            );
        }
    }
}

/// FALSIFY-GM-005: k = 1 reproduces the closed-form mean and covariance
#[test]
fn falsify_gm_005_single_component_closed_form() {
    let (x, _, _) = three_blobs();
    let reg = 1e-3;
    let fit = GaussianMixture::new(1, CovarianceType::Full)
        .with_reg_covar(reg)
        .fit_detailed(&x)
        .expect("fit succeeds");

    let mean = x.column_means();
    for (a, b) in fit.model.means().row(0).iter().zip(&mean) {
        assert!((a - b).abs() < 1e-9, "FALSIFIED GM-005: mean {a} != {b}");
    }

    let mut expected = cov_matrix(&x).expect("non-empty");
    expected.add_to_diagonal(reg);
    let cov = fit.model.component_covariance(0);
    for (a, b) in cov.as_slice().iter().zip(expected.as_slice()) {
        assert!((a - b).abs() < 1e-9, "FALSIFIED GM-005: covariance {a} != {b}");
    }
    assert!(fit.converged(), "FALSIFIED GM-005: k=1 did not converge");
}

/// FALSIFY-GM-006: Three well-separated blobs are recovered
#[test]
fn falsify_gm_006_recovers_separated_blobs() {
    let (x, truth, centers) = three_blobs();
    let fit = GaussianMixture::new(3, CovarianceType::Full)
        .with_seed(42)
        .fit_detailed(&x)
        .expect("fit succeeds");

    for center in &centers {
        let nearest = (0..3)
            .map(|j| {
                let m = fit.model.means().row(j);
                ((m[0] - center[0]).powi(2) + (m[1] - center[1]).powi(2)).sqrt()
            })
            .fold(f64::INFINITY, f64::min);
        assert!(
            nearest < 0.5,
            "FALSIFIED GM-006: no mean within 0.5 of {center:?} (closest {nearest})"
        );
    }

    let agreement = agreement_up_to_permutation(&truth, &fit.labels());
    assert!(
        agreement >= 0.95,
        "FALSIFIED GM-006: label agreement {agreement}, expected >= 0.95"
    );
}

/// FALSIFY-GM-007: BIC over k in 1..=2k* is minimised at k*
#[test]
fn falsify_gm_007_bic_selects_true_k() {
    let (x, _, _) = three_blobs();
    let options = GmmOptions {
        seed: 42,
        ..Default::default()
    };
    let report = select_n_components(&x, &[1, 2, 3, 4, 5, 6], &options, InformationCriterion::Bic)
        .expect("all candidates fit");
    let bics: Vec<f64> = report.candidates.iter().map(|c| c.bic).collect();
    assert_eq!(
        report.best_n_components(),
        3,
        "FALSIFIED GM-007: BIC chose k={} ({bics:?})",
        report.best_n_components()
    );
}

/// FALSIFY-GM-008: A component left empty by initialisation is reinitialised
#[test]
fn falsify_gm_008_empty_component_reinitialised() {
    // k-means puts every duplicate point in the first cluster
    let x = Matrix::<f64>::from_rows(&vec![vec![1.0, 1.0]; 12]).expect("rectangular");

    let mut gmm = GaussianMixture::new(3, CovarianceType::Diagonal).with_seed(0);
    let fit = gmm.fit_detailed(&x).expect("recoverable");
    gmm.fit(&x).expect("recoverable");

    assert!(
        fit.warnings.iter().any(|w| matches!(
            w,
            FitWarning::ComponentReinitialized {
                reason: DegeneracyReason::Collapsed,
                iteration: 0,
                ..
            }
        )),
        "FALSIFIED GM-008: no reinitialisation recorded ({:?})",
        fit.warnings
    );
    let model = &fit.model;
    assert!(
        model.weights().iter().all(|w| w.is_finite() && *w > 0.0),
        "FALSIFIED GM-008: weights {:?}",
        model.weights()
    );
    assert!(model.means().is_finite(), "FALSIFIED GM-008: NaN in means");
    assert!(
        fit.log_likelihood_history.iter().all(|ll| !ll.is_nan()),
        "FALSIFIED GM-008: NaN log-likelihood"
    );
    assert_eq!(gmm.warnings(), fit.warnings.as_slice());
}

/// FALSIFY-GM-009: predict is the arg-max of predict_proba
#[test]
fn falsify_gm_009_predict_is_argmax() {
    let (x, _, _) = three_blobs();
    let mut gmm = GaussianMixture::new(3, CovarianceType::Tied).with_seed(3);
    gmm.fit(&x).expect("fit succeeds");
    let labels = gmm.predict(&x).expect("fitted");
    let proba = gmm.predict_proba(&x).expect("fitted");

    for (i, row) in proba.rows().enumerate() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(
            row[labels[i]], max,
            "FALSIFIED GM-009: row {i} label {} is not the arg-max",
            labels[i]
        );
    }
}

/// FALSIFY-GM-010: Feature count mismatch is a shape error, not a panic
#[test]
fn falsify_gm_010_feature_mismatch() {
    let (x, _, _) = three_blobs();
    let mut gmm = GaussianMixture::new(3, CovarianceType::Spherical);
    gmm.fit(&x).expect("fit succeeds");
    let wrong = Matrix::<f64>::from_vec(2, 3, vec![0.0; 6]).expect("valid");
    assert!(
        matches!(gmm.predict(&wrong), Err(GaussMixError::InvalidShape { .. })),
        "FALSIFIED GM-010: mismatched features not rejected"
    );
}

/// FALSIFY-GM-011: Too few samples for the covariance style is a shape error
#[test]
fn falsify_gm_011_min_samples() {
    let x = Matrix::<f64>::from_vec(3, 2, vec![0.0, 0.0, 1.0, 1.0, 2.0, 0.5]).expect("valid");
    let err = GaussianMixture::new(2, CovarianceType::Full)
        .fit_detailed(&x)
        .expect_err("3 samples cannot support 2 full components in 2D");
    assert!(
        matches!(err, GaussMixError::InvalidShape { .. }),
        "FALSIFIED GM-011: got {err:?}"
    );
}

/// FALSIFY-GM-012: A zero-variance component is reinitialised, not kept
#[test]
fn falsify_gm_012_singular_component_reinitialised() {
    // k-means isolates the three zeros; their spherical variance is exactly 0
    let x = Matrix::<f64>::from_vec(6, 1, vec![0.0, 0.0, 0.0, 10.0, 11.0, 12.0]).expect("valid");
    let fit = GaussianMixture::new(2, CovarianceType::Spherical)
        .with_reg_covar(0.0)
        .with_max_iter(2)
        .with_seed(0)
        .fit_detailed(&x)
        .expect("recoverable");

    assert!(
        fit.warnings.iter().any(|w| matches!(
            w,
            FitWarning::ComponentReinitialized {
                reason: DegeneracyReason::SingularCovariance,
                iteration: 0,
                ..
            }
        )),
        "FALSIFIED GM-012: no singular-covariance reinitialisation ({:?})",
        fit.warnings
    );
    let sum: f64 = fit.model.weights().iter().sum();
    assert!(
        (sum - 1.0).abs() < 1e-9 && fit.model.weights().iter().all(|w| w.is_finite() && *w > 0.0),
        "FALSIFIED GM-012: weights {:?}",
        fit.model.weights()
    );
    assert!(fit.model.means().is_finite(), "FALSIFIED GM-012: non-finite means");
    for j in 0..2 {
        let var = fit.model.component_covariance(j).get(0, 0);
        assert!(
            var.is_finite() && var > 0.0,
            "FALSIFIED GM-012: component {j} variance {var}"
        );
    }
    assert!(
        fit.log_likelihood.is_finite(),
        "FALSIFIED GM-012: log-likelihood {}",
        fit.log_likelihood
    );
}

/// FALSIFY-GM-013: Constant data without regularisation exhausts the reinit budget
#[test]
fn falsify_gm_013_unrecoverable_degeneracy() {
    let x = Matrix::<f64>::from_vec(4, 1, vec![1.0; 4]).expect("valid");
    for style in [CovarianceType::Full, CovarianceType::Tied] {
        let err = GaussianMixture::new(1, style)
            .with_reg_covar(0.0)
            .with_max_reinit(3)
            .fit_detailed(&x)
            .expect_err("every covariance is singular");
        assert!(
            matches!(err, GaussMixError::NumericalDegeneracy { retries: 3, .. }),
            "FALSIFIED GM-013: {style} gave {err:?}"
        );
    }
}
