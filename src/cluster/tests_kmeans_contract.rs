// =========================================================================
// FALSIFY-KM: k-means initialiser contract (gaussmix cluster)
//
// The mixture fitter turns k-means labels into its first responsibility
// matrix, so labels must be valid indices and nearest-centroid consistent.
//
// References:
//   - Lloyd (1982) "Least Squares Quantization in PCM"
//   - Arthur & Vassilvitskii (2007) "k-means++: The Advantages of Careful Seeding"
// =========================================================================

use super::*;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;

/// FALSIFY-KM-001: Valid cluster indices: all labels in [0, K-1]
#[test]
fn falsify_km_001_valid_indices() {
    let data = Matrix::<f64>::from_vec(
        6,
        2,
        vec![1.0, 2.0, 1.5, 1.8, 5.0, 8.0, 8.0, 8.0, 1.0, 0.6, 9.0, 11.0],
    )
    .expect("valid matrix");

    let k = 3;
    let mut km = KMeans::new(k).with_random_state(42);
    km.fit(&data).expect("fit succeeds");

    let labels = km.predict(&data).expect("fitted");
    for (i, &label) in labels.iter().enumerate() {
        assert!(
            label < k,
            "FALSIFIED KM-001: label[{i}] = {label}, expected < {k}"
        );
    }
}

/// FALSIFY-KM-002: Nearest centroid assignment: each point assigned to closest
#[test]
fn falsify_km_002_nearest_centroid() {
    let data = Matrix::<f64>::from_vec(
        6,
        2,
        vec![
            0.0, 0.0, 0.1, 0.1, 0.2, 0.2, 10.0, 10.0, 10.1, 10.1, 10.2, 10.2,
        ],
    )
    .expect("valid matrix");

    let mut km = KMeans::new(2).with_random_state(42);
    km.fit(&data).expect("fit succeeds");

    let labels = km.predict(&data).expect("fitted");
    let centroids = km.centroids().expect("fitted");

    for (i, point) in data.rows().enumerate() {
        let dist = |c: usize| -> f64 {
            point
                .iter()
                .zip(centroids.row(c))
                .map(|(a, b)| (a - b) * (a - b))
                .sum()
        };
        let assigned = labels[i];
        for c in 0..2 {
            assert!(
                dist(assigned) <= dist(c) + 1e-12,
                "FALSIFIED KM-002: point[{i}] assigned to c={assigned} but c={c} is closer"
            );
        }
    }
}

/// FALSIFY-KM-003: K=1: all points in same cluster, centroid is mean
#[test]
fn falsify_km_003_single_cluster() {
    let data = Matrix::<f64>::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid matrix");

    let mut km = KMeans::new(1).with_random_state(42);
    km.fit(&data).expect("fit succeeds");

    let labels = km.predict(&data).expect("fitted");
    assert!(labels.iter().all(|&l| l == 0), "FALSIFIED KM-003: label != 0");

    let centroids = km.centroids().expect("fitted");
    assert!(
        (centroids.get(0, 0) - 3.0).abs() < 1e-12 && (centroids.get(0, 1) - 4.0).abs() < 1e-12,
        "FALSIFIED KM-003: centroid = {:?}, expected [3.0, 4.0]",
        centroids.row(0)
    );
}

/// FALSIFY-KM-004: Inertia equals the summed squared distance to assigned centroids
#[test]
fn falsify_km_004_inertia_matches_assignment() {
    let data =
        Matrix::<f64>::from_vec(4, 2, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).expect("valid matrix");

    let mut km = KMeans::new(2).with_random_state(5);
    km.fit(&data).expect("fit succeeds");

    let labels = km.labels().expect("fitted");
    let centroids = km.centroids().expect("fitted");
    let expected: f64 = data
        .rows()
        .zip(labels)
        .map(|(p, &l)| {
            p.iter()
                .zip(centroids.row(l))
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
        })
        .sum();

    assert!(
        (km.inertia() - expected).abs() < 1e-12,
        "FALSIFIED KM-004: inertia = {}, expected {expected}",
        km.inertia()
    );
}
