//! K-Means clustering algorithm.
//!
//! Uses Lloyd's algorithm with seeded k-means++ initialization. The mixture
//! fitter uses it to build its initial partition.

use crate::error::{GaussMixError, Result};
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const DEFAULT_SEED: u64 = 42;

/// K-Means clustering algorithm.
///
/// # Algorithm
///
/// 1. Initialize centroids using k-means++ (D² sampling)
/// 2. Assign each sample to nearest centroid
/// 3. Update centroids as mean of assigned samples
/// 4. Repeat until centroid shift falls below `tol` or `max_iter` is hit
///
/// # Examples
///
/// ```
/// use gaussmix::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     1.0, 2.0,
///     1.5, 1.8,
///     5.0, 8.0,
///     8.0, 8.0,
///     1.0, 0.6,
///     9.0, 11.0,
/// ]).expect("Valid matrix dimensions and data length");
///
/// let mut kmeans = KMeans::new(2).with_random_state(7);
/// kmeans.fit(&data).expect("Fit succeeds with valid data");
///
/// let labels = kmeans.predict(&data).expect("model is fitted");
/// assert_eq!(labels.len(), 6);
/// ```
///
/// # Performance
///
/// - Time complexity: O(nkdi) where n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(nk)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on centroid movement.
    tol: f64,
    /// Random seed for initialization.
    random_state: Option<u64>,
    /// Cluster centroids after fitting.
    centroids: Option<Matrix<f64>>,
    /// Labels for training data.
    labels: Option<Vec<usize>>,
    /// Sum of squared distances (inertia).
    inertia: f64,
    /// Number of iterations run.
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Returns the cluster centroids.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::NotFitted`] before `fit()`.
    pub fn centroids(&self) -> Result<&Matrix<f64>> {
        self.centroids.as_ref().ok_or(GaussMixError::NotFitted)
    }

    /// Returns the training labels.
    ///
    /// # Errors
    ///
    /// Returns [`GaussMixError::NotFitted`] before `fit()`.
    pub fn labels(&self) -> Result<&[usize]> {
        self.labels.as_deref().ok_or(GaussMixError::NotFitted)
    }

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    /// Initializes centroids with k-means++: each new centroid is drawn with
    /// probability proportional to its squared distance to the nearest one
    /// already chosen.
    fn kmeans_plusplus_init(&self, x: &Matrix<f64>, rng: &mut StdRng) -> Matrix<f64> {
        let (n_samples, n_features) = x.shape();
        let mut centroids = Matrix::zeros(self.n_clusters, n_features);

        let first_idx = rng.gen_range(0..n_samples);
        centroids.row_mut(0).copy_from_slice(x.row(first_idx));

        let mut min_distances: Vec<f64> = x
            .rows()
            .map(|row| squared_distance(row, x.row(first_idx)))
            .collect();

        for c in 1..self.n_clusters {
            // All points coinciding with a centroid leave no weight; go uniform.
            let next_idx = match WeightedIndex::new(&min_distances) {
                Ok(d2) => d2.sample(rng),
                Err(_) => rng.gen_range(0..n_samples),
            };

            let new_centroid = x.row(next_idx);
            centroids.row_mut(c).copy_from_slice(new_centroid);
            for (dist, row) in min_distances.iter_mut().zip(x.rows()) {
                *dist = dist.min(squared_distance(row, new_centroid));
            }
        }

        centroids
    }

    /// Assigns each sample to the nearest centroid.
    fn assign_labels(&self, x: &Matrix<f64>, centroids: &Matrix<f64>) -> Vec<usize> {
        x.rows()
            .map(|point| nearest_centroid(point, centroids).0)
            .collect()
    }

    /// Updates centroids as the mean of assigned samples. Empty clusters keep
    /// their previous centroid.
    fn update_centroids(
        &self,
        x: &Matrix<f64>,
        labels: &[usize],
        previous: &Matrix<f64>,
    ) -> Matrix<f64> {
        let n_features = x.n_cols();
        let mut new_centroids = Matrix::zeros(self.n_clusters, n_features);
        let mut counts = vec![0usize; self.n_clusters];

        for (point, &label) in x.rows().zip(labels) {
            counts[label] += 1;
            for (c, &v) in new_centroids.row_mut(label).iter_mut().zip(point) {
                *c += v;
            }
        }

        for (k, &count) in counts.iter().enumerate() {
            let row = new_centroids.row_mut(k);
            if count > 0 {
                row.iter_mut().for_each(|c| *c /= count as f64);
            } else {
                row.copy_from_slice(previous.row(k));
            }
        }

        new_centroids
    }

    /// Checks if centroids have converged.
    fn centroids_converged(&self, old: &Matrix<f64>, new: &Matrix<f64>) -> bool {
        old.rows()
            .zip(new.rows())
            .all(|(a, b)| squared_distance(a, b) <= self.tol * self.tol)
    }
}

impl UnsupervisedEstimator for KMeans {
    type Labels = Vec<usize>;

    /// Fits the K-Means model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `n_clusters` is zero
    /// - Data is empty
    /// - Data has fewer samples than clusters
    fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
        let n_samples = x.n_rows();

        if self.n_clusters == 0 {
            return Err(GaussMixError::invalid_parameter("n_clusters", 0, ">= 1"));
        }
        if n_samples == 0 || x.n_cols() == 0 {
            return Err(GaussMixError::InvalidShape {
                context: "k-means input".to_string(),
                expected: "non-empty matrix".to_string(),
                actual: format!("{}x{}", n_samples, x.n_cols()),
            });
        }
        if n_samples < self.n_clusters {
            return Err(GaussMixError::dimension_mismatch(
                "k-means samples (>= n_clusters)",
                self.n_clusters,
                n_samples,
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(DEFAULT_SEED));
        let mut centroids = self.kmeans_plusplus_init(x, &mut rng);
        let mut labels = self.assign_labels(x, &centroids);
        self.n_iter = 0;

        for iter in 0..self.max_iter {
            let new_centroids = self.update_centroids(x, &labels, &centroids);
            let converged = self.centroids_converged(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = self.assign_labels(x, &centroids);
            self.n_iter = iter + 1;
            if converged {
                break;
            }
        }

        self.inertia = x
            .rows()
            .zip(&labels)
            .map(|(point, &label)| squared_distance(point, centroids.row(label)))
            .sum();
        self.labels = Some(labels);
        self.centroids = Some(centroids);

        Ok(())
    }

    /// Predicts cluster labels for new data.
    fn predict(&self, x: &Matrix<f64>) -> Result<Vec<usize>> {
        let centroids = self.centroids()?;
        if x.n_cols() != centroids.n_cols() {
            return Err(GaussMixError::dimension_mismatch(
                "n_features",
                centroids.n_cols(),
                x.n_cols(),
            ));
        }
        Ok(self.assign_labels(x, centroids))
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(point: &[f64], centroids: &Matrix<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (k, centroid) in centroids.rows().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (k, dist);
        }
    }
    best
}
