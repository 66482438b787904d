//! Initial responsibilities for the first M-step.

use super::options::GmmInit;
use crate::cluster::KMeans;
use crate::error::Result;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use rand::rngs::StdRng;
use rand::Rng;

/// Builds an `n × k` responsibility matrix from which the first parameter
/// estimate is computed.
pub(crate) fn initial_responsibilities(
    x: &Matrix<f64>,
    n_components: usize,
    init: GmmInit,
    rng: &mut StdRng,
) -> Result<Matrix<f64>> {
    let n_samples = x.n_rows();
    let mut resp = Matrix::zeros(n_samples, n_components);

    match init {
        GmmInit::KMeans => {
            let mut kmeans = KMeans::new(n_components).with_random_state(rng.gen());
            kmeans.fit(x)?;
            for (i, &label) in kmeans.labels()?.iter().enumerate() {
                resp.set(i, label, 1.0);
            }
        }
        GmmInit::Random => {
            for i in 0..n_samples {
                let row = resp.row_mut(i);
                row.iter_mut().for_each(|r| *r = rng.gen::<f64>() + f64::EPSILON);
                let total: f64 = row.iter().sum();
                row.iter_mut().for_each(|r| *r /= total);
            }
        }
    }

    Ok(resp)
}
