//! Small numerical helpers used by the sampler and the summaries.

use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array1, Array2};
use statrs::statistics::{Data, OrderStatistics};

/// Running mean and covariance of a stream of vectors (Welford's algorithm).
#[derive(Debug, Clone)]
pub struct RunningCovariance {
    count: usize,
    mean: Array1<f64>,
    // Sum of outer products of deviations from the running mean.
    m2: Array2<f64>,
}

impl RunningCovariance {
    /// Creates an empty accumulator for `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self {
            count: 0,
            mean: Array1::zeros(dim),
            m2: Array2::zeros((dim, dim)),
        }
    }

    /// Adds one observation.
    pub fn update(&mut self, x: &Array1<f64>) {
        self.count += 1;
        let delta = x - &self.mean;
        self.mean.scaled_add(1.0 / self.count as f64, &delta);
        let delta_after = x - &self.mean;
        let dim = self.mean.len();
        for i in 0..dim {
            for j in 0..dim {
                self.m2[[i, j]] += delta[i] * delta_after[j];
            }
        }
    }

    /// Number of observations seen so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Unbiased sample covariance, `None` with fewer than two observations.
    pub fn covariance(&self) -> Option<Array2<f64>> {
        if self.count < 2 {
            return None;
        }
        Some(&self.m2 / (self.count - 1) as f64)
    }

    /// Forgets every observation.
    pub fn reset(&mut self) {
        self.count = 0;
        self.mean.fill(0.0);
        self.m2.fill(0.0);
    }
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite
/// matrix, `None` if the matrix is not square or not positive definite.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let matrix = DMatrix::from_fn(n, n, |i, j| a[[i, j]]);
    let l = Cholesky::new(matrix)?.unpack();
    let factor = Array2::from_shape_fn((n, n), |(i, j)| l[(i, j)]);
    factor.iter().all(|v| v.is_finite()).then_some(factor)
}

/// `ln(1 + exp(x))` without overflow.
pub fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Logistic sigmoid `1 / (1 + exp(-x))`.
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`logistic`].
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Empirical quantiles of `values` at each probability in `taus`.
///
/// Returns `NaN` for every tau when `values` is empty.
pub fn quantiles(values: &[f64], taus: &[f64]) -> Vec<f64> {
    let mut data = Data::new(values.to_vec());
    taus.iter().map(|&tau| data.quantile(tau)).collect()
}

/// Lower and upper quantiles of an equal-tailed interval holding `mass`
/// of the probability.
pub fn central_interval(values: &[f64], mass: f64) -> (f64, f64) {
    let tail = (1.0 - mass) / 2.0;
    let q = quantiles(values, &[tail, 1.0 - tail]);
    (q[0], q[1])
}
