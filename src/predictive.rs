//! Posterior predictive simulation: Monte Carlo integration of the
//! Gaussian likelihood over the posterior draws.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{RegressionError, Result};
use crate::math::central_interval;
use crate::posterior::PosteriorSamples;

/// Pointwise interval of the predictive distribution at one predictor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictiveInterval {
    /// Query predictor value.
    pub predictor: f64,
    /// Lower percentile.
    pub lower: f64,
    /// Upper percentile.
    pub upper: f64,
}

impl PredictiveInterval {
    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Simulates outcomes from the posterior predictive distribution.
pub struct PredictiveSimulator<'a> {
    samples: &'a PosteriorSamples,
    mass: f64,
}

impl<'a> PredictiveSimulator<'a> {
    /// Creates a simulator over `samples` reporting intervals that hold
    /// `mass` of the predictive distribution (0.95 gives the 2.5th and
    /// 97.5th percentiles).
    pub fn new(samples: &'a PosteriorSamples, mass: f64) -> Result<Self> {
        if samples.is_empty() {
            return Err(RegressionError::DataError(
                "posterior sample set is empty".to_string(),
            ));
        }
        if !(mass > 0.0 && mass < 1.0) {
            return Err(RegressionError::invalid(
                "credible_mass",
                format!("must lie in (0, 1), got {mass}"),
            ));
        }
        Ok(Self { samples, mass })
    }

    /// One predicted outcome per posterior row at `query`:
    /// `intercept + slope * query + sigma * z` with `z ~ N(0, 1)`.
    pub fn draws<R: Rng>(&self, query: f64, rng: &mut R) -> Array1<f64> {
        self.samples
            .iter()
            .map(|p| {
                let z: f64 = rng.sample(StandardNormal);
                p.intercept + p.slope * query + p.sigma * z
            })
            .collect()
    }

    /// Posterior draws of the mean outcome at `query`, without residual noise.
    pub fn mean_draws(&self, query: f64) -> Array1<f64> {
        self.samples
            .iter()
            .map(|p| p.intercept + p.slope * query)
            .collect()
    }

    /// Predictive interval at a single query value.
    pub fn interval<R: Rng>(&self, query: f64, rng: &mut R) -> PredictiveInterval {
        let draws = self.draws(query, rng);
        self.summarize(query, &draws)
    }

    /// Predictive intervals for every query, in order, with one generator
    /// seeded by `seed` before the sweep.
    pub fn intervals(&self, queries: &[f64], seed: u64) -> Vec<PredictiveInterval> {
        let mut rng = StdRng::seed_from_u64(seed);
        queries
            .iter()
            .map(|&query| self.interval(query, &mut rng))
            .collect()
    }

    /// Intervals of the mean outcome (the band of posterior regression
    /// lines) for every query.
    pub fn mean_intervals(&self, queries: &[f64]) -> Vec<PredictiveInterval> {
        queries
            .iter()
            .map(|&query| self.summarize(query, &self.mean_draws(query)))
            .collect()
    }

    fn summarize(&self, query: f64, draws: &Array1<f64>) -> PredictiveInterval {
        let values = draws.to_vec();
        let (lower, upper) = central_interval(&values, self.mass);
        PredictiveInterval {
            predictor: query,
            lower,
            upper,
        }
    }
}
