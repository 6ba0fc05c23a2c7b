//! Pipeline configuration.
//!
//! One `Config` value is threaded explicitly through every stage; nothing
//! reads global state. Counts are kept signed so that negative values
//! coming from a file or the command line are reported as
//! `InvalidArgument` rather than failing to parse.

use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, PredictorEncoding};
use crate::error::{RegressionError, Result};
use crate::priors::{LogNormalPrior, NormalPrior, Priors, UniformPrior};
use crate::sampler::SamplerSettings;

/// Offset between the seeds of consecutive pipeline stages.
pub const STAGE_STRIDE: u64 = 0xD1B5_4A32_D192_ED03;

/// Every recognized option of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seed of every pseudo-random draw. Prior simulation, posterior
    /// sampling and predictive simulation each derive their own stream
    /// from it.
    pub seed: u64,
    /// Number of prior simulation draws.
    pub draw_count: i64,
    /// Number of MCMC chains.
    pub chains: i64,
    /// Discarded iterations per chain.
    pub warmup_iters: i64,
    /// Total iterations per chain, warm-up included.
    pub total_iters: i64,
    /// Encoding of the predictor in the mean function.
    pub predictor_encoding: PredictorEncoding,
    /// Intercept prior (location, scale).
    pub prior_intercept: NormalPrior,
    /// Slope prior (location, scale of the log-scale normal).
    pub prior_slope: LogNormalPrior,
    /// Sigma prior (lower, upper bound).
    pub prior_sigma: UniformPrior,
    /// Probability mass of credible and predictive intervals.
    pub credible_mass: f64,
    /// Number of evenly spaced predictor values queried for intervals.
    pub query_points: i64,
    /// Range of queried predictor values; the observed range if unset.
    pub query_range: Option<(f64, f64)>,
    /// Largest R-hat accepted without a warning.
    pub max_r_hat: f64,
    /// Name of the predictor column in the input CSV.
    pub predictor_column: String,
    /// Name of the outcome column in the input CSV.
    pub outcome_column: String,
}

impl Default for Config {
    fn default() -> Self {
        let priors = Priors::default();
        Self {
            seed: 1999,
            draw_count: 150,
            chains: 4,
            warmup_iters: 3000,
            total_iters: 4000,
            predictor_encoding: PredictorEncoding::Centered,
            prior_intercept: priors.intercept,
            prior_slope: priors.slope,
            prior_sigma: priors.sigma,
            credible_mass: 0.95,
            query_points: 30,
            query_range: None,
            max_r_hat: 1.05,
            predictor_column: "duration".to_string(),
            outcome_column: "temperature".to_string(),
        }
    }
}

impl Config {
    /// Parses a JSON configuration; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(encoding) = value.get("predictor_encoding").and_then(|v| v.as_str()) {
            encoding.parse::<PredictorEncoding>()?;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks every option against its contract.
    pub fn validate(&self) -> Result<()> {
        if self.draw_count < 0 {
            return Err(RegressionError::invalid(
                "draw_count",
                format!("must be >= 0, got {}", self.draw_count),
            ));
        }
        self.sampler_settings()?;
        self.priors().validate()?;
        if !(self.credible_mass > 0.0 && self.credible_mass < 1.0) {
            return Err(RegressionError::invalid(
                "credible_mass",
                format!("must lie in (0, 1), got {}", self.credible_mass),
            ));
        }
        if self.query_points < 0 {
            return Err(RegressionError::invalid(
                "query_points",
                format!("must be >= 0, got {}", self.query_points),
            ));
        }
        if let Some((lo, hi)) = self.query_range {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(RegressionError::invalid(
                    "query_range",
                    format!("expected finite bounds with lower <= upper, got ({lo}, {hi})"),
                ));
            }
        }
        if !(self.max_r_hat >= 1.0) {
            return Err(RegressionError::invalid(
                "max_r_hat",
                format!("must be >= 1, got {}", self.max_r_hat),
            ));
        }
        Ok(())
    }

    /// The three priors.
    pub fn priors(&self) -> Priors {
        Priors {
            intercept: self.prior_intercept,
            slope: self.prior_slope,
            sigma: self.prior_sigma,
        }
    }

    /// Validated chain layout.
    pub fn sampler_settings(&self) -> Result<SamplerSettings> {
        SamplerSettings::new(
            self.chains,
            self.warmup_iters,
            self.total_iters,
            self.sampler_seed(),
        )
    }

    /// Seed of the prior simulation stage.
    pub fn prior_seed(&self) -> u64 {
        self.seed
    }

    /// Seed of chain 0 of the posterior sampler; later chains are offset
    /// from it by [`SEED_STRIDE`](crate::sampler::SEED_STRIDE).
    pub fn sampler_seed(&self) -> u64 {
        self.seed.wrapping_add(STAGE_STRIDE)
    }

    /// Seed of the posterior predictive sweep.
    pub fn predictive_seed(&self) -> u64 {
        self.seed.wrapping_add(STAGE_STRIDE.wrapping_mul(2))
    }

    /// Evenly spaced real-world predictor values to query, spanning
    /// `query_range` or the observed predictor range.
    pub fn query_grid(&self, data: &Dataset) -> Vec<f64> {
        let (lo, hi) = self.query_range.unwrap_or_else(|| data.predictor_range());
        match usize::try_from(self.query_points).unwrap_or(0) {
            0 => Vec::new(),
            1 => vec![lo],
            n => Array1::linspace(lo, hi, n).to_vec(),
        }
    }
}
