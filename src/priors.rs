//! Prior specifications for the intercept, slope and residual scale, and
//! the prior simulator used for prior predictive checks.
//!
//! Each prior family implements the `Prior` trait: it can be validated,
//! sampled (via `rand_distr`), and evaluated as a log density (via `statrs`).

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::{self as density, Continuous};
use tracing::debug;

use crate::error::{RegressionError, Result};

/// Interface shared by the prior families.
pub trait Prior {
    /// Checks the parameters, naming the prior as `name` in errors.
    fn validate(&self, name: &str) -> Result<()>;
    /// Draws one value from the prior.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;
    /// Log density of the prior at `x`. `-inf` outside the support.
    fn ln_pdf(&self, x: f64) -> f64;
}

/// Location-scale prior used for the intercept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPrior {
    /// Mean.
    pub location: f64,
    /// Standard deviation.
    pub scale: f64,
}

/// Prior with support on the positive reals, used for the slope. The
/// parameters are those of the underlying normal on the log scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormalPrior {
    /// Mean of `ln(x)`.
    pub location: f64,
    /// Standard deviation of `ln(x)`.
    pub scale: f64,
}

/// Bounded prior used for the residual scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformPrior {
    /// Lower bound (inclusive).
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

fn validate_location_scale(name: &str, location: f64, scale: f64) -> Result<()> {
    if !location.is_finite() {
        return Err(RegressionError::invalid(name, "location must be finite"));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(RegressionError::invalid(
            name,
            format!("scale must be finite and positive, got {scale}"),
        ));
    }
    Ok(())
}

impl Prior for NormalPrior {
    fn validate(&self, name: &str) -> Result<()> {
        validate_location_scale(name, self.location, self.scale)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(rand_distr::StandardNormal);
        self.location + self.scale * z
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        density::Normal::new(self.location, self.scale)
            .map(|d| d.ln_pdf(x))
            .unwrap_or(f64::NEG_INFINITY)
    }
}

impl Prior for LogNormalPrior {
    fn validate(&self, name: &str) -> Result<()> {
        validate_location_scale(name, self.location, self.scale)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(rand_distr::StandardNormal);
        (self.location + self.scale * z).exp()
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        density::LogNormal::new(self.location, self.scale)
            .map(|d| d.ln_pdf(x))
            .unwrap_or(f64::NEG_INFINITY)
    }
}

impl Prior for UniformPrior {
    fn validate(&self, name: &str) -> Result<()> {
        if !(self.lower.is_finite() && self.upper.is_finite()) {
            return Err(RegressionError::invalid(name, "bounds must be finite"));
        }
        if self.lower < 0.0 {
            return Err(RegressionError::invalid(
                name,
                format!("lower bound of a scale prior must be >= 0, got {}", self.lower),
            ));
        }
        if self.lower >= self.upper {
            return Err(RegressionError::invalid(
                name,
                format!(
                    "lower bound {} must be smaller than upper bound {}",
                    self.lower, self.upper
                ),
            ));
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rand_distr::Uniform::new(self.lower, self.upper).sample(rng)
    }

    fn ln_pdf(&self, x: f64) -> f64 {
        if x < self.lower || x > self.upper {
            return f64::NEG_INFINITY;
        }
        density::Uniform::new(self.lower, self.upper)
            .map(|d| d.ln_pdf(x))
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// The three priors of the regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    /// Prior over the intercept.
    pub intercept: NormalPrior,
    /// Prior over the slope; non-negative support.
    pub slope: LogNormalPrior,
    /// Prior over the residual standard deviation.
    pub sigma: UniformPrior,
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            intercept: NormalPrior {
                location: 75.0,
                scale: 15.0,
            },
            slope: LogNormalPrior {
                location: 0.0,
                scale: 0.8,
            },
            sigma: UniformPrior {
                lower: 0.0,
                upper: 50.0,
            },
        }
    }
}

impl Priors {
    /// Validates every prior.
    pub fn validate(&self) -> Result<()> {
        self.intercept.validate("prior_intercept")?;
        self.slope.validate("prior_slope")?;
        self.sigma.validate("prior_sigma")
    }

    /// Joint log prior density of one parameter triple.
    pub fn ln_pdf(&self, intercept: f64, slope: f64, sigma: f64) -> f64 {
        self.intercept.ln_pdf(intercept) + self.slope.ln_pdf(slope) + self.sigma.ln_pdf(sigma)
    }
}

/// Parameter draws taken from the priors alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorDraws {
    /// Intercept draws.
    pub intercept: Array1<f64>,
    /// Slope draws, all strictly positive.
    pub slope: Array1<f64>,
    /// Residual scale draws.
    pub sigma: Array1<f64>,
}

impl PriorDraws {
    /// Number of draws.
    pub fn len(&self) -> usize {
        self.intercept.len()
    }

    /// Whether no draws were taken.
    pub fn is_empty(&self) -> bool {
        self.intercept.is_empty()
    }

    /// Prior predictive regression lines: entry `(i, j)` is
    /// `intercept[i] + slope[i] * queries[j]`.
    pub fn predictive_lines(&self, queries: &[f64]) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), queries.len()), |(i, j)| {
            self.intercept[i] + self.slope[i] * queries[j]
        })
    }
}

/// Draws parameter triples from the priors before any data is seen.
pub struct PriorSimulator<'a> {
    priors: &'a Priors,
}

impl<'a> PriorSimulator<'a> {
    /// Creates a simulator over validated priors.
    pub fn new(priors: &'a Priors) -> Result<Self> {
        priors.validate()?;
        Ok(Self { priors })
    }

    /// Draws `n` values of each parameter with a generator seeded by `seed`.
    ///
    /// All intercepts are drawn first, then all slopes, then all sigmas, so
    /// the same `(n, seed)` always reproduces the same sequences. A negative
    /// `n` is rejected.
    pub fn simulate(&self, n: i64, seed: u64) -> Result<PriorDraws> {
        let n = usize::try_from(n).map_err(|_| {
            RegressionError::invalid("draw_count", format!("must be >= 0, got {n}"))
        })?;
        let mut rng = StdRng::seed_from_u64(seed);

        let intercept = Array1::from_iter((0..n).map(|_| self.priors.intercept.sample(&mut rng)));
        let slope = Array1::from_iter((0..n).map(|_| self.priors.slope.sample(&mut rng)));
        let sigma = Array1::from_iter((0..n).map(|_| self.priors.sigma.sample(&mut rng)));

        debug!(n, seed, "simulated prior draws");
        Ok(PriorDraws {
            intercept,
            slope,
            sigma,
        })
    }
}
