//! The linear-Gaussian regression model: likelihood, posterior density, and
//! the change of variables the sampler works in.

use ndarray::{array, Array1};

use crate::data::{Dataset, PredictorEncoding};
use crate::error::Result;
use crate::math::{logistic, logit, softplus};
use crate::priors::Priors;

/// Number of free parameters (intercept, slope, sigma).
pub const N_PARAMS: usize = 3;

/// One joint value of the regression parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Outcome at predictor = 0 in the model's encoding.
    pub intercept: f64,
    /// Change in outcome per unit predictor.
    pub slope: f64,
    /// Residual standard deviation.
    pub sigma: f64,
}

/// Outcome ~ Normal(intercept + slope * x, sigma) for one dataset under one
/// predictor encoding.
pub struct LinearGaussianModel<'a> {
    data: &'a Dataset,
    encoding: PredictorEncoding,
    priors: Priors,
}

impl<'a> LinearGaussianModel<'a> {
    /// Binds the dataset, encoding and (validated) priors.
    pub fn new(data: &'a Dataset, encoding: PredictorEncoding, priors: Priors) -> Result<Self> {
        priors.validate()?;
        Ok(Self {
            data,
            encoding,
            priors,
        })
    }

    /// Observed data.
    pub fn data(&self) -> &Dataset {
        self.data
    }

    /// Predictor encoding used by the mean function.
    pub fn encoding(&self) -> PredictorEncoding {
        self.encoding
    }

    /// Priors of the model.
    pub fn priors(&self) -> &Priors {
        &self.priors
    }

    /// Gaussian log-likelihood of the outcome given `params`.
    pub fn log_likelihood(&self, params: &Params) -> f64 {
        if !(params.sigma > 0.0) {
            return f64::NEG_INFINITY;
        }
        let x = self.data.predictor(self.encoding);
        let y = self.data.outcome();
        let n = y.len() as f64;

        let sum_sq: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| {
                let r = yi - (params.intercept + params.slope * xi);
                r * r
            })
            .sum();

        -n * (params.sigma.ln() + 0.5 * (2.0 * std::f64::consts::PI).ln())
            - sum_sq / (2.0 * params.sigma * params.sigma)
    }

    /// Unnormalized log posterior density of `params`.
    pub fn log_posterior(&self, params: &Params) -> f64 {
        let lp = self
            .priors
            .ln_pdf(params.intercept, params.slope, params.sigma);
        if !lp.is_finite() {
            return f64::NEG_INFINITY;
        }
        lp + self.log_likelihood(params)
    }

    /// Maps an unconstrained point `(intercept, ln slope, logit of the
    /// rescaled sigma)` to model parameters.
    pub fn constrain(&self, theta: &Array1<f64>) -> Params {
        let bounds = self.priors.sigma;
        Params {
            intercept: theta[0],
            slope: theta[1].exp(),
            sigma: bounds.lower + (bounds.upper - bounds.lower) * logistic(theta[2]),
        }
    }

    /// Inverse of [`LinearGaussianModel::constrain`]. `slope` must be
    /// positive and `sigma` strictly inside the prior bounds.
    pub fn unconstrain(&self, params: &Params) -> Array1<f64> {
        let bounds = self.priors.sigma;
        let p = (params.sigma - bounds.lower) / (bounds.upper - bounds.lower);
        array![params.intercept, params.slope.ln(), logit(p)]
    }

    /// Log posterior on the unconstrained space, including the log-Jacobian
    /// of [`LinearGaussianModel::constrain`].
    pub fn log_density(&self, theta: &Array1<f64>) -> f64 {
        if theta.iter().any(|v| !v.is_finite()) {
            return f64::NEG_INFINITY;
        }
        let params = self.constrain(theta);
        let bounds = self.priors.sigma;
        // d slope / d u = slope, d sigma / d v = (upper - lower) * s * (1 - s)
        let log_jacobian = theta[1] + (bounds.upper - bounds.lower).ln()
            - softplus(-theta[2])
            - softplus(theta[2]);
        self.log_posterior(&params) + log_jacobian
    }

    /// Least-squares point estimate clipped into the prior support. Used as
    /// the starting point of the chains.
    pub fn initial_params(&self) -> Params {
        let x = self.data.predictor(self.encoding);
        let y = self.data.outcome();
        let n = y.len() as f64;
        let x_mean = x.sum() / n;
        let y_mean = y.sum() / n;

        let sxx: f64 = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum();
        let sxy: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
            .sum();

        let prior_median_slope = self.priors.slope.location.exp();
        let slope = if sxx > 0.0 && sxy > 0.0 {
            sxy / sxx
        } else {
            prior_median_slope
        };
        let intercept = y_mean - slope * x_mean;

        let rss: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| (yi - intercept - slope * xi).powi(2))
            .sum();
        let bounds = self.priors.sigma;
        let width = bounds.upper - bounds.lower;
        let sigma = (rss / n)
            .sqrt()
            .clamp(bounds.lower + 0.01 * width, bounds.upper - 0.01 * width);

        Params {
            intercept,
            slope,
            sigma,
        }
    }
}
