//   Copyright 2024 The PyMC Developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

#![warn(missing_docs)]

//! heatfit fits a Bayesian linear regression of a measured temperature on
//! a treatment duration. Intercept, slope and residual scale get Normal,
//! LogNormal and Uniform priors; the slope prior keeps the fitted process
//! heating-only. The posterior is sampled over several chains by an
//! adaptive Metropolis or a stretch-move ensemble MCMC sampler, and
//! posterior predictive intervals are obtained by pushing every posterior
//! draw through the Gaussian likelihood.
//!
//! The same pipeline fits the model with the raw or the mean-centered
//! predictor, so the two parameterizations can be compared directly.

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod posterior;
pub mod predictive;
pub mod priors;
#[cfg(feature = "python")]
mod python;
pub mod sampler;

pub use crate::config::Config;
pub use crate::data::{Dataset, Observation, PredictorEncoding};
pub use crate::error::{RegressionError, Result};
pub use crate::pipeline::{EncodingComparison, Pipeline, PipelineOutput};
pub use crate::posterior::{ParameterSummary, PosteriorSamples};
pub use crate::predictive::{PredictiveInterval, PredictiveSimulator};
pub use crate::priors::{PriorDraws, PriorSimulator, Priors};
pub use crate::sampler::{AdaptiveMetropolis, EnsembleSampler, PosteriorSampler, SamplerSettings};
