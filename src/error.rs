//! Error types shared by every stage of the regression pipeline.

use thiserror::Error;

/// Errors raised while configuring, loading data for, or running the
/// regression pipeline.
///
/// Every stage either returns a complete result or one of these errors;
/// there is no partially filled output.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// A configuration value or call argument violates its contract.
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        param: String,
        /// Constraint that was violated.
        reason: String,
    },

    /// Observations are empty, missing values, or have mismatched lengths.
    #[error("data error: {0}")]
    DataError(String),

    /// A Markov chain could not produce a valid set of posterior draws.
    #[error("sampling failure in chain {chain}: {reason}")]
    SamplingFailure {
        /// Index of the failing chain.
        chain: usize,
        /// What went wrong.
        reason: String,
    },

    /// I/O error while reading or writing tables.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed CSV while reading or writing tables.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Malformed JSON configuration.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RegressionError {
    /// Shorthand for [`RegressionError::InvalidArgument`].
    pub fn invalid(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`RegressionError::SamplingFailure`].
    pub fn sampling(chain: usize, reason: impl Into<String>) -> Self {
        Self::SamplingFailure {
            chain,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = RegressionError> = std::result::Result<T, E>;
