//! Observed (predictor, outcome) pairs and the predictor encodings the
//! regression can be fit against.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegressionError, Result};

/// How the predictor enters the linear mean function.
///
/// Under `Raw` the intercept is the outcome at predictor = 0; under
/// `Centered` it is the outcome at the sample mean of the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PredictorEncoding {
    /// Predictor as observed.
    Raw,
    /// Predictor minus its sample mean.
    Centered,
}

impl PredictorEncoding {
    /// Both encodings, in the order the pipeline compares them.
    pub const ALL: [PredictorEncoding; 2] = [PredictorEncoding::Raw, PredictorEncoding::Centered];

    /// Lowercase name used in configuration and output file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictorEncoding::Raw => "raw",
            PredictorEncoding::Centered => "centered",
        }
    }
}

impl fmt::Display for PredictorEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictorEncoding {
    type Err = RegressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(PredictorEncoding::Raw),
            "centered" => Ok(PredictorEncoding::Centered),
            _ => Err(RegressionError::invalid(
                "predictor_encoding",
                format!("unknown encoding `{s}`, expected `raw` or `centered`"),
            )),
        }
    }
}

impl TryFrom<String> for PredictorEncoding {
    type Error = RegressionError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// A single observation: treatment duration and measured outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Predictor value (duration in seconds).
    pub predictor: f64,
    /// Outcome value (measured temperature).
    pub outcome: f64,
}

/// Container for the observed data.
///
/// The centered predictor is derived once at construction and never
/// changes afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    predictor: Array1<f64>,
    predictor_centered: Array1<f64>,
    predictor_mean: f64,
    outcome: Array1<f64>,
}

impl Dataset {
    /// Creates a new `Dataset` from paired predictor and outcome values.
    ///
    /// Fails with [`RegressionError::DataError`] if the inputs are empty,
    /// have different lengths, contain a non-finite (missing) value, or
    /// span a range too wide to center in `f64`.
    pub fn new(predictor: Vec<f64>, outcome: Vec<f64>) -> Result<Self> {
        if predictor.is_empty() || outcome.is_empty() {
            return Err(RegressionError::DataError(
                "observation collection is empty".to_string(),
            ));
        }
        if predictor.len() != outcome.len() {
            return Err(RegressionError::DataError(format!(
                "predictor has {} values but outcome has {}",
                predictor.len(),
                outcome.len()
            )));
        }
        if let Some(row) = predictor
            .iter()
            .zip(outcome.iter())
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(RegressionError::DataError(format!(
                "missing or non-finite value in row {row}"
            )));
        }

        let predictor = Array1::from(predictor);
        let outcome = Array1::from(outcome);
        // Scaling before summing keeps the mean finite for finite inputs.
        let n = predictor.len() as f64;
        let predictor_mean = predictor.iter().map(|x| x / n).sum::<f64>();
        let predictor_centered = predictor.mapv(|x| x - predictor_mean);
        if predictor_centered.iter().any(|x| !x.is_finite()) {
            return Err(RegressionError::DataError(
                "predictor values overflow when centered".to_string(),
            ));
        }

        Ok(Self {
            predictor,
            predictor_centered,
            predictor_mean,
            outcome,
        })
    }

    /// Creates a `Dataset` from a slice of observations.
    pub fn from_observations(observations: &[Observation]) -> Result<Self> {
        let (predictor, outcome) = observations
            .iter()
            .map(|obs| (obs.predictor, obs.outcome))
            .unzip();
        Self::new(predictor, outcome)
    }

    /// Loads observations from a CSV file with a header row, picking the
    /// predictor and outcome columns by name.
    ///
    /// Empty cells count as missing values and fail the whole load.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        predictor_column: &str,
        outcome_column: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let column_index = |name: &str| {
            headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
                RegressionError::DataError(format!(
                    "column `{name}` not found, available columns: {:?}",
                    headers.iter().collect::<Vec<_>>()
                ))
            })
        };
        let predictor_idx = column_index(predictor_column)?;
        let outcome_idx = column_index(outcome_column)?;

        let mut predictor = Vec::new();
        let mut outcome = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            predictor.push(parse_cell(record.get(predictor_idx), row, predictor_column)?);
            outcome.push(parse_cell(record.get(outcome_idx), row, outcome_column)?);
        }

        debug!(path = %path.display(), rows = predictor.len(), "loaded observations");
        Self::new(predictor, outcome)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.outcome.len()
    }

    /// Always `false` for a constructed `Dataset`.
    pub fn is_empty(&self) -> bool {
        self.outcome.is_empty()
    }

    /// Predictor values under the requested encoding.
    pub fn predictor(&self, encoding: PredictorEncoding) -> &Array1<f64> {
        match encoding {
            PredictorEncoding::Raw => &self.predictor,
            PredictorEncoding::Centered => &self.predictor_centered,
        }
    }

    /// Outcome values.
    pub fn outcome(&self) -> &Array1<f64> {
        &self.outcome
    }

    /// Sample mean of the raw predictor.
    pub fn predictor_mean(&self) -> f64 {
        self.predictor_mean
    }

    /// Smallest and largest raw predictor value.
    pub fn predictor_range(&self) -> (f64, f64) {
        self.predictor
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            })
    }

    /// Maps a real-world predictor value into the given encoding.
    pub fn encode(&self, value: f64, encoding: PredictorEncoding) -> f64 {
        match encoding {
            PredictorEncoding::Raw => value,
            PredictorEncoding::Centered => value - self.predictor_mean,
        }
    }

    /// Observations as (predictor, outcome) pairs in the raw encoding.
    pub fn observations(&self) -> Vec<Observation> {
        self.predictor
            .iter()
            .zip(self.outcome.iter())
            .map(|(&predictor, &outcome)| Observation { predictor, outcome })
            .collect()
    }
}

fn parse_cell(cell: Option<&str>, row: usize, column: &str) -> Result<f64> {
    let cell = cell.map(str::trim).unwrap_or_default();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") {
        return Err(RegressionError::DataError(format!(
            "missing value in column `{column}` at row {row}"
        )));
    }
    cell.parse::<f64>().map_err(|e| {
        RegressionError::DataError(format!(
            "cannot parse `{cell}` in column `{column}` at row {row}: {e}"
        ))
    })
}
