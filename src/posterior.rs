//! Posterior sample sets: storage, sub-ranges, summaries and the CSV table
//! format shared with external plotting tools.

use std::ops::Range;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{ConvergenceReport, ParameterDiagnostics};
use crate::error::{RegressionError, Result};
use crate::math::central_interval;
use crate::model::Params;

/// One row of the posterior table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorRow {
    /// Chain the draw came from.
    pub chain: usize,
    /// Index of the draw within its chain.
    pub draw: usize,
    /// Intercept draw.
    pub intercept: f64,
    /// Slope draw.
    pub slope: f64,
    /// Sigma draw.
    pub sigma: f64,
}

/// Joint posterior draws of (intercept, slope, sigma).
///
/// Draws are stored chain-major: the retained draws of chain 0 come first,
/// then those of chain 1, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSamples {
    intercept: Array1<f64>,
    slope: Array1<f64>,
    sigma: Array1<f64>,
    chains: usize,
    draws_per_chain: usize,
}

impl PosteriorSamples {
    /// Concatenates per-chain draws. Every chain must hold the same number
    /// of draws, and every draw must be finite with a non-negative sigma.
    pub fn from_chains(chains: Vec<Vec<Params>>) -> Result<Self> {
        let n_chains = chains.len();
        let draws_per_chain = chains.first().map_or(0, Vec::len);
        if chains.iter().any(|c| c.len() != draws_per_chain) {
            return Err(RegressionError::DataError(
                "chains hold different numbers of draws".to_string(),
            ));
        }

        let rows = chains.iter().flatten();
        let samples = Self {
            intercept: rows.clone().map(|p| p.intercept).collect(),
            slope: rows.clone().map(|p| p.slope).collect(),
            sigma: rows.map(|p| p.sigma).collect(),
            chains: n_chains,
            draws_per_chain,
        };
        samples.check_draws()?;
        Ok(samples)
    }

    /// Builds a single-chain sample set from parameter columns.
    ///
    /// Fails with [`RegressionError::DataError`] on mismatched lengths, a
    /// non-finite value, or a negative sigma.
    pub fn from_columns(intercept: Vec<f64>, slope: Vec<f64>, sigma: Vec<f64>) -> Result<Self> {
        let n = intercept.len();
        if slope.len() != n || sigma.len() != n {
            return Err(RegressionError::DataError(format!(
                "posterior columns have lengths {}, {}, {}",
                n,
                slope.len(),
                sigma.len()
            )));
        }
        let samples = Self {
            intercept: Array1::from(intercept),
            slope: Array1::from(slope),
            sigma: Array1::from(sigma),
            chains: usize::from(n > 0),
            draws_per_chain: n,
        };
        samples.check_draws()?;
        Ok(samples)
    }

    /// Every draw must be finite, with a non-negative sigma.
    fn check_draws(&self) -> Result<()> {
        match self.iter().position(|p| !is_valid_draw(&p)) {
            Some(row) => Err(RegressionError::DataError(format!(
                "posterior row {row} is not finite or has a negative sigma"
            ))),
            None => Ok(()),
        }
    }

    /// Total number of draws.
    pub fn len(&self) -> usize {
        self.intercept.len()
    }

    /// Whether the set holds no draws.
    pub fn is_empty(&self) -> bool {
        self.intercept.is_empty()
    }

    /// Number of chains.
    pub fn chains(&self) -> usize {
        self.chains
    }

    /// Number of retained draws per chain.
    pub fn draws_per_chain(&self) -> usize {
        self.draws_per_chain
    }

    /// Intercept draws.
    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    /// Slope draws.
    pub fn slope(&self) -> &Array1<f64> {
        &self.slope
    }

    /// Sigma draws.
    pub fn sigma(&self) -> &Array1<f64> {
        &self.sigma
    }

    /// Parameters of row `i`.
    pub fn get(&self, i: usize) -> Option<Params> {
        (i < self.len()).then(|| Params {
            intercept: self.intercept[i],
            slope: self.slope[i],
            sigma: self.sigma[i],
        })
    }

    /// Iterates the rows in storage order.
    pub fn iter(&self) -> impl Iterator<Item = Params> + '_ {
        self.intercept
            .iter()
            .zip(self.slope.iter())
            .zip(self.sigma.iter())
            .map(|((&intercept, &slope), &sigma)| Params {
                intercept,
                slope,
                sigma,
            })
    }

    /// Copies a contiguous range of rows into a new single-chain set.
    pub fn range(&self, rows: Range<usize>) -> Result<Self> {
        if rows.start > rows.end || rows.end > self.len() {
            return Err(RegressionError::invalid(
                "rows",
                format!("range {rows:?} out of bounds for {} draws", self.len()),
            ));
        }
        Self::from_columns(
            self.intercept.slice(ndarray::s![rows.clone()]).to_vec(),
            self.slope.slice(ndarray::s![rows.clone()]).to_vec(),
            self.sigma.slice(ndarray::s![rows]).to_vec(),
        )
    }

    /// Draws of a single chain.
    pub fn chain(&self, chain: usize) -> Result<Self> {
        if chain >= self.chains {
            return Err(RegressionError::invalid(
                "chain",
                format!("chain {chain} out of bounds for {} chains", self.chains),
            ));
        }
        let start = chain * self.draws_per_chain;
        self.range(start..start + self.draws_per_chain)
    }

    /// Intercept re-expressed at another reference point of the predictor:
    /// `intercept + slope * shift`, row by row.
    ///
    /// Shifting a raw-encoding posterior by the predictor mean gives draws
    /// comparable with the intercept of a centered-encoding posterior.
    pub fn intercept_at(&self, shift: f64) -> Array1<f64> {
        &self.intercept + &self.slope.mapv(|b| b * shift)
    }

    fn diagnostics(&self, column: &Array1<f64>) -> ParameterDiagnostics {
        match column.view().into_shape((self.chains, self.draws_per_chain)) {
            Ok(draws) => ParameterDiagnostics::compute(draws),
            Err(_) => ParameterDiagnostics {
                r_hat: f64::NAN,
                ess: f64::NAN,
            },
        }
    }

    /// Split R-hat and ESS per parameter.
    pub fn convergence(&self) -> ConvergenceReport {
        ConvergenceReport {
            intercept: self.diagnostics(&self.intercept),
            slope: self.diagnostics(&self.slope),
            sigma: self.diagnostics(&self.sigma),
        }
    }

    /// Per-parameter mean, standard deviation, equal-tailed credible
    /// interval holding `mass` of the posterior, and diagnostics.
    pub fn summary(&self, mass: f64) -> Result<Vec<ParameterSummary>> {
        if !(mass > 0.0 && mass < 1.0) {
            return Err(RegressionError::invalid(
                "credible_mass",
                format!("must lie in (0, 1), got {mass}"),
            ));
        }
        if self.is_empty() {
            return Err(RegressionError::DataError(
                "cannot summarize an empty posterior".to_string(),
            ));
        }

        let convergence = self.convergence();
        let columns = [&self.intercept, &self.slope, &self.sigma];
        Ok(convergence
            .iter()
            .zip(columns)
            .map(|((parameter, diagnostics), column)| {
                let values = column.as_slice().unwrap_or_default();
                let (lower, upper) = central_interval(values, mass);
                let sd = if column.len() > 1 { column.std(1.0) } else { 0.0 };
                ParameterSummary {
                    parameter: parameter.to_string(),
                    mean: column.mean().unwrap_or(f64::NAN),
                    sd,
                    lower,
                    upper,
                    r_hat: diagnostics.r_hat,
                    ess: diagnostics.ess,
                }
            })
            .collect())
    }

    /// Rows of the posterior table, in storage order.
    pub fn rows(&self) -> Vec<PosteriorRow> {
        let per_chain = self.draws_per_chain.max(1);
        self.iter()
            .enumerate()
            .map(|(i, p)| PosteriorRow {
                chain: i / per_chain,
                draw: i % per_chain,
                intercept: p.intercept,
                slope: p.slope,
                sigma: p.sigma,
            })
            .collect()
    }

    /// Writes the posterior table as CSV with columns
    /// `chain, draw, intercept, slope, sigma`.
    ///
    /// Floats are written in shortest round-trip form, so
    /// [`PosteriorSamples::read_csv`] recovers identical values.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the posterior table to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }

    /// Reads a table written by [`PosteriorSamples::write_csv`].
    ///
    /// Rows must be grouped by chain, with chains numbered from 0 in order
    /// and each holding the same number of draws.
    pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut chains: Vec<Vec<Params>> = Vec::new();
        for row in reader.deserialize() {
            let row: PosteriorRow = row?;
            if row.chain == chains.len() {
                chains.push(Vec::new());
            } else if row.chain + 1 != chains.len() {
                return Err(RegressionError::DataError(format!(
                    "posterior rows out of chain order at chain {}",
                    row.chain
                )));
            }
            if let Some(chain) = chains.last_mut() {
                chain.push(Params {
                    intercept: row.intercept,
                    slope: row.slope,
                    sigma: row.sigma,
                });
            }
        }
        Self::from_chains(chains)
    }

    /// Reads the posterior table from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file))
    }
}

fn is_valid_draw(p: &Params) -> bool {
    p.intercept.is_finite() && p.slope.is_finite() && p.sigma.is_finite() && p.sigma >= 0.0
}

/// Summary statistics of one parameter's marginal posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Parameter name.
    pub parameter: String,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// Lower bound of the credible interval.
    pub lower: f64,
    /// Upper bound of the credible interval.
    pub upper: f64,
    /// Split R-hat.
    pub r_hat: f64,
    /// Effective sample size.
    pub ess: f64,
}
