//! Convergence diagnostics computed from the per-chain layout of the draws:
//! split potential scale reduction (R-hat) and effective sample size.
//!
//! Both follow Gelman et al., Bayesian Data Analysis (3rd ed.), with the
//! autocorrelation sum truncated by Geyer's initial monotone sequence.

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::Serialize;

/// Splits every chain in half, dropping the middle draw of odd-length
/// chains, so that within-chain drift shows up as between-chain variance.
fn split_chains<'a>(draws: ArrayView2<'a, f64>) -> Vec<ArrayView1<'a, f64>> {
    let half = draws.ncols() / 2;
    let offset = draws.ncols() - half;
    (0..draws.nrows())
        .flat_map(move |c| {
            let chain = draws.index_axis_move(Axis(0), c);
            let (first, _) = chain.split_at(Axis(0), half);
            let (_, second) = chain.split_at(Axis(0), offset);
            [first, second]
        })
        .collect()
}

fn mean(x: &ArrayView1<'_, f64>) -> f64 {
    x.sum() / x.len() as f64
}

fn sample_variance(x: &ArrayView1<'_, f64>) -> f64 {
    let m = mean(x);
    x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (x.len() - 1) as f64
}

/// Within-chain variance `W` and pooled variance estimate `var+`.
fn variance_components(chains: &[ArrayView1<'_, f64>]) -> Option<(f64, f64)> {
    let m = chains.len();
    let n = chains.first()?.len();
    if m < 2 || n < 2 {
        return None;
    }
    let means: Vec<f64> = chains.iter().map(mean).collect();
    let grand = means.iter().sum::<f64>() / m as f64;
    let between = n as f64 * means.iter().map(|c| (c - grand).powi(2)).sum::<f64>() / (m - 1) as f64;
    let within = chains.iter().map(sample_variance).sum::<f64>() / m as f64;
    let var_plus = (n - 1) as f64 / n as f64 * within + between / n as f64;
    Some((within, var_plus))
}

/// Split R-hat of draws laid out as `(chains, draws_per_chain)`.
///
/// `NaN` when fewer than two draws per split chain exist or the draws are
/// constant.
pub fn split_r_hat(draws: ArrayView2<'_, f64>) -> f64 {
    let chains = split_chains(draws);
    match variance_components(&chains) {
        Some((within, var_plus)) if within > 0.0 => (var_plus / within).sqrt(),
        _ => f64::NAN,
    }
}

/// Autocovariance of `x` at `lag`, normalized by `x.len()`.
fn autocovariance(x: &ArrayView1<'_, f64>, lag: usize) -> f64 {
    let n = x.len();
    let m = mean(x);
    (0..n - lag)
        .map(|i| (x[i] - m) * (x[i + lag] - m))
        .sum::<f64>()
        / n as f64
}

/// Multi-chain effective sample size of draws laid out as
/// `(chains, draws_per_chain)`.
pub fn effective_sample_size(draws: ArrayView2<'_, f64>) -> f64 {
    let chains = split_chains(draws);
    let Some((within, var_plus)) = variance_components(&chains) else {
        return f64::NAN;
    };
    if !(within > 0.0) {
        return f64::NAN;
    }
    let m = chains.len();
    let n = chains[0].len();

    let rho = |lag: usize| {
        let mean_acov = chains.iter().map(|c| autocovariance(c, lag)).sum::<f64>() / m as f64;
        1.0 - (within - mean_acov) / var_plus
    };

    // Sum consecutive pairs while they stay positive and non-increasing.
    let mut tau = 0.0;
    let mut previous_pair = f64::INFINITY;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = (rho(lag) + rho(lag + 1)).min(previous_pair);
        if pair <= 0.0 {
            break;
        }
        tau += pair;
        previous_pair = pair;
        lag += 2;
    }
    let total = (m * n) as f64;
    let tau = (2.0 * tau - 1.0).max(1.0 / total.log10());
    total / tau
}

/// Diagnostics for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterDiagnostics {
    /// Split R-hat.
    pub r_hat: f64,
    /// Effective sample size.
    pub ess: f64,
}

impl ParameterDiagnostics {
    /// Computes both diagnostics for draws laid out as `(chains, draws)`.
    pub fn compute(draws: ArrayView2<'_, f64>) -> Self {
        Self {
            r_hat: split_r_hat(draws),
            ess: effective_sample_size(draws),
        }
    }
}

/// Diagnostics for every model parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceReport {
    /// Intercept diagnostics.
    pub intercept: ParameterDiagnostics,
    /// Slope diagnostics.
    pub slope: ParameterDiagnostics,
    /// Sigma diagnostics.
    pub sigma: ParameterDiagnostics,
}

impl ConvergenceReport {
    /// Parameters paired with their diagnostics, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParameterDiagnostics)> {
        [
            ("intercept", &self.intercept),
            ("slope", &self.slope),
            ("sigma", &self.sigma),
        ]
        .into_iter()
    }

    /// Whether every R-hat is finite and at most `max_r_hat`.
    pub fn is_converged(&self, max_r_hat: f64) -> bool {
        self.iter()
            .all(|(_, d)| d.r_hat.is_finite() && d.r_hat <= max_r_hat)
    }
}
