//! Markov chain Monte Carlo sampling of the regression posterior.
//!
//! Samplers implement `PosteriorSampler`, whose single contract is "given
//! data, likelihood and priors, return posterior draws". Two
//! implementations are provided:
//!
//! - `AdaptiveMetropolis`, a block random-walk Metropolis sampler on the
//!   unconstrained parameter space whose proposal covariance is learned from
//!   the chain during warm-up and frozen afterwards.
//! - `EnsembleSampler`, an affine-invariant stretch-move ensemble that
//!   needs no tuning.

use std::thread;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info_span};

use crate::error::{RegressionError, Result};
use crate::math::{cholesky, RunningCovariance};
use crate::model::{LinearGaussianModel, Params, N_PARAMS};
use crate::posterior::PosteriorSamples;

/// Offset between the seeds of consecutive chains.
pub const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Chain layout shared by every sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Number of independent chains.
    pub chains: usize,
    /// Iterations discarded at the start of each chain.
    pub warmup_iters: usize,
    /// Total iterations per chain, warm-up included.
    pub total_iters: usize,
    /// Seed of chain 0; chain `c` uses `seed + c * SEED_STRIDE`.
    pub seed: u64,
}

impl SamplerSettings {
    /// Validates raw counts: at least one chain, a non-negative warm-up and
    /// at least one retained iteration.
    pub fn new(chains: i64, warmup_iters: i64, total_iters: i64, seed: u64) -> Result<Self> {
        if chains <= 0 {
            return Err(RegressionError::invalid(
                "chains",
                format!("must be positive, got {chains}"),
            ));
        }
        if total_iters <= 0 {
            return Err(RegressionError::invalid(
                "total_iters",
                format!("must be positive, got {total_iters}"),
            ));
        }
        if warmup_iters < 0 {
            return Err(RegressionError::invalid(
                "warmup_iters",
                format!("must be >= 0, got {warmup_iters}"),
            ));
        }
        if warmup_iters >= total_iters {
            return Err(RegressionError::invalid(
                "warmup_iters",
                format!("must be smaller than total_iters ({total_iters}), got {warmup_iters}"),
            ));
        }
        Ok(Self {
            chains: chains as usize,
            warmup_iters: warmup_iters as usize,
            total_iters: total_iters as usize,
            seed,
        })
    }

    /// Draws kept per chain.
    pub fn retained_draws(&self) -> usize {
        self.total_iters - self.warmup_iters
    }

    /// Seed of chain `chain`.
    pub fn chain_seed(&self, chain: usize) -> u64 {
        self.seed
            .wrapping_add((chain as u64).wrapping_mul(SEED_STRIDE))
    }
}

/// Anything that can turn a model into posterior draws.
pub trait PosteriorSampler {
    /// Samples the posterior of `model`, concatenating the retained draws of
    /// every chain in chain order.
    fn sample(
        &self,
        model: &LinearGaussianModel<'_>,
        settings: &SamplerSettings,
    ) -> Result<PosteriorSamples>;
}

/// Warm-up adaptation settings of [`AdaptiveMetropolis`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalTuning {
    /// Iterations between two adaptations of the proposal.
    pub adaptation_interval: usize,
    /// Below this acceptance rate the step scale shrinks.
    pub acceptance_target_low: f64,
    /// Above this acceptance rate the step scale grows.
    pub acceptance_target_high: f64,
    /// Factor applied to the step scale when acceptance is too low.
    pub scale_decrease_factor: f64,
    /// Factor applied to the step scale when acceptance is too high.
    pub scale_increase_factor: f64,
    /// Fraction of the warm-up after which draws feed the proposal
    /// covariance estimate.
    pub covariance_start: f64,
    /// Standard deviation of the jitter added to the starting point.
    pub jitter: f64,
    /// Starting points tried before giving up on a chain.
    pub max_init_attempts: usize,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            adaptation_interval: 50,
            acceptance_target_low: 0.15,
            acceptance_target_high: 0.45,
            scale_decrease_factor: 0.8,
            scale_increase_factor: 1.25,
            covariance_start: 0.2,
            jitter: 0.1,
            max_init_attempts: 20,
        }
    }
}

/// Adaptive block random-walk Metropolis sampler.
///
/// Proposals are `theta + step_scale * L z` with `z ~ N(0, I)` on the space
/// `(intercept, ln slope, logit sigma)`. `L` starts diagonal and is replaced
/// by the Cholesky factor of the scaled empirical covariance of the chain
/// during warm-up, which removes the intercept/slope correlation of the raw
/// encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveMetropolis {
    /// Warm-up adaptation settings.
    pub tuning: ProposalTuning,
}

/// Proposal state of one chain.
struct Proposal {
    cholesky: Array2<f64>,
    step_scale: f64,
}

impl Proposal {
    fn diagonal(scales: &Array1<f64>) -> Self {
        Self {
            cholesky: Array2::from_diag(scales),
            step_scale: 1.0,
        }
    }

    fn propose<R: Rng>(&self, theta: &Array1<f64>, rng: &mut R) -> Array1<f64> {
        let z = Array1::from_iter((0..theta.len()).map(|_| rng.sample::<f64, _>(StandardNormal)));
        theta + &(self.cholesky.dot(&z) * self.step_scale)
    }

    /// Uses `2.38^2 / d * covariance` as the proposal covariance, keeping
    /// the old factor if the estimate is not positive definite.
    fn set_covariance(&mut self, covariance: &Array2<f64>) -> bool {
        let d = covariance.nrows();
        let scaled = covariance * (2.38 * 2.38 / d as f64) + Array2::<f64>::eye(d) * 1e-8;
        match cholesky(&scaled) {
            Some(factor) => {
                self.cholesky = factor;
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct AcceptanceWindow {
    accepted: usize,
    proposed: usize,
}

impl AcceptanceWindow {
    fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        self.accepted += usize::from(accepted);
    }

    fn rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

fn should_accept<R: Rng>(log_acceptance: f64, rng: &mut R) -> bool {
    log_acceptance >= 0.0 || rng.gen::<f64>().ln() < log_acceptance
}

fn adapt_step_scale(scale: f64, acceptance: f64, tuning: &ProposalTuning) -> f64 {
    if acceptance < tuning.acceptance_target_low {
        scale * tuning.scale_decrease_factor
    } else if acceptance > tuning.acceptance_target_high {
        scale * tuning.scale_increase_factor
    } else {
        scale
    }
}

/// Jittered least-squares starting point with a finite log density.
fn initial_point<R: Rng>(
    model: &LinearGaussianModel<'_>,
    jitter: f64,
    max_attempts: usize,
    chain: usize,
    rng: &mut R,
) -> Result<(Array1<f64>, f64)> {
    let base = model.unconstrain(&model.initial_params());
    for _ in 0..max_attempts.max(1) {
        let theta = base.mapv(|v| v + jitter * rng.sample::<f64, _>(StandardNormal));
        let log_p = model.log_density(&theta);
        if log_p.is_finite() {
            return Ok((theta, log_p));
        }
    }
    Err(RegressionError::sampling(
        chain,
        "no starting point with a finite log density",
    ))
}

/// Runs `run_chain` for every chain on scoped threads and concatenates the
/// retained draws in chain order, independent of thread scheduling.
fn run_chains<F>(settings: &SamplerSettings, run_chain: F) -> Result<PosteriorSamples>
where
    F: Fn(usize) -> Result<Vec<Params>> + Sync,
{
    let run_chain = &run_chain;
    let chains = thread::scope(|scope| {
        let handles: Vec<_> = (0..settings.chains)
            .map(|chain| scope.spawn(move || run_chain(chain)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(chain, handle)| {
                handle
                    .join()
                    .map_err(|_| RegressionError::sampling(chain, "chain thread panicked"))
                    .and_then(|result| result)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    PosteriorSamples::from_chains(chains)
}

fn is_finite(params: &Params) -> bool {
    params.intercept.is_finite() && params.slope.is_finite() && params.sigma.is_finite()
}

impl AdaptiveMetropolis {
    /// Creates a sampler with explicit tuning.
    pub fn new(tuning: ProposalTuning) -> Self {
        Self { tuning }
    }

    /// Initial proposal scales on the unconstrained space.
    fn initial_scales(model: &LinearGaussianModel<'_>) -> Array1<f64> {
        let y = model.data().outcome();
        let n = y.len() as f64;
        let spread = if y.len() > 1 { y.std(1.0) } else { 1.0 };
        let intercept_scale = (spread / n.sqrt()).max(1e-3);
        Array1::from(vec![intercept_scale, 0.1, 0.1])
    }

    fn run_chain(
        &self,
        model: &LinearGaussianModel<'_>,
        settings: &SamplerSettings,
        chain: usize,
    ) -> Result<Vec<Params>> {
        let tuning = &self.tuning;
        let mut rng = StdRng::seed_from_u64(settings.chain_seed(chain));
        let (mut theta, mut log_p) = initial_point(
            model,
            tuning.jitter,
            tuning.max_init_attempts,
            chain,
            &mut rng,
        )?;

        let mut proposal = Proposal::diagonal(&Self::initial_scales(model));
        let mut running = RunningCovariance::new(N_PARAMS);
        let mut window = AcceptanceWindow::default();
        let mut adopted_covariance = false;
        let covariance_start = (settings.warmup_iters as f64 * tuning.covariance_start) as usize;
        let interval = tuning.adaptation_interval.max(1);

        let mut draws = Vec::with_capacity(settings.retained_draws());
        let mut accepted_draws = 0usize;

        for iter in 0..settings.total_iters {
            let candidate = proposal.propose(&theta, &mut rng);
            let candidate_log_p = model.log_density(&candidate);
            let accepted =
                candidate_log_p.is_finite() && should_accept(candidate_log_p - log_p, &mut rng);
            if accepted {
                theta = candidate;
                log_p = candidate_log_p;
            }

            if iter < settings.warmup_iters {
                window.record(accepted);
                if iter >= covariance_start {
                    running.update(&theta);
                }
                if (iter + 1) % interval == 0 {
                    proposal.step_scale = adapt_step_scale(proposal.step_scale, window.rate(), tuning);
                    if running.count() >= 10 * N_PARAMS {
                        if let Some(covariance) = running.covariance() {
                            if proposal.set_covariance(&covariance) && !adopted_covariance {
                                // The scaled covariance already sets the step size.
                                proposal.step_scale = 1.0;
                                adopted_covariance = true;
                            }
                        }
                    }
                    window = AcceptanceWindow::default();
                }
            } else {
                accepted_draws += usize::from(accepted);
                let params = model.constrain(&theta);
                if !is_finite(&params) {
                    return Err(RegressionError::sampling(
                        chain,
                        format!("non-finite draw at iteration {iter}"),
                    ));
                }
                draws.push(params);
            }
        }

        debug!(
            chain,
            acceptance_rate = accepted_draws as f64 / settings.retained_draws() as f64,
            step_scale = proposal.step_scale,
            "chain finished"
        );
        Ok(draws)
    }
}

impl PosteriorSampler for AdaptiveMetropolis {
    fn sample(
        &self,
        model: &LinearGaussianModel<'_>,
        settings: &SamplerSettings,
    ) -> Result<PosteriorSamples> {
        let _span = info_span!(
            "sample",
            encoding = %model.encoding(),
            chains = settings.chains,
            warmup = settings.warmup_iters,
            total = settings.total_iters,
        )
        .entered();

        run_chains(settings, |chain| self.run_chain(model, settings, chain))
    }
}

/// Affine-invariant ensemble sampler with the stretch move of Goodman and
/// Weare (2010).
///
/// Every chain runs its own ensemble of walkers on the same unconstrained
/// space as [`AdaptiveMetropolis`] and records the trajectory of its first
/// walker. Proposals move a walker along the line through another walker,
/// so they follow the shape of the posterior without any warm-up tuning;
/// warm-up iterations only let the ensemble spread out from the starting
/// point.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleSampler {
    /// Walkers per ensemble, at least twice the number of parameters.
    pub walkers: usize,
    /// Stretch scale `a > 1`; step factors are drawn from `[1/a, a]`.
    pub stretch: f64,
    /// Standard deviation of the jitter around the starting point.
    pub jitter: f64,
    /// Starting points tried per walker before giving up on a chain.
    pub max_init_attempts: usize,
}

impl Default for EnsembleSampler {
    fn default() -> Self {
        Self {
            walkers: 16,
            stretch: 2.0,
            jitter: 0.1,
            max_init_attempts: 20,
        }
    }
}

impl EnsembleSampler {
    fn validate(&self) -> Result<()> {
        if self.walkers < 2 * N_PARAMS {
            return Err(RegressionError::invalid(
                "walkers",
                format!("need at least {}, got {}", 2 * N_PARAMS, self.walkers),
            ));
        }
        if !(self.stretch > 1.0 && self.stretch.is_finite()) {
            return Err(RegressionError::invalid(
                "stretch",
                format!("must be finite and greater than 1, got {}", self.stretch),
            ));
        }
        Ok(())
    }

    /// Step factor `z` with density proportional to `1 / sqrt(z)` on
    /// `[1/a, a]`.
    fn stretch_factor<R: Rng>(&self, rng: &mut R) -> f64 {
        let a = self.stretch;
        let u: f64 = rng.gen();
        ((a - 1.0) * u + 1.0).powi(2) / a
    }

    fn run_chain(
        &self,
        model: &LinearGaussianModel<'_>,
        settings: &SamplerSettings,
        chain: usize,
    ) -> Result<Vec<Params>> {
        let mut rng = StdRng::seed_from_u64(settings.chain_seed(chain));
        let mut positions = Vec::with_capacity(self.walkers);
        let mut log_ps = Vec::with_capacity(self.walkers);
        for _ in 0..self.walkers {
            let (theta, log_p) =
                initial_point(model, self.jitter, self.max_init_attempts, chain, &mut rng)?;
            positions.push(theta);
            log_ps.push(log_p);
        }

        let mut draws = Vec::with_capacity(settings.retained_draws());
        let mut accepted = 0usize;
        for iter in 0..settings.total_iters {
            for k in 0..self.walkers {
                let mut j = rng.gen_range(0..self.walkers - 1);
                if j >= k {
                    j += 1;
                }
                let z = self.stretch_factor(&mut rng);
                let candidate = &positions[j] + &((&positions[k] - &positions[j]) * z);
                let candidate_log_p = model.log_density(&candidate);
                let log_acceptance =
                    (N_PARAMS as f64 - 1.0) * z.ln() + candidate_log_p - log_ps[k];
                if candidate_log_p.is_finite() && should_accept(log_acceptance, &mut rng) {
                    positions[k] = candidate;
                    log_ps[k] = candidate_log_p;
                    if iter >= settings.warmup_iters {
                        accepted += 1;
                    }
                }
            }

            if iter >= settings.warmup_iters {
                let params = model.constrain(&positions[0]);
                if !is_finite(&params) {
                    return Err(RegressionError::sampling(
                        chain,
                        format!("non-finite draw at iteration {iter}"),
                    ));
                }
                draws.push(params);
            }
        }

        debug!(
            chain,
            acceptance_rate =
                accepted as f64 / (settings.retained_draws() * self.walkers) as f64,
            "ensemble finished"
        );
        Ok(draws)
    }
}

impl PosteriorSampler for EnsembleSampler {
    fn sample(
        &self,
        model: &LinearGaussianModel<'_>,
        settings: &SamplerSettings,
    ) -> Result<PosteriorSamples> {
        self.validate()?;
        let _span = info_span!(
            "sample",
            encoding = %model.encoding(),
            chains = settings.chains,
            walkers = self.walkers,
            warmup = settings.warmup_iters,
            total = settings.total_iters,
        )
        .entered();

        run_chains(settings, |chain| self.run_chain(model, settings, chain))
    }
}
