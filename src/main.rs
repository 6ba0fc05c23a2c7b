use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use heatfit::{
    AdaptiveMetropolis, Config, Dataset, EnsembleSampler, Pipeline, PipelineOutput,
    PosteriorSampler, PredictorEncoding,
};

/// Bayesian linear regression of temperature on treatment duration.
#[derive(Parser)]
#[command(version, about)]
struct Opts {
    /// CSV file with one row per observation
    #[arg(long, env = "HEATFIT_DATA")]
    data: PathBuf,

    /// JSON configuration file; defaults are used for missing keys
    #[arg(long, env = "HEATFIT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the output tables are written to
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Seed of every pseudo-random draw
    #[arg(long)]
    seed: Option<u64>,

    /// Number of prior simulation draws
    #[arg(long, allow_hyphen_values = true)]
    draw_count: Option<i64>,

    /// Number of MCMC chains
    #[arg(long, allow_hyphen_values = true)]
    chains: Option<i64>,

    /// Discarded iterations per chain
    #[arg(long, allow_hyphen_values = true)]
    warmup_iters: Option<i64>,

    /// Total iterations per chain, warm-up included
    #[arg(long, allow_hyphen_values = true)]
    total_iters: Option<i64>,

    /// Predictor encoding to fit; `both` compares raw and centered fits
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// MCMC sampler used for the posterior
    #[arg(long, value_enum, default_value_t = SamplerArg::Metropolis)]
    sampler: SamplerArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum SamplerArg {
    Metropolis,
    Ensemble,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Raw,
    Centered,
    Both,
}

impl Opts {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(draw_count) = self.draw_count {
            config.draw_count = draw_count;
        }
        if let Some(chains) = self.chains {
            config.chains = chains;
        }
        if let Some(warmup_iters) = self.warmup_iters {
            config.warmup_iters = warmup_iters;
        }
        if let Some(total_iters) = self.total_iters {
            config.total_iters = total_iters;
        }
        match self.encoding {
            Some(EncodingArg::Raw) => config.predictor_encoding = PredictorEncoding::Raw,
            Some(EncodingArg::Centered) => config.predictor_encoding = PredictorEncoding::Centered,
            Some(EncodingArg::Both) | None => {}
        }
        Ok(config)
    }

    fn encodings(&self, config: &Config) -> Vec<PredictorEncoding> {
        match self.encoding {
            Some(EncodingArg::Both) => PredictorEncoding::ALL.to_vec(),
            _ => vec![config.predictor_encoding],
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env("HEATFIT_LOG")
        .or_else(|_| EnvFilter::try_new("heatfit=info"))?;
    let format_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_filter(filter);
    tracing_subscriber::registry().with(format_layer).init();
    Ok(())
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct PriorRow {
    intercept: f64,
    slope: f64,
    sigma: f64,
}

fn write_output(out: &Path, output: &PipelineOutput) -> Result<()> {
    let suffix = output.encoding.as_str();
    output
        .posterior
        .save(out.join(format!("posterior_{suffix}.csv")))?;
    write_table(&out.join(format!("summary_{suffix}.csv")), &output.summary)?;
    write_table(&out.join(format!("intervals_{suffix}.csv")), &output.intervals)?;
    write_table(
        &out.join(format!("mean_intervals_{suffix}.csv")),
        &output.mean_intervals,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing()?;

    let config = opts.config()?;
    let data = Dataset::from_csv(&opts.data, &config.predictor_column, &config.outcome_column)
        .with_context(|| format!("failed to load observations from {}", opts.data.display()))?;
    let encodings = opts.encodings(&config);
    let pipeline = Pipeline::new(config)?;
    let metropolis = AdaptiveMetropolis::default();
    let ensemble = EnsembleSampler::default();
    let sampler: &dyn PosteriorSampler = match opts.sampler {
        SamplerArg::Metropolis => &metropolis,
        SamplerArg::Ensemble => &ensemble,
    };

    fs::create_dir_all(&opts.out)
        .with_context(|| format!("failed to create {}", opts.out.display()))?;

    let prior_draws = pipeline.simulate_priors()?;
    let prior_rows: Vec<PriorRow> = prior_draws
        .intercept
        .iter()
        .zip(prior_draws.slope.iter())
        .zip(prior_draws.sigma.iter())
        .map(|((&intercept, &slope), &sigma)| PriorRow {
            intercept,
            slope,
            sigma,
        })
        .collect();
    write_table(&opts.out.join("prior_draws.csv"), &prior_rows)?;

    for encoding in encodings {
        let output = pipeline.run(&data, sampler, encoding)?;
        for summary in &output.summary {
            info!(
                %encoding,
                parameter = %summary.parameter,
                mean = summary.mean,
                sd = summary.sd,
                lower = summary.lower,
                upper = summary.upper,
                r_hat = summary.r_hat,
                "posterior summary"
            );
        }
        write_output(&opts.out, &output)?;
    }

    info!(out = %opts.out.display(), "tables written");
    Ok(())
}
