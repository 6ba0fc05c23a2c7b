use heatfit::config::Config;
use heatfit::data::{Dataset, PredictorEncoding};
use heatfit::pipeline::Pipeline;
use heatfit::posterior::PosteriorSamples;
use heatfit::sampler::AdaptiveMetropolis;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn synthetic_data(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let predictor: Vec<f64> = (1..=20).map(|i| 10.0 * i as f64).collect();
    let outcome = predictor
        .iter()
        .map(|&x| 60.0 + 0.5 * x + 3.0 * rng.sample::<f64, _>(StandardNormal))
        .collect();
    Dataset::new(predictor, outcome).unwrap()
}

fn test_config() -> Config {
    Config {
        chains: 2,
        warmup_iters: 1500,
        total_iters: 2500,
        query_points: 5,
        ..Config::default()
    }
}

#[test]
fn test_run_output_shapes() {
    let data = synthetic_data(1);
    let pipeline = Pipeline::new(test_config()).unwrap();

    let output = pipeline
        .run(&data, &AdaptiveMetropolis::default(), PredictorEncoding::Centered)
        .unwrap();

    assert_eq!(output.encoding, PredictorEncoding::Centered);
    assert_eq!(output.prior_draws.len(), 150);
    assert_eq!(output.posterior.len(), 2 * 1000);
    assert_eq!(output.summary.len(), 3);
    assert_eq!(output.intervals.len(), 5);
    assert_eq!(output.mean_intervals.len(), 5);

    // Intervals are keyed by real-world durations, not centered ones
    let grid = pipeline.config().query_grid(&data);
    for (interval, &query) in output.intervals.iter().zip(&grid) {
        assert_eq!(interval.predictor, query);
        assert!(interval.lower <= interval.upper);
    }
    assert_eq!(output.intervals[0].predictor, 10.0);
}

#[test]
fn test_prior_stage_matches_config_seed() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    let first = pipeline.simulate_priors().unwrap();
    let second = pipeline.simulate_priors().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 150);
    assert!(first.slope.iter().all(|&b| b > 0.0));
    assert!(first.sigma.iter().all(|&s| (0.0..=50.0).contains(&s)));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config {
        draw_count: -1,
        ..test_config()
    };
    assert!(Pipeline::new(config).is_err());
}

#[test]
fn test_encodings_give_matching_predictions() {
    let data = synthetic_data(2);
    let pipeline = Pipeline::new(test_config()).unwrap();

    let comparison = pipeline
        .compare_encodings(&data, &AdaptiveMetropolis::default())
        .unwrap();
    assert_eq!(comparison.predictor_mean, 105.0);

    let pairs = comparison
        .raw
        .intervals
        .iter()
        .zip(&comparison.centered.intervals);
    for (raw, centered) in pairs {
        assert_eq!(raw.predictor, centered.predictor);
        assert!((raw.lower - centered.lower).abs() < 1.5, "{raw:?} vs {centered:?}");
        assert!((raw.upper - centered.upper).abs() < 1.5, "{raw:?} vs {centered:?}");
    }

    let pairs = comparison
        .raw
        .mean_intervals
        .iter()
        .zip(&comparison.centered.mean_intervals);
    for (raw, centered) in pairs {
        assert!((raw.lower - centered.lower).abs() < 1.0, "{raw:?} vs {centered:?}");
        assert!((raw.upper - centered.upper).abs() < 1.0, "{raw:?} vs {centered:?}");
    }
}

#[test]
fn test_reference_intercepts_match_centered_intercept() {
    let data = synthetic_data(3);
    let pipeline = Pipeline::new(test_config()).unwrap();

    let comparison = pipeline
        .compare_encodings(&data, &AdaptiveMetropolis::default())
        .unwrap();

    let shifted = comparison.reference_intercepts().mean().unwrap();
    let centered = comparison.centered.posterior.intercept().mean().unwrap();
    assert!((shifted - centered).abs() < 0.5, "{shifted} vs {centered}");

    // The raw intercept itself refers to duration 0 and sits far lower
    let raw = comparison.raw.posterior.intercept().mean().unwrap();
    assert!(centered - raw > 30.0);
}

#[test]
fn test_stages_use_separate_random_streams() {
    let config = Config::default();
    assert_ne!(config.prior_seed(), config.sampler_seed());
    assert_ne!(config.prior_seed(), config.predictive_seed());
    assert_ne!(config.sampler_seed(), config.predictive_seed());
    assert_eq!(config.sampler_settings().unwrap().seed, config.sampler_seed());

    let pipeline = Pipeline::new(config).unwrap();
    let priors = pipeline.simulate_priors().unwrap();
    let prior_noise: Vec<f64> = priors.intercept.iter().map(|a| (a - 75.0) / 15.0).collect();

    // One draw with zero mean and unit sigma turns each interval into the
    // standard normal draw used at that query
    let posterior = PosteriorSamples::from_columns(vec![0.0], vec![0.0], vec![1.0]).unwrap();
    let data = synthetic_data(1);
    let queries: Vec<f64> = (0..150).map(f64::from).collect();
    let (intervals, _) = pipeline
        .predict(&data, &posterior, PredictorEncoding::Raw, &queries)
        .unwrap();

    let shared = intervals
        .iter()
        .zip(&prior_noise)
        .filter(|(interval, z)| (interval.lower - **z).abs() < 1e-9)
        .count();
    assert_eq!(shared, 0, "{shared} predictive draws repeat the prior noise");
}
