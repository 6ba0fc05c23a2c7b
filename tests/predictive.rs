use heatfit::error::RegressionError;
use heatfit::posterior::PosteriorSamples;
use heatfit::predictive::PredictiveSimulator;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Posterior draws on a centered predictor with independent intercept and
/// slope uncertainty.
fn create_test_posterior(n: usize) -> PosteriorSamples {
    let mut rng = StdRng::seed_from_u64(42);
    let mut normal = |mean: f64, sd: f64| mean + sd * rng.sample::<f64, _>(StandardNormal);
    let intercept: Vec<f64> = (0..n).map(|_| normal(112.5, 0.7)).collect();
    let slope: Vec<f64> = (0..n).map(|_| normal(0.5, 0.012)).collect();
    let sigma: Vec<f64> = (0..n).map(|_| normal(3.0, 0.5).abs()).collect();
    PosteriorSamples::from_columns(intercept, slope, sigma).unwrap()
}

#[test]
fn test_intervals_are_ordered() {
    let posterior = create_test_posterior(2000);
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();

    let queries: Vec<f64> = (-10..=10).map(|i| 10.0 * i as f64).collect();
    let intervals = simulator.intervals(&queries, 1999);

    assert_eq!(intervals.len(), queries.len());
    for (interval, &query) in intervals.iter().zip(&queries) {
        assert_eq!(interval.predictor, query);
        assert!(interval.lower <= interval.upper);
        let center = 112.5 + 0.5 * query;
        assert!(interval.lower < center && center < interval.upper);
    }
}

#[test]
fn test_intervals_are_deterministic() {
    let posterior = create_test_posterior(500);
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();
    let queries = [-50.0, 0.0, 50.0];

    assert_eq!(
        simulator.intervals(&queries, 7),
        simulator.intervals(&queries, 7)
    );
    assert_ne!(
        simulator.intervals(&queries, 7),
        simulator.intervals(&queries, 8)
    );
}

#[test]
fn test_interval_width_matches_predictive_spread() {
    let posterior = create_test_posterior(4000);
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();

    let interval = simulator.intervals(&[0.0], 3)[0];
    // sd ~ sqrt(0.7^2 + 3^2 + 0.5^2) ~ 3.12
    let expected = 2.0 * 1.96 * 3.12;
    assert!(
        (interval.width() - expected).abs() < 1.0,
        "width = {}",
        interval.width()
    );
}

#[test]
fn test_intervals_widen_away_from_the_data() {
    let posterior = create_test_posterior(2000);
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();

    let intervals = simulator.intervals(&[0.0, 2000.0], 11);
    assert!(intervals[1].width() > intervals[0].width());

    let mean_intervals = simulator.mean_intervals(&[0.0, 2000.0]);
    assert!(mean_intervals[1].width() > 10.0 * mean_intervals[0].width());
}

#[test]
fn test_mean_interval_inside_predictive_interval() {
    let posterior = create_test_posterior(2000);
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();
    let queries = [-80.0, 0.0, 80.0];

    let predictive = simulator.intervals(&queries, 5);
    let mean = simulator.mean_intervals(&queries);
    for (p, m) in predictive.iter().zip(&mean) {
        assert!(p.lower < m.lower && m.upper < p.upper);
    }
}

#[test]
fn test_zero_sigma_collapses_interval() {
    let posterior =
        PosteriorSamples::from_columns(vec![10.0; 50], vec![2.0; 50], vec![0.0; 50]).unwrap();
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();

    let interval = simulator.intervals(&[3.0], 1)[0];
    assert_eq!(interval.lower, 16.0);
    assert_eq!(interval.upper, 16.0);
    assert_eq!(interval.width(), 0.0);
}

#[test]
fn test_single_draw() {
    let posterior = PosteriorSamples::from_columns(vec![1.0], vec![1.0], vec![1.0]).unwrap();
    let simulator = PredictiveSimulator::new(&posterior, 0.95).unwrap();

    let interval = simulator.intervals(&[0.0], 1)[0];
    assert_eq!(interval.lower, interval.upper);
}

#[test]
fn test_invalid_inputs() {
    let empty = PosteriorSamples::from_columns(vec![], vec![], vec![]).unwrap();
    assert!(matches!(
        PredictiveSimulator::new(&empty, 0.95),
        Err(RegressionError::DataError(_))
    ));

    let posterior = create_test_posterior(10);
    assert!(matches!(
        PredictiveSimulator::new(&posterior, 1.5),
        Err(RegressionError::InvalidArgument { .. })
    ));
    assert!(PredictiveSimulator::new(&posterior, f64::NAN).is_err());
}
