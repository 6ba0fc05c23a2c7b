use heatfit::config::Config;
use heatfit::data::{Dataset, PredictorEncoding};
use heatfit::error::RegressionError;

fn invalid_param(result: heatfit::Result<Config>) -> String {
    match result {
        Err(RegressionError::InvalidArgument { param, .. }) => param,
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let settings = config.sampler_settings().unwrap();
    assert_eq!(settings.chains, 4);
    assert_eq!(settings.retained_draws(), 1000);
}

#[test]
fn test_partial_json_uses_defaults() {
    let config = Config::from_json(
        r#"{
            "seed": 7,
            "predictor_encoding": "raw",
            "prior_sigma": {"lower": 0.0, "upper": 20.0}
        }"#,
    )
    .unwrap();

    assert_eq!(config.seed, 7);
    assert_eq!(config.predictor_encoding, PredictorEncoding::Raw);
    assert_eq!(config.prior_sigma.upper, 20.0);
    assert_eq!(config.chains, Config::default().chains);
    assert_eq!(config.prior_intercept, Config::default().prior_intercept);
}

#[test]
fn test_invalid_counts() {
    assert_eq!(invalid_param(Config::from_json(r#"{"draw_count": -1}"#)), "draw_count");
    assert_eq!(invalid_param(Config::from_json(r#"{"chains": 0}"#)), "chains");
    assert_eq!(invalid_param(Config::from_json(r#"{"total_iters": 0}"#)), "total_iters");
    assert_eq!(
        invalid_param(Config::from_json(r#"{"warmup_iters": -5}"#)),
        "warmup_iters"
    );
    assert_eq!(
        invalid_param(Config::from_json(
            r#"{"warmup_iters": 100, "total_iters": 100}"#
        )),
        "warmup_iters"
    );
}

#[test]
fn test_invalid_encoding_and_priors() {
    assert_eq!(
        invalid_param(Config::from_json(r#"{"predictor_encoding": "log"}"#)),
        "predictor_encoding"
    );
    assert_eq!(
        invalid_param(Config::from_json(
            r#"{"prior_sigma": {"lower": 5.0, "upper": 1.0}}"#
        )),
        "prior_sigma"
    );
    assert_eq!(
        invalid_param(Config::from_json(
            r#"{"prior_intercept": {"location": 75.0, "scale": 0.0}}"#
        )),
        "prior_intercept"
    );
    assert_eq!(
        invalid_param(Config::from_json(r#"{"credible_mass": 1.0}"#)),
        "credible_mass"
    );
}

#[test]
fn test_unknown_key_rejected() {
    assert!(matches!(
        Config::from_json(r#"{"chain": 4}"#),
        Err(RegressionError::Json(_))
    ));
}

#[test]
fn test_query_grid() {
    let data = Dataset::new(vec![10.0, 50.0, 100.0], vec![1.0, 2.0, 3.0]).unwrap();

    let config = Config {
        query_points: 10,
        ..Config::default()
    };
    let grid = config.query_grid(&data);
    assert_eq!(grid.len(), 10);
    assert_eq!(grid[0], 10.0);
    assert!((grid[9] - 100.0).abs() < 1e-9);

    let config = Config {
        query_points: 3,
        query_range: Some((0.0, 1000.0)),
        ..Config::default()
    };
    assert_eq!(config.query_grid(&data), vec![0.0, 500.0, 1000.0]);
}

#[test]
fn test_load_from_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{"chains": 2, "total_iters": 500, "warmup_iters": 250}}"#).expect("write");

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.chains, 2);
    assert_eq!(config.sampler_settings().unwrap().retained_draws(), 250);
}

#[test]
fn test_encoding_names_are_case_insensitive() {
    let config = Config::from_json(r#"{"predictor_encoding": "RAW"}"#).unwrap();
    assert_eq!(config.predictor_encoding, PredictorEncoding::Raw);

    let config = Config::from_json(r#"{"predictor_encoding": "Centered"}"#).unwrap();
    assert_eq!(config.predictor_encoding, PredictorEncoding::Centered);

    // Written back in lowercase
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains(r#""predictor_encoding":"centered""#));
}

#[test]
fn test_negative_query_points_rejected() {
    assert_eq!(
        invalid_param(Config::from_json(r#"{"query_points": -3}"#)),
        "query_points"
    );
}
