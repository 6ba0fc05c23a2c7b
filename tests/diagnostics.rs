use heatfit::diagnostics::{effective_sample_size, split_r_hat, ConvergenceReport, ParameterDiagnostics};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn iid_chains(chains: usize, draws: usize, offsets: &[f64], seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((chains, draws), |(c, _)| {
        offsets[c] + rng.sample::<f64, _>(StandardNormal)
    })
}

#[test]
fn test_r_hat_near_one_for_mixed_chains() {
    let draws = iid_chains(4, 1000, &[0.0; 4], 1);
    let r_hat = split_r_hat(draws.view());

    assert!(r_hat.is_finite());
    assert!(r_hat < 1.02, "r_hat = {r_hat}");
}

#[test]
fn test_r_hat_flags_separated_chains() {
    let draws = iid_chains(4, 1000, &[0.0, 0.0, 5.0, 5.0], 2);
    let r_hat = split_r_hat(draws.view());

    assert!(r_hat > 1.5, "r_hat = {r_hat}");
}

#[test]
fn test_r_hat_flags_drifting_chain() {
    // A trend within each chain shows up between the split halves
    let draws = Array2::from_shape_fn((2, 500), |(_, i)| i as f64);
    assert!(split_r_hat(draws.view()) > 1.5);
}

#[test]
fn test_ess_of_independent_draws() {
    let draws = iid_chains(4, 1000, &[0.0; 4], 3);
    let ess = effective_sample_size(draws.view());

    assert!(ess > 2500.0 && ess < 6000.0, "ess = {ess}");
}

#[test]
fn test_ess_of_autocorrelated_draws() {
    // AR(1) with coefficient 0.9 has ESS ~ n * (1 - 0.9) / (1 + 0.9)
    let mut rng = StdRng::seed_from_u64(4);
    let mut draws = Array2::zeros((4, 2000));
    for c in 0..4 {
        let mut x = 0.0;
        for i in 0..2000 {
            x = 0.9 * x + rng.sample::<f64, _>(StandardNormal);
            draws[[c, i]] = x;
        }
    }
    let ess = effective_sample_size(draws.view());

    assert!(ess > 150.0 && ess < 1000.0, "ess = {ess}");
}

#[test]
fn test_degenerate_draws_give_nan() {
    let constant = Array2::from_elem((2, 100), 1.0);
    assert!(split_r_hat(constant.view()).is_nan());
    assert!(effective_sample_size(constant.view()).is_nan());

    let too_short = Array2::from_elem((2, 1), 1.0);
    assert!(split_r_hat(too_short.view()).is_nan());
}

#[test]
fn test_convergence_report() {
    let good = ParameterDiagnostics {
        r_hat: 1.001,
        ess: 900.0,
    };
    let bad = ParameterDiagnostics {
        r_hat: 1.3,
        ess: 12.0,
    };
    let report = ConvergenceReport {
        intercept: good,
        slope: good,
        sigma: bad,
    };

    assert!(!report.is_converged(1.05));
    assert!(report.is_converged(1.5));
    let names: Vec<_> = report.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["intercept", "slope", "sigma"]);
}
