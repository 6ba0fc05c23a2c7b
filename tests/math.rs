use heatfit::math::{
    central_interval, cholesky, logistic, logit, quantiles, softplus, RunningCovariance,
};

use ndarray::{array, Array1, Array2};

#[test]
fn test_running_covariance_matches_direct() {
    let xs = vec![
        array![1.0, 2.0],
        array![2.0, 4.5],
        array![3.0, 5.0],
        array![4.0, 8.0],
    ];
    let mut running = RunningCovariance::new(2);
    assert!(running.covariance().is_none());
    for x in &xs {
        running.update(x);
    }

    assert_eq!(running.count(), 4);
    assert!((running.mean()[0] - 2.5).abs() < 1e-12);
    assert!((running.mean()[1] - 4.875).abs() < 1e-12);

    let cov = running.covariance().unwrap();
    // var(1, 2, 3, 4) = 5 / 3
    assert!((cov[[0, 0]] - 5.0 / 3.0).abs() < 1e-12);
    assert!((cov[[0, 1]] - cov[[1, 0]]).abs() < 1e-12);
    let direct: f64 = xs
        .iter()
        .map(|x| (x[0] - 2.5) * (x[1] - 4.875))
        .sum::<f64>()
        / 3.0;
    assert!((cov[[0, 1]] - direct).abs() < 1e-12);

    running.reset();
    assert_eq!(running.count(), 0);
}

#[test]
fn test_cholesky() {
    let a = array![[4.0, 2.0, 0.4], [2.0, 10.0, 1.0], [0.4, 1.0, 3.0]];
    let l = cholesky(&a).unwrap();

    let reconstructed = l.dot(&l.t());
    for (x, y) in reconstructed.iter().zip(a.iter()) {
        assert!((x - y).abs() < 1e-10);
    }
    assert_eq!(l[[0, 1]], 0.0);
    assert_eq!(l[[0, 0]], 2.0);

    let not_pd = array![[1.0, 2.0], [2.0, 1.0]];
    assert!(cholesky(&not_pd).is_none());
    assert!(cholesky(&Array2::zeros((2, 3))).is_none());
    assert!(cholesky(&array![[f64::NAN, 0.0], [0.0, 1.0]]).is_none());
}

#[test]
fn test_logistic_transforms() {
    assert_eq!(logistic(0.0), 0.5);
    assert!((logit(logistic(1.7)) - 1.7).abs() < 1e-12);
    assert!(logistic(-800.0) >= 0.0);
    assert!(logistic(800.0) <= 1.0);

    assert!((softplus(0.0) - 2.0f64.ln()).abs() < 1e-12);
    assert!((softplus(800.0) - 800.0).abs() < 1e-9);
    assert!(softplus(-800.0) >= 0.0);
}

#[test]
fn test_quantiles() {
    let values: Vec<f64> = (1..=101).map(f64::from).collect();
    let q = quantiles(&values, &[0.0, 0.5, 1.0]);

    assert_eq!(q[0], 1.0);
    assert!((q[1] - 51.0).abs() < 1e-9);
    assert_eq!(q[2], 101.0);

    let (lower, upper) = central_interval(&values, 0.95);
    assert!(lower < upper);
    assert!((lower - 3.5).abs() < 1.0);
    assert!((upper - 98.5).abs() < 1.0);

    assert!(quantiles(&[], &[0.5])[0].is_nan());
}

#[test]
fn test_central_interval_of_constant() {
    let values = Array1::from_elem(10, 3.0).to_vec();
    assert_eq!(central_interval(&values, 0.9), (3.0, 3.0));
}
