//! Python bindings so plotting code can consume the pipeline's tables as
//! NumPy arrays.

use numpy::{PyArray1, PyArray2, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::Config;
use crate::data::{Dataset, PredictorEncoding};
use crate::error::RegressionError;
use crate::pipeline::Pipeline;
use crate::posterior::PosteriorSamples;
use crate::predictive::PredictiveSimulator;
use crate::sampler::{AdaptiveMetropolis, EnsembleSampler, PosteriorSampler};

impl From<RegressionError> for PyErr {
    fn from(err: RegressionError) -> Self {
        match err {
            RegressionError::SamplingFailure { .. } => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

type Columns<'py> = (
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
);

fn parse_config(config_json: Option<&str>) -> Result<Config, RegressionError> {
    match config_json {
        Some(json) => Config::from_json(json),
        None => Ok(Config::default()),
    }
}

/// Draws (intercept, slope, sigma) from the priors of `config_json`.
#[pyfunction]
#[pyo3(signature = (config_json=None))]
fn simulate_priors<'py>(py: Python<'py>, config_json: Option<&str>) -> PyResult<Columns<'py>> {
    let pipeline = Pipeline::new(parse_config(config_json)?)?;
    let draws = pipeline.simulate_priors()?;
    Ok((
        PyArray1::from_array_bound(py, &draws.intercept),
        PyArray1::from_array_bound(py, &draws.slope),
        PyArray1::from_array_bound(py, &draws.sigma),
    ))
}

/// Prior predictive lines, one row per prior draw and one column per query.
#[pyfunction]
#[pyo3(signature = (queries, config_json=None))]
fn prior_lines<'py>(
    py: Python<'py>,
    queries: PyReadonlyArray1<'py, f64>,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let pipeline = Pipeline::new(parse_config(config_json)?)?;
    let draws = pipeline.simulate_priors()?;
    let queries = queries.as_array().to_vec();
    Ok(PyArray2::from_owned_array_bound(
        py,
        draws.predictive_lines(&queries),
    ))
}

/// Samples the posterior and returns its (intercept, slope, sigma) columns.
#[pyfunction]
#[pyo3(signature = (predictor, outcome, encoding="centered", sampler="metropolis", config_json=None))]
fn fit_posterior<'py>(
    py: Python<'py>,
    predictor: PyReadonlyArray1<'py, f64>,
    outcome: PyReadonlyArray1<'py, f64>,
    encoding: &str,
    sampler: &str,
    config_json: Option<&str>,
) -> PyResult<Columns<'py>> {
    let sampler: Box<dyn PosteriorSampler + Send + Sync> = match sampler {
        "metropolis" => Box::new(AdaptiveMetropolis::default()),
        "ensemble" => Box::new(EnsembleSampler::default()),
        other => {
            return Err(RegressionError::invalid(
                "sampler",
                format!("unknown sampler `{other}`, expected `metropolis` or `ensemble`"),
            )
            .into())
        }
    };
    let encoding: PredictorEncoding = encoding.parse()?;
    let data = Dataset::new(predictor.as_array().to_vec(), outcome.as_array().to_vec())?;
    let pipeline = Pipeline::new(parse_config(config_json)?)?;
    let posterior = py.allow_threads(|| pipeline.fit(&data, sampler.as_ref(), encoding))?;
    Ok((
        PyArray1::from_array_bound(py, posterior.intercept()),
        PyArray1::from_array_bound(py, posterior.slope()),
        PyArray1::from_array_bound(py, posterior.sigma()),
    ))
}

/// Lower and upper predictive bounds at each query (in the encoding the
/// posterior columns were fit under).
#[pyfunction]
#[pyo3(signature = (intercept, slope, sigma, queries, seed=1999, mass=0.95))]
fn predictive_intervals<'py>(
    py: Python<'py>,
    intercept: PyReadonlyArray1<'py, f64>,
    slope: PyReadonlyArray1<'py, f64>,
    sigma: PyReadonlyArray1<'py, f64>,
    queries: PyReadonlyArray1<'py, f64>,
    seed: u64,
    mass: f64,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let samples = PosteriorSamples::from_columns(
        intercept.as_array().to_vec(),
        slope.as_array().to_vec(),
        sigma.as_array().to_vec(),
    )?;
    let simulator = PredictiveSimulator::new(&samples, mass)?;
    let intervals = simulator.intervals(&queries.as_array().to_vec(), seed);
    let (lower, upper): (Vec<f64>, Vec<f64>) =
        intervals.iter().map(|i| (i.lower, i.upper)).unzip();
    Ok((
        PyArray1::from_vec_bound(py, lower),
        PyArray1::from_vec_bound(py, upper),
    ))
}

#[pymodule]
fn heatfit(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(simulate_priors, m)?)?;
    m.add_function(wrap_pyfunction!(prior_lines, m)?)?;
    m.add_function(wrap_pyfunction!(fit_posterior, m)?)?;
    m.add_function(wrap_pyfunction!(predictive_intervals, m)?)?;

    Ok(())
}
