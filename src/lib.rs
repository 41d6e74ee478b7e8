// src/lib.rs

pub mod engine;

#[cfg(feature = "python")]
mod python;

pub use engine::{
    run_backtest, run_sweep, Backtest, BacktestConfig, BacktestError, BacktestResult, BarSeries,
    MarginPolicy, SignalSeries,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn hedge_backtester(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(python::run_backtest, m)?)?;
    m.add_function(wrap_pyfunction!(python::run_sweep, m)?)?;
    Ok(())
}
