// src/python.rs

use numpy::PyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::engine::metrics::{
    compute_summary_metrics, profit_by_conf_and_direction, profit_by_confidence,
    ConfidenceBucket, SideTradeMetrics, CONFIDENCE_BUCKET_WIDTH, M5_PERIODS_PER_YEAR,
};
use crate::engine::{
    self, BacktestConfig, BacktestError, BacktestResult, BarSeries, MarginPolicy, SignalSeries,
};

impl From<BacktestError> for PyErr {
    fn from(err: BacktestError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_policy(raw: &str) -> PyResult<MarginPolicy> {
    match raw {
        "combined"    => Ok(MarginPolicy::Combined),
        "directional" => Ok(MarginPolicy::Directional),
        other => Err(PyValueError::new_err(format!(
            "margin_policy must be 'combined' or 'directional', got '{other}'"
        ))),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_series(
    timestamp:  &PyArray1<f64>,
    open:       &PyArray1<f64>,
    high:       &PyArray1<f64>,
    low:        &PyArray1<f64>,
    close:      &PyArray1<f64>,
    atr:        &PyArray1<f64>,
    direction:  &PyArray1<i64>,
    confidence: &PyArray1<f64>,
) -> PyResult<(BarSeries, SignalSeries)> {
    let col = |a: &PyArray1<f64>| a.readonly().as_array().to_vec();
    let bars = BarSeries::from_columns(
        &col(timestamp),
        &col(open),
        &col(high),
        &col(low),
        &col(close),
        &col(atr),
    )?;
    let dirs = direction.readonly().as_array().to_vec();
    let signals = SignalSeries::from_columns(&dirs, &col(confidence))?;
    Ok((bars, signals))
}

fn trade_metrics_dict<'py>(py: Python<'py>, tm: &SideTradeMetrics) -> PyResult<&'py PyDict> {
    let d = PyDict::new(py);
    d.set_item("number_of_trades", tm.number_of_trades)?;
    d.set_item("win_rate",         tm.win_rate)?;
    d.set_item("loss_rate",        tm.loss_rate)?;
    d.set_item("average_pnl",      tm.average_pnl)?;
    d.set_item("gross_profit",     tm.gross_profit)?;
    d.set_item("gross_loss",       tm.gross_loss)?;
    d.set_item("profit_factor",    tm.profit_factor)?;
    d.set_item("payoff_ratio",     tm.payoff_ratio)?;
    d.set_item("expectancy",       tm.expectancy)?;
    d.set_item("average_holding",  tm.average_holding)?;
    Ok(d)
}

fn bucket_list<'py>(py: Python<'py>, buckets: &[ConfidenceBucket]) -> PyResult<&'py PyList> {
    let out = PyList::empty(py);
    for b in buckets {
        let d = PyDict::new(py);
        d.set_item("bucket", &b.label)?;
        d.set_item("count",  b.count)?;
        d.set_item("sum",    b.sum)?;
        d.set_item("mean",   b.mean)?;
        out.append(d)?;
    }
    Ok(out)
}

fn result_dict(py: Python<'_>, res: &BacktestResult) -> PyResult<PyObject> {
    let out = PyDict::new(py);

    // 1) trade log
    let trades = PyList::empty(py);
    for t in &res.trades {
        let p = &t.position;
        let d = PyDict::new(py);
        d.set_item("position_id",  p.position_id)?;
        d.set_item("direction",    p.direction.sign() as i64)?;
        d.set_item("entry_time",   p.entry_time)?;
        d.set_item("entry_index",  p.entry_index)?;
        d.set_item("entry_price",  p.entry_price)?;
        d.set_item("size",         p.size)?;
        d.set_item("atr",          p.atr_at_entry)?;
        d.set_item("confidence",   p.confidence_at_entry)?;
        d.set_item("atr_norm",     p.atr_norm_at_entry)?;
        d.set_item("margin",       p.margin_reserved)?;
        d.set_item("exit_time",    t.exit_time)?;
        d.set_item("exit_price",   t.exit_price)?;
        d.set_item("exit_reason",  format!("{:?}", t.exit_reason))?;
        d.set_item("pnl",          t.pnl)?;
        d.set_item("pnl_points",   t.pnl_points)?;
        d.set_item("holding_bars", t.holding_bars)?;
        trades.append(d)?;
    }
    out.set_item("trades", trades)?;

    // 2) equity curve
    let times: Vec<f64> = res.equity_curve.iter().map(|p| p.timestamp).collect();
    let equity: Vec<f64> = res.equity_curve.iter().map(|p| p.equity).collect();
    let used: Vec<f64> = res.exposure.iter().map(|s| s.used_margin).collect();
    let exposure: Vec<f64> = res.exposure.iter().map(|s| s.total_exposure()).collect();
    out.set_item("equity_time", PyList::new(py, &times))?;
    out.set_item("equity",      PyList::new(py, &equity))?;
    out.set_item("used_margin", PyList::new(py, &used))?;
    out.set_item("exposure",    PyList::new(py, &exposure))?;

    // 3) final state + diagnostics
    let fs = PyDict::new(py);
    fs.set_item("final_balance",     res.final_state.final_balance)?;
    fs.set_item("final_used_margin", res.final_state.final_used_margin)?;
    fs.set_item("count_still_open",  res.final_state.count_still_open)?;
    out.set_item("final_state", fs)?;

    let skips = PyDict::new(py);
    skips.set_item("low_volatility", res.skips.low_volatility)?;
    skips.set_item("low_confidence", res.skips.low_confidence)?;
    skips.set_item("no_direction",   res.skips.no_direction)?;
    skips.set_item("invalid_atr",    res.skips.invalid_atr)?;
    skips.set_item("margin_limit",   res.skips.margin_limit)?;
    out.set_item("skips", skips)?;

    // 4) metrics
    let summary = compute_summary_metrics(&res.trades, &res.equity_curve, M5_PERIODS_PER_YEAR);
    let m = PyDict::new(py);
    m.set_item("total_pnl",    summary.total_pnl)?;
    m.set_item("sharpe_ratio", summary.equity.sharpe_ratio)?;
    m.set_item("max_drawdown", summary.equity.max_drawdown)?;
    m.set_item("cumulative_return", summary.equity.cumulative_return)?;
    m.set_item("overall", trade_metrics_dict(py, &summary.overall)?)?;
    m.set_item("long",    trade_metrics_dict(py, &summary.longs)?)?;
    m.set_item("short",   trade_metrics_dict(py, &summary.shorts)?)?;
    out.set_item("metrics", m)?;

    // 5) pnl by entry confidence, overall and per side
    let split = profit_by_conf_and_direction(&res.trades, CONFIDENCE_BUCKET_WIDTH);
    let cb = PyDict::new(py);
    let overall = profit_by_confidence(&res.trades, CONFIDENCE_BUCKET_WIDTH);
    cb.set_item("overall", bucket_list(py, &overall)?)?;
    cb.set_item("long",  bucket_list(py, &split.long)?)?;
    cb.set_item("short", bucket_list(py, &split.short)?)?;
    out.set_item("confidence_buckets", cb)?;

    Ok(out.into())
}

#[pyfunction]
#[pyo3(signature=(
    timestamp, open, high, low, close, atr,
    direction, confidence,
    sl_mult, tp_mult, initial_balance, position_size,
    conf_threshold, atr_norm_threshold,
    contract_size, leverage, margin_limit_fraction,
    margin_policy = "combined"
))]
#[allow(clippy::too_many_arguments)]
pub fn run_backtest(
    py:                    Python<'_>,
    timestamp:             &PyArray1<f64>,
    open:                  &PyArray1<f64>,
    high:                  &PyArray1<f64>,
    low:                   &PyArray1<f64>,
    close:                 &PyArray1<f64>,
    atr:                   &PyArray1<f64>,
    direction:             &PyArray1<i64>,
    confidence:            &PyArray1<f64>,
    sl_mult:               f64,
    tp_mult:               f64,
    initial_balance:       f64,
    position_size:         f64,
    conf_threshold:        f64,
    atr_norm_threshold:    f64,
    contract_size:         f64,
    leverage:              f64,
    margin_limit_fraction: f64,
    margin_policy:         &str,
) -> PyResult<PyObject> {
    let (bars, signals) =
        build_series(timestamp, open, high, low, close, atr, direction, confidence)?;
    let config = BacktestConfig {
        sl_mult,
        tp_mult,
        initial_balance,
        position_size,
        conf_threshold,
        atr_norm_threshold,
        contract_size,
        leverage,
        margin_limit_fraction,
        margin_policy: parse_policy(margin_policy)?,
    };

    let res = py.allow_threads(|| engine::run_backtest(&bars, &signals, &config))?;
    result_dict(py, &res)
}

/// `configs` is a list of JSON objects, one per run.
#[pyfunction]
#[pyo3(signature=(
    timestamp, open, high, low, close, atr,
    direction, confidence, configs,
    periods_per_year = M5_PERIODS_PER_YEAR
))]
#[allow(clippy::too_many_arguments)]
pub fn run_sweep(
    py:               Python<'_>,
    timestamp:        &PyArray1<f64>,
    open:             &PyArray1<f64>,
    high:             &PyArray1<f64>,
    low:              &PyArray1<f64>,
    close:            &PyArray1<f64>,
    atr:              &PyArray1<f64>,
    direction:        &PyArray1<i64>,
    confidence:       &PyArray1<f64>,
    configs:          Vec<String>,
    periods_per_year: f64,
) -> PyResult<PyObject> {
    let (bars, signals) =
        build_series(timestamp, open, high, low, close, atr, direction, confidence)?;
    let configs = configs
        .iter()
        .map(|raw| BacktestConfig::from_json_str(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes =
        py.allow_threads(|| engine::run_sweep(&bars, &signals, &configs, periods_per_year))?;

    let out = PyList::empty(py);
    for o in &outcomes {
        let d = PyDict::new(py);
        let cfg = serde_json::to_string(&o.config)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        d.set_item("config",        cfg)?;
        d.set_item("objective",     o.objective)?;
        d.set_item("sharpe",        o.sharpe)?;
        d.set_item("final_balance", o.final_balance)?;
        d.set_item("trades",        o.trades)?;
        out.append(d)?;
    }
    Ok(out.into())
}
