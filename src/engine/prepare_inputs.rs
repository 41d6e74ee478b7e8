// src/engine/prepare_inputs.rs

use crate::engine::error::{BacktestError, Result};

/// All columns must share one length; returns it.
pub fn common_length(columns: &[(&str, usize)]) -> Result<usize> {
    let Some(&(first_name, len)) = columns.first() else {
        return Err(BacktestError::validation("no input columns"));
    };
    for &(name, l) in columns {
        if l != len {
            return Err(BacktestError::validation(format!(
                "'{name}' length {l} != '{first_name}' length {len}"
            )));
        }
    }
    Ok(len)
}

pub fn check_timestamps(ts: &[f64]) -> Result<()> {
    if let Some(i) = ts.iter().position(|t| !t.is_finite()) {
        return Err(BacktestError::validation(format!("timestamp at index {i} is not finite")));
    }
    if let Some(i) = ts.windows(2).position(|w| w[1] <= w[0]) {
        return Err(BacktestError::validation(format!(
            "timestamps must be strictly increasing (index {} -> {})",
            i,
            i + 1
        )));
    }
    Ok(())
}

/// Prices must be finite and non-negative.
pub fn check_prices(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|x| !x.is_finite() || *x < 0.0) {
        Some(i) => Err(BacktestError::validation(format!(
            "'{name}' has invalid price {} at index {i}",
            values[i]
        ))),
        None => Ok(()),
    }
}

pub fn check_ranges(high: &[f64], low: &[f64]) -> Result<()> {
    match high.iter().zip(low).position(|(h, l)| l > h) {
        Some(i) => Err(BacktestError::validation(format!(
            "low {} above high {} at index {i}",
            low[i], high[i]
        ))),
        None => Ok(()),
    }
}

/// ATR may be NaN (warm-up) but never negative or infinite.
pub fn check_atr(atr: &[f64]) -> Result<()> {
    match atr.iter().position(|a| a.is_infinite() || *a < 0.0) {
        Some(i) => Err(BacktestError::validation(format!("invalid atr {} at index {i}", atr[i]))),
        None => Ok(()),
    }
}

pub fn check_confidence(conf: &[f64]) -> Result<()> {
    match conf.iter().position(|c| !(0.0..=1.0).contains(c)) {
        Some(i) => Err(BacktestError::validation(format!(
            "confidence {} outside [0, 1] at index {i}",
            conf[i]
        ))),
        None => Ok(()),
    }
}
