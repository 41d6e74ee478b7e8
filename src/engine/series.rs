// src/engine/series.rs

use serde::{Deserialize, Serialize};

use crate::engine::error::{BacktestError, Result};
use crate::engine::position::Direction;
use crate::engine::prepare_inputs::{
    check_atr, check_confidence, check_prices, check_ranges, check_timestamps, common_length,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: f64,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub atr:       f64,
    pub atr_norm:  f64,  // atr / close
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction:  Option<Direction>,
    pub confidence: f64,
}

/// Validated, time-ordered OHLC + ATR bars.
#[derive(Clone, Debug, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn from_columns(
        timestamp: &[f64],
        open: &[f64],
        high: &[f64],
        low: &[f64],
        close: &[f64],
        atr: &[f64],
    ) -> Result<Self> {
        let n = common_length(&[
            ("timestamp", timestamp.len()),
            ("open", open.len()),
            ("high", high.len()),
            ("low", low.len()),
            ("close", close.len()),
            ("atr", atr.len()),
        ])?;
        check_timestamps(timestamp)?;
        for (name, col) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            check_prices(name, col)?;
        }
        check_ranges(high, low)?;
        check_atr(atr)?;

        let bars = (0..n)
            .map(|i| Bar {
                timestamp: timestamp[i],
                open:      open[i],
                high:      high[i],
                low:       low[i],
                close:     close[i],
                atr:       atr[i],
                atr_norm:  atr[i] / close[i],
            })
            .collect();
        Ok(BarSeries { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

/// Model output aligned index-for-index with a `BarSeries`.
#[derive(Clone, Debug, Default)]
pub struct SignalSeries {
    signals: Vec<Signal>,
}

impl SignalSeries {
    pub fn from_columns(direction: &[i64], confidence: &[f64]) -> Result<Self> {
        common_length(&[("direction", direction.len()), ("confidence", confidence.len())])?;
        check_confidence(confidence)?;
        let signals = direction
            .iter()
            .zip(confidence)
            .map(|(&d, &c)| -> Result<Signal> {
                Ok(Signal {
                    direction:  Direction::from_signal(d)?,
                    confidence: c,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SignalSeries { signals })
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }
}

/// Cross-series checks run once before the loop.
pub fn check_alignment(bars: &BarSeries, signals: &SignalSeries) -> Result<()> {
    common_length(&[("bars", bars.len()), ("signals", signals.len())])?;
    if bars.len() < 2 {
        return Err(BacktestError::validation(format!(
            "need at least 2 bars, got {}",
            bars.len()
        )));
    }
    Ok(())
}
