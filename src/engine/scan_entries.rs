// src/engine/scan_entries.rs

use serde::{Deserialize, Serialize};

use crate::engine::account::AccountState;
use crate::engine::config::BacktestConfig;
use crate::engine::error::Result;
use crate::engine::margin::{policy_allows, required_margin};
use crate::engine::position::{Position, PositionId};
use crate::engine::series::{Bar, Signal};

/// Why a bar produced no entry. Not an error; counted per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    LowVolatility,
    LowConfidence,
    NoDirection,
    InvalidAtr,
    MarginLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    Admitted(Position),
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub low_volatility: usize,
    pub low_confidence: usize,
    pub no_direction:   usize,
    pub invalid_atr:    usize,
    pub margin_limit:   usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::LowVolatility => self.low_volatility += 1,
            SkipReason::LowConfidence => self.low_confidence += 1,
            SkipReason::NoDirection   => self.no_direction += 1,
            SkipReason::InvalidAtr    => self.invalid_atr += 1,
            SkipReason::MarginLimit   => self.margin_limit += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low_volatility + self.low_confidence + self.no_direction + self.invalid_atr + self.margin_limit
    }
}

/// Gate order: volatility, confidence, direction/ATR, margin. The first
/// failing gate wins and nothing is reserved.
pub fn admit_entry(
    index: usize,
    bar: &Bar,
    signal: &Signal,
    account: &AccountState,
    config: &BacktestConfig,
    position_id: PositionId,
) -> Result<Admission> {
    // 1) NaN atr_norm falls through to the ATR check below
    if bar.atr_norm < config.atr_norm_threshold {
        return Ok(Admission::Skipped(SkipReason::LowVolatility));
    }

    // 2) Model confidence
    if signal.confidence < config.conf_threshold {
        return Ok(Admission::Skipped(SkipReason::LowConfidence));
    }

    // 3) Direction and a usable ATR
    let Some(direction) = signal.direction else {
        return Ok(Admission::Skipped(SkipReason::NoDirection));
    };
    if !(bar.atr.is_finite() && bar.atr > 0.0) {
        return Ok(Admission::Skipped(SkipReason::InvalidAtr));
    }

    // 4) Margin cap against realized balance
    let trade_margin = required_margin(
        bar.close,
        config.position_size,
        config.contract_size,
        config.leverage,
    )?;
    if !policy_allows(
        config.margin_policy,
        &account.by_side,
        direction,
        trade_margin,
        account.balance,
        config.margin_limit_fraction,
    ) {
        return Ok(Admission::Skipped(SkipReason::MarginLimit));
    }

    Ok(Admission::Admitted(Position {
        position_id,
        entry_time:          bar.timestamp,
        entry_index:         index,
        entry_price:         bar.close,
        direction,
        size:                config.position_size,
        atr_at_entry:        bar.atr,
        confidence_at_entry: signal.confidence,
        atr_norm_at_entry:   bar.atr_norm,
        margin_reserved:     trade_margin,
    }))
}
