// src/engine/margin.rs

use crate::engine::config::MarginPolicy;
use crate::engine::error::{BacktestError, Result};
use crate::engine::position::Direction;

/// price * size * contract_size / leverage
pub fn required_margin(price: f64, size: f64, contract_size: f64, leverage: f64) -> Result<f64> {
    for (name, v) in [
        ("price", price),
        ("size", size),
        ("contract_size", contract_size),
        ("leverage", leverage),
    ] {
        if !v.is_finite() || v < 0.0 {
            return Err(BacktestError::InvalidInput {
                reason: format!("{name} must be finite and non-negative, got {v}"),
            });
        }
    }
    if leverage == 0.0 {
        return Err(BacktestError::InvalidInput { reason: "leverage must be non-zero".into() });
    }
    Ok(price * size * contract_size / leverage)
}

/// Cap is measured against realized balance, never equity.
pub fn margin_allowed(
    used_margin: f64,
    trade_margin: f64,
    balance: f64,
    margin_limit_fraction: f64,
) -> bool {
    used_margin + trade_margin <= balance * margin_limit_fraction
}

/// Margin currently reserved, split by side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarginUsage {
    pub long:  f64,
    pub short: f64,
}

impl MarginUsage {
    pub fn total(&self) -> f64 {
        self.long + self.short
    }

    pub fn side(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long  => self.long,
            Direction::Short => self.short,
        }
    }
}

/// Apply the configured policy to a prospective trade.
pub fn policy_allows(
    policy: MarginPolicy,
    usage: &MarginUsage,
    direction: Direction,
    trade_margin: f64,
    balance: f64,
    margin_limit_fraction: f64,
) -> bool {
    let used = match policy {
        MarginPolicy::Combined    => usage.total(),
        MarginPolicy::Directional => usage.side(direction),
    };
    margin_allowed(used, trade_margin, balance, margin_limit_fraction)
}
