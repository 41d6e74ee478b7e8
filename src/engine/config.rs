// src/engine/config.rs

use serde::{Deserialize, Serialize};

use crate::engine::error::{BacktestError, Result};

/// How the margin cap is split between the two sides of the book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginPolicy {
    /// One allowance shared by longs and shorts (batch engine).
    #[default]
    Combined,
    /// Longs and shorts each get the full allowance (live loop).
    Directional,
}

/// Every knob the engine reads. No field has a baked-in value except
/// `margin_policy`, which falls back to `Combined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub sl_mult:               f64,  // stop distance in ATRs
    pub tp_mult:               f64,  // target distance in ATRs
    pub initial_balance:       f64,
    pub position_size:         f64,  // lots per trade
    pub conf_threshold:        f64,  // min model confidence
    pub atr_norm_threshold:    f64,  // min atr/close
    pub contract_size:         f64,
    pub leverage:              f64,
    pub margin_limit_fraction: f64,  // of balance, in (0, 1]
    #[serde(default)]
    pub margin_policy:         MarginPolicy,
}

fn require(name: &'static str, value: f64, ok: bool, reason: &'static str) -> Result<()> {
    if !value.is_finite() {
        return Err(BacktestError::InvalidParameter { name, value, reason: "must be finite" });
    }
    if !ok {
        return Err(BacktestError::InvalidParameter { name, value, reason });
    }
    Ok(())
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        require("sl_mult", self.sl_mult, self.sl_mult > 0.0, "must be > 0")?;
        require("tp_mult", self.tp_mult, self.tp_mult > 0.0, "must be > 0")?;
        require("initial_balance", self.initial_balance, self.initial_balance > 0.0, "must be > 0")?;
        require("position_size", self.position_size, self.position_size > 0.0, "must be > 0")?;
        require(
            "conf_threshold",
            self.conf_threshold,
            (0.0..=1.0).contains(&self.conf_threshold),
            "must lie in [0, 1]",
        )?;
        require(
            "atr_norm_threshold",
            self.atr_norm_threshold,
            self.atr_norm_threshold >= 0.0,
            "must be >= 0",
        )?;
        require("contract_size", self.contract_size, self.contract_size > 0.0, "must be > 0")?;
        require("leverage", self.leverage, self.leverage > 0.0, "must be > 0")?;
        require(
            "margin_limit_fraction",
            self.margin_limit_fraction,
            self.margin_limit_fraction > 0.0 && self.margin_limit_fraction <= 1.0,
            "must lie in (0, 1]",
        )?;
        Ok(())
    }

    /// Parse a JSON object and validate it.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: BacktestConfig = serde_json::from_str(raw)
            .map_err(|e| BacktestError::InvalidConfig { reason: e.to_string() })?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
pub(crate) fn sample_config() -> BacktestConfig {
    BacktestConfig {
        sl_mult:               1.0,
        tp_mult:               2.0,
        initial_balance:       1000.0,
        position_size:         1.0,
        conf_threshold:        0.5,
        atr_norm_threshold:    0.0,
        contract_size:         1.0,
        leverage:              20.0,
        margin_limit_fraction: 0.5,
        margin_policy:         MarginPolicy::Combined,
    }
}
