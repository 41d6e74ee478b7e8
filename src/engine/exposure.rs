// src/engine/exposure.rs

use serde::{Deserialize, Serialize};

use crate::engine::account::AccountState;
use crate::engine::position::Direction;
use crate::engine::simulate_exits::PositionLedger;

/// Realized balance after a bar's exits and entry are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: f64,
    pub equity:    f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    pub timestamp:      f64,
    pub long_exposure:  f64,  // sum of open long lots
    pub short_exposure: f64,  // sum of open short lots
    pub long_margin:    f64,
    pub short_margin:   f64,
    pub used_margin:    f64,
    pub balance:        f64,
    pub open_positions: usize,
}

impl ExposureSnapshot {
    pub fn capture(timestamp: f64, account: &AccountState, ledger: &PositionLedger) -> Self {
        ExposureSnapshot {
            timestamp,
            long_exposure:  ledger.open_size(Direction::Long),
            short_exposure: ledger.open_size(Direction::Short),
            long_margin:    account.by_side.long,
            short_margin:   account.by_side.short,
            used_margin:    account.used_margin,
            balance:        account.balance,
            open_positions: ledger.len(),
        }
    }

    pub fn total_exposure(&self) -> f64 {
        self.long_exposure + self.short_exposure
    }
}
