// src/engine/position.rs

use serde::{Deserialize, Serialize};

use crate::engine::error::{BacktestError, Result};

/// Synthetic key of an open position; allocated in admission order.
pub type PositionId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Model output -1 / 0 / +1. Zero means "no trade".
    pub fn from_signal(raw: i64) -> Result<Option<Direction>> {
        match raw {
            1  => Ok(Some(Direction::Long)),
            -1 => Ok(Some(Direction::Short)),
            0  => Ok(None),
            other => Err(BacktestError::validation(format!(
                "direction must be -1, 0 or 1, got {other}"
            ))),
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Long  => 1.0,
            Direction::Short => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id:         PositionId,
    pub entry_time:          f64,
    pub entry_index:         usize,      // bar of fill
    pub entry_price:         f64,        // bar close
    pub direction:           Direction,
    pub size:                f64,        // lots
    pub atr_at_entry:        f64,        // frozen for the life of the trade
    pub confidence_at_entry: f64,
    pub atr_norm_at_entry:   f64,
    pub margin_reserved:     f64,
}

impl Position {
    pub fn take_profit(&self, tp_mult: f64) -> f64 {
        self.entry_price + self.direction.sign() * tp_mult * self.atr_at_entry
    }

    pub fn stop_loss(&self, sl_mult: f64) -> f64 {
        self.entry_price - self.direction.sign() * sl_mult * self.atr_at_entry
    }

    /// Convert into a closed trade filled at `exit_price` on bar `exit_index`.
    pub fn close(
        self,
        exit_index: usize,
        exit_time: f64,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Trade {
        let pnl_points = (exit_price - self.entry_price) * self.direction.sign();
        Trade {
            pnl:          pnl_points * self.size,
            holding_bars: exit_index - self.entry_index,
            pnl_points,
            exit_time,
            exit_price,
            exit_reason,
            position:     self,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(flatten)]
    pub position:     Position,
    pub exit_time:    f64,
    pub exit_price:   f64,
    pub exit_reason:  ExitReason,
    pub pnl:          f64,        // pnl_points * size
    pub pnl_points:   f64,
    pub holding_bars: usize,
}
