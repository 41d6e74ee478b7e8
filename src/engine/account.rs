// src/engine/account.rs

use serde::{Deserialize, Serialize};

use crate::engine::margin::MarginUsage;
use crate::engine::position::{Direction, Position, Trade};

/// Realized balance and reserved margin. Owned by one run; moved through
/// each simulation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccountState {
    pub balance:     f64,
    pub used_margin: f64,
    pub by_side:     MarginUsage,
}

impl AccountState {
    pub fn new(initial_balance: f64) -> Self {
        AccountState {
            balance:     initial_balance,
            used_margin: 0.0,
            by_side:     MarginUsage::default(),
        }
    }

    pub fn reserve(&mut self, position: &Position) {
        self.used_margin += position.margin_reserved;
        match position.direction {
            Direction::Long  => self.by_side.long += position.margin_reserved,
            Direction::Short => self.by_side.short += position.margin_reserved,
        }
    }

    /// Release the trade's margin and book its pnl.
    pub fn settle(&mut self, trade: &Trade) {
        let margin = trade.position.margin_reserved;
        self.used_margin -= margin;
        match trade.position.direction {
            Direction::Long  => self.by_side.long -= margin,
            Direction::Short => self.by_side.short -= margin,
        }
        self.balance += trade.pnl;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalAccountState {
    pub final_balance:     f64,
    pub final_used_margin: f64,
    pub count_still_open:  usize,
}
