// src/engine/simulate_exits.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::position::{Direction, ExitReason, Position, PositionId, Trade};
use crate::engine::series::Bar;

/// TP/SL check against one bar's range. TP wins when both levels are
/// inside [low, high]; intrabar order is not modeled.
pub fn resolve_exit(
    position: &Position,
    bar: &Bar,
    tp_mult: f64,
    sl_mult: f64,
) -> Option<(f64, ExitReason)> {
    let tp = position.take_profit(tp_mult);
    let sl = position.stop_loss(sl_mult);

    let (hit_tp, hit_sl) = match position.direction {
        Direction::Long  => (bar.high >= tp, bar.low <= sl),
        Direction::Short => (bar.low <= tp, bar.high >= sl),
    };

    if hit_tp {
        Some((tp, ExitReason::TakeProfit))
    } else if hit_sl {
        Some((sl, ExitReason::StopLoss))
    } else {
        None
    }
}

/// The set of open positions, keyed by admission order.
#[derive(Clone, Debug, Default)]
pub struct PositionLedger {
    open:    BTreeMap<PositionId, Position>,
    next_id: PositionId,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> PositionId {
        self.next_id
    }

    pub fn insert(&mut self, position: Position) {
        self.next_id = self.next_id.max(position.position_id + 1);
        self.open.insert(position.position_id, position);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    pub fn reserved_margin(&self) -> f64 {
        self.open.values().map(|p| p.margin_reserved).sum()
    }

    pub fn open_size(&self, direction: Direction) -> f64 {
        self.open
            .values()
            .filter(|p| p.direction == direction)
            .map(|p| p.size)
            .sum()
    }

    /// Close every position whose level is touched by `bar`. Closed trades
    /// come back in admission order; survivors stay untouched.
    pub fn evaluate_exits(
        &mut self,
        index: usize,
        bar: &Bar,
        tp_mult: f64,
        sl_mult: f64,
    ) -> Vec<Trade> {
        let mut closed = Vec::new();
        for (id, pos) in std::mem::take(&mut self.open) {
            match resolve_exit(&pos, bar, tp_mult, sl_mult) {
                Some((exit_price, reason)) => {
                    debug!(
                        position_id = id,
                        index,
                        exit_price,
                        ?reason,
                        "position closed"
                    );
                    closed.push(pos.close(index, bar.timestamp, exit_price, reason));
                }
                None => {
                    self.open.insert(id, pos);
                }
            }
        }
        closed
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.open.into_values().collect()
    }
}
