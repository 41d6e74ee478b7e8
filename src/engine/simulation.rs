// src/engine/simulation.rs

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::account::{AccountState, FinalAccountState};
use crate::engine::config::BacktestConfig;
use crate::engine::error::Result;
use crate::engine::exposure::{EquityPoint, ExposureSnapshot};
use crate::engine::position::{Position, PositionId, Trade};
use crate::engine::scan_entries::{admit_entry, Admission, SkipCounts, SkipReason};
use crate::engine::series::{check_alignment, Bar, BarSeries, Signal, SignalSeries};
use crate::engine::simulate_exits::PositionLedger;

/// What one bar did to the account.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub account: AccountState,
    pub closed:  Vec<Trade>,
    pub opened:  Option<PositionId>,
    pub skipped: Option<SkipReason>,
}

/// Exits first, then at most one entry. The account is taken by value and
/// handed back so a step has no hidden state besides the ledger.
pub fn step(
    mut account: AccountState,
    ledger: &mut PositionLedger,
    index: usize,
    bar: &Bar,
    signal: &Signal,
    config: &BacktestConfig,
) -> Result<StepOutcome> {
    // 1) Exits, in admission order
    let closed = ledger.evaluate_exits(index, bar, config.tp_mult, config.sl_mult);
    for trade in &closed {
        account.settle(trade);
    }

    // 2) Entry gate
    let (opened, skipped) =
        match admit_entry(index, bar, signal, &account, config, ledger.next_id())? {
            Admission::Admitted(position) => {
                let id = position.position_id;
                account.reserve(&position);
                ledger.insert(position);
                (Some(id), None)
            }
            Admission::Skipped(reason) => {
                debug!(index, ?reason, "entry skipped");
                (None, Some(reason))
            }
        };

    Ok(StepOutcome { account, closed, opened, skipped })
}

#[derive(Clone, Debug, Serialize)]
pub struct BacktestResult {
    pub trades:         Vec<Trade>,
    pub equity_curve:   Vec<EquityPoint>,
    pub exposure:       Vec<ExposureSnapshot>,
    /// Still open after the last bar; never force-closed.
    pub open_positions: Vec<Position>,
    pub final_state:    FinalAccountState,
    pub skips:          SkipCounts,
}

/// A validated configuration ready to replay series.
#[derive(Clone, Debug)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Backtest { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay bars 1..N. Bar 0 is context only.
    pub fn run(&self, bars: &BarSeries, signals: &SignalSeries) -> Result<BacktestResult> {
        check_alignment(bars, signals)?;

        let n = bars.len();
        let mut account = AccountState::new(self.config.initial_balance);
        let mut ledger = PositionLedger::new();
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(n - 1);
        let mut exposure = Vec::with_capacity(n - 1);
        let mut skips = SkipCounts::default();

        for (i, (bar, signal)) in bars.bars().iter().zip(signals.signals()).enumerate().skip(1) {
            let outcome = step(account, &mut ledger, i, bar, signal, &self.config)?;
            account = outcome.account;
            trades.extend(outcome.closed);
            if let Some(reason) = outcome.skipped {
                skips.record(reason);
            }

            equity_curve.push(EquityPoint { timestamp: bar.timestamp, equity: account.balance });
            exposure.push(ExposureSnapshot::capture(bar.timestamp, &account, &ledger));
        }

        let final_state = FinalAccountState {
            final_balance:     account.balance,
            final_used_margin: account.used_margin,
            count_still_open:  ledger.len(),
        };
        if final_state.count_still_open > 0 {
            warn!(
                still_open = final_state.count_still_open,
                reserved = final_state.final_used_margin,
                "positions open at end of series are excluded from the trade log"
            );
        }
        info!(
            bars = n,
            trades = trades.len(),
            final_balance = final_state.final_balance,
            skipped = skips.total(),
            still_open = final_state.count_still_open,
            "backtest finished"
        );

        Ok(BacktestResult {
            trades,
            equity_curve,
            exposure,
            open_positions: ledger.into_positions(),
            final_state,
            skips,
        })
    }
}

/// Validate `config`, then replay.
pub fn run_backtest(
    bars: &BarSeries,
    signals: &SignalSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult> {
    Backtest::new(config.clone())?.run(bars, signals)
}
