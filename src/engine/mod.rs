// src/engine/mod.rs

pub mod account;
pub mod config;
pub mod error;
pub mod exposure;
pub mod margin;
pub mod metrics;
pub mod position;
pub mod prepare_inputs;
pub mod scan_entries;
pub mod series;
pub mod simulate_exits;
pub mod simulation;
pub mod sweep;

pub use account::{AccountState, FinalAccountState};
pub use config::{BacktestConfig, MarginPolicy};
pub use error::{BacktestError, Result};
pub use exposure::{EquityPoint, ExposureSnapshot};
pub use position::{Direction, ExitReason, Position, PositionId, Trade};
pub use scan_entries::{admit_entry, Admission, SkipCounts, SkipReason};
pub use series::{Bar, BarSeries, Signal, SignalSeries};
pub use simulate_exits::PositionLedger;
pub use simulation::{run_backtest, step, Backtest, BacktestResult, StepOutcome};
pub use sweep::{best_outcome, run_sweep, SweepOutcome};
