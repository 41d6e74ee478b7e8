// src/engine/sweep.rs

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::engine::config::BacktestConfig;
use crate::engine::error::Result;
use crate::engine::metrics::{equity_returns, sharpe_ratio};
use crate::engine::series::{BarSeries, SignalSeries};
use crate::engine::simulation::{run_backtest, BacktestResult};

/// Score for a run that produced no equity points or no trades.
pub const EMPTY_RUN_SCORE: f64 = -1e6;

/// Runs with fewer closed trades have their score halved.
pub const MIN_TRADES_FOR_FULL_SCORE: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub config:        BacktestConfig,
    pub objective:     f64,
    pub sharpe:        f64,
    pub final_balance: f64,
    pub trades:        usize,
}

/// Sharpe times normalized net pnl.
pub fn objective(result: &BacktestResult, initial_balance: f64, periods_per_year: f64) -> f64 {
    if result.equity_curve.is_empty() || result.trades.is_empty() {
        return EMPTY_RUN_SCORE;
    }
    let sharpe = sharpe_ratio(&equity_returns(&result.equity_curve), periods_per_year);
    let pnl_norm = (result.final_state.final_balance - initial_balance) / initial_balance;
    let score = sharpe * pnl_norm;
    if result.trades.len() < MIN_TRADES_FOR_FULL_SCORE {
        score * 0.5
    } else {
        score
    }
}

/// Independent runs in parallel; output keeps the order of `configs`.
/// The first invalid config aborts the sweep.
pub fn run_sweep(
    bars: &BarSeries,
    signals: &SignalSeries,
    configs: &[BacktestConfig],
    periods_per_year: f64,
) -> Result<Vec<SweepOutcome>> {
    let outcomes = configs
        .par_iter()
        .map(|cfg| -> Result<SweepOutcome> {
            let result = run_backtest(bars, signals, cfg)?;
            Ok(SweepOutcome {
                objective:     objective(&result, cfg.initial_balance, periods_per_year),
                sharpe:        sharpe_ratio(&equity_returns(&result.equity_curve), periods_per_year),
                final_balance: result.final_state.final_balance,
                trades:        result.trades.len(),
                config:        cfg.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(best) = best_outcome(&outcomes) {
        info!(runs = outcomes.len(), best = best.objective, "sweep finished");
    }
    Ok(outcomes)
}

pub fn best_outcome(outcomes: &[SweepOutcome]) -> Option<&SweepOutcome> {
    outcomes
        .iter()
        .filter(|o| !o.objective.is_nan())
        .max_by(|a, b| a.objective.total_cmp(&b.objective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::sample_config;
    use crate::engine::metrics::M5_PERIODS_PER_YEAR;

    fn series() -> (BarSeries, SignalSeries) {
        let close = [100.0, 101.0, 103.0, 98.0, 99.0];
        let ts = [0.0, 1.0, 2.0, 3.0, 4.0];
        let bars = BarSeries::from_columns(&ts, &close, &close, &close, &close, &[1.0; 5]).unwrap();
        let signals = SignalSeries::from_columns(&[0, 1, 0, 0, 0], &[0.0, 0.9, 0.0, 0.0, 0.0]).unwrap();
        (bars, signals)
    }

    #[test]
    fn no_trades_scores_minus_a_million() {
        let (bars, signals) = series();
        let cfg = BacktestConfig { conf_threshold: 0.95, ..sample_config() };
        let out = run_sweep(&bars, &signals, &[cfg], M5_PERIODS_PER_YEAR).unwrap();
        assert_eq!(out[0].objective, EMPTY_RUN_SCORE);
        assert_eq!(out[0].trades, 0);
    }

    #[test]
    fn order_is_preserved() {
        let (bars, signals) = series();
        let configs: Vec<_> = [0.3, 0.95, 0.5]
            .iter()
            .map(|&c| BacktestConfig { conf_threshold: c, ..sample_config() })
            .collect();
        let out = run_sweep(&bars, &signals, &configs, M5_PERIODS_PER_YEAR).unwrap();
        let thresholds: Vec<f64> = out.iter().map(|o| o.config.conf_threshold).collect();
        assert_eq!(thresholds, vec![0.3, 0.95, 0.5]);
        assert_eq!(out[0].trades, 1);
        assert_eq!(out[1].trades, 0);
        assert_eq!(out[2].final_balance, 1002.0);
    }

    #[test]
    fn invalid_config_aborts() {
        let (bars, signals) = series();
        let bad = BacktestConfig { tp_mult: 0.0, ..sample_config() };
        assert!(run_sweep(&bars, &signals, &[sample_config(), bad], M5_PERIODS_PER_YEAR).is_err());
    }

    #[test]
    fn best_ignores_nan() {
        let mk = |objective| SweepOutcome {
            config: sample_config(),
            objective,
            sharpe: 0.0,
            final_balance: 0.0,
            trades: 0,
        };
        let outs = vec![mk(1.0), mk(f64::NAN), mk(3.0), mk(-2.0)];
        assert_eq!(best_outcome(&outs).unwrap().objective, 3.0);
        assert!(best_outcome(&[]).is_none());
    }
}
