// tests/backtest_properties.rs

use hedge_backtester::engine::{
    run_backtest, step, AccountState, BacktestConfig, BarSeries, Direction, ExitReason,
    MarginPolicy, PositionLedger, SignalSeries,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EPS: f64 = 1e-9;

fn config() -> BacktestConfig {
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

/// Random walk with bar ranges and a noisy model.
fn random_inputs(seed: u64, n: usize) -> (BarSeries, SignalSeries) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ts = Vec::with_capacity(n);
    let (mut open, mut high, mut low, mut close, mut atr) =
        (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let mut dir = Vec::with_capacity(n);
    let mut conf = Vec::with_capacity(n);

    let mut px = 1000.0_f64;
    for i in 0..n {
        let o = px;
        let c = (o + rng.random_range(-4.0..4.0)).max(1.0);
        let h = o.max(c) + rng.random_range(0.0..3.0);
        let l = (o.min(c) - rng.random_range(0.0..3.0)).max(0.5);
        ts.push(1_700_000_000.0 + i as f64 * 300.0);
        open.push(o);
        high.push(h);
        low.push(l);
        close.push(c);
        atr.push(rng.random_range(0.5..3.0));
        dir.push(rng.random_range(-1..=1_i64));
        conf.push(rng.random_range(0.0..1.0));
        px = c;
    }
    (
        BarSeries::from_columns(&ts, &open, &high, &low, &close, &atr).unwrap(),
        SignalSeries::from_columns(&dir, &conf).unwrap(),
    )
}

#[test]
fn used_margin_matches_open_positions_every_bar() {
    for seed in 0..20 {
        let (bars, signals) = random_inputs(seed, 400);
        let cfg = BacktestConfig {
            margin_limit_fraction: 0.3,
            margin_policy: if seed % 2 == 0 { MarginPolicy::Combined } else { MarginPolicy::Directional },
            ..config()
        };

        let mut account = AccountState::new(cfg.initial_balance);
        let mut ledger = PositionLedger::new();
        for i in 1..bars.len() {
            let out = step(account, &mut ledger, i, &bars.bars()[i], &signals.signals()[i], &cfg)
                .unwrap();
            account = out.account;

            assert!((account.used_margin - ledger.reserved_margin()).abs() < EPS, "seed {seed} bar {i}");
            assert!((account.used_margin - account.by_side.total()).abs() < EPS);
            if let Some(id) = out.opened {
                let pos = ledger.positions().find(|p| p.position_id == id).unwrap();
                let cap = account.balance * cfg.margin_limit_fraction + EPS;
                match cfg.margin_policy {
                    MarginPolicy::Combined    => assert!(account.used_margin <= cap),
                    MarginPolicy::Directional => assert!(account.by_side.side(pos.direction) <= cap),
                }
            }
        }
    }
}

#[test]
fn balance_is_initial_plus_realized_pnl() {
    for seed in 100..110 {
        let (bars, signals) = random_inputs(seed, 500);
        let res = run_backtest(&bars, &signals, &config()).unwrap();
        let realized: f64 = res.trades.iter().map(|t| t.pnl).sum();
        assert!((res.final_state.final_balance - (1000.0 + realized)).abs() < 1e-6);

        let reserved: f64 = res.open_positions.iter().map(|p| p.margin_reserved).sum();
        assert!((res.final_state.final_used_margin - reserved).abs() < 1e-6);
        assert_eq!(res.final_state.count_still_open, res.open_positions.len());
    }
}

#[test]
fn equity_curve_has_one_point_per_processed_bar() {
    let (bars, signals) = random_inputs(7, 250);
    let res = run_backtest(&bars, &signals, &config()).unwrap();
    assert_eq!(res.equity_curve.len(), bars.len() - 1);
    assert_eq!(res.exposure.len(), bars.len() - 1);
    for (p, bar) in res.equity_curve.iter().zip(&bars.bars()[1..]) {
        assert_eq!(p.timestamp, bar.timestamp);
    }
}

#[test]
fn low_confidence_never_trades() {
    let (bars, _) = random_inputs(3, 300);
    let n = bars.len();
    let signals = SignalSeries::from_columns(&vec![1; n], &vec![0.49; n]).unwrap();
    let res = run_backtest(&bars, &signals, &config()).unwrap();
    assert!(res.trades.is_empty());
    assert!(res.open_positions.is_empty());
    assert_eq!(res.skips.low_confidence, n - 1);
    assert!(res.equity_curve.iter().all(|p| p.equity == 1000.0));
}

#[test]
fn take_profit_wins_on_a_bar_spanning_both_levels() {
    let ts = [0.0, 1.0, 2.0];
    let open = [100.0, 100.0, 100.0];
    let high = [100.0, 100.0, 110.0];
    let low = [100.0, 100.0, 90.0];
    let close = [100.0, 100.0, 100.0];
    let atr = [1.0, 1.0, 1.0];
    let bars = BarSeries::from_columns(&ts, &open, &high, &low, &close, &atr).unwrap();

    for (raw, tp) in [(1, 102.0), (-1, 98.0)] {
        let signals = SignalSeries::from_columns(&[0, raw, 0], &[0.0, 0.9, 0.0]).unwrap();
        let res = run_backtest(&bars, &signals, &config()).unwrap();
        assert_eq!(res.trades.len(), 1);
        assert_eq!(res.trades[0].exit_price, tp);
        assert_eq!(res.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(res.trades[0].pnl, 2.0);
    }
}

#[test]
fn hedged_long_and_short_coexist() {
    let close = [100.0, 100.0, 100.0, 100.0];
    let ts = [0.0, 1.0, 2.0, 3.0];
    let bars = BarSeries::from_columns(&ts, &close, &close, &close, &close, &[1.0; 4]).unwrap();
    let signals = SignalSeries::from_columns(&[0, 1, -1, 1], &[0.0, 0.9, 0.9, 0.9]).unwrap();
    let res = run_backtest(&bars, &signals, &config()).unwrap();
    let dirs: Vec<Direction> = res.open_positions.iter().map(|p| p.direction).collect();
    assert_eq!(dirs, vec![Direction::Long, Direction::Short, Direction::Long]);
    assert_eq!(res.final_state.final_used_margin, 15.0);
    assert_eq!(res.exposure[2].long_exposure, 2.0);
    assert_eq!(res.exposure[2].short_exposure, 1.0);
    assert_eq!(res.exposure[2].total_exposure(), 3.0);
}

#[test]
fn margin_cap_blocks_then_frees_after_exit() {
    // each trade reserves 100 * 1 / 20 = 5; cap is 1000 * 0.01 = 10
    let cfg = BacktestConfig { margin_limit_fraction: 0.01, ..config() };
    let ts = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let close = [100.0, 100.0, 100.0, 100.0, 100.0, 100.0];
    let high = [100.0, 100.0, 100.0, 100.0, 102.0, 100.0];
    let bars = BarSeries::from_columns(&ts, &close, &high, &close, &close, &[1.0; 6]).unwrap();
    let signals =
        SignalSeries::from_columns(&[0, 1, 1, 1, 1, 1], &[0.0, 0.9, 0.9, 0.9, 0.9, 0.9]).unwrap();

    let res = run_backtest(&bars, &signals, &cfg).unwrap();
    // bars 1,2 open; bar 3 blocked; bar 4 closes both at tp=102 then reopens
    assert_eq!(res.skips.margin_limit, 1);
    assert_eq!(res.trades.len(), 2);
    assert_eq!(res.final_state.final_balance, 1004.0);
    assert_eq!(res.final_state.count_still_open, 2);
    let ids: Vec<_> = res.trades.iter().map(|t| t.position.position_id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn directional_policy_admits_opposite_side_at_cap() {
    let cfg = BacktestConfig {
        margin_limit_fraction: 0.005,
        margin_policy: MarginPolicy::Directional,
        ..config()
    };
    let close = [100.0; 4];
    let ts = [0.0, 1.0, 2.0, 3.0];
    let bars = BarSeries::from_columns(&ts, &close, &close, &close, &close, &[1.0; 4]).unwrap();
    let signals = SignalSeries::from_columns(&[0, 1, -1, 1], &[0.0, 0.9, 0.9, 0.9]).unwrap();

    let res = run_backtest(&bars, &signals, &cfg).unwrap();
    assert_eq!(res.final_state.count_still_open, 2);
    assert_eq!(res.skips.margin_limit, 1);

    let combined = BacktestConfig { margin_policy: MarginPolicy::Combined, ..cfg };
    let res = run_backtest(&bars, &signals, &combined).unwrap();
    assert_eq!(res.final_state.count_still_open, 1);
    assert_eq!(res.skips.margin_limit, 2);
}

#[test]
fn repeated_runs_are_identical() {
    let (bars, signals) = random_inputs(42, 600);
    let a = run_backtest(&bars, &signals, &config()).unwrap();
    let b = run_backtest(&bars, &signals, &config()).unwrap();
    assert_eq!(serde_json::to_string(&a.trades).unwrap(), serde_json::to_string(&b.trades).unwrap());
    assert_eq!(
        serde_json::to_string(&a.equity_curve).unwrap(),
        serde_json::to_string(&b.equity_curve).unwrap()
    );
}

#[test]
fn exit_thresholds_use_atr_frozen_at_entry() {
    // entry atr 1 -> tp 102; later atr 10 must not widen it
    let ts = [0.0, 1.0, 2.0];
    let close = [100.0, 100.0, 100.0];
    let high = [100.0, 100.0, 102.0];
    let atr = [1.0, 1.0, 10.0];
    let bars = BarSeries::from_columns(&ts, &close, &high, &close, &close, &atr).unwrap();
    let signals = SignalSeries::from_columns(&[0, 1, 0], &[0.0, 0.9, 0.0]).unwrap();
    let res = run_backtest(&bars, &signals, &config()).unwrap();
    assert_eq!(res.trades.len(), 1);
    assert_eq!(res.trades[0].exit_price, 102.0);
}

#[test]
fn malformed_inputs_fail_before_any_bar() {
    let ts = [0.0, 2.0, 1.0];
    let close = [1.0; 3];
    assert!(BarSeries::from_columns(&ts, &close, &close, &close, &close, &[0.1; 3]).is_err());

    let ts = [0.0, 1.0, 2.0];
    let bars = BarSeries::from_columns(&ts, &close, &close, &close, &close, &[0.1; 3]).unwrap();
    let short = SignalSeries::from_columns(&[0, 1], &[0.0, 0.9]).unwrap();
    assert!(run_backtest(&bars, &short, &config()).is_err());
}
