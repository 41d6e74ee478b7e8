// src/engine/metrics.rs

use ndarray::Array1;
use serde::Serialize;

use crate::engine::exposure::EquityPoint;
use crate::engine::position::{Direction, Trade};

/// M5 bars: 288 per day, 252 trading days.
pub const M5_PERIODS_PER_YEAR: f64 = 288.0 * 252.0;

/// Sharpe is reported as zero below this many returns.
pub const MIN_RETURNS_FOR_SHARPE: usize = 10;

pub const CONFIDENCE_BUCKET_WIDTH: f64 = 0.05;

/// Per-trade statistics for one side (or both)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideTradeMetrics {
    pub number_of_trades:   usize,
    pub win_rate:           f64,
    pub loss_rate:          f64,
    pub average_pnl:        f64,
    pub average_pnl_points: f64,
    pub gross_profit:       f64,
    pub gross_loss:         f64,          // positive number
    pub profit_factor:      Option<f64>,  // None without losers
    pub payoff_ratio:       Option<f64>,  // avg win / avg loss
    pub expectancy:         f64,          // mean pnl per trade
    pub average_holding:    f64,          // bars
}

/// Bar-by-bar statistics of the realized equity curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesMetrics {
    pub returns:           Vec<f64>,
    pub mean_return:       f64,
    pub volatility:        f64,
    pub sharpe_ratio:      f64,  // annualized
    pub cumulative_return: f64,
    pub max_drawdown:      f64,  // fraction of running peak
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_pnl: f64,
    pub overall:   SideTradeMetrics,
    pub longs:     SideTradeMetrics,
    pub shorts:    SideTradeMetrics,
    pub equity:    TimeSeriesMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceBucket {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub sum:   f64,
    pub mean:  f64,
}

pub fn compute_trade_metrics<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> SideTradeMetrics {
    let mut n = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut sum_pnl = 0.0;
    let mut sum_points = 0.0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut sum_holding = 0usize;

    for t in trades {
        n += 1;
        sum_pnl += t.pnl;
        sum_points += t.pnl_points;
        sum_holding += t.holding_bars;
        if t.pnl > 0.0 {
            wins += 1;
            gross_profit += t.pnl;
        } else if t.pnl < 0.0 {
            losses += 1;
            gross_loss += -t.pnl;
        }
    }

    let nf = n as f64;
    let ratio = |x: f64| if n > 0 { x / nf } else { 0.0 };
    let profit_factor = (gross_loss > 0.0).then(|| gross_profit / gross_loss);
    let payoff_ratio = (wins > 0 && losses > 0)
        .then(|| (gross_profit / wins as f64) / (gross_loss / losses as f64));

    SideTradeMetrics {
        number_of_trades:   n,
        win_rate:           ratio(wins as f64),
        loss_rate:          ratio(losses as f64),
        average_pnl:        ratio(sum_pnl),
        average_pnl_points: ratio(sum_points),
        gross_profit,
        gross_loss,
        profit_factor,
        payoff_ratio,
        expectancy:         ratio(sum_pnl),
        average_holding:    ratio(sum_holding as f64),
    }
}

/// Simple returns between consecutive equity samples.
pub fn equity_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev != 0.0 { (w[1].equity - prev) / prev } else { 0.0 }
        })
        .collect()
}

/// Annualized Sharpe; zero when flat or when fewer than
/// `MIN_RETURNS_FOR_SHARPE` returns are available.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < MIN_RETURNS_FOR_SHARPE {
        return 0.0;
    }
    let r = Array1::from(returns.to_vec());
    let mean = r.mean().unwrap_or(0.0);
    let std = r.std(1.0);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd: f64 = 0.0;
    for p in curve {
        peak = peak.max(p.equity);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - p.equity) / peak);
        }
    }
    max_dd
}

pub fn compute_time_metrics(curve: &[EquityPoint], periods_per_year: f64) -> TimeSeriesMetrics {
    let returns = equity_returns(curve);
    let r = Array1::from(returns.clone());
    let mean_return = r.mean().unwrap_or(0.0);
    let volatility = if r.len() > 1 { r.std(1.0) } else { 0.0 };

    let cumulative_return = match (curve.first(), curve.last()) {
        (Some(first), Some(last)) if first.equity != 0.0 => last.equity / first.equity - 1.0,
        _ => 0.0,
    };

    TimeSeriesMetrics {
        sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
        max_drawdown: max_drawdown(curve),
        returns,
        mean_return,
        volatility,
        cumulative_return,
    }
}

pub fn compute_summary_metrics(
    trades: &[Trade],
    curve: &[EquityPoint],
    periods_per_year: f64,
) -> SummaryMetrics {
    let side = |d: Direction| trades.iter().filter(move |t| t.position.direction == d);
    SummaryMetrics {
        total_pnl: trades.iter().map(|t| t.pnl).sum(),
        overall:   compute_trade_metrics(trades),
        longs:     compute_trade_metrics(side(Direction::Long)),
        shorts:    compute_trade_metrics(side(Direction::Short)),
        equity:    compute_time_metrics(curve, periods_per_year),
    }
}

/// Confidence buckets for each side of the book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionalBuckets {
    pub long:  Vec<ConfidenceBucket>,
    pub short: Vec<ConfidenceBucket>,
}

/// Right-closed bucket edges from 0.5 to 1.0; the last edge is pinned at 1.0.
fn empty_buckets(width: f64) -> Vec<ConfidenceBucket> {
    let n_buckets = (((0.5 / width) - 1e-9).ceil() as usize).max(1);
    (0..n_buckets)
        .map(|k| {
            let lower = 0.5 + k as f64 * width;
            let upper = if k + 1 == n_buckets { 1.0 } else { 0.5 + (k + 1) as f64 * width };
            ConfidenceBucket {
                label: format!("{lower:.2}-{upper:.2}"),
                lower,
                upper,
                count: 0,
                sum: 0.0,
                mean: 0.0,
            }
        })
        .collect()
}

fn bucket_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>, width: f64) -> Vec<ConfidenceBucket> {
    if !(width > 0.0) {
        return Vec::new();
    }
    let mut buckets = empty_buckets(width);
    let last = buckets.len() - 1;

    for t in trades {
        let c = t.position.confidence_at_entry;
        if c < 0.5 {
            continue;
        }
        // first bucket also includes its lower edge
        let k = buckets
            .iter()
            .position(|b| c <= b.upper + 1e-12)
            .unwrap_or(last);
        buckets[k].count += 1;
        buckets[k].sum += t.pnl;
    }
    for b in &mut buckets {
        if b.count > 0 {
            b.mean = b.sum / b.count as f64;
        }
    }
    buckets
}

/// Group pnl by entry confidence in `width`-wide buckets over [0.5, 1.0].
/// Trades entered below 0.5 are not bucketed.
pub fn profit_by_confidence(trades: &[Trade], width: f64) -> Vec<ConfidenceBucket> {
    bucket_trades(trades, width)
}

pub fn profit_by_conf_and_direction(trades: &[Trade], width: f64) -> DirectionalBuckets {
    let side = |d: Direction| trades.iter().filter(move |t| t.position.direction == d);
    DirectionalBuckets {
        long:  bucket_trades(side(Direction::Long), width),
        short: bucket_trades(side(Direction::Short), width),
    }
}
