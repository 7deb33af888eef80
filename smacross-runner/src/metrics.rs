//! Performance metrics: pure functions over a completed signal run.
//!
//! Metrics are recomputed from the run every time; nothing is cached or
//! updated incrementally. Undefined returns (the first point) are excluded
//! from every aggregate.

use serde::{Deserialize, Serialize};
use smacross_core::engine::{Position, SignalPoint, SignalRun};

/// Aggregate performance metrics for one signal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub cumulative_return: f64,
    pub strategy_cumulative_return: f64,
    pub annualized_return: f64,
    pub annualized_strategy_return: f64,
    pub annualized_volatility: f64,
    pub annualized_strategy_volatility: f64,
    pub max_drawdown: f64,
    /// Longest calendar-day gap between consecutive new equity highs.
    pub longest_drawdown_days: Option<i64>,
    /// Same gap measured in trading bars.
    pub longest_drawdown_bars: Option<usize>,
    pub bar_count: usize,
    /// Fraction of defined strategy bars spent long.
    pub exposure: f64,
}

impl PerformanceMetrics {
    pub fn compute(run: &SignalRun, trading_days_per_year: u32) -> Self {
        let days = f64::from(trading_days_per_year);
        let market: Vec<f64> = run.daily_log_returns().collect();
        let strategy: Vec<f64> = run.strategy_log_returns().collect();
        let points = run.points();
        let longest = longest_drawdown(points);

        Self {
            cumulative_return: cumulative_return(&market),
            strategy_cumulative_return: cumulative_return(&strategy),
            annualized_return: annualized_return(&market, days),
            annualized_strategy_return: annualized_return(&strategy, days),
            annualized_volatility: annualized_volatility(&market, days),
            annualized_strategy_volatility: annualized_volatility(&strategy, days),
            max_drawdown: max_drawdown(points),
            longest_drawdown_days: longest.map(|l| l.calendar_days),
            longest_drawdown_bars: longest.map(|l| l.bars),
            bar_count: points.len(),
            exposure: exposure(points),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `exp(sum of log returns) - 1`.
pub fn cumulative_return(log_returns: &[f64]) -> f64 {
    log_returns.iter().sum::<f64>().exp() - 1.0
}

/// `exp(mean log return * periods_per_year) - 1`. Zero for no returns.
pub fn annualized_return(log_returns: &[f64], periods_per_year: f64) -> f64 {
    (mean_f64(log_returns) * periods_per_year).exp() - 1.0
}

/// Sample standard deviation of simple returns, scaled by `sqrt(periods_per_year)`.
pub fn annualized_volatility(log_returns: &[f64], periods_per_year: f64) -> f64 {
    let simple: Vec<f64> = log_returns.iter().map(|r| r.exp() - 1.0).collect();
    std_dev(&simple) * periods_per_year.sqrt()
}

/// Largest gap between the running peak and the cumulative strategy return.
///
/// Zero when the equity curve never falls.
pub fn max_drawdown(points: &[SignalPoint]) -> f64 {
    points.iter().map(SignalPoint::drawdown).fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongestDrawdown {
    pub calendar_days: i64,
    pub bars: usize,
}

/// Longest stretch between consecutive points sitting exactly at a new high.
///
/// None when fewer than two such points exist.
pub fn longest_drawdown(points: &[SignalPoint]) -> Option<LongestDrawdown> {
    let highs: Vec<(usize, &SignalPoint)> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.drawdown() == 0.0)
        .collect();

    highs
        .windows(2)
        .map(|w| LongestDrawdown {
            calendar_days: (w[1].1.date - w[0].1.date).num_days(),
            bars: w[1].0 - w[0].0,
        })
        .fold(None, |acc: Option<LongestDrawdown>, gap| {
            Some(match acc {
                None => gap,
                Some(best) => LongestDrawdown {
                    calendar_days: best.calendar_days.max(gap.calendar_days),
                    bars: best.bars.max(gap.bars),
                },
            })
        })
}

/// Fraction of points whose strategy return was earned while long.
pub fn exposure(points: &[SignalPoint]) -> f64 {
    let held: Vec<Position> = points
        .windows(2)
        .map(|w| w[0].position)
        .collect();
    if held.is_empty() {
        return 0.0;
    }
    held.iter().filter(|p| **p == Position::Long).count() as f64 / held.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
