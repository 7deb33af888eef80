//! SMA crossover signal engine.
//!
//! One pass over a PriceSeries: two trailing SMAs of the open, a binary
//! long/flat position, log returns, lagged strategy returns, and the
//! cumulative equity curve with its running peak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EngineError;
use crate::domain::PriceSeries;
use crate::indicators::{Indicator, Sma};

pub const DEFAULT_SMA_EARLY_WINDOW: usize = 60;
pub const DEFAULT_SMA_LATE_WINDOW: usize = 252;

/// Window lengths for the two moving averages.
///
/// "Early" is the SMA whose value feeds the `SMA_Low` slot and "late" the
/// `SMA_High` slot. By default early is the ~3 month average and late the
/// ~1 year average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverConfig {
    pub sma_early_window: usize,
    pub sma_late_window: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            sma_early_window: DEFAULT_SMA_EARLY_WINDOW,
            sma_late_window: DEFAULT_SMA_LATE_WINDOW,
        }
    }
}

impl CrossoverConfig {
    pub fn new(sma_early_window: usize, sma_late_window: usize) -> Self {
        Self {
            sma_early_window,
            sma_late_window,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sma_early_window == 0
            || self.sma_late_window == 0
            || self.sma_early_window == self.sma_late_window
        {
            return Err(EngineError::InvalidWindows {
                early: self.sma_early_window,
                late: self.sma_late_window,
            });
        }
        Ok(())
    }

    /// Bars needed before the first point is produced.
    pub fn required_bars(&self) -> usize {
        self.sma_early_window.max(self.sma_late_window)
    }
}

/// Binary strategy position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Flat,
    Long,
}

impl Position {
    /// Long when the early SMA is strictly above the late SMA. Ties are flat.
    pub fn from_smas(sma_early: f64, sma_late: f64) -> Self {
        if sma_early > sma_late {
            Position::Long
        } else {
            Position::Flat
        }
    }

    /// 1 for long, 0 for flat.
    pub fn as_u8(self) -> u8 {
        match self {
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn weight(self) -> f64 {
        f64::from(self.as_u8())
    }
}

/// One bar of engine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub open: f64,
    pub sma_early: f64,
    pub sma_late: f64,
    pub position: Position,
    /// `ln(open_t / open_{t-1})`; None on the first point.
    pub daily_log_return: Option<f64>,
    /// `position_{t-1} * daily_log_return_t`; None on the first point.
    pub strategy_log_return: Option<f64>,
    pub cumulative_strategy_return: f64,
    pub cumulative_strategy_max: f64,
}

impl SignalPoint {
    /// Distance from the running peak, never negative.
    pub fn drawdown(&self) -> f64 {
        self.cumulative_strategy_max - self.cumulative_strategy_return
    }
}

/// Completed engine output for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRun {
    symbol: String,
    config: CrossoverConfig,
    dataset_hash: String,
    input_bars: usize,
    points: Vec<SignalPoint>,
}

impl SignalRun {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn config(&self) -> CrossoverConfig {
        self.config
    }

    pub fn dataset_hash(&self) -> &str {
        &self.dataset_hash
    }

    /// Number of bars in the input series, before warm-up truncation.
    pub fn input_bars(&self) -> usize {
        self.input_bars
    }

    pub fn points(&self) -> &[SignalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Chronologically last point.
    pub fn latest(&self) -> Option<&SignalPoint> {
        self.points.last()
    }

    /// Defined daily log returns, in date order.
    pub fn daily_log_returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.daily_log_return)
    }

    /// Defined strategy log returns, in date order.
    pub fn strategy_log_returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.strategy_log_return)
    }
}

/// Deterministic crossover engine. Holds no state between runs.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: CrossoverConfig,
    early: Sma,
    late: Sma,
}

impl SignalEngine {
    pub fn new(config: CrossoverConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            early: Sma::new(config.sma_early_window),
            late: Sma::new(config.sma_late_window),
        })
    }

    pub fn config(&self) -> CrossoverConfig {
        self.config
    }

    pub fn run(&self, series: &PriceSeries) -> Result<SignalRun, EngineError> {
        let bars = series.bars();
        let early = self.early.compute(bars);
        let late = self.late.compute(bars);

        let mut points = Vec::with_capacity(bars.len().saturating_sub(self.config.required_bars() - 1));
        let mut prev: Option<(f64, Position)> = None;
        let mut running_sum = 0.0_f64;
        let mut running_max = f64::NEG_INFINITY;

        for ((bar, &sma_early), &sma_late) in bars.iter().zip(&early).zip(&late) {
            // warm-up, or a window containing a missing open
            if sma_early.is_nan() || sma_late.is_nan() {
                continue;
            }

            let position = Position::from_smas(sma_early, sma_late);
            let daily_log_return = prev.map(|(prev_open, _)| (bar.open / prev_open).ln());
            let strategy_log_return = prev
                .zip(daily_log_return)
                .map(|((_, prev_position), r)| prev_position.weight() * r);

            running_sum += strategy_log_return.unwrap_or(0.0);
            let cumulative_strategy_return = running_sum.exp();
            running_max = running_max.max(cumulative_strategy_return);

            points.push(SignalPoint {
                date: bar.date,
                open: bar.open,
                sma_early,
                sma_late,
                position,
                daily_log_return,
                strategy_log_return,
                cumulative_strategy_return,
                cumulative_strategy_max: running_max,
            });
            prev = Some((bar.open, position));
        }

        if points.is_empty() {
            return Err(EngineError::InsufficientHistory {
                symbol: series.symbol().to_string(),
                bars: bars.len(),
                required: self.config.required_bars(),
            });
        }

        debug!(
            symbol = series.symbol(),
            input_bars = bars.len(),
            points = points.len(),
            "signal run complete"
        );

        Ok(SignalRun {
            symbol: series.symbol().to_string(),
            config: self.config,
            dataset_hash: series.dataset_hash(),
            input_bars: bars.len(),
            points,
        })
    }
}
