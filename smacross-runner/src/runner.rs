//! Run pipeline: wires provider, signal engine, metrics, and dispatch.
//!
//! Two entry points:
//! - `run_backtest()`: history → signal → metrics + recommendation. No broker.
//! - `run_pipeline()`: the full single-ticker pass, submitting at most one order.
//!
//! Both are synchronous and hold no state between calls; every invocation
//! re-fetches and recomputes from scratch.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use smacross_core::data::{DataError, DataSource, HistoryProvider};
use smacross_core::engine::{resolve, EngineError, Recommendation, SignalEngine, SignalRun};
use thiserror::Error;
use tracing::info;

use crate::broker::{BrokerError, Brokerage};
use crate::config::{ConfigError, SmacrossConfig};
use crate::dispatch::{decide, dispatch, DispatchOutcome, MarketSnapshot, OrderDecision};
use crate::metrics::PerformanceMetrics;

/// Errors that abort a run. Order failures are not among them.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("invalid date range: {0}")]
    DateRange(String),
}

/// Whether a pipeline run may write to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Live,
    DryRun,
}

/// Backtest-only output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub today: NaiveDate,
    pub sma_early_window: usize,
    pub sma_late_window: usize,
    pub data_source: DataSource,
    pub input_bars: usize,
    pub dataset_hash: String,
    pub metrics: PerformanceMetrics,
    pub recommendation: Recommendation,
}

/// Full pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub backtest: BacktestReport,
    pub snapshot: MarketSnapshot,
    pub decision: OrderDecision,
    pub outcome: DispatchOutcome,
}

/// History window ending at (and including) `today`: `[today - years, today + 1)`.
pub fn history_window(today: NaiveDate, lookback_years: u32) -> Result<(NaiveDate, NaiveDate), RunError> {
    let start = today
        .checked_sub_months(Months::new(lookback_years.saturating_mul(12)))
        .ok_or_else(|| RunError::DateRange(format!("{lookback_years} years before {today}")))?;
    let end = today
        .succ_opt()
        .ok_or_else(|| RunError::DateRange(format!("day after {today}")))?;
    Ok((start, end))
}

/// Fetch history, run the engine, and summarize.
pub fn run_backtest(
    provider: &dyn HistoryProvider,
    config: &SmacrossConfig,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let engine = SignalEngine::new(config.crossover())?;

    let series = provider.fetch(ticker, start, end)?;
    info!(
        %ticker,
        provider = provider.name(),
        bars = series.len(),
        "history loaded"
    );

    let run = engine.run(&series)?;
    let recommendation = resolve(&run, today)?;
    log_recommendation(ticker, &recommendation);

    Ok(build_report(
        ticker,
        (start, end),
        today,
        provider.source(),
        config,
        &run,
        recommendation,
    ))
}

fn build_report(
    ticker: &str,
    (start, end): (NaiveDate, NaiveDate),
    today: NaiveDate,
    data_source: DataSource,
    config: &SmacrossConfig,
    run: &SignalRun,
    recommendation: Recommendation,
) -> BacktestReport {
    let crossover = run.config();
    BacktestReport {
        ticker: ticker.to_string(),
        start_date: start,
        end_date: end,
        today,
        sma_early_window: crossover.sma_early_window,
        sma_late_window: crossover.sma_late_window,
        data_source,
        input_bars: run.input_bars(),
        dataset_hash: run.dataset_hash().to_string(),
        metrics: PerformanceMetrics::compute(run, config.strategy.trading_days_per_year),
        recommendation,
    }
}

fn log_recommendation(ticker: &str, rec: &Recommendation) {
    match (rec.is_success(), rec.position) {
        (true, Some(position)) => info!(
            %ticker,
            date = %rec.date,
            position = position.as_u8(),
            sma_early = rec.sma_early.unwrap_or(f64::NAN),
            sma_late = rec.sma_late.unwrap_or(f64::NAN),
            "recommendation ready"
        ),
        // stale data is expected on weekends and holidays
        _ => info!(
            %ticker,
            latest_bar = %rec.date,
            reason = rec.reason.as_deref().unwrap_or(""),
            "no recommendation for today"
        ),
    }
}

/// Read the broker-side state the decision needs.
pub fn read_snapshot(broker: &dyn Brokerage, ticker: &str) -> Result<MarketSnapshot, RunError> {
    let market_open = broker.is_market_open()?;
    let account = broker.account()?;
    let has_position = broker.has_position(ticker)?;
    Ok(MarketSnapshot {
        market_open,
        account,
        has_position,
    })
}

/// Single-ticker pass: history → signal → account state → decide → at most one order.
pub fn run_pipeline(
    provider: &dyn HistoryProvider,
    broker: &dyn Brokerage,
    config: &SmacrossConfig,
    ticker: &str,
    today: NaiveDate,
    mode: DispatchMode,
) -> Result<RunReport, RunError> {
    let (start, end) = history_window(today, config.data.lookback_years)?;
    let backtest = run_backtest(provider, config, ticker, start, end, today)?;

    let snapshot = read_snapshot(broker, ticker)?;
    let decision = decide(&backtest.recommendation, &snapshot, &config.sizing);
    info!(%ticker, ?decision, market_open = snapshot.market_open, "order decision");

    let outcome = match mode {
        DispatchMode::Live => dispatch(broker, ticker, &decision),
        DispatchMode::DryRun => DispatchOutcome::DryRun {
            decision: decision.clone(),
        },
    };

    Ok(RunReport {
        backtest,
        snapshot,
        decision,
        outcome,
    })
}
