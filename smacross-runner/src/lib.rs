//! smacross runner: configuration, performance metrics, brokerage, order dispatch.
//!
//! This crate builds on `smacross-core` to provide:
//! - TOML configuration with validated defaults
//! - Performance metrics over a completed signal run
//! - The brokerage trait and an Alpaca REST client
//! - Order sizing/dispatch from a recommendation and account snapshot
//! - The single-ticker run pipeline

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod runner;

pub use broker::{AccountState, AlpacaBroker, BrokerError, Brokerage, OrderAck, OrderResult, OrderSide};
pub use config::{ConfigError, Credentials, SizingConfig, SmacrossConfig};
pub use dispatch::{decide, dispatch, CloseResult, DispatchOutcome, MarketSnapshot, NoOpReason, OrderDecision};
pub use metrics::PerformanceMetrics;
pub use runner::{
    history_window, read_snapshot, run_backtest, run_pipeline, BacktestReport, DispatchMode,
    RunError, RunReport,
};
