//! smacross core: price series, history providers, the SMA crossover
//! signal engine, and the same-day recommendation resolver.
//!
//! - Domain types (price bars, ordered price series)
//! - History providers (Yahoo Finance, CSV import, in-memory)
//! - Trailing SMA indicator with NaN propagation
//! - Crossover signal engine with one-bar position lag
//! - Recommendation resolver with an injected "today"
//!
//! Everything here is a pure function of its inputs except the providers'
//! network and file reads.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

pub use data::{DataError, HistoryProvider};
pub use domain::{PriceBar, PriceSeries};
pub use engine::{
    resolve, CrossoverConfig, EngineError, Position, Recommendation, RecommendationStatus,
    SignalEngine, SignalPoint, SignalRun,
};
