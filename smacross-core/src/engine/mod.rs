//! Signal engine and recommendation resolver.

pub mod recommendation;
pub mod signal;

use thiserror::Error;

pub use recommendation::{resolve, Recommendation, RecommendationStatus};
pub use signal::{CrossoverConfig, Position, SignalEngine, SignalPoint, SignalRun};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("invalid SMA windows (early={early}, late={late}): both must be > 0 and differ")]
    InvalidWindows { early: usize, late: usize },

    #[error("insufficient history for {symbol}: {bars} bars, need at least {required}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        required: usize,
    },
}
