//! Same-day recommendation from the latest signal point.
//!
//! A recommendation is only actionable when the latest bar is dated today
//! and carries an opening price. Anything else (weekend, holiday, source
//! not yet published) resolves to `Fail`, which is an ordinary outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::signal::{Position, SignalRun};
use super::EngineError;

pub const STALE_REASON: &str =
    "Could not pull open price data or latest record does not match current date.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    Success,
    Fail,
}

/// Value output handed to the order layer. Position and SMA fields are
/// populated only on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub date: NaiveDate,
    pub position: Option<Position>,
    pub sma_early: Option<f64>,
    pub sma_late: Option<f64>,
    pub status: RecommendationStatus,
    pub reason: Option<String>,
}

impl Recommendation {
    pub fn is_success(&self) -> bool {
        self.status == RecommendationStatus::Success
    }
}

/// Resolve the recommendation for `today` from a completed run.
pub fn resolve(run: &SignalRun, today: NaiveDate) -> Result<Recommendation, EngineError> {
    let latest = run.latest().ok_or_else(|| EngineError::InsufficientHistory {
        symbol: run.symbol().to_string(),
        bars: run.input_bars(),
        required: run.config().required_bars(),
    })?;

    if latest.date == today && latest.open.is_finite() {
        return Ok(Recommendation {
            date: latest.date,
            position: Some(latest.position),
            sma_early: Some(latest.sma_early),
            sma_late: Some(latest.sma_late),
            status: RecommendationStatus::Success,
            reason: None,
        });
    }

    Ok(Recommendation {
        date: latest.date,
        position: None,
        sma_early: None,
        sma_late: None,
        status: RecommendationStatus::Fail,
        reason: Some(STALE_REASON.to_string()),
    })
}
