//! Order sizing and dispatch.
//!
//! `decide` is a pure function of the recommendation and a snapshot of the
//! account; `dispatch` carries the decision out against a `Brokerage`.
//! At most one broker write happens per dispatch and failures come back
//! as values.
//!
//! | market | status  | position | signal                | decision                         |
//! |--------|---------|----------|-----------------------|----------------------------------|
//! | closed | any     | any      | any                   | no-op                            |
//! | open   | FAIL    | any      | any                   | no-op                            |
//! | open   | SUCCESS | none     | long, buying power > 0| buy `bp * fraction`              |
//! | open   | SUCCESS | none     | flat or bp <= 0       | no-op                            |
//! | open   | SUCCESS | held     | flat                  | close position                   |
//! | open   | SUCCESS | held     | long                  | buy `(1 - scaled) * bp * fraction`|

use serde::{Deserialize, Serialize};
use smacross_core::engine::{Position, Recommendation};
use tracing::{info, warn};

use crate::broker::{AccountState, BrokerError, Brokerage, OrderResult, OrderSide};
use crate::config::SizingConfig;

/// Broker-side state the decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_open: bool,
    pub account: AccountState,
    pub has_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    MarketClosed,
    RecommendationFailed,
    NoBuySignal,
    InsufficientBuyingPower,
    NonPositiveNotional,
}

impl std::fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NoOpReason::MarketClosed => "market closed",
            NoOpReason::RecommendationFailed => "no actionable recommendation for today",
            NoOpReason::NoBuySignal => "no buy recommendation for today",
            NoOpReason::InsufficientBuyingPower => "insufficient buying power",
            NoOpReason::NonPositiveNotional => "sized notional is not positive",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderDecision {
    Buy { notional: f64 },
    ClosePosition,
    NoOp { reason: NoOpReason },
}

/// Outcome of a close request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum CloseResult {
    Closed,
    NoPosition,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Skipped { reason: NoOpReason },
    /// Decision computed but not sent.
    DryRun { decision: OrderDecision },
    Order { notional: f64, result: OrderResult },
    Close { result: CloseResult },
}

/// Spread-scaled fraction of a fresh buy, for adding to an existing position.
///
/// `rel_diff = sma_late / sma_early - 1`, `scaled = min(rel_diff / max_spread_scale, 1)`,
/// notional = `(1 - scaled) * buying_power * fraction`. The ratio takes the
/// recommendation's SMA fields as given.
pub fn scaled_notional(
    sma_early: f64,
    sma_late: f64,
    buying_power: f64,
    sizing: &SizingConfig,
) -> f64 {
    let rel_diff = sma_late / sma_early - 1.0;
    let scaled = (rel_diff / sizing.max_spread_scale).min(1.0);
    (1.0 - scaled) * buying_power * sizing.buying_power_fraction
}

pub fn decide(
    recommendation: &Recommendation,
    snapshot: &MarketSnapshot,
    sizing: &SizingConfig,
) -> OrderDecision {
    let noop = |reason| OrderDecision::NoOp { reason };

    if !snapshot.market_open {
        return noop(NoOpReason::MarketClosed);
    }
    let (Some(position), true) = (recommendation.position, recommendation.is_success()) else {
        return noop(NoOpReason::RecommendationFailed);
    };
    let buying_power = snapshot.account.non_margin_buying_power;

    if !snapshot.has_position {
        return match position {
            Position::Long if buying_power > 0.0 => OrderDecision::Buy {
                notional: buying_power * sizing.buying_power_fraction,
            },
            _ if buying_power <= 0.0 => noop(NoOpReason::InsufficientBuyingPower),
            _ => noop(NoOpReason::NoBuySignal),
        };
    }

    match position {
        Position::Flat => OrderDecision::ClosePosition,
        Position::Long => {
            let (Some(sma_early), Some(sma_late)) =
                (recommendation.sma_early, recommendation.sma_late)
            else {
                return noop(NoOpReason::RecommendationFailed);
            };
            let notional = scaled_notional(sma_early, sma_late, buying_power, sizing);
            if notional.is_finite() && notional > 0.0 {
                if notional > buying_power {
                    // early above late makes rel_diff negative; the broker may reject this
                    warn!(
                        notional,
                        buying_power,
                        sma_early,
                        sma_late,
                        "sized notional exceeds non-margin buying power"
                    );
                }
                OrderDecision::Buy { notional }
            } else {
                noop(NoOpReason::NonPositiveNotional)
            }
        }
    }
}

/// Execute a decision. Broker errors are logged and folded into the outcome.
pub fn dispatch(broker: &dyn Brokerage, symbol: &str, decision: &OrderDecision) -> DispatchOutcome {
    match *decision {
        OrderDecision::NoOp { reason } => {
            info!(%symbol, %reason, "no order placed");
            DispatchOutcome::Skipped { reason }
        }
        OrderDecision::Buy { notional } => {
            let result = OrderResult::from(broker.submit_market_order(symbol, notional, OrderSide::Buy));
            match &result {
                OrderResult::Filled => info!(%symbol, notional, "order filled"),
                OrderResult::NotFilled => warn!(%symbol, notional, "order not filled"),
                OrderResult::Error(detail) => warn!(%symbol, notional, %detail, "order failed"),
            }
            DispatchOutcome::Order { notional, result }
        }
        OrderDecision::ClosePosition => {
            let result = match broker.close_position(symbol) {
                Ok(()) => CloseResult::Closed,
                Err(BrokerError::NoPosition { .. }) => CloseResult::NoPosition,
                Err(e) => CloseResult::Error(e.to_string()),
            };
            match &result {
                CloseResult::Closed => info!(%symbol, "position closed"),
                CloseResult::NoPosition => warn!(%symbol, "close requested but no position exists"),
                CloseResult::Error(detail) => warn!(%symbol, %detail, "close failed"),
            }
            DispatchOutcome::Close { result }
        }
    }
}
