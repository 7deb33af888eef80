//! Brokerage collaborator: account state, positions, market clock, orders.
//!
//! The pipeline only talks to the `Brokerage` trait; `AlpacaBroker` is the
//! REST implementation and tests substitute a recording mock.

pub mod alpaca;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alpaca::AlpacaBroker;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("network error: {0}")]
    Network(String),

    #[error("broker API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("no open position for {symbol}")]
    NoPosition { symbol: String },

    #[error("failed to decode broker response: {0}")]
    Decode(String),
}

/// Cash figures used for sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub cash: f64,
    pub non_margin_buying_power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
}

/// Acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub filled: bool,
}

/// Typed outcome of an order attempt. Failures are values, not panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum OrderResult {
    Filled,
    NotFilled,
    Error(String),
}

impl From<Result<OrderAck, BrokerError>> for OrderResult {
    fn from(result: Result<OrderAck, BrokerError>) -> Self {
        match result {
            Ok(ack) if ack.filled => OrderResult::Filled,
            Ok(_) => OrderResult::NotFilled,
            Err(e) => OrderResult::Error(e.to_string()),
        }
    }
}

/// External brokerage operations the pipeline depends on.
pub trait Brokerage {
    fn account(&self) -> Result<AccountState, BrokerError>;

    /// Whether an open position exists for `symbol`.
    fn has_position(&self, symbol: &str) -> Result<bool, BrokerError>;

    fn is_market_open(&self) -> Result<bool, BrokerError>;

    /// Submit a day market order for a dollar amount.
    fn submit_market_order(
        &self,
        symbol: &str,
        notional: f64,
        side: OrderSide,
    ) -> Result<OrderAck, BrokerError>;

    /// Liquidate the entire position in `symbol`.
    fn close_position(&self, symbol: &str) -> Result<(), BrokerError>;
}
