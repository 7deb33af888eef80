//! Alpaca trading REST API client (blocking).
//!
//! Explicitly constructed and passed to the pipeline; no global client.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AccountState, BrokerError, Brokerage, OrderAck, OrderSide};
use crate::config::Credentials;

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

#[derive(Debug, Deserialize)]
struct AccountBody {
    cash: String,
    non_marginable_buying_power: String,
}

#[derive(Debug, Deserialize)]
struct PositionBody {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct ClockBody {
    is_open: bool,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    filled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    notional: String,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
}

pub struct AlpacaBroker {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl AlpacaBroker {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(KEY_HEADER, &self.credentials.key_id)
            .header(SECRET_HEADER, &self.credentials.secret_key)
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response, BrokerError> {
        let resp = self
            .authed(builder)
            .send()
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().unwrap_or_default();
        Err(BrokerError::Api {
            status,
            message: api_message(&body),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, BrokerError> {
        let resp = self.send(self.client.get(self.url(path)))?;
        resp.json().map_err(|e| BrokerError::Decode(e.to_string()))
    }
}

/// Pull `message` out of an Alpaca error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string())
}

fn parse_amount(field: &str, raw: &str) -> Result<f64, BrokerError> {
    raw.parse::<f64>()
        .map_err(|_| BrokerError::Decode(format!("{field} is not a number: {raw:?}")))
}

fn decode_account(body: AccountBody) -> Result<AccountState, BrokerError> {
    Ok(AccountState {
        cash: parse_amount("cash", &body.cash)?,
        non_margin_buying_power: parse_amount(
            "non_marginable_buying_power",
            &body.non_marginable_buying_power,
        )?,
    })
}

/// Dollar amounts go over the wire rounded to cents.
fn format_notional(notional: f64) -> String {
    format!("{:.2}", notional)
}

impl Brokerage for AlpacaBroker {
    fn account(&self) -> Result<AccountState, BrokerError> {
        decode_account(self.get_json("/v2/account")?)
    }

    fn has_position(&self, symbol: &str) -> Result<bool, BrokerError> {
        let positions: Vec<PositionBody> = self.get_json("/v2/positions")?;
        Ok(positions
            .iter()
            .any(|p| p.symbol.eq_ignore_ascii_case(symbol)))
    }

    fn is_market_open(&self) -> Result<bool, BrokerError> {
        let clock: ClockBody = self.get_json("/v2/clock")?;
        Ok(clock.is_open)
    }

    fn submit_market_order(
        &self,
        symbol: &str,
        notional: f64,
        side: OrderSide,
    ) -> Result<OrderAck, BrokerError> {
        let request = OrderRequest {
            symbol,
            notional: format_notional(notional),
            side,
            order_type: "market",
            time_in_force: "day",
        };
        debug!(%symbol, notional = %request.notional, "submitting market order");
        let resp = self.send(self.client.post(self.url("/v2/orders")).json(&request))?;
        let order: OrderBody = resp.json().map_err(|e| BrokerError::Decode(e.to_string()))?;
        Ok(OrderAck {
            order_id: order.id,
            filled: order.filled_at.is_some(),
        })
    }

    fn close_position(&self, symbol: &str) -> Result<(), BrokerError> {
        let path = format!("/v2/positions/{symbol}");
        match self.send(self.client.delete(self.url(&path))) {
            Ok(_) => Ok(()),
            Err(BrokerError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(BrokerError::NoPosition {
                    symbol: symbol.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
