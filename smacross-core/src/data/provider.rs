//! History provider trait and structured error types.
//!
//! The HistoryProvider trait abstracts over price sources (Yahoo Finance,
//! CSV files, in-memory fixtures) so the pipeline can swap them and tests
//! can run offline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PriceBar, PriceSeries, SeriesError};

/// Structured error types for history fetches.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data available for '{symbol}' in the requested range")]
    DataUnavailable { symbol: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("invalid provider base url: {0}")]
    InvalidBaseUrl(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("csv error in {path}: {message}")]
    Csv { path: String, message: String },
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Static,
}

/// Trait for price history sources.
///
/// `fetch` returns bars dated within `[start, end)`, ascending. A source
/// with no rows for the range reports `DataError::DataUnavailable`.
pub trait HistoryProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError>;
}

/// Shared tail of every provider: range check, sort, validate, reject empty.
pub(crate) fn finish_series(
    symbol: &str,
    bars: Vec<PriceBar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    let series = PriceSeries::from_unsorted(symbol, bars)?.restrict(start, end);
    if series.is_empty() {
        return Err(DataError::DataUnavailable {
            symbol: symbol.to_string(),
        });
    }
    Ok(series)
}

pub(crate) fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataError> {
    if start >= end {
        return Err(DataError::InvalidRange { start, end });
    }
    Ok(())
}

/// In-memory provider over pre-built series, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    series: Vec<PriceSeries>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.retain(|s| s.symbol() != series.symbol());
        self.series.push(series);
        self
    }
}

impl HistoryProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn source(&self) -> DataSource {
        DataSource::Static
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        check_range(start, end)?;
        let bars = self
            .series
            .iter()
            .find(|s| s.symbol().eq_ignore_ascii_case(symbol))
            .map(|s| s.bars().to_vec())
            .unwrap_or_default();
        finish_series(symbol, bars, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            open: 100.0 + day as f64,
            high: 110.0,
            low: 90.0,
            close: 100.0,
            volume: 10,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn static_provider_filters_range() {
        let series = PriceSeries::new("SPY", (1..=10).map(bar).collect()).unwrap();
        let provider = StaticProvider::new().with_series(series);
        let fetched = provider.fetch("SPY", d(3), d(6)).unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched.first_date(), Some(d(3)));
        assert_eq!(fetched.last_date(), Some(d(5)));
    }

    #[test]
    fn unknown_symbol_is_unavailable() {
        let provider = StaticProvider::new();
        let err = provider.fetch("NOPE", d(1), d(2)).unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable { symbol } if symbol == "NOPE"));
    }

    #[test]
    fn empty_range_is_unavailable() {
        let series = PriceSeries::new("SPY", (1..=3).map(bar).collect()).unwrap();
        let provider = StaticProvider::new().with_series(series);
        assert!(matches!(
            provider.fetch("SPY", d(20), d(25)),
            Err(DataError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let provider = StaticProvider::new();
        assert!(matches!(
            provider.fetch("SPY", d(5), d(5)),
            Err(DataError::InvalidRange { .. })
        ));
    }
}
