//! Indicators: pure functions from bar history to a numeric series.
//!
//! Every indicator returns a series the same length as its input, with
//! `f64::NAN` for bars that do not yet have enough history.

pub mod sma;

pub use sma::Sma;

use crate::domain::PriceBar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_open_60").
    fn name(&self) -> &str;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Create synthetic bars from opening prices for testing.
#[cfg(test)]
pub fn make_bars(opens: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    opens
        .iter()
        .enumerate()
        .map(|(i, &open)| PriceBar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
