//! Simple Moving Average (SMA).
//!
//! Trailing mean of one price field, right-aligned: the value at bar i
//! covers bars `i + 1 - period ..= i`. First valid value at index period-1.

use super::Indicator;
use crate::domain::{PriceBar, PriceField};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    field: PriceField,
    name: String,
}

impl Sma {
    /// SMA over opening prices. `period` must be at least 1; callers validate
    /// windows before building indicators.
    pub fn new(period: usize) -> Self {
        Self::on(PriceField::Open, period)
    }

    pub fn on(field: PriceField, period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            field,
            name: format!("sma_{}_{period}", field.as_str()),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let values: Vec<f64> = bars.iter().map(|b| self.field.of(b)).collect();
        for (i, window) in values.windows(self.period).enumerate() {
            result[i + self.period - 1] = window_mean(window);
        }
        result
    }
}

/// Mean of one window, NaN if any value is NaN.
///
/// Summed as deviations from the first value, so a window of identical
/// prices yields that price exactly and two windows over the same flat
/// stretch compare equal.
fn window_mean(window: &[f64]) -> f64 {
    let base = window[0];
    let mut deviation = 0.0;
    for &v in window {
        if v.is_nan() {
            return f64::NAN;
        }
        deviation += v - base;
    }
    base + deviation / window.len() as f64
}
