//! Signal engine and recommendation scenarios on hand-checked series.

use chrono::NaiveDate;
use smacross_core::data::{HistoryProvider, StaticProvider};
use smacross_core::domain::{PriceBar, PriceSeries};
use smacross_core::engine::{
    resolve, CrossoverConfig, Position, RecommendationStatus, SignalEngine,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Weekday-only bars starting at `start`, mirroring exchange calendars.
fn weekday_bars(start: NaiveDate, opens: &[f64]) -> Vec<PriceBar> {
    use chrono::Datelike;
    let mut date = start;
    let mut bars = Vec::with_capacity(opens.len());
    for &open in opens {
        while matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            date = date.succ_opt().unwrap();
        }
        bars.push(PriceBar {
            date,
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 10_000,
        });
        date = date.succ_opt().unwrap();
    }
    bars
}

#[test]
fn flat_year_is_never_long() {
    let bars = weekday_bars(d(2023, 1, 2), &[100.0; 253]);
    let series = PriceSeries::new("SPY", bars).unwrap();
    let run = SignalEngine::new(CrossoverConfig::default())
        .unwrap()
        .run(&series)
        .unwrap();

    assert_eq!(run.len(), 2);
    assert!(run.points().iter().all(|p| p.position == Position::Flat));
    assert!(run.points().iter().all(|p| p.drawdown() == 0.0));
}

#[test]
fn weekend_run_resolves_to_fail() {
    // last bar lands on a Friday
    let bars = weekday_bars(d(2024, 6, 3), &[10.0, 10.0, 10.0, 12.0, 14.0]);
    let friday = bars.last().unwrap().date;
    assert_eq!(friday, d(2024, 6, 7));

    let series = PriceSeries::new("SPY", bars).unwrap();
    let run = SignalEngine::new(CrossoverConfig::new(2, 3))
        .unwrap()
        .run(&series)
        .unwrap();

    let saturday = resolve(&run, d(2024, 6, 8)).unwrap();
    assert_eq!(saturday.status, RecommendationStatus::Fail);
    assert!(saturday.position.is_none());

    let on_friday = resolve(&run, friday).unwrap();
    assert_eq!(on_friday.status, RecommendationStatus::Success);
    assert_eq!(on_friday.position, Some(Position::Long));
    assert_eq!(on_friday.sma_early, Some(13.0));
    assert_eq!(on_friday.sma_late, Some(12.0));
}

#[test]
fn provider_to_recommendation() {
    let opens: Vec<f64> = (0..40).map(|i| 100.0 - i as f64 * 0.5).collect();
    let bars = weekday_bars(d(2024, 1, 1), &opens);
    let last = bars.last().unwrap().date;
    let provider = StaticProvider::new().with_series(PriceSeries::new("QQQ", bars).unwrap());

    let series = provider
        .fetch("QQQ", d(2023, 1, 1), last.succ_opt().unwrap())
        .unwrap();
    let run = SignalEngine::new(CrossoverConfig::new(5, 20))
        .unwrap()
        .run(&series)
        .unwrap();
    let rec = resolve(&run, last).unwrap();

    // falling prices: the short average sits below the long one
    assert!(rec.is_success());
    assert_eq!(rec.position, Some(Position::Flat));
    assert!(run.strategy_log_returns().all(|r| r == 0.0));
}
