//! End-to-end pipeline tests against an in-memory provider and a recording broker.

use std::cell::RefCell;

use chrono::{Datelike, NaiveDate, Weekday};
use smacross_core::data::{CsvProvider, DataSource, StaticProvider};
use smacross_core::domain::{PriceBar, PriceSeries};
use smacross_core::engine::{EngineError, Position, RecommendationStatus};
use smacross_runner::{
    dispatch, run_backtest, run_pipeline, AccountState, BrokerError, Brokerage, CloseResult,
    DispatchMode, DispatchOutcome, NoOpReason, OrderAck, OrderDecision, OrderResult, OrderSide,
    RunError, SmacrossConfig,
};

// ── Fixtures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Submit { symbol: String, notional: f64 },
    Close { symbol: String },
}

struct MockBroker {
    market_open: bool,
    account: AccountState,
    has_position: bool,
    submit_error: Option<fn() -> BrokerError>,
    close_error: Option<fn() -> BrokerError>,
    fill: bool,
    calls: RefCell<Vec<Call>>,
}

impl MockBroker {
    fn new(market_open: bool, buying_power: f64, has_position: bool) -> Self {
        Self {
            market_open,
            account: AccountState {
                cash: buying_power,
                non_margin_buying_power: buying_power,
            },
            has_position,
            submit_error: None,
            close_error: None,
            fill: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn submits(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Submit { .. }))
            .count()
    }

    fn closes(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Close { .. }))
            .count()
    }
}

impl Brokerage for MockBroker {
    fn account(&self) -> Result<AccountState, BrokerError> {
        Ok(self.account)
    }

    fn has_position(&self, _symbol: &str) -> Result<bool, BrokerError> {
        Ok(self.has_position)
    }

    fn is_market_open(&self) -> Result<bool, BrokerError> {
        Ok(self.market_open)
    }

    fn submit_market_order(
        &self,
        symbol: &str,
        notional: f64,
        side: OrderSide,
    ) -> Result<OrderAck, BrokerError> {
        assert_eq!(side, OrderSide::Buy);
        self.calls.borrow_mut().push(Call::Submit {
            symbol: symbol.to_string(),
            notional,
        });
        if let Some(make_err) = self.submit_error {
            return Err(make_err());
        }
        Ok(OrderAck {
            order_id: "order-1".into(),
            filled: self.fill,
        })
    }

    fn close_position(&self, symbol: &str) -> Result<(), BrokerError> {
        self.calls.borrow_mut().push(Call::Close {
            symbol: symbol.to_string(),
        });
        if let Some(make_err) = self.close_error {
            return Err(make_err());
        }
        if self.has_position {
            Ok(())
        } else {
            Err(BrokerError::NoPosition {
                symbol: symbol.to_string(),
            })
        }
    }
}

const TODAY: (i32, u32, u32) = (2024, 6, 7); // a Friday

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(TODAY.0, TODAY.1, TODAY.2).unwrap()
}

/// Weekday bars ending exactly on `last`, oldest first.
fn bars_ending(last: NaiveDate, opens: &[f64]) -> Vec<PriceBar> {
    let mut dates = Vec::with_capacity(opens.len());
    let mut date = last;
    while dates.len() < opens.len() {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(date);
        }
        date = date.pred_opt().unwrap();
    }
    dates.reverse();
    dates
        .into_iter()
        .zip(opens)
        .map(|(date, &open)| PriceBar {
            date,
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 1_000,
        })
        .collect()
}

fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

fn falling(n: usize) -> Vec<f64> {
    (0..n).map(|i| 200.0 - i as f64).collect()
}

fn provider(opens: &[f64], last: NaiveDate) -> StaticProvider {
    StaticProvider::new().with_series(PriceSeries::new("SPY", bars_ending(last, opens)).unwrap())
}

fn config() -> SmacrossConfig {
    SmacrossConfig::from_toml("[strategy]\nsma_early_window = 5\nsma_late_window = 20\n").unwrap()
}

// ── Decision table ───────────────────────────────────────────────────

#[test]
fn market_closed_submits_nothing() {
    let broker = MockBroker::new(false, 1000.0, true);
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(broker.submits(), 0);
    assert_eq!(broker.closes(), 0);
    assert_eq!(
        report.outcome,
        DispatchOutcome::Skipped {
            reason: NoOpReason::MarketClosed
        }
    );
}

#[test]
fn first_buy_uses_half_of_buying_power() {
    let broker = MockBroker::new(true, 1000.0, false);
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(report.backtest.recommendation.position, Some(Position::Long));
    assert_eq!(report.backtest.data_source, DataSource::Static);
    assert_eq!(
        broker.calls.borrow().as_slice(),
        &[Call::Submit {
            symbol: "SPY".into(),
            notional: 500.0
        }]
    );
    assert_eq!(
        report.outcome,
        DispatchOutcome::Order {
            notional: 500.0,
            result: OrderResult::Filled
        }
    );
}

#[test]
fn held_position_with_flat_signal_closes_once() {
    let broker = MockBroker::new(true, 1000.0, true);
    let report = run_pipeline(
        &provider(&falling(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(broker.closes(), 1);
    assert_eq!(broker.submits(), 0);
    assert_eq!(report.decision, OrderDecision::ClosePosition);
    assert_eq!(
        report.outcome,
        DispatchOutcome::Close {
            result: CloseResult::Closed
        }
    );
}

#[test]
fn held_position_with_long_signal_scales_buy() {
    let broker = MockBroker::new(true, 1000.0, true);
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    let rec = &report.backtest.recommendation;
    let (early, late) = (rec.sma_early.unwrap(), rec.sma_late.unwrap());
    let expected = (1.0 - ((late / early - 1.0) / 0.3).min(1.0)) * 500.0;

    let OrderDecision::Buy { notional } = report.decision else {
        panic!("expected a buy, got {:?}", report.decision);
    };
    assert!((notional - expected).abs() < 1e-9);
    assert_eq!(broker.submits(), 1);
}

#[test]
fn stale_history_places_no_order() {
    let broker = MockBroker::new(true, 1000.0, true);
    let yesterday = today().pred_opt().unwrap();
    let report = run_pipeline(
        &provider(&rising(40), yesterday),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(report.backtest.recommendation.status, RecommendationStatus::Fail);
    assert!(broker.calls.borrow().is_empty());
    assert_eq!(
        report.outcome,
        DispatchOutcome::Skipped {
            reason: NoOpReason::RecommendationFailed
        }
    );
}

// ── Failure handling ─────────────────────────────────────────────────

#[test]
fn order_error_is_reported_not_raised() {
    let mut broker = MockBroker::new(true, 1000.0, false);
    broker.submit_error = Some(|| BrokerError::Api {
        status: 403,
        message: "insufficient buying power".into(),
    });
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(broker.submits(), 1);
    let DispatchOutcome::Order { result, .. } = report.outcome else {
        panic!("expected an order outcome");
    };
    assert!(matches!(result, OrderResult::Error(detail) if detail.contains("insufficient")));
}

#[test]
fn closing_a_missing_position_is_reported() {
    let mut broker = MockBroker::new(true, 1000.0, true);
    broker.close_error = Some(|| BrokerError::NoPosition {
        symbol: "SPY".into(),
    });

    let outcome = dispatch(&broker, "SPY", &OrderDecision::ClosePosition);

    assert_eq!(
        outcome,
        DispatchOutcome::Close {
            result: CloseResult::NoPosition
        }
    );
    assert_eq!(broker.closes(), 1);
    assert_eq!(broker.submits(), 0);
}

#[test]
fn close_api_error_is_reported_not_raised() {
    let mut broker = MockBroker::new(true, 1000.0, true);
    broker.close_error = Some(|| BrokerError::Api {
        status: 500,
        message: "internal error".into(),
    });
    let report = run_pipeline(
        &provider(&falling(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();

    assert_eq!(report.decision, OrderDecision::ClosePosition);
    let DispatchOutcome::Close { result } = report.outcome else {
        panic!("expected a close outcome");
    };
    assert!(matches!(result, CloseResult::Error(detail) if detail.contains("internal error")));
    assert_eq!(broker.closes(), 1);
    assert_eq!(broker.submits(), 0);
}

#[test]
fn unfilled_order_is_reported() {
    let mut broker = MockBroker::new(true, 1000.0, false);
    broker.fill = false;
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap();
    assert!(matches!(
        report.outcome,
        DispatchOutcome::Order {
            result: OrderResult::NotFilled,
            ..
        }
    ));
}

#[test]
fn dry_run_touches_only_reads() {
    let broker = MockBroker::new(true, 1000.0, false);
    let report = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::DryRun,
    )
    .unwrap();
    assert!(broker.calls.borrow().is_empty());
    assert_eq!(
        report.outcome,
        DispatchOutcome::DryRun {
            decision: OrderDecision::Buy { notional: 500.0 }
        }
    );
}

#[test]
fn short_history_aborts_the_run() {
    let broker = MockBroker::new(true, 1000.0, false);
    let err = run_pipeline(
        &provider(&rising(10), today()),
        &broker,
        &config(),
        "SPY",
        today(),
        DispatchMode::Live,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::Engine(EngineError::InsufficientHistory {
            bars: 10,
            required: 20,
            ..
        })
    ));
    assert!(broker.calls.borrow().is_empty());
}

#[test]
fn unknown_ticker_aborts_the_run() {
    let broker = MockBroker::new(true, 1000.0, false);
    let err = run_pipeline(
        &provider(&rising(40), today()),
        &broker,
        &config(),
        "NOPE",
        today(),
        DispatchMode::Live,
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Data(_)));
}

// ── Backtest only ────────────────────────────────────────────────────

#[test]
fn backtest_from_csv_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("date,open,high,low,close,volume\n");
    for bar in bars_ending(today(), &rising(30)) {
        body.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    std::fs::write(dir.path().join("SPY.csv"), body).unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = today().succ_opt().unwrap();
    let report = run_backtest(
        &CsvProvider::new(dir.path()),
        &config(),
        "SPY",
        start,
        end,
        today(),
    )
    .unwrap();

    assert_eq!(report.input_bars, 30);
    assert_eq!(report.data_source, DataSource::CsvImport);
    assert_eq!(report.metrics.bar_count, 11);
    assert!(report.recommendation.is_success());
    assert!(report.metrics.cumulative_return > 0.0);
    assert_eq!(report.metrics.max_drawdown, 0.0);
    assert_eq!(report.dataset_hash.len(), 64);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["data_source"], "csv_import");
    assert_eq!(json["recommendation"]["status"], "SUCCESS");
    assert_eq!(json["recommendation"]["position"], "long");
}
