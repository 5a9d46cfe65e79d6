#![allow(dead_code)]
// Re-export helpers so tests can `use helpers::*;`
pub mod mock_provider;

pub use mock_provider::{MockProvider, m_fail, m_hist};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use wrdata::{BackoffConfig, RawRecord, RawSeries};
use wrdata_mock::{MockEvent, MockStreamProvider, Session};

// ---------- Lightweight fixtures and helpers for tests ----------

/// Common symbol constants used across tests.
pub const AAPL: &str = "AAPL";
pub const MSFT: &str = "MSFT";
#[allow(dead_code)]
pub const BTC_USD: &str = "BTC-USD";
#[allow(dead_code)]
pub const ETH_USD: &str = "ETH-USD";

/// Calendar date without unwrap noise in tests.
pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// UTC instant from epoch seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

/// Whole-number decimal.
pub fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

/// One lowercase OHLCV record at epoch second `ts`, all prices equal to `close`.
pub fn record(ts: i64, close: f64) -> RawRecord {
    let v = json!({
        "timestamp": ts,
        "open": close,
        "high": close,
        "low": close,
        "close": close,
        "volume": 1_000,
    });
    v.as_object().cloned().expect("object literal")
}

/// Series of records for the given `(ts, close)` pairs.
pub fn series(rows: &[(i64, f64)]) -> RawSeries {
    RawSeries::new(rows.iter().map(|&(ts, c)| record(ts, c)).collect())
}

/// Backoff short enough to keep paused-clock tests quick.
pub const fn quick_backoff(max_attempts: u32) -> BackoffConfig {
    BackoffConfig {
        min_backoff_ms: 10,
        max_backoff_ms: 40,
        factor: 2,
        jitter_percent: 0,
        max_attempts: Some(max_attempts),
    }
}

/// Ticker feed that delivers one trade per price, then ends.
pub fn trades(prices: &[i64]) -> Session {
    Session::Deliver(
        (1..)
            .zip(prices)
            .map(|(t, &p)| MockEvent::trade(at(t), dec(p), dec(1)))
            .collect(),
    )
}

/// Scripted stream provider with one ticker script per `(symbol, prices)`.
pub fn ticker_feed(name: &'static str, scripts: &[(&str, &[i64])]) -> Arc<MockStreamProvider> {
    let p = MockStreamProvider::new(name);
    for (symbol, prices) in scripts {
        p.set_script(symbol, vec![trades(prices)]);
    }
    Arc::new(p)
}
