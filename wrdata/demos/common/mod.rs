#![allow(dead_code)]

use std::sync::Arc;

use wrdata::{Provider, StreamProvider};

/// Route demo output through `RUST_LOG`, e.g. `RUST_LOG=wrdata=debug`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Live Coinbase by default; CI may set `WRDATA_DEMOS_USE_MOCK` to stay offline.
pub fn use_mock() -> bool {
    std::env::var("WRDATA_DEMOS_USE_MOCK").is_ok()
}

#[must_use]
pub fn history_provider() -> Arc<dyn Provider> {
    if use_mock() {
        println!("--- (Using mock provider) ---");
        Arc::new(wrdata_mock::MockProvider::named("coinbase"))
    } else {
        Arc::new(wrdata_coinbase::CoinbaseProvider::new())
    }
}

#[must_use]
pub fn stream_provider() -> Arc<dyn StreamProvider> {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use wrdata_mock::{MockEvent, MockStreamProvider, Session};

    if !use_mock() {
        return Arc::new(wrdata_coinbase::CoinbaseStream::new());
    }
    println!("--- (Using mock stream provider) ---");
    let t = |s| Utc.timestamp_opt(1_704_067_200 + s, 0).single().unwrap_or_default();
    let p = |v: i64| Decimal::new(v, 2);
    let book = vec![
        MockEvent::snapshot(
            t(0),
            &[(p(4_200_000), p(150)), (p(4_199_500), p(300))],
            &[(p(4_200_100), p(80)), (p(4_200_500), p(220))],
        ),
        MockEvent::update(t(1), &[(wrdata::BookSide::Ask, p(4_200_100), Decimal::ZERO)]),
        MockEvent::update(t(2), &[(wrdata::BookSide::Bid, p(4_200_050), p(25))]),
    ];
    let trades = (0..10)
        .map(|i| MockEvent::trade(t(i * 20), p(4_200_000 + i * 100), p(10)))
        .collect();
    Arc::new(
        MockStreamProvider::new("coinbase")
            .script("BTC-USD", vec![Session::Hold(book)])
            .script("ETH-USD", vec![Session::Deliver(trades)]),
    )
}
