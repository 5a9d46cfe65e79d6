use std::sync::Arc;

use futures::StreamExt;
use wrdata::{CloseReason, DataStream, StreamSpec, WrdataError};
use wrdata_mock::{MockStreamProvider, Session};

use crate::helpers::{BTC_USD, dec, quick_backoff, trades};

#[tokio::test(start_paused = true)]
async fn feed_reconnects_after_drops_and_refusals() {
    let feed = Arc::new(MockStreamProvider::new("ws").script(
        BTC_USD,
        vec![
            trades(&[100]),
            Session::Refuse(WrdataError::transport("reset by peer")),
            trades(&[101]),
        ],
    ));
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .backoff(quick_backoff(3))
        .build()
        .unwrap();

    let mut sub = ds.stream(BTC_USD, StreamSpec::Ticker, None).await.unwrap();
    let prices: Vec<_> = (&mut sub).filter_map(|m| async move { m.price }).collect().await;
    assert_eq!(prices, vec![dec(100), dec(101)]);
    assert_eq!(sub.close_reason(), Some(&CloseReason::EndOfStream));
}

#[tokio::test(start_paused = true)]
async fn configured_budget_ends_with_retries_exhausted() {
    let feed = Arc::new(MockStreamProvider::new("ws").script(BTC_USD, vec![Session::Unreachable]));
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .backoff(quick_backoff(4))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let mut sub = ds.stream(BTC_USD, StreamSpec::Ticker, None).await.unwrap();
    assert!(sub.next().await.is_none());
    assert_eq!(
        sub.close_reason(),
        Some(&CloseReason::RetriesExhausted { attempts: 4 })
    );
    // 10 + 20 + 40 + 40 ms of backoff before giving up
    assert_eq!(started.elapsed().as_millis(), 110);
}

#[tokio::test]
async fn permanent_connect_error_fails_the_subscription() {
    let feed = Arc::new(MockStreamProvider::new("ws").script(
        BTC_USD,
        vec![Session::Refuse(WrdataError::InvalidArg("unknown product".into()))],
    ));
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let mut sub = ds.stream(BTC_USD, StreamSpec::Ticker, None).await.unwrap();
    assert!(sub.next().await.is_none());
    assert_eq!(
        sub.close_reason(),
        Some(&CloseReason::Failed(WrdataError::InvalidArg(
            "unknown product".into()
        )))
    );
}
