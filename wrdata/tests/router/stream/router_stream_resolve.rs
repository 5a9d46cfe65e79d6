use std::sync::{Arc, Mutex};

use futures::StreamExt;
use wrdata::{CloseReason, DataStream, StreamKind, StreamSpec, WrdataError};
use wrdata_mock::MockStreamProvider;

use crate::helpers::{BTC_USD, dec, ticker_feed};

#[tokio::test]
async fn no_stream_provider_is_unsupported() {
    let ds = DataStream::builder().build().unwrap();
    let err = ds.stream(BTC_USD, StreamSpec::Depth, None).await.unwrap_err();
    assert_eq!(err, WrdataError::unsupported("stream-depth"));
}

#[tokio::test]
async fn ticker_stream_yields_then_reports_end() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[100, 101, 102])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let mut sub = ds.stream(BTC_USD, StreamSpec::Ticker, None).await.unwrap();
    assert_eq!(sub.provider(), "ws");
    assert_eq!(sub.kind(), StreamKind::Ticker);

    let prices: Vec<_> = (&mut sub).filter_map(|m| async move { m.price }).collect().await;
    assert_eq!(prices, vec![dec(100), dec(101), dec(102)]);
    assert_eq!(sub.close_reason(), Some(&CloseReason::EndOfStream));
}

#[tokio::test]
async fn explicit_unknown_or_incapable_provider_falls_through() {
    let depth_only = Arc::new(MockStreamProvider::new("depth-only").only(&[StreamKind::Depth]));
    let feed = ticker_feed("ws", &[(BTC_USD, &[1])]);
    let ds = DataStream::builder()
        .with_stream_provider(depth_only.clone())
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let sub = ds
        .stream(BTC_USD, StreamSpec::Ticker, Some("ghost"))
        .await
        .unwrap();
    assert_eq!(sub.provider(), "ws");

    let sub = ds
        .stream(BTC_USD, StreamSpec::Ticker, Some("depth-only"))
        .await
        .unwrap();
    assert_eq!(sub.provider(), "ws");
    assert!(depth_only.requests().is_empty());

    let resolved = ds
        .stream_manager()
        .resolve(StreamKind::Depth, None)
        .unwrap();
    assert_eq!(resolved.name(), "depth-only");
}

#[tokio::test]
async fn provider_refusal_is_returned() {
    let feed = ticker_feed("ws", &[]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();
    let err = ds.stream("NOPE", StreamSpec::Ticker, None).await.unwrap_err();
    assert!(matches!(err, WrdataError::NotFound { .. }));
}

#[tokio::test]
async fn callback_subscription_receives_every_message() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[7, 8])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handle = ds
        .subscribe(BTC_USD, StreamSpec::Ticker, None, move |m| {
            sink.lock().unwrap().push(m.price);
        })
        .await
        .unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("callback task finishes when the feed ends");
    assert_eq!(*seen.lock().unwrap(), vec![Some(dec(7)), Some(dec(8))]);
}
