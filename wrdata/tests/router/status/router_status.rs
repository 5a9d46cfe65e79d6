use std::time::Duration;

use wrdata::DataStream;
use wrdata_mock::{DynamicMockProvider, MockStreamProvider};

use crate::helpers::{BTC_USD, MockProvider, ticker_feed};

#[tokio::test]
async fn status_reports_probe_and_capabilities() {
    let (dynamic, controller) = DynamicMockProvider::new_with_controller("dyn");
    controller.set_connected(false).await;
    let opts = MockProvider::builder()
        .name("opts")
        .supports_options(true)
        .build();

    let ds = DataStream::builder()
        .with_provider(dynamic)
        .with_provider(opts)
        .build()
        .unwrap();

    let status = ds.status().await;
    assert_eq!(status.len(), 2);
    assert!(!status["dyn"].connected);
    assert!(status["opts"].connected);
    assert!(status["opts"].supports_options);
    assert!(!status["opts"].supports_historical_options);
    assert!(!status["opts"].streaming);
    assert_eq!(status["opts"].error, None);
    assert_eq!(status["dyn"].vendor.as_deref(), Some("DynamicMock"));
}

#[tokio::test(start_paused = true)]
async fn slow_probe_times_out() {
    let slow = MockProvider::builder().name("slow").delay_ms(10_000).build();
    let ds = DataStream::builder()
        .with_provider(slow)
        .provider_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let status = ds.status().await;
    assert!(!status["slow"].connected);
    assert_eq!(
        status["slow"].error.as_deref(),
        Some("provider timed out: validate via slow")
    );
}

#[tokio::test]
async fn stream_only_providers_are_listed() {
    let feed = ticker_feed("ws", &[]);
    feed.set_script(BTC_USD, vec![wrdata_mock::Session::Hold(vec![])]);
    let idle = std::sync::Arc::new(MockStreamProvider::new("idle"));

    let ds = DataStream::builder()
        .with_stream_provider(feed.clone())
        .with_stream_provider(idle)
        .build()
        .unwrap();

    let before = ds.status().await;
    assert!(!before["ws"].streaming);

    let sub = ds
        .stream(BTC_USD, wrdata::StreamSpec::Ticker, Some("ws"))
        .await
        .unwrap();
    // wait for the feed task to open its connection
    while feed.live_connections() == 0 {
        tokio::task::yield_now().await;
    }

    let during = ds.status().await;
    assert!(during["ws"].streaming);
    assert!(during["ws"].connected);
    assert!(!during["idle"].streaming);

    sub.stop().await;
    assert!(!ds.status().await["ws"].streaming);
}
