use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use wrdata::{BookSide, CloseReason, DataStream, Interval, StreamKind, StreamSpec};
use wrdata_mock::{MockEvent, MockStreamProvider, Session};

use crate::helpers::{BTC_USD, ETH_USD, at, dec};

#[tokio::test]
async fn depth_stream_reflects_snapshot_then_diffs() {
    let feed = Arc::new(MockStreamProvider::new("ws").script(
        BTC_USD,
        vec![Session::Deliver(vec![
            MockEvent::snapshot(
                at(1),
                &[(dec(100), dec(1)), (dec(99), dec(2)), (dec(98), dec(3))],
                &[(dec(101), dec(1)), (dec(102), dec(2))],
            ),
            MockEvent::update(at(2), &[(BookSide::Bid, dec(100), dec(0))]),
            MockEvent::update(at(3), &[(BookSide::Ask, dec(100), dec(4))]),
        ])],
    ));
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .depth_levels(2)
        .build()
        .unwrap();

    let msgs: Vec<_> = ds
        .stream(BTC_USD, StreamSpec::Depth, None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(msgs.len(), 3);
    assert!(msgs.iter().all(|m| m.stream_type == StreamKind::Depth));

    let bids: Vec<_> = msgs[1].bids.as_ref().unwrap().iter().map(|l| l.price).collect();
    assert_eq!(bids, vec![dec(99), dec(98)]);
    assert_eq!(msgs[1].bid, Some(dec(99)));

    // the crossed book is reported as it is
    assert_eq!(msgs[2].ask, Some(dec(100)));
    assert_eq!(msgs[2].bid, Some(dec(99)));
}

#[tokio::test]
async fn kline_stream_synthesizes_bars_from_trades() {
    let feed = Arc::new(MockStreamProvider::new("ws").script(
        ETH_USD,
        vec![Session::Deliver(vec![
            MockEvent::trade(at(300), dec(10), dec(1)),
            MockEvent::trade(at(420), dec(14), dec(1)),
            MockEvent::trade(at(600), dec(12), dec(1)),
            MockEvent::trade(at(930), dec(11), dec(1)),
        ])],
    ));
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let bars: Vec<_> = ds
        .stream(ETH_USD, StreamSpec::Kline(Interval::I5m), None)
        .await
        .unwrap()
        .collect()
        .await;
    let summary: Vec<_> = bars
        .iter()
        .map(|b| (b.timestamp.timestamp(), b.open, b.close, b.volume))
        .collect();
    assert_eq!(
        summary,
        vec![
            (300, Some(dec(10)), Some(dec(14)), Some(dec(2))),
            (600, Some(dec(12)), Some(dec(12)), Some(dec(1))),
        ]
    );
}

#[tokio::test]
async fn disconnect_streams_stops_open_feeds() {
    let feed = Arc::new(
        MockStreamProvider::new("ws")
            .script(BTC_USD, vec![Session::Hold(vec![MockEvent::trade(at(1), dec(1), dec(1))])]),
    );
    let ds = DataStream::builder()
        .with_stream_provider(feed.clone())
        .build()
        .unwrap();

    let mut sub = ds.stream(BTC_USD, StreamSpec::Ticker, None).await.unwrap();
    assert!(sub.next().await.is_some());
    assert!(ds.stream_manager().status()["ws"]);

    ds.disconnect_streams().await;
    let rest = tokio::time::timeout(Duration::from_secs(5), sub.next())
        .await
        .expect("feed stops promptly");
    assert!(rest.is_none());
    assert_eq!(sub.close_reason(), Some(&CloseReason::Stopped));
}
