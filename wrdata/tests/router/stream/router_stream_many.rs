use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use wrdata::{CloseReason, DataStream, StreamSpec, WrdataError};
use wrdata_mock::{MockStreamProvider, Session};

use crate::helpers::{BTC_USD, ETH_USD, dec, quick_backoff, ticker_feed, trades};

#[tokio::test]
async fn merged_subscription_carries_every_symbol() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[1, 2]), (ETH_USD, &[3])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let mut sub = ds
        .subscribe_many(&[BTC_USD, ETH_USD], StreamSpec::Ticker, None)
        .await
        .unwrap();
    assert_eq!(sub.symbol(), "BTC-USD,ETH-USD");

    let mut got: Vec<_> = (&mut sub).map(|m| (m.symbol, m.price)).collect().await;
    got.sort();
    assert_eq!(
        got,
        vec![
            (BTC_USD.to_string(), Some(dec(1))),
            (BTC_USD.to_string(), Some(dec(2))),
            (ETH_USD.to_string(), Some(dec(3))),
        ]
    );
    assert_eq!(sub.close_reason(), Some(&CloseReason::EndOfStream));
}

#[tokio::test]
async fn per_symbol_order_is_preserved() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[1, 2, 3, 4, 5]), (ETH_USD, &[9, 8, 7])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let msgs: Vec<_> = ds
        .subscribe_many(&[BTC_USD, ETH_USD], StreamSpec::Ticker, None)
        .await
        .unwrap()
        .collect()
        .await;
    let btc: Vec<_> = msgs
        .iter()
        .filter(|m| m.symbol == BTC_USD)
        .filter_map(|m| m.price)
        .collect();
    let eth: Vec<_> = msgs
        .iter()
        .filter(|m| m.symbol == ETH_USD)
        .filter_map(|m| m.price)
        .collect();
    assert_eq!(btc, (1..=5).map(dec).collect::<Vec<_>>());
    assert_eq!(eth, vec![dec(9), dec(8), dec(7)]);
}

#[tokio::test(start_paused = true)]
async fn a_failing_symbol_does_not_stop_its_siblings() {
    let feed = Arc::new(
        MockStreamProvider::new("ws")
            .script(BTC_USD, vec![Session::Unreachable])
            .script(ETH_USD, vec![trades(&[5, 6])]),
    );
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .backoff(quick_backoff(2))
        .build()
        .unwrap();

    let mut sub = ds
        .subscribe_many(&[BTC_USD, ETH_USD], StreamSpec::Ticker, None)
        .await
        .unwrap();
    let prices: Vec<_> = (&mut sub).filter_map(|m| async move { m.price }).collect().await;
    assert_eq!(prices, vec![dec(5), dec(6)]);
    // ETH ends at once; BTC gives up after its backoff budget and closes last.
    assert_eq!(
        sub.close_reason(),
        Some(&CloseReason::RetriesExhausted { attempts: 2 })
    );
}

#[tokio::test]
async fn refused_symbols_are_skipped() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[1])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let msgs: Vec<_> = ds
        .subscribe_many(&[BTC_USD, "NOPE"], StreamSpec::Ticker, None)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(msgs.len(), 1);

    let err = ds
        .subscribe_many(&["NOPE", "NADA"], StreamSpec::Ticker, None)
        .await
        .unwrap_err();
    match err {
        WrdataError::AllProvidersFailed(v) => assert_eq!(v.len(), 2),
        other => panic!("unexpected: {other:?}"),
    }

    let err = ds
        .subscribe_many::<&str>(&[], StreamSpec::Ticker, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WrdataError::InvalidArg(_)));
}

#[tokio::test]
async fn stopping_the_merged_subscription_stops_every_symbol() {
    let feed = Arc::new(
        MockStreamProvider::new("ws")
            .script(BTC_USD, vec![Session::Hold(vec![])])
            .script(ETH_USD, vec![Session::Hold(vec![])]),
    );
    let ds = DataStream::builder()
        .with_stream_provider(feed.clone())
        .build()
        .unwrap();

    let sub = ds
        .subscribe_many(&[BTC_USD, ETH_USD], StreamSpec::Ticker, None)
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while feed.live_connections() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("both connections open");

    sub.stop().await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while feed.live_connections() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("every connection closed");
}

#[tokio::test]
async fn callback_panic_only_ends_its_own_symbol() {
    let feed = ticker_feed("ws", &[(BTC_USD, &[1, 2, 3]), (ETH_USD, &[4, 5, 6])]);
    let ds = DataStream::builder()
        .with_stream_provider(feed)
        .build()
        .unwrap();

    let btc_seen = Arc::new(AtomicUsize::new(0));
    let eth_seen = Arc::new(Mutex::new(Vec::new()));
    let (b, e) = (Arc::clone(&btc_seen), Arc::clone(&eth_seen));
    let handle = ds
        .subscribe_many_with(&[BTC_USD, ETH_USD], StreamSpec::Ticker, None, move |m| {
            if m.symbol == BTC_USD {
                b.fetch_add(1, Ordering::SeqCst);
                panic!("callback blew up");
            }
            e.lock().unwrap().push(m.price);
        })
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while eth_seen.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("sibling symbol keeps delivering");

    assert_eq!(btc_seen.load(Ordering::SeqCst), 1);
    assert_eq!(
        *eth_seen.lock().unwrap(),
        vec![Some(dec(4)), Some(dec(5)), Some(dec(6))]
    );
    handle.stop().await;
}
