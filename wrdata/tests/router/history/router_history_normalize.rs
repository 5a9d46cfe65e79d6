use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use wrdata::{AssetType, DataStream, GetOptions, RawSeries};
use wrdata_mock::MockProvider as FixtureProvider;

use crate::helpers::{AAPL, BTC_USD, ETH_USD, MockProvider};

fn fixtures() -> DataStream {
    DataStream::builder()
        .with_provider(Arc::new(FixtureProvider::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn title_case_daily_columns_are_normalized() {
    let rows = fixtures().get(AAPL, &GetOptions::new()).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(rows[0].timestamp.to_rfc3339(), "2023-01-02T00:00:00+00:00");
    assert_eq!(rows[0].close, Decimal::from(141));
    assert_eq!(rows[0].symbol.as_deref(), Some(AAPL));
    assert!(rows[0].extra.contains_key("adj_close"));
}

#[tokio::test]
async fn epoch_and_rfc3339_timestamps_agree() {
    let ds = fixtures();
    let opts = GetOptions::new().asset_type(AssetType::Crypto);
    let btc = ds.get(BTC_USD, &opts).await.unwrap();
    let eth = ds.get(ETH_USD, &opts).await.unwrap();
    assert_eq!(btc[0].timestamp, eth[0].timestamp);
    assert_eq!(btc[1].volume, "10.75".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn provider_metadata_is_passed_through() {
    let resp = fixtures()
        .fetch(&wrdata::DataRequest::builder(BTC_USD).build().unwrap())
        .await;
    assert_eq!(resp.metadata["granularity"], 86_400);
}

#[tokio::test]
async fn malformed_rows_are_dropped_without_failing() {
    let records = vec![
        json!({"date": "2024-01-03", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}),
        json!({"date": "garbage", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}),
        json!({"date": "2024-01-02", "open": 2, "high": 2, "low": 2, "close": 2}),
        json!({"date": "2024-01-01", "open": 3, "high": 3, "low": 3, "close": 3, "volume": 3}),
        json!({"date": "2024-01-01", "open": 9, "high": 9, "low": 9, "close": 9, "volume": 9}),
    ];
    let p = MockProvider::builder()
        .name("messy")
        .returns_ok(RawSeries::new(
            records
                .into_iter()
                .map(|v| v.as_object().cloned().unwrap())
                .collect(),
        ))
        .build();
    let ds = DataStream::builder().with_provider(p).build().unwrap();

    let resp = ds.fetch(&wrdata::DataRequest::builder("X").build().unwrap()).await;
    assert!(resp.success);
    let closes: Vec<_> = resp.data.iter().map(|c| c.close).collect();
    assert_eq!(closes, vec![Decimal::from(3), Decimal::from(1)]);
}

#[tokio::test]
async fn rows_that_all_drop_out_still_succeed_empty() {
    let p = MockProvider::builder()
        .name("junk")
        .returns_ok(RawSeries::new(vec![
            json!({"price": 1}).as_object().cloned().unwrap(),
        ]))
        .build();
    let ds = DataStream::builder().with_provider(p).build().unwrap();

    let resp = ds.fetch(&wrdata::DataRequest::builder("X").build().unwrap()).await;
    assert!(resp.success);
    assert!(resp.data.is_empty());
}
