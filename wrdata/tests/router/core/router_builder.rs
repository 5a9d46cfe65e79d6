use std::sync::Arc;

use wrdata::{AssetType, DataStream, GetOptions, Provider, WrdataError};
use wrdata_mock::MockStreamProvider;

use crate::helpers::{AAPL, m_fail, m_hist};

#[tokio::test]
async fn register_records_failures_in_startup_report() {
    let ok = m_hist("ok", &[1, 2]);
    let ds = DataStream::builder()
        .register("ok", Ok(ok as Arc<dyn Provider>))
        .register("broken", Err(WrdataError::InvalidArg("missing api key".into())))
        .build()
        .unwrap();

    let report = ds.startup_report();
    assert_eq!(report.registered, vec!["ok".to_string()]);
    assert_eq!(report.warnings.len(), 1);
    assert!(
        matches!(&report.warnings[0], WrdataError::Provider { provider, msg }
            if provider == "broken" && msg.contains("missing api key")),
        "got {:?}",
        report.warnings[0]
    );
    assert_eq!(ds.providers(), vec!["ok"]);
}

#[tokio::test]
async fn same_name_replaces_in_place() {
    let first = m_fail("a");
    let other = m_hist("b", &[5]);
    let replacement = m_hist("a", &[1, 2, 3]);

    let ds = DataStream::builder()
        .with_provider(first.clone())
        .with_provider(other.clone())
        .with_provider(replacement.clone())
        .build()
        .unwrap();

    assert_eq!(ds.providers(), vec!["a", "b"]);
    let rows = ds
        .get(AAPL, &GetOptions::new().provider("a"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(first.calls(), 0);
    assert_eq!(replacement.calls(), 1);
}

#[test]
fn build_rejects_zero_depth() {
    let err = DataStream::builder().depth_levels(0).build().unwrap_err();
    assert!(matches!(err, WrdataError::InvalidArg(_)));
}

#[test]
fn build_without_providers_is_allowed() {
    let ds = DataStream::builder().build().unwrap();
    assert!(ds.providers().is_empty());
    assert!(ds.supported_asset_types().is_empty());
    assert_eq!(ds.to_string(), "DataStream(providers=[])");
}

#[test]
fn build_hands_stream_settings_to_providers() {
    let feed = Arc::new(MockStreamProvider::new("ws"));
    let _ds = DataStream::builder()
        .with_stream_provider(feed.clone())
        .depth_levels(5)
        .backoff(crate::helpers::quick_backoff(2))
        .build()
        .unwrap();

    let applied = feed.settings();
    assert_eq!(applied.depth_levels, 5);
    assert_eq!(applied.backoff.max_attempts, Some(2));
    assert_eq!(applied.channel_capacity, 1024);
}

#[test]
fn supported_asset_types_follow_registered_priorities() {
    let ds = DataStream::builder()
        .with_provider(m_hist("coinbase", &[1]))
        .build()
        .unwrap();

    let kinds = ds.supported_asset_types();
    assert!(kinds.contains(&AssetType::Crypto));
    assert!(!kinds.contains(&AssetType::Equity));
    assert_eq!(ds.to_string(), "DataStream(providers=[coinbase])");
}
