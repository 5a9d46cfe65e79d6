use wrdata::{AssetType, DataRequest, DataStream, GetOptions, WrdataError};

use crate::helpers::{BTC_USD, MockProvider, m_fail, m_hist, series};

#[tokio::test]
async fn fallback_serves_from_second_provider() {
    // Primary errors, the next registered provider answers.
    let p1 = m_fail("p1");
    let p2 = m_hist("p2", &[10, 11]);

    let ds = DataStream::builder()
        .with_provider(p1.clone())
        .with_provider(p2.clone())
        .priority_for(AssetType::Crypto, &["p1", "p2"])
        .build()
        .unwrap();

    let req = DataRequest::builder(BTC_USD)
        .asset_type(AssetType::Crypto)
        .build()
        .unwrap();
    let resp = ds.fetch(&req).await;

    assert!(resp.success);
    assert_eq!(resp.provider, "p2");
    assert_eq!(resp.data.len(), 2);
    assert_eq!(resp.data[0].timestamp.timestamp(), 10);
    assert_eq!(p1.calls(), 1);
    assert_eq!(p2.calls(), 1);

    let attempts = resp.metadata["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["provider"], "p1");
}

#[tokio::test]
async fn disabled_fallback_calls_only_the_primary() {
    let p1 = m_fail("p1");
    let p2 = m_hist("p2", &[1]);
    let p3 = m_hist("p3", &[1]);

    let ds = DataStream::builder()
        .with_provider(p1.clone())
        .with_provider(p2.clone())
        .with_provider(p3.clone())
        .fallback_enabled(false)
        .build()
        .unwrap();

    let resp = ds.fetch(&DataRequest::builder("X").build().unwrap()).await;
    assert!(!resp.success);
    assert_eq!(resp.provider, "p1");
    assert_eq!(resp.error.as_deref(), Some("p1 failed: boom"));
    assert_eq!((p1.calls(), p2.calls(), p3.calls()), (1, 0, 0));

    let err = ds.get("X", &GetOptions::new()).await.unwrap_err();
    assert_eq!(err, WrdataError::provider("p1", "boom"));
}

#[tokio::test]
async fn per_call_override_beats_instance_flag() {
    let p1 = m_fail("p1");
    let p2 = m_hist("p2", &[1]);
    let ds = DataStream::builder()
        .with_provider(p1.clone())
        .with_provider(p2.clone())
        .build()
        .unwrap();

    let err = ds
        .get("X", &GetOptions::new().fallback(false))
        .await
        .unwrap_err();
    assert!(matches!(err, WrdataError::Provider { .. }));
    assert_eq!(p2.calls(), 0);
}

#[tokio::test]
async fn every_provider_failing_is_aggregated() {
    let p1 = m_fail("p1");
    let p2 = m_fail("p2");
    let ds = DataStream::builder()
        .with_provider(p1.clone())
        .with_provider(p2.clone())
        .build()
        .unwrap();

    let resp = ds.fetch(&DataRequest::builder("X").build().unwrap()).await;
    assert!(!resp.success);
    assert!(resp.data.is_empty());
    assert_eq!(resp.error.as_deref(), Some("All providers failed to fetch data"));

    let attempts = resp.metadata["attempts"].as_array().unwrap();
    let names: Vec<_> = attempts.iter().map(|a| a["provider"].clone()).collect();
    assert_eq!(names, vec!["p1", "p2"]);

    match resp.into_result() {
        Err(WrdataError::AllProvidersFailed(v)) => assert_eq!(v.len(), 2),
        other => panic!("unexpected: {other:?}"),
    }

    match ds.get("X", &GetOptions::new()).await {
        Err(WrdataError::AllProvidersFailed(v)) => {
            assert_eq!(v[0], WrdataError::provider("p1", "boom"));
            assert_eq!(v[1], WrdataError::provider("p2", "boom"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn empty_result_counts_as_failure() {
    let empty = MockProvider::builder()
        .name("empty")
        .returns_ok(series(&[]))
        .build();
    let full = m_hist("full", &[1, 2]);
    let ds = DataStream::builder()
        .with_provider(empty.clone())
        .with_provider(full.clone())
        .build()
        .unwrap();

    let resp = ds.fetch(&DataRequest::builder("X").build().unwrap()).await;
    assert!(resp.success);
    assert_eq!(resp.provider, "full");
    assert_eq!(empty.calls(), 1);
}

#[tokio::test]
async fn only_empty_results_read_as_not_found() {
    let a = MockProvider::builder()
        .name("a")
        .returns_ok(series(&[]))
        .build();
    let ds = DataStream::builder().with_provider(a).build().unwrap();

    let err = ds.get("X", &GetOptions::new()).await.unwrap_err();
    assert!(matches!(err, WrdataError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn empty_primary_without_fallback_reports_its_own_error() {
    let empty = MockProvider::builder()
        .name("empty")
        .returns_ok(series(&[]))
        .build();
    let full = m_hist("full", &[1]);
    let ds = DataStream::builder()
        .with_provider(empty.clone())
        .with_provider(full.clone())
        .build()
        .unwrap();

    let req = DataRequest::builder("X").fallback(false).build().unwrap();
    let resp = ds.fetch(&req).await;
    assert!(!resp.success);
    assert_eq!(resp.provider, "empty");
    assert_eq!(resp.error.as_deref(), Some("not found: history for X via empty"));
    assert_eq!((empty.calls(), full.calls()), (1, 0));
}

#[tokio::test]
async fn invalid_request_never_reaches_providers() {
    let a = m_hist("a", &[1]);
    let ds = DataStream::builder().with_provider(a.clone()).build().unwrap();

    let req = DataRequest {
        symbol: "   ".into(),
        ..DataRequest::builder("X").build().unwrap()
    };
    let resp = ds.fetch(&req).await;
    assert!(!resp.success);
    assert!(resp.error.unwrap().contains("symbol"));

    let opts = GetOptions::new().range(
        crate::helpers::day(2024, 2, 1),
        crate::helpers::day(2024, 1, 1),
    );
    let err = ds.get("X", &opts).await.unwrap_err();
    assert!(matches!(err, WrdataError::InvalidArg(_)));
    assert_eq!(a.calls(), 0);
}
