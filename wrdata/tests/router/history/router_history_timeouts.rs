use std::time::Duration;

use wrdata::{DataRequest, DataStream, GetOptions, WrdataError};

use crate::helpers::{MockProvider, m_hist, series};

#[tokio::test(start_paused = true)]
async fn provider_timeout_moves_on_to_the_next_provider() {
    let slow = MockProvider::builder()
        .name("slow")
        .returns_ok(series(&[(1, 1.0)]))
        .delay_ms(5_000)
        .build();
    let fast = m_hist("fast", &[1, 2]);

    let ds = DataStream::builder()
        .with_provider(slow.clone())
        .with_provider(fast.clone())
        .provider_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let resp = ds.fetch(&DataRequest::builder("X").build().unwrap()).await;
    assert!(resp.success);
    assert_eq!(resp.provider, "fast");

    let attempts = resp.metadata["attempts"].as_array().unwrap();
    assert_eq!(attempts[0]["provider"], "slow");
    assert_eq!(
        attempts[0]["error"],
        "provider timed out: history via slow"
    );
}

#[tokio::test(start_paused = true)]
async fn request_timeout_bounds_the_whole_chain() {
    let a = MockProvider::builder()
        .name("a")
        .returns_ok(series(&[(1, 1.0)]))
        .delay_ms(300)
        .build();
    let b = MockProvider::builder()
        .name("b")
        .returns_ok(series(&[(1, 1.0)]))
        .delay_ms(300)
        .build();

    let ds = DataStream::builder()
        .with_provider(a.clone())
        .with_provider(b.clone())
        .provider_timeout(Duration::from_millis(200))
        .request_timeout(Duration::from_millis(250))
        .build()
        .unwrap();

    let err = ds.get("X", &GetOptions::new()).await.unwrap_err();
    assert_eq!(err, WrdataError::request_timeout("history"));
    // the chain was cut off while the second provider was still running
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn without_timeouts_a_slow_provider_still_answers() {
    let slow = MockProvider::builder()
        .name("slow")
        .returns_ok(series(&[(1, 1.0)]))
        .delay_ms(60_000)
        .build();
    let ds = DataStream::builder().with_provider(slow).build().unwrap();

    let rows = ds.get("X", &GetOptions::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
}
