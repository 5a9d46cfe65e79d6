mod common;

use chrono::{Days, Utc};
use wrdata::{AssetType, DataRequest, DataStream, GetOptions, Interval, WrdataError};
use wrdata_mock::{DynamicMockProvider, MockBehavior};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    // 1. A primary that always fails, with a working provider behind it.
    let (flaky, controller) = DynamicMockProvider::new_with_controller("flaky");
    controller
        .set_history_behavior(
            "BTC-USD",
            MockBehavior::Fail(WrdataError::provider("flaky", "503 upstream")),
        )
        .await;

    let ds = DataStream::builder()
        .with_provider(flaky)
        .with_provider(common::history_provider())
        .priority_for(AssetType::Crypto, &["flaky", "coinbase"])
        .build()?;
    println!("{ds}");

    // 2. Ten days of daily candles, as a DataResponse with diagnostics.
    let end = Utc::now().date_naive();
    let start = end.checked_sub_days(Days::new(10)).unwrap_or(end);
    let req = DataRequest::builder("BTC-USD")
        .asset_type(AssetType::Crypto)
        .interval(Interval::D1)
        .start(start)
        .end(end)
        .build()?;

    let resp = ds.fetch(&req).await;
    println!("served by {} (success={})", resp.provider, resp.success);
    for w in resp.warnings() {
        println!("  warning: {w}");
    }
    if let Some(attempts) = resp.metadata.get("attempts") {
        println!("  attempts: {attempts}");
    }

    // 3. The same request through the Result API.
    let opts = GetOptions::new()
        .asset_type(AssetType::Crypto)
        .interval(Interval::D1)
        .range(start, end);
    let bars = ds.get("BTC-USD", &opts).await?;
    for c in bars.iter().take(5) {
        println!(
            " - {}  o={} h={} l={} c={} v={}",
            c.timestamp, c.open, c.high, c.low, c.close, c.volume
        );
    }

    // 4. Without fallback the primary's error comes back untouched.
    match ds.get("BTC-USD", &opts.fallback(false)).await {
        Ok(rows) => println!("fallback disabled: {} rows", rows.len()),
        Err(e) => println!("fallback disabled: {e}"),
    }
    println!("calls to flaky: {}", controller.history_calls("BTC-USD").await);

    Ok(())
}
