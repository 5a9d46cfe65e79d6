mod common;

use std::time::Duration;

use wrdata::DataStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    let ds = DataStream::builder()
        .register("coinbase", Ok(common::history_provider()))
        .register(
            "broken",
            Err(wrdata::WrdataError::InvalidArg("missing API key".into())),
        )
        .with_stream_provider(common::stream_provider())
        .provider_timeout(Duration::from_secs(5))
        .build()?;

    let report = ds.startup_report();
    println!("registered: {:?}", report.registered);
    for w in &report.warnings {
        println!("startup warning: {w}");
    }
    println!("asset types served: {:?}", ds.supported_asset_types());

    for (name, s) in ds.status().await {
        println!(
            "{name:<10} connected={} streaming={} options={} error={:?}",
            s.connected, s.streaming, s.supports_options, s.error
        );
    }
    Ok(())
}
