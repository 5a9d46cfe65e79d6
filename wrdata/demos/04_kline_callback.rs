mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wrdata::{DataStream, Interval, StreamSpec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    let ds = DataStream::builder()
        .with_stream_provider(common::stream_provider())
        .build()?;

    // Coinbase has no kline channel: bars are built from trades and each bar is
    // printed once the next one opens.
    let bars = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&bars);
    let handle = ds
        .subscribe_many_with(
            &["ETH-USD"],
            StreamSpec::Kline(Interval::I1m),
            None,
            move |m| {
                counter.fetch_add(1, Ordering::Relaxed);
                println!(
                    "{} {}  o={:?} h={:?} l={:?} c={:?} v={:?}",
                    m.symbol, m.timestamp, m.open, m.high, m.low, m.close, m.volume
                );
            },
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(if common::use_mock() { 1 } else { 130 })).await;
    handle.stop().await;
    println!("{} bars received", bars.load(Ordering::Relaxed));
    Ok(())
}
