mod common;

use std::time::Duration;

use futures::StreamExt;
use wrdata::{DataStream, StreamSpec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    let ds = DataStream::builder()
        .with_stream_provider(common::stream_provider())
        .depth_levels(5)
        .build()?;

    println!("Streaming BTC-USD order book... (up to 10 updates or ~10s)");
    let mut depth = ds.stream("BTC-USD", StreamSpec::Depth, Some("coinbase")).await?;

    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);
    let mut seen = 0usize;
    loop {
        tokio::select! {
            () = &mut deadline => break,
            next = depth.next() => {
                let Some(msg) = next else { break };
                let spread = msg.ask.zip(msg.bid).map(|(a, b)| a - b);
                println!(
                    "{}  bid={:?} ask={:?} mid={:?} spread={:?}",
                    msg.timestamp, msg.bid, msg.ask, msg.price, spread
                );
                for (b, a) in msg.bids.unwrap_or_default().iter().zip(msg.asks.unwrap_or_default().iter()) {
                    println!("    {:>12} x {:<10} | {:>12} x {:<10}", b.price, b.size, a.price, a.size);
                }
                seen += 1;
                if seen >= 10 {
                    break;
                }
            }
        }
    }

    ds.disconnect_streams().await;
    while depth.next().await.is_some() {}
    match depth.close_error() {
        Some(err) => println!("stream failed: {err}"),
        None => println!("stream closed: {:?}", depth.close_reason()),
    }
    Ok(())
}
