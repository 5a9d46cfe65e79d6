mod common;

use wrdata::{AssetType, DataStream, GetOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    let ds = DataStream::builder()
        .with_provider(common::history_provider())
        .priority_for(AssetType::Crypto, &["coinbase"])
        .build()?;

    let symbols = ["BTC-USD", "ETH-USD", "NOT-A-PAIR", "BTC-USD"];
    let opts = GetOptions::new().asset_type(AssetType::Crypto);

    println!("Fetching {} symbols concurrently...", symbols.len());
    let report = ds.get_many(&symbols, &opts).await;

    for (symbol, rows) in &report.data {
        match rows.last() {
            Some(last) => println!(" - {symbol}: {} rows, last close {}", rows.len(), last.close),
            None => println!(" - {symbol}: no data"),
        }
    }
    for (symbol, err) in report.failed.iter().zip(&report.warnings) {
        println!("failed {symbol}: {err}");
    }
    Ok(())
}
