mod common;

use wrdata::{AssetType, DataStream, GetOptions, ToDataFrame};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logging();

    let ds = DataStream::builder()
        .with_provider(common::history_provider())
        .build()?;

    let bars = ds
        .get("BTC-USD", &GetOptions::new().asset_type(AssetType::Crypto))
        .await?;
    let df = bars.to_dataframe()?;
    println!("{df}");
    Ok(())
}
