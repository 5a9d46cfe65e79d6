//! Optional conversion of candles into a `polars` `DataFrame`.

use polars::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use wrdata_types::{Candle, WrdataError};

/// Types that can be rendered as a `DataFrame`.
pub trait ToDataFrame {
    /// Build the frame.
    ///
    /// # Errors
    /// Returns `Data` if polars rejects the columns.
    fn to_dataframe(&self) -> Result<DataFrame, WrdataError>;
}

impl ToDataFrame for [Candle] {
    fn to_dataframe(&self) -> Result<DataFrame, WrdataError> {
        let f = |g: fn(&Candle) -> rust_decimal::Decimal| -> Vec<Option<f64>> {
            self.iter().map(|c| g(c).to_f64()).collect()
        };
        let ts: Vec<i64> = self.iter().map(|c| c.timestamp.timestamp_millis()).collect();
        let symbol: Vec<Option<String>> = self.iter().map(|c| c.symbol.clone()).collect();
        df!(
            "timestamp" => ts,
            "open" => f(|c| c.open),
            "high" => f(|c| c.high),
            "low" => f(|c| c.low),
            "close" => f(|c| c.close),
            "volume" => f(|c| c.volume),
            "symbol" => symbol,
        )
        .map_err(|e| WrdataError::Data(e.to_string()))
    }
}

impl ToDataFrame for Vec<Candle> {
    fn to_dataframe(&self) -> Result<DataFrame, WrdataError> {
        self.as_slice().to_dataframe()
    }
}
