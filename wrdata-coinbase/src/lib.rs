//! wrdata-coinbase
//!
//! Coinbase connector for wrdata. Public market data only, no credentials.
//!
//! - [`CoinbaseProvider`] serves historical candles from the Advanced Trade REST
//!   API and implements `wrdata_core::Provider`.
//! - [`CoinbaseStream`] serves real-time data from the Exchange WebSocket feed and
//!   implements `wrdata_core::StreamProvider`:
//!   - ticker: the `ticker` channel, one message per update;
//!   - kline: the `matches` channel folded into bars (the feed has no native
//!     kline channel, so a bar is emitted when the next one opens);
//!   - depth: the `level2_batch` channel rebuilt into an order book, one depth
//!     message per snapshot or update.
//!
//! Both share one registry name, `"coinbase"`, so priority lists and
//! `DataStream::status` treat them as one provider.
#![warn(missing_docs)]

/// Historical candles over REST.
pub mod rest;
/// Real-time WebSocket feed.
pub mod stream;
mod symbol;

pub use rest::CoinbaseProvider;
pub use stream::{CoinbaseDecoder, CoinbaseStream};
pub use symbol::normalize_symbol;

/// Registry name shared by the REST and streaming providers.
pub const NAME: &str = "coinbase";
