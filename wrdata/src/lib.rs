//! wrdata routes market-data requests across multiple providers.
//!
//! Overview
//! - Routes history requests to providers that implement the `wrdata_core` contracts.
//! - Picks a primary provider per asset type from a priority table, then falls back
//!   across every other registered provider when it fails.
//! - Normalizes heterogeneous provider records into one candle schema.
//! - Multiplexes real-time subscriptions (ticker, kline, depth) with per-connection
//!   reconnect and exponential backoff.
//!
//! Key behaviors and trade-offs
//! - Fallback is sequential: one provider at a time, in registration order after the
//!   primary. Predictable and economical on rate limits, slower than a race.
//! - Timeouts are opt-in. Without them a hung provider holds the chain; with a
//!   `request_timeout` the chain fails fast even if providers remain untried.
//! - `fetch` never errors and reports failures inside `DataResponse`; `get` returns
//!   a `Result` for callers who prefer `?`.
//! - Streaming: each subscription owns its connection. A feed that exhausts its
//!   reconnect budget ends with `CloseReason::RetriesExhausted`; siblings continue.
//!
//! Examples
//! Building a client and fetching daily bars:
//! ```rust,ignore
//! use std::sync::Arc;
//! use wrdata::{AssetType, DataStream, GetOptions};
//!
//! let ds = DataStream::builder()
//!     .with_provider(Arc::new(CoinbaseProvider::new()))
//!     .priority_for(AssetType::Crypto, &["coinbase"])
//!     .build()?;
//!
//! let bars = ds
//!     .get("BTC-USD", &GetOptions::new().asset_type(AssetType::Crypto))
//!     .await?;
//! ```
//!
//! Streaming order book depth:
//! ```rust,ignore
//! use futures::StreamExt;
//! use wrdata::StreamSpec;
//!
//! let mut depth = ds.stream("BTC-USD", StreamSpec::Depth, None).await?;
//! while let Some(msg) = depth.next().await {
//!     println!("{:?} / {:?}", msg.bid, msg.ask);
//! }
//! println!("closed: {:?}", depth.close_reason());
//! ```
//!
//! See `wrdata/demos/` for runnable end-to-end demonstrations.
#![warn(missing_docs)]

pub(crate) mod core;
mod router;
mod streaming;

pub use core::{DataStream, DataStreamBuilder, GetOptions};
pub use router::util::collapse_errors;
pub use streaming::StreamManager;

#[cfg(feature = "dataframe")]
pub use wrdata_core::dataframe::ToDataFrame;

pub use wrdata_core::{
    // Foundational types
    AssetType,
    BackoffConfig,
    BookLevel,
    BookSide,
    Candle,
    Capability,
    CloseReason,
    // Request and response types
    DataRequest,
    DataRequestBuilder,
    DataResponse,
    GetManyReport,
    Interval,
    // Provider contracts
    Provider,
    ProviderKey,
    ProviderStatus,
    RawRecord,
    RawSeries,
    StartupReport,
    StreamHandle,
    StreamKind,
    StreamMessage,
    StreamProvider,
    StreamSettings,
    StreamSpec,
    Subscription,
    WrdataConfig,
    WrdataError,
};
