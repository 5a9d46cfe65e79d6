//! wrdata-core
//!
//! Provider traits and the data-plane building blocks shared across the
//! wrdata ecosystem.
//!
//! - `provider`: the `Provider` (historical) and `StreamProvider` (real-time) traits.
//! - `normalize`: maps heterogeneous provider records onto canonical candles.
//! - `orderbook`: level-2 book reconstruction from snapshots and updates.
//! - `kline`: trade-to-bar aggregation for feeds without a native kline channel.
//! - `feed`: a supervised connect/decode/reconnect loop for websocket-style feeds.
//! - `subscription`: the consumer side of a live feed.
//!
//! Async runtime (Tokio)
//! ---------------------
//! This crate assumes the Tokio ecosystem as the async runtime. Several public
//! APIs are explicitly coupled to Tokio types and facilities:
//!
//! - `stream::StreamHandle` wraps `tokio::task::JoinHandle<()>` and uses
//!   `tokio::sync::oneshot::Sender<()>` for cooperative shutdown.
//! - `subscription::Subscription` reads from a `tokio::sync::mpsc` channel.
//! - `feed::FeedDriver` sleeps with `tokio::time`, so paused-clock tests work.
//!
//! As a result, code that uses streaming must run under a Tokio 1.x runtime.
//!
#![warn(missing_docs)]

/// Jittered waits for reconnect loops.
pub mod backoff;
#[cfg(feature = "dataframe")]
pub mod dataframe;
pub mod feed;
pub mod kline;
pub mod normalize;
pub mod orderbook;
/// Historical and streaming provider traits.
pub mod provider;
/// Internal stream utilities used by `StreamHandle` and tests.
pub mod stream;
pub mod subscription;
pub mod types;

pub use feed::{ConnectionTracker, FeedConnection, FeedDriver, FeedTransport, FrameDecoder};
pub use kline::KlineAggregator;
pub use normalize::{RowRejection, normalize, normalize_record};
pub use orderbook::{BookChange, DEFAULT_DEPTH_LEVELS, OrderBook, OrderBookSet};
pub use provider::{Provider, StreamProvider};
pub use stream::StreamHandle;
pub use subscription::{EventSender, StreamEvent, Subscription};
pub use types::*;
