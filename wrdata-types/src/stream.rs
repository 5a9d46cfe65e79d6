//! Real-time message types shared by stream providers and consumers.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WrdataError;
use crate::market::Interval;

/// Kind of real-time feed a subscription carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Last trade / best bid and offer.
    Ticker,
    /// OHLCV bars.
    Kline,
    /// Top-of-book depth snapshot.
    Depth,
}

impl StreamKind {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Kline => "kline",
            Self::Depth => "depth",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = WrdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ticker" | "trade" | "trades" => Ok(Self::Ticker),
            "kline" | "candle" | "candles" => Ok(Self::Kline),
            "depth" | "orderbook" | "level2" => Ok(Self::Depth),
            other => Err(WrdataError::InvalidArg(format!(
                "unknown stream type '{other}'"
            ))),
        }
    }
}

/// What a caller subscribes to: a kind, plus the bar width for klines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamSpec {
    /// Trades / best bid and offer.
    Ticker,
    /// Bars of the given width.
    Kline(Interval),
    /// Order book depth.
    Depth,
}

impl StreamSpec {
    /// Kind of messages this subscription yields.
    #[must_use]
    pub const fn kind(self) -> StreamKind {
        match self {
            Self::Ticker => StreamKind::Ticker,
            Self::Kline(_) => StreamKind::Kline,
            Self::Depth => StreamKind::Depth,
        }
    }
}

/// Side of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    /// Buy side.
    Bid,
    /// Sell side.
    Ask,
}

impl FromStr for BookSide {
    type Err = WrdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "bid" | "bids" => Ok(Self::Bid),
            "sell" | "ask" | "asks" | "offer" => Ok(Self::Ask),
            other => Err(WrdataError::Decode(format!("unknown book side '{other}'"))),
        }
    }
}

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Level price.
    pub price: Decimal,
    /// Resting size at `price`.
    pub size: Decimal,
}

impl BookLevel {
    /// Construct a level.
    #[must_use]
    pub const fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// A single real-time update.
///
/// Which optional fields are set depends on `stream_type`: tickers carry
/// `price`/`bid`/`ask`/`volume`, klines carry OHLCV, depth carries
/// `bids`/`asks` plus the derived best prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Symbol as the provider reports it.
    pub symbol: String,
    /// Event time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Last or mid price.
    pub price: Option<Decimal>,
    /// Best bid.
    pub bid: Option<Decimal>,
    /// Best ask.
    pub ask: Option<Decimal>,
    /// Trade size or bar volume.
    pub volume: Option<Decimal>,
    /// Bar open.
    pub open: Option<Decimal>,
    /// Bar high.
    pub high: Option<Decimal>,
    /// Bar low.
    pub low: Option<Decimal>,
    /// Bar close.
    pub close: Option<Decimal>,
    /// Bid levels, best (highest) first.
    pub bids: Option<Vec<BookLevel>>,
    /// Ask levels, best (lowest) first.
    pub asks: Option<Vec<BookLevel>>,
    /// Provider that produced the message.
    pub provider: String,
    /// Kind of update.
    pub stream_type: StreamKind,
    /// Untouched provider payload, when kept.
    pub raw_data: Option<Value>,
}

impl StreamMessage {
    /// Empty message of the given kind; callers fill in the relevant fields.
    pub fn new(
        symbol: impl Into<String>,
        provider: impl Into<String>,
        stream_type: StreamKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price: None,
            bid: None,
            ask: None,
            volume: None,
            open: None,
            high: None,
            low: None,
            close: None,
            bids: None,
            asks: None,
            provider: provider.into(),
            stream_type,
            raw_data: None,
        }
    }
}

/// Why a subscription stopped producing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The provider could not reconnect within the configured attempt budget.
    RetriesExhausted {
        /// Consecutive failed attempts before giving up.
        attempts: u32,
    },
    /// The upstream finished normally (finite or scripted feeds).
    EndOfStream,
    /// The subscription was stopped or dropped by the caller.
    Stopped,
    /// A non-retryable error ended the subscription.
    Failed(WrdataError),
}

impl CloseReason {
    /// The error behind an abnormal close, attributed to `provider`.
    ///
    /// Normal ends (`EndOfStream`, `Stopped`) yield `None`.
    #[must_use]
    pub fn to_error(&self, provider: &str) -> Option<WrdataError> {
        match self {
            Self::RetriesExhausted { attempts } => Some(WrdataError::RetriesExhausted {
                provider: provider.to_string(),
                attempts: *attempts,
            }),
            Self::Failed(e) => Some(e.clone()),
            Self::EndOfStream | Self::Stopped => None,
        }
    }
}
