use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wrdata_core::normalize::{parse_decimal_str, parse_timestamp_str};
use wrdata_core::{
    BookChange, BookSide, ConnectionTracker, Decimal, FeedConnection, FeedDriver, FeedTransport,
    FrameDecoder, Interval, KlineAggregator, OrderBook, OrderBookSet, StreamKind, StreamMessage,
    StreamProvider, StreamSettings, Subscription, WrdataError,
};

use crate::NAME;
use crate::symbol::normalize_symbol;

/// Public Exchange WebSocket feed.
pub const DEFAULT_WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsTransport {
    url: String,
    subscribe: String,
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn FeedConnection>, WrdataError> {
        let (mut ws, _resp) = connect_async(self.url.as_str())
            .await
            .map_err(WrdataError::transport)?;
        ws.send(Message::Text(self.subscribe.clone()))
            .await
            .map_err(WrdataError::transport)?;
        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: Socket,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<String, WrdataError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // pings are answered by tungstenite on the next read
                Ok(_) => {}
                Err(e) => return Some(Err(WrdataError::transport(e))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Feed frames this crate understands. Anything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Frame {
    #[serde(rename = "ticker")]
    Ticker {
        time: Option<String>,
        price: Option<String>,
        best_bid: Option<String>,
        best_ask: Option<String>,
        last_size: Option<String>,
    },
    #[serde(rename = "match")]
    Match {
        time: String,
        price: String,
        size: String,
    },
    #[serde(rename = "snapshot")]
    Snapshot {
        bids: Vec<[String; 2]>,
        asks: Vec<[String; 2]>,
    },
    #[serde(rename = "l2update")]
    L2Update {
        time: Option<String>,
        changes: Vec<[String; 3]>,
    },
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(other)]
    Other,
}

fn decimal(s: &str, field: &str) -> Result<Decimal, WrdataError> {
    parse_decimal_str(s).ok_or_else(|| WrdataError::decode(format!("{field}: {s}")))
}

fn opt_decimal(s: Option<&String>) -> Option<Decimal> {
    s.and_then(|v| parse_decimal_str(v))
}

fn time_or_now(s: Option<&str>) -> DateTime<Utc> {
    s.and_then(parse_timestamp_str).unwrap_or_else(Utc::now)
}

fn book_levels(raw: &[[String; 2]], field: &str) -> Result<Vec<(Decimal, Decimal)>, WrdataError> {
    raw.iter()
        .map(|[p, s]| Ok((decimal(p, field)?, decimal(s, field)?)))
        .collect()
}

fn change([side, price, size]: &[String; 3]) -> Result<BookChange, WrdataError> {
    let side = match side.as_str() {
        "buy" => BookSide::Bid,
        "sell" => BookSide::Ask,
        other => return Err(WrdataError::decode(format!("book side: {other}"))),
    };
    Ok(BookChange {
        side,
        price: decimal(price, "change price")?,
        size: decimal(size, "change size")?,
    })
}

enum View {
    Ticker,
    Kline(KlineAggregator),
    Depth { books: OrderBookSet, levels: usize },
}

/// Turns Coinbase feed frames for one product into [`StreamMessage`]s.
///
/// One decoder serves one subscription. Depth decoders hold the reconstructed
/// book and emit nothing until the first snapshot arrives; every reconnect
/// discards the book and waits for a fresh snapshot.
pub struct CoinbaseDecoder {
    product: String,
    view: View,
}

impl CoinbaseDecoder {
    /// Ticker decoder for `symbol`.
    #[must_use]
    pub fn ticker(symbol: &str) -> Self {
        Self {
            product: normalize_symbol(symbol),
            view: View::Ticker,
        }
    }

    /// Bars of width `interval` built from the trade feed.
    #[must_use]
    pub fn kline(symbol: &str, interval: Interval) -> Self {
        let product = normalize_symbol(symbol);
        Self {
            view: View::Kline(KlineAggregator::new(product.as_str(), NAME, interval)),
            product,
        }
    }

    /// Order book decoder reporting `levels` levels per side.
    #[must_use]
    pub fn depth(symbol: &str, levels: usize) -> Self {
        Self {
            product: normalize_symbol(symbol),
            view: View::Depth {
                books: OrderBookSet::new(),
                levels,
            },
        }
    }

    /// Product id frames are expected for.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Feed channel this decoder consumes.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self.view {
            View::Ticker => "ticker",
            View::Kline(_) => "matches",
            View::Depth { .. } => "level2_batch",
        }
    }

    /// Current reconstructed book, once a snapshot has been applied.
    #[must_use]
    pub fn book(&self) -> Option<&OrderBook> {
        match &self.view {
            View::Depth { books, .. } => books.get(&self.product),
            _ => None,
        }
    }

    /// Subscribe request for this decoder's channel.
    #[must_use]
    pub fn subscribe_message(&self) -> String {
        json!({
            "type": "subscribe",
            "product_ids": [self.product],
            "channels": [self.channel()],
        })
        .to_string()
    }
}

impl FrameDecoder for CoinbaseDecoder {
    fn on_connect(&mut self) {
        match &mut self.view {
            View::Ticker => {}
            View::Kline(agg) => agg.reset(),
            View::Depth { books, .. } => books.clear(),
        }
    }

    fn decode(&mut self, frame: &str) -> Result<Vec<StreamMessage>, WrdataError> {
        let value: Value = serde_json::from_str(frame)?;
        if let Some(pid) = value.get("product_id").and_then(Value::as_str)
            && pid != self.product
        {
            return Ok(Vec::new());
        }
        let parsed = Frame::deserialize(&value)?;

        let out = match (&mut self.view, parsed) {
            (
                View::Ticker,
                Frame::Ticker {
                    time,
                    price,
                    best_bid,
                    best_ask,
                    last_size,
                },
            ) => {
                let mut msg = StreamMessage::new(
                    &self.product,
                    NAME,
                    StreamKind::Ticker,
                    time_or_now(time.as_deref()),
                );
                msg.price = opt_decimal(price.as_ref());
                msg.bid = opt_decimal(best_bid.as_ref());
                msg.ask = opt_decimal(best_ask.as_ref());
                msg.volume = opt_decimal(last_size.as_ref());
                msg.raw_data = Some(value);
                Some(msg)
            }
            (View::Kline(agg), Frame::Match { time, price, size }) => {
                let ts = parse_timestamp_str(&time)
                    .ok_or_else(|| WrdataError::decode(format!("match time: {time}")))?;
                agg.push_trade(ts, decimal(&price, "match price")?, decimal(&size, "match size")?)
            }
            (View::Depth { books, levels }, Frame::Snapshot { bids, asks }) => {
                let (bids, asks) = (book_levels(&bids, "bid")?, book_levels(&asks, "ask")?);
                let book = books.book_mut(&self.product);
                book.apply_snapshot(bids, asks);
                Some(book.depth_message(&self.product, NAME, Utc::now(), *levels, Some(value)))
            }
            (View::Depth { books, levels }, Frame::L2Update { time, changes }) => {
                // nothing to patch until a snapshot has seeded the book
                let Some(book) = books.get_mut(&self.product) else {
                    return Ok(Vec::new());
                };
                let changes = changes.iter().map(change).collect::<Result<Vec<_>, _>>()?;
                book.apply_update(changes);
                Some(book.depth_message(
                    &self.product,
                    NAME,
                    time_or_now(time.as_deref()),
                    *levels,
                    Some(value),
                ))
            }
            (_, Frame::Error { message, reason }) => {
                let detail = match reason {
                    Some(r) => format!("{message}: {r}"),
                    None => message,
                };
                return Err(WrdataError::provider(NAME, detail));
            }
            _ => None,
        };
        Ok(out.into_iter().collect())
    }
}

/// Coinbase Exchange WebSocket feed.
///
/// Every subscription opens its own socket to the feed and subscribes to one
/// channel for one product; it reconnects under the applied backoff settings
/// and stops when [`disconnect`](StreamProvider::disconnect) is called.
pub struct CoinbaseStream {
    url: String,
    settings: Mutex<StreamSettings>,
    tracker: Arc<ConnectionTracker>,
}

impl Default for CoinbaseStream {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseStream {
    /// Stream provider against the public production feed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(DEFAULT_WS_URL)
    }

    /// Stream provider against another feed URL (sandbox, local relay).
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            settings: Mutex::new(StreamSettings::default()),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Settings later subscriptions will use.
    #[must_use]
    pub fn settings(&self) -> StreamSettings {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open sockets across all subscriptions.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.tracker.live()
    }

    fn open(&self, kind: StreamKind, decoder: CoinbaseDecoder) -> Subscription {
        let settings = self.settings();
        let transport = WsTransport {
            url: self.url.clone(),
            subscribe: decoder.subscribe_message(),
        };
        #[cfg(feature = "tracing")]
        tracing::info!(product = decoder.product(), channel = decoder.channel(), "opening coinbase feed");
        let product = decoder.product().to_string();
        FeedDriver::new(NAME, product, kind, transport, decoder)
            .backoff(settings.backoff)
            .tracker(Arc::clone(&self.tracker))
            .capacity(settings.channel_capacity)
            .spawn()
    }
}

#[async_trait]
impl StreamProvider for CoinbaseStream {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, kind: StreamKind) -> bool {
        matches!(
            kind,
            StreamKind::Ticker | StreamKind::Kline | StreamKind::Depth
        )
    }

    fn apply_settings(&self, settings: &StreamSettings) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = *settings;
    }

    async fn disconnect(&self) {
        self.tracker.disconnect_all();
    }

    fn is_connected(&self) -> bool {
        self.tracker.is_connected()
    }

    async fn subscribe_ticker(&self, symbol: &str) -> Result<Subscription, WrdataError> {
        Ok(self.open(StreamKind::Ticker, CoinbaseDecoder::ticker(symbol)))
    }

    async fn subscribe_kline(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Subscription, WrdataError> {
        Ok(self.open(StreamKind::Kline, CoinbaseDecoder::kline(symbol, interval)))
    }

    async fn subscribe_depth(&self, symbol: &str) -> Result<Subscription, WrdataError> {
        let levels = self.settings().depth_levels;
        Ok(self.open(StreamKind::Depth, CoinbaseDecoder::depth(symbol, levels)))
    }
}
