//! Scripted stream provider.
//!
//! Every subscription replays its symbol's script from the start: a list of
//! connection sessions, each either refused or delivering a fixed list of
//! events. Events travel as JSON text frames through [`FeedDriver`], so the
//! reconnect policy, kline synthesis, and book reconstruction behave exactly
//! as they do for a live venue.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wrdata_core::{
    BookChange, BookSide, Capability, ConnectionTracker, FeedConnection, FeedDriver,
    FeedTransport, FrameDecoder, Interval, KlineAggregator, OrderBook, StreamKind,
    StreamMessage, StreamProvider, StreamSettings, Subscription, WrdataError,
};

/// One event in a scripted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MockEvent {
    /// A trade print.
    Trade {
        /// Trade time.
        time: DateTime<Utc>,
        /// Trade price.
        price: Decimal,
        /// Trade size.
        size: Decimal,
    },
    /// Best bid and offer.
    Quote {
        /// Quote time.
        time: DateTime<Utc>,
        /// Best bid.
        bid: Decimal,
        /// Best ask.
        ask: Decimal,
    },
    /// Full book replacement.
    Snapshot {
        /// Snapshot time.
        time: DateTime<Utc>,
        /// `(price, size)` bid levels.
        bids: Vec<(Decimal, Decimal)>,
        /// `(price, size)` ask levels.
        asks: Vec<(Decimal, Decimal)>,
    },
    /// Incremental book changes.
    Update {
        /// Update time.
        time: DateTime<Utc>,
        /// `(side, price, size)`; size zero removes the level.
        changes: Vec<(BookSide, Decimal, Decimal)>,
    },
    /// Sent verbatim instead of as JSON, e.g. to exercise undecodable frames.
    Raw {
        /// Frame text.
        text: String,
    },
}

impl MockEvent {
    /// Trade print.
    #[must_use]
    pub const fn trade(time: DateTime<Utc>, price: Decimal, size: Decimal) -> Self {
        Self::Trade { time, price, size }
    }

    /// Book snapshot.
    #[must_use]
    pub fn snapshot(
        time: DateTime<Utc>,
        bids: &[(Decimal, Decimal)],
        asks: &[(Decimal, Decimal)],
    ) -> Self {
        Self::Snapshot {
            time,
            bids: bids.to_vec(),
            asks: asks.to_vec(),
        }
    }

    /// Book update.
    #[must_use]
    pub fn update(time: DateTime<Utc>, changes: &[(BookSide, Decimal, Decimal)]) -> Self {
        Self::Update {
            time,
            changes: changes.to_vec(),
        }
    }

    fn to_frame(&self) -> String {
        match self {
            Self::Raw { text } => text.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

/// One connection attempt in a script.
#[derive(Debug, Clone)]
pub enum Session {
    /// The connect call fails with this error.
    Refuse(WrdataError),
    /// Connect succeeds, these events arrive, then the peer closes.
    Deliver(Vec<MockEvent>),
    /// Connect succeeds, these events arrive, then the connection idles until stopped.
    Hold(Vec<MockEvent>),
    /// This and every later connect fails with a transport error.
    Unreachable,
}

struct ScriptedTransport {
    sessions: Mutex<VecDeque<Session>>,
}

impl ScriptedTransport {
    fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
        }
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn connect(&self) -> Result<Box<dyn FeedConnection>, WrdataError> {
        let next = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            match sessions.front() {
                Some(Session::Unreachable) => Some(Session::Unreachable),
                _ => sessions.pop_front(),
            }
        };
        match next {
            None => Err(WrdataError::transport("script exhausted")),
            Some(Session::Unreachable) => Err(WrdataError::transport("connection refused")),
            Some(Session::Refuse(e)) => Err(e),
            Some(Session::Deliver(events)) => Ok(Box::new(ScriptedConnection::new(&events, false))),
            Some(Session::Hold(events)) => Ok(Box::new(ScriptedConnection::new(&events, true))),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct ScriptedConnection {
    frames: VecDeque<String>,
    hold: bool,
}

impl ScriptedConnection {
    fn new(events: &[MockEvent], hold: bool) -> Self {
        Self {
            frames: events.iter().map(MockEvent::to_frame).collect(),
            hold,
        }
    }
}

#[async_trait]
impl FeedConnection for ScriptedConnection {
    async fn next_frame(&mut self) -> Option<Result<String, WrdataError>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.hold {
            std::future::pending::<()>().await;
        }
        None
    }
}

enum View {
    Ticker,
    Kline(KlineAggregator),
    Depth { book: OrderBook, levels: usize },
}

struct MockDecoder {
    symbol: String,
    provider: &'static str,
    view: View,
}

impl FrameDecoder for MockDecoder {
    fn on_connect(&mut self) {
        match &mut self.view {
            View::Ticker => {}
            View::Kline(agg) => agg.reset(),
            View::Depth { book, .. } => book.clear(),
        }
    }

    fn decode(&mut self, frame: &str) -> Result<Vec<StreamMessage>, WrdataError> {
        let event: MockEvent = serde_json::from_str(frame)?;
        let out = match (&mut self.view, event) {
            (View::Ticker, MockEvent::Trade { time, price, size }) => {
                let mut msg =
                    StreamMessage::new(&self.symbol, self.provider, StreamKind::Ticker, time);
                msg.price = Some(price);
                msg.volume = Some(size);
                Some(msg)
            }
            (View::Ticker, MockEvent::Quote { time, bid, ask }) => {
                let mut msg =
                    StreamMessage::new(&self.symbol, self.provider, StreamKind::Ticker, time);
                msg.bid = Some(bid);
                msg.ask = Some(ask);
                msg.price = Some((bid + ask) / Decimal::from(2));
                Some(msg)
            }
            (View::Kline(agg), MockEvent::Trade { time, price, size }) => {
                agg.push_trade(time, price, size)
            }
            (View::Depth { book, levels }, MockEvent::Snapshot { time, bids, asks }) => {
                book.apply_snapshot(bids, asks);
                Some(book.depth_message(&self.symbol, self.provider, time, *levels, None))
            }
            (View::Depth { book, levels }, MockEvent::Update { time, changes }) => {
                book.apply_update(
                    changes
                        .into_iter()
                        .map(|(side, price, size)| BookChange { side, price, size }),
                );
                Some(book.depth_message(&self.symbol, self.provider, time, *levels, None))
            }
            _ => None,
        };
        Ok(out.into_iter().collect())
    }
}

/// Stream provider that replays per-symbol scripts.
///
/// Subscribing to a symbol without a script fails with `NotFound`. Settings
/// applied by the facade (backoff, depth levels, channel size) are honored by
/// every later subscription.
pub struct MockStreamProvider {
    name: &'static str,
    kinds: Vec<StreamKind>,
    scripts: Mutex<HashMap<String, Vec<Session>>>,
    requests: Mutex<Vec<(String, StreamKind)>>,
    settings: Mutex<StreamSettings>,
    tracker: Arc<ConnectionTracker>,
}

impl MockStreamProvider {
    /// Provider offering ticker, kline, and depth streams.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            kinds: vec![StreamKind::Ticker, StreamKind::Kline, StreamKind::Depth],
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            settings: Mutex::new(StreamSettings::default()),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Restrict the stream kinds this provider advertises.
    #[must_use]
    pub fn only(mut self, kinds: &[StreamKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Script `symbol` (builder form of [`set_script`](Self::set_script)).
    #[must_use]
    pub fn script(self, symbol: &str, sessions: Vec<Session>) -> Self {
        self.set_script(symbol, sessions);
        self
    }

    /// Replace the script for `symbol`; affects later subscriptions only.
    pub fn set_script(&self, symbol: &str, sessions: Vec<Session>) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.to_string(), sessions);
    }

    /// Every accepted or refused subscription request, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, StreamKind)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Settings later subscriptions will use.
    #[must_use]
    pub fn settings(&self) -> StreamSettings {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open connections across all subscriptions.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.tracker.live()
    }

    fn open(
        &self,
        symbol: &str,
        kind: StreamKind,
        interval: Option<Interval>,
    ) -> Result<Subscription, WrdataError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((symbol.to_string(), kind));
        if !self.supports(kind) {
            return Err(WrdataError::unsupported(Capability::from(kind).as_str()));
        }
        let sessions = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned()
            .ok_or_else(|| WrdataError::not_found(format!("stream for {symbol}")))?;

        let settings = self.settings();
        let view = match kind {
            StreamKind::Ticker => View::Ticker,
            StreamKind::Kline => View::Kline(KlineAggregator::new(
                symbol,
                self.name,
                interval.unwrap_or(Interval::I1m),
            )),
            StreamKind::Depth => View::Depth {
                book: OrderBook::new(),
                levels: settings.depth_levels,
            },
        };
        let decoder = MockDecoder {
            symbol: symbol.to_string(),
            provider: self.name,
            view,
        };
        Ok(FeedDriver::new(
            self.name,
            symbol,
            kind,
            ScriptedTransport::new(sessions),
            decoder,
        )
        .backoff(settings.backoff)
        .tracker(Arc::clone(&self.tracker))
        .capacity(settings.channel_capacity)
        .spawn())
    }
}

#[async_trait]
impl StreamProvider for MockStreamProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, kind: StreamKind) -> bool {
        self.kinds.contains(&kind)
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
        self.open(symbol, StreamKind::Ticker, None)
    }

    async fn subscribe_kline(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Subscription, WrdataError> {
        self.open(symbol, StreamKind::Kline, Some(interval))
    }

    async fn subscribe_depth(&self, symbol: &str) -> Result<Subscription, WrdataError> {
        self.open(symbol, StreamKind::Depth, None)
    }
}
