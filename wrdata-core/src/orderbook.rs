//! Level-2 order book reconstruction from a snapshot plus incremental changes.
//!
//! Each side is a `BTreeMap` keyed by price, so best-price lookups and sorted
//! depth views fall out of map iteration order. Levels with size zero are never
//! stored: a zero in a snapshot is skipped and a zero in an update deletes.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use wrdata_types::{BookLevel, BookSide, StreamKind, StreamMessage};

/// Default number of levels per side in depth messages.
pub const DEFAULT_DEPTH_LEVELS: usize = 20;

/// One incremental change: set `side` at `price` to `size` (zero removes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookChange {
    /// Side being changed.
    pub side: BookSide,
    /// Level price.
    pub price: Decimal,
    /// New absolute size at `price`.
    pub size: Decimal,
}

/// Reconstructed book for a single symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    /// Empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both sides wholesale. Zero-size levels are skipped.
    pub fn apply_snapshot<B, A>(&mut self, bids: B, asks: A)
    where
        B: IntoIterator<Item = (Decimal, Decimal)>,
        A: IntoIterator<Item = (Decimal, Decimal)>,
    {
        self.bids = bids.into_iter().filter(|(_, s)| !s.is_zero()).collect();
        self.asks = asks.into_iter().filter(|(_, s)| !s.is_zero()).collect();
    }

    /// Apply changes in order. Removing an absent level is a no-op.
    pub fn apply_update<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = BookChange>,
    {
        for BookChange { side, price, size } in changes {
            let book = match side {
                BookSide::Bid => &mut self.bids,
                BookSide::Ask => &mut self.asks,
            };
            if size.is_zero() {
                book.remove(&price);
            } else {
                book.insert(price, size);
            }
        }
    }

    /// Highest bid, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(p, s)| BookLevel::new(*p, *s))
    }

    /// Lowest ask, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks
            .iter()
            .next()
            .map(|(p, s)| BookLevel::new(*p, *s))
    }

    /// Midpoint of the best prices when both sides are present.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b.price + a.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// Best ask minus best bid. Negative for a crossed book.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some(a.price - b.price),
            _ => None,
        }
    }

    /// Top `n` bids, highest first.
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<BookLevel> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, s)| BookLevel::new(*p, *s))
            .collect()
    }

    /// Top `n` asks, lowest first.
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<BookLevel> {
        self.asks
            .iter()
            .take(n)
            .map(|(p, s)| BookLevel::new(*p, *s))
            .collect()
    }

    /// Size resting at `price` on `side`.
    #[must_use]
    pub fn level(&self, side: BookSide, price: Decimal) -> Option<Decimal> {
        match side {
            BookSide::Bid => self.bids.get(&price).copied(),
            BookSide::Ask => self.asks.get(&price).copied(),
        }
    }

    /// Number of levels per side as `(bids, asks)`.
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// True when both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Drop all levels.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Build a depth message for the current state.
    ///
    /// Bids are listed highest first and asks lowest first, each truncated to
    /// `levels`. `bid`/`ask` are the best prices and `price` is their midpoint.
    /// Crossed books are reported as they are.
    #[must_use]
    pub fn depth_message(
        &self,
        symbol: &str,
        provider: &str,
        timestamp: DateTime<Utc>,
        levels: usize,
        raw: Option<Value>,
    ) -> StreamMessage {
        let mut msg = StreamMessage::new(symbol, provider, StreamKind::Depth, timestamp);
        msg.bid = self.best_bid().map(|l| l.price);
        msg.ask = self.best_ask().map(|l| l.price);
        msg.price = self.mid();
        msg.bids = Some(self.top_bids(levels));
        msg.asks = Some(self.top_asks(levels));
        msg.raw_data = raw;
        msg
    }
}

/// Books keyed by symbol, owned by the single task that feeds them.
#[derive(Debug, Default)]
pub struct OrderBookSet {
    books: HashMap<String, OrderBook>,
}

impl OrderBookSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Book for `symbol`, created empty on first use.
    pub fn book_mut(&mut self, symbol: &str) -> &mut OrderBook {
        self.books.entry(symbol.to_string()).or_default()
    }

    /// Current book for `symbol`, if one has been started.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Mutable book for `symbol`, only if one has been started.
    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut OrderBook> {
        self.books.get_mut(symbol)
    }

    /// Discard every book (after a reconnect the feed resends snapshots).
    pub fn clear(&mut self) {
        self.books.clear();
    }
}
