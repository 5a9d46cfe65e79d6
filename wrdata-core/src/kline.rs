//! Build OHLCV bars from individual trades for feeds without a native kline channel.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use wrdata_types::{Interval, StreamKind, StreamMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bar {
    start: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

/// Trade-to-bar aggregator.
///
/// A bar is closed and emitted only when a trade lands in a later bucket, so
/// each bar is reported one interval late and the final partial bar is never
/// emitted. Buckets are aligned to multiples of the interval length since the
/// Unix epoch.
#[derive(Debug, Clone)]
pub struct KlineAggregator {
    symbol: String,
    provider: String,
    bucket_secs: i64,
    current: Option<Bar>,
}

impl KlineAggregator {
    /// New aggregator. Intervals without a fixed length fall back to one minute.
    pub fn new(symbol: impl Into<String>, provider: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
            bucket_secs: interval.seconds().unwrap_or(60),
            current: None,
        }
    }

    /// Start of the bucket containing `ts`.
    #[must_use]
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = ts.timestamp();
        let start = secs - secs.rem_euclid(self.bucket_secs);
        DateTime::from_timestamp(start, 0).unwrap_or(ts)
    }

    /// Fold one trade in; returns the previous bar if this trade rolled over.
    ///
    /// Trades older than the open bar are folded into it rather than reopening
    /// an earlier bucket.
    pub fn push_trade(
        &mut self,
        ts: DateTime<Utc>,
        price: Decimal,
        size: Decimal,
    ) -> Option<StreamMessage> {
        let start = self.bucket_start(ts);
        match &mut self.current {
            Some(bar) if start <= bar.start => {
                bar.high = bar.high.max(price);
                bar.low = bar.low.min(price);
                bar.close = price;
                bar.volume += size;
                None
            }
            slot => {
                let finished = slot.replace(Bar {
                    start,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: size,
                });
                finished.map(|b| self.to_message(&b))
            }
        }
    }

    /// Forget the open bar (e.g. after a reconnect gap).
    pub fn reset(&mut self) {
        self.current = None;
    }

    fn to_message(&self, bar: &Bar) -> StreamMessage {
        let mut msg = StreamMessage::new(&self.symbol, &self.provider, StreamKind::Kline, bar.start);
        msg.open = Some(bar.open);
        msg.high = Some(bar.high);
        msg.low = Some(bar.low);
        msg.close = Some(bar.close);
        msg.volume = Some(bar.volume);
        msg.price = Some(bar.close);
        msg
    }
}
