//! Configuration types shared across the router, stream manager, and providers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::market::AssetType;

/// Exponential backoff configuration for reconnecting streaming connections.
///
/// The delay before attempt `n` (zero-based) is
/// `min(min_backoff_ms * factor^n, max_backoff_ms)` plus optional jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
    /// Consecutive failed attempts before a connection is abandoned. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            factor: 2,
            jitter_percent: 0,
            max_attempts: Some(10),
        }
    }
}

impl BackoffConfig {
    /// Base delay (before jitter) for zero-based attempt `attempt`.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let factor = u64::from(self.factor.max(1));
        let mut delay = self.min_backoff_ms;
        for _ in 0..attempt {
            delay = delay.saturating_mul(factor);
            if delay >= self.max_backoff_ms {
                return self.max_backoff_ms;
            }
        }
        delay.min(self.max_backoff_ms)
    }

    /// True once `failures` consecutive attempts have used up the budget.
    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

/// Default provider priority per asset type.
///
/// This is business policy: brokers with full market access first, free
/// sources last.
#[must_use]
pub fn default_priority() -> BTreeMap<AssetType, Vec<String>> {
    let list = |names: &[&str]| names.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    let equity = list(&["ibkr", "alpaca", "finnhub", "alphavantage", "yfinance"]);
    BTreeMap::from([
        (AssetType::Equity, equity.clone()),
        (AssetType::Stock, equity),
        (AssetType::Etf, list(&["ibkr", "alpaca", "finnhub", "yfinance"])),
        (AssetType::Option, list(&["ibkr"])),
        (AssetType::Future, list(&["ibkr"])),
        (AssetType::Index, list(&["yfinance"])),
        (AssetType::Forex, list(&["ibkr", "alphavantage", "yfinance"])),
        (
            AssetType::Crypto,
            list(&["binance", "coingecko", "coinbase", "yfinance"]),
        ),
        (AssetType::Economic, list(&["fred"])),
    ])
}

/// Global configuration for the `DataStream` facade and its stream manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrdataConfig {
    /// Provider names per asset type, highest priority first.
    ///
    /// Names that are not registered are skipped at selection time.
    pub priority: BTreeMap<AssetType, Vec<String>>,
    /// Whether to try other providers after the primary fails.
    pub fallback_enabled: bool,
    /// Provider used when a request does not name one.
    pub default_provider: Option<String>,
    /// Optional timeout for each individual provider call.
    pub provider_timeout: Option<Duration>,
    /// Optional deadline for the whole primary-plus-fallback chain.
    pub request_timeout: Option<Duration>,
    /// Reconnect policy for streaming connections.
    pub backoff: BackoffConfig,
    /// Levels per side in depth messages.
    pub depth_levels: usize,
    /// Buffer size of each subscription channel.
    pub channel_capacity: usize,
}

impl WrdataConfig {
    /// The subset of this configuration streaming providers need.
    #[must_use]
    pub const fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            backoff: self.backoff,
            depth_levels: self.depth_levels,
            channel_capacity: self.channel_capacity,
        }
    }
}

/// Settings handed to every streaming provider when it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Reconnect policy for each connection.
    pub backoff: BackoffConfig,
    /// Levels per side in depth messages.
    pub depth_levels: usize,
    /// Buffer size of each subscription channel.
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        WrdataConfig::default().stream_settings()
    }
}

impl Default for WrdataConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            fallback_enabled: true,
            default_provider: None,
            provider_timeout: None,
            request_timeout: None,
            backoff: BackoffConfig::default(),
            depth_levels: 20,
            channel_capacity: 1024,
        }
    }
}
