use async_trait::async_trait;

use wrdata_types::{
    Capability, DataRequest, Interval, ProviderKey, RawSeries, StreamKind, StreamSettings, StreamSpec,
    WrdataError,
};

use crate::subscription::Subscription;

/// Historical data source (REST API, local cache, ...).
///
/// Implementations return raw records in their own column spelling; the router
/// normalizes them. Any `Err` is treated as a provider failure and triggers
/// fallback, so implementations need not distinguish transient from permanent
/// errors.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A stable identifier used in priority lists (e.g. "coinbase", "yfinance").
    fn name(&self) -> &'static str;

    /// Canonical provider key constructed from the static name.
    fn key(&self) -> ProviderKey {
        ProviderKey::new(self.name())
    }

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Fetch OHLCV records for `req.symbol` over the request's date range.
    async fn fetch_timeseries(&self, req: &DataRequest) -> Result<RawSeries, WrdataError>;

    /// Cheap connectivity probe.
    async fn validate_connection(&self) -> bool;

    /// Whether the provider serves option chains.
    fn supports_options(&self) -> bool {
        false
    }

    /// Whether the provider serves historical option data.
    fn supports_historical_options(&self) -> bool {
        false
    }
}

/// Real-time data source.
///
/// Each `subscribe_*` call returns an independent [`Subscription`] whose
/// producing task owns its own connection and reconnect loop. Methods a
/// provider does not implement report `Unsupported`.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// A stable identifier used in priority lists.
    fn name(&self) -> &'static str;

    /// Canonical provider key constructed from the static name.
    fn key(&self) -> ProviderKey {
        ProviderKey::new(self.name())
    }

    /// Whether the provider offers `kind` at all.
    fn supports(&self, kind: StreamKind) -> bool;

    /// Adopt the facade's backoff, depth, and channel settings for later
    /// subscriptions. Default: keep whatever the provider was built with.
    fn apply_settings(&self, settings: &StreamSettings) {
        let _ = settings;
    }

    /// Prepare shared resources. Default: nothing to prepare.
    async fn connect(&self) -> Result<(), WrdataError> {
        Ok(())
    }

    /// Stop every subscription this provider started.
    async fn disconnect(&self);

    /// True while at least one connection is open.
    fn is_connected(&self) -> bool;

    /// Disconnect, then connect again.
    async fn reconnect(&self) -> Result<(), WrdataError> {
        self.disconnect().await;
        self.connect().await
    }

    /// Trades / best bid and offer for `symbol`.
    async fn subscribe_ticker(&self, symbol: &str) -> Result<Subscription, WrdataError> {
        let _ = symbol;
        Err(WrdataError::unsupported(Capability::StreamTicker.as_str()))
    }

    /// Bars of width `interval` for `symbol`.
    async fn subscribe_kline(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Subscription, WrdataError> {
        let _ = (symbol, interval);
        Err(WrdataError::unsupported(Capability::StreamKline.as_str()))
    }

    /// Reconstructed order book depth for `symbol`.
    async fn subscribe_depth(&self, symbol: &str) -> Result<Subscription, WrdataError> {
        let _ = symbol;
        Err(WrdataError::unsupported(Capability::StreamDepth.as_str()))
    }

    /// Dispatch on `spec` to the matching `subscribe_*` method.
    async fn subscribe(&self, symbol: &str, spec: StreamSpec) -> Result<Subscription, WrdataError> {
        match spec {
            StreamSpec::Ticker => self.subscribe_ticker(symbol).await,
            StreamSpec::Kline(interval) => self.subscribe_kline(symbol, interval).await,
            StreamSpec::Depth => self.subscribe_depth(symbol).await,
        }
    }
}
