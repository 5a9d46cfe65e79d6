use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use wrdata_core::{
    AssetType, BackoffConfig, DataRequest, Interval, Provider, ProviderKey, StartupReport,
    StreamProvider, WrdataConfig, WrdataError,
};

use crate::streaming::StreamManager;

/// Unified entry point: routes history requests across registered providers
/// and multiplexes real-time subscriptions.
pub struct DataStream {
    pub(crate) providers: Vec<Arc<dyn Provider>>,
    pub(crate) cfg: WrdataConfig,
    pub(crate) streams: StreamManager,
    pub(crate) startup: StartupReport,
}

/// Builder for constructing a `DataStream` with custom configuration.
pub struct DataStreamBuilder {
    providers: Vec<Arc<dyn Provider>>,
    stream_providers: Vec<Arc<dyn StreamProvider>>,
    cfg: WrdataConfig,
    warnings: Vec<WrdataError>,
}

impl Default for DataStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert<T: ?Sized>(list: &mut Vec<Arc<T>>, item: Arc<T>, key_of: impl Fn(&T) -> ProviderKey) {
    let key = key_of(&item);
    if let Some(slot) = list.iter_mut().find(|p| key_of(p) == key) {
        *slot = item;
    } else {
        list.push(item);
    }
}

impl DataStreamBuilder {
    /// Create a new builder with the default configuration.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no providers. A `DataStream` without providers still builds;
    ///   every history request then fails with "no providers available".
    /// - Defaults mirror the stock priority table: brokers first, free sources last,
    ///   fallback enabled, no timeouts, 1 s to 60 s reconnect backoff with 10 attempts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: vec![],
            stream_providers: vec![],
            cfg: WrdataConfig::default(),
            warnings: vec![],
        }
    }

    /// Register a historical data provider.
    ///
    /// Behavior and trade-offs:
    /// - Registration order is the fallback order and the last-resort primary choice.
    /// - Registering a second provider with the same `name()` replaces the first one
    ///   in place, keeping its position.
    #[must_use]
    pub fn with_provider(mut self, p: Arc<dyn Provider>) -> Self {
        upsert(&mut self.providers, p, |p| p.key());
        self
    }

    /// Register the outcome of constructing a provider.
    ///
    /// Behavior and trade-offs:
    /// - `Ok` registers the provider like [`with_provider`](Self::with_provider).
    /// - `Err` is recorded in the [`StartupReport`] under `name` and the build
    ///   continues; inspect [`DataStream::startup_report`] to see what was skipped.
    #[must_use]
    pub fn register(
        mut self,
        name: &str,
        provider: Result<Arc<dyn Provider>, WrdataError>,
    ) -> Self {
        match provider {
            Ok(p) => self.with_provider(p),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(provider = name, error = %e, "provider not registered");
                self.warnings.push(tag_err(name, e));
                self
            }
        }
    }

    /// Register a streaming provider.
    ///
    /// Behavior and trade-offs:
    /// - Registration order decides which provider serves a stream kind when the
    ///   caller does not name one.
    /// - Same-name registrations replace in place.
    #[must_use]
    pub fn with_stream_provider(mut self, p: Arc<dyn StreamProvider>) -> Self {
        upsert(&mut self.stream_providers, p, |p| p.key());
        self
    }

    /// Replace the provider priority list for an asset type.
    ///
    /// Behavior and trade-offs:
    /// - Only the primary choice is affected: the first registered name in the list
    ///   wins. Fallback still walks every registered provider in registration order.
    /// - Unregistered names are skipped at selection time, so lists may mention
    ///   providers that are registered later or not at all.
    #[must_use]
    pub fn priority_for(mut self, asset_type: AssetType, names: &[&str]) -> Self {
        self.cfg.priority.insert(
            asset_type,
            names.iter().map(|n| (*n).to_string()).collect(),
        );
        self
    }

    /// Toggle fallback to other providers after the primary fails.
    ///
    /// Behavior and trade-offs:
    /// - Disabled, a failing primary is returned as-is and no other provider is called.
    /// - Requests can override this with [`GetOptions::fallback`].
    #[must_use]
    pub const fn fallback_enabled(mut self, yes: bool) -> Self {
        self.cfg.fallback_enabled = yes;
        self
    }

    /// Provider to try first when a request does not name one.
    #[must_use]
    pub fn default_provider(mut self, name: impl Into<String>) -> Self {
        self.cfg.default_provider = Some(name.into());
        self
    }

    /// Bound each individual provider call.
    ///
    /// Behavior and trade-offs:
    /// - A timed-out call counts as a provider failure, so fallback continues.
    /// - Off by default; a slow provider then holds the chain as long as it takes.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = Some(timeout);
        self
    }

    /// Bound the whole primary-plus-fallback chain.
    ///
    /// Behavior and trade-offs:
    /// - When exceeded, the request fails with `request timed out: history` even if
    ///   untried providers remain.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Provide a custom reconnect policy for streaming.
    ///
    /// Behavior and trade-offs:
    /// - Handed to every stream provider at build time.
    /// - Jitter spreads simultaneous reconnects at the cost of less predictable delays.
    #[must_use]
    pub const fn backoff(mut self, cfg: BackoffConfig) -> Self {
        self.cfg.backoff = cfg;
        self
    }

    /// Levels per side in depth messages.
    #[must_use]
    pub const fn depth_levels(mut self, levels: usize) -> Self {
        self.cfg.depth_levels = levels;
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: WrdataConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build the `DataStream`.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `depth_levels` or `channel_capacity` is zero.
    pub fn build(self) -> Result<DataStream, WrdataError> {
        if self.cfg.depth_levels == 0 {
            return Err(WrdataError::InvalidArg(
                "depth_levels must be at least 1".into(),
            ));
        }
        if self.cfg.channel_capacity == 0 {
            return Err(WrdataError::InvalidArg(
                "channel_capacity must be at least 1".into(),
            ));
        }

        let settings = self.cfg.stream_settings();
        for sp in &self.stream_providers {
            sp.apply_settings(&settings);
        }

        let startup = StartupReport {
            registered: self.providers.iter().map(|p| p.name().to_string()).collect(),
            warnings: self.warnings,
        };

        Ok(DataStream {
            providers: self.providers,
            streams: StreamManager::new(self.stream_providers)
                .with_capacity(self.cfg.channel_capacity),
            cfg: self.cfg,
            startup,
        })
    }
}

/// Per-call options for [`DataStream::get`] and [`DataStream::get_many`].
///
/// Unset dates default to the trailing year ending today (UTC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Asset class used to choose the primary provider.
    pub asset_type: AssetType,
    /// First day (inclusive).
    pub start: Option<NaiveDate>,
    /// Last day (inclusive).
    pub end: Option<NaiveDate>,
    /// Bar width.
    pub interval: Interval,
    /// Provider to try first.
    pub provider: Option<String>,
    /// Override of the instance fallback flag.
    pub fallback: Option<bool>,
}

impl GetOptions {
    /// Daily equity bars over the trailing year.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the asset class.
    #[must_use]
    pub const fn asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = asset_type;
        self
    }

    /// Set the inclusive date range.
    #[must_use]
    pub const fn range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set the bar width.
    #[must_use]
    pub const fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Try `name` first.
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Enable or disable fallback for this call only.
    #[must_use]
    pub const fn fallback(mut self, yes: bool) -> Self {
        self.fallback = Some(yes);
        self
    }

    pub(crate) fn request(&self, symbol: &str) -> Result<DataRequest, WrdataError> {
        let mut b = DataRequest::builder(symbol)
            .asset_type(self.asset_type)
            .interval(self.interval)
            .provider_opt(self.provider.clone());
        if let Some(s) = self.start {
            b = b.start(s);
        }
        if let Some(e) = self.end {
            b = b.end(e);
        }
        if let Some(f) = self.fallback {
            b = b.fallback(f);
        }
        b.build()
    }
}

pub fn tag_err(provider: &str, e: WrdataError) -> WrdataError {
    match e {
        e @ (WrdataError::NotFound { .. }
        | WrdataError::ProviderTimeout { .. }
        | WrdataError::Provider { .. }
        | WrdataError::RequestTimeout { .. }
        | WrdataError::AllProvidersFailed(_)) => e,
        other => WrdataError::Provider {
            provider: provider.to_string(),
            msg: other.to_string(),
        },
    }
}

impl DataStream {
    /// Wrap a provider future with a timeout and standardized timeout error mapping.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata::core::provider_call_with_timeout",
            skip(fut),
            fields(
                provider = provider_name,
                capability = capability,
                timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            ),
        )
    )]
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        provider_name: &'static str,
        capability: &'static str,
        timeout: Option<Duration>,
        fut: Fut,
    ) -> Result<T, WrdataError>
    where
        Fut: core::future::Future<Output = Result<T, WrdataError>>,
    {
        match timeout {
            Some(t) => (tokio::time::timeout(t, fut).await)
                .unwrap_or_else(|_| Err(WrdataError::provider_timeout(provider_name, capability))),
            None => fut.await,
        }
    }

    /// Start building a new `DataStream`.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use wrdata::{AssetType, DataStream};
    ///
    /// let ds = DataStream::builder()
    ///     .with_provider(Arc::new(CoinbaseProvider::new()))
    ///     .with_stream_provider(Arc::new(CoinbaseStream::new()))
    ///     .priority_for(AssetType::Crypto, &["coinbase"])
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> DataStreamBuilder {
        DataStreamBuilder::new()
    }

    /// Registration outcome recorded at build time.
    #[must_use]
    pub const fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    /// Registered historical providers, in registration (fallback) order.
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Asset types whose priority list names at least one registered provider.
    #[must_use]
    pub fn supported_asset_types(&self) -> BTreeSet<AssetType> {
        self.cfg
            .priority
            .iter()
            .filter(|(_, names)| names.iter().any(|n| self.provider(n).is_some()))
            .map(|(t, _)| *t)
            .collect()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &WrdataConfig {
        &self.cfg
    }

    /// The stream manager behind [`stream`](Self::stream) and friends.
    #[must_use]
    pub const fn stream_manager(&self) -> &StreamManager {
        &self.streams
    }

    pub(crate) fn provider(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }
}

impl fmt::Debug for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStream")
            .field("providers", &self.providers())
            .field("stream_providers", &self.streams.providers())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataStream(providers=[{}])", self.providers().join(", "))
    }
}
