//! Registry of streaming providers and multi-symbol fan-in.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinSet;
use wrdata_core::{
    Capability, CloseReason, EventSender, Interval, StreamHandle, StreamKind, StreamMessage,
    StreamProvider, StreamSpec, Subscription, WrdataError,
};

use crate::router::util::collapse_errors;

/// Routes subscriptions to registered stream providers.
///
/// Each subscription owns its own connection and reconnect loop inside the
/// provider, so one failing feed never disturbs another.
pub struct StreamManager {
    providers: Vec<Arc<dyn StreamProvider>>,
    capacity: usize,
}

impl StreamManager {
    /// Manager over `providers`, in resolution order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn StreamProvider>>) -> Self {
        Self {
            providers,
            capacity: 1024,
        }
    }

    /// Channel size for merged multi-symbol subscriptions.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Registered provider names, in resolution order.
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Pick the provider for `kind`.
    ///
    /// An explicit name wins when it is registered and offers `kind`; otherwise
    /// it is logged and resolution falls through to the first registered
    /// provider that offers `kind`.
    ///
    /// # Errors
    /// Returns `Unsupported` when no registered provider offers `kind`.
    pub fn resolve(
        &self,
        kind: StreamKind,
        provider: Option<&str>,
    ) -> Result<Arc<dyn StreamProvider>, WrdataError> {
        if let Some(name) = provider {
            match self.providers.iter().find(|p| p.name() == name) {
                Some(p) if p.supports(kind) => return Ok(Arc::clone(p)),
                Some(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(provider = name, kind = %kind, "provider does not offer this stream, using fallback");
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(provider = name, "stream provider not available, using fallback");
                }
            }
        }
        self.providers
            .iter()
            .find(|p| p.supports(kind))
            .cloned()
            .ok_or_else(|| WrdataError::unsupported(Capability::from(kind).as_str()))
    }

    /// Subscribe to one symbol.
    ///
    /// # Errors
    /// Returns `Unsupported` when no provider offers the stream, or whatever the
    /// provider reports when it refuses the subscription.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata::streaming::subscribe",
            skip(self),
            fields(kind = %spec.kind()),
        )
    )]
    pub async fn subscribe(
        &self,
        symbol: &str,
        spec: StreamSpec,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        let source = self.resolve(spec.kind(), provider)?;
        source.subscribe(symbol, spec).await
    }

    /// Trades / best bid and offer for `symbol`.
    ///
    /// # Errors
    /// See [`subscribe`](Self::subscribe).
    pub async fn subscribe_ticker(
        &self,
        symbol: &str,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        self.subscribe(symbol, StreamSpec::Ticker, provider).await
    }

    /// Bars of width `interval` for `symbol`.
    ///
    /// # Errors
    /// See [`subscribe`](Self::subscribe).
    pub async fn subscribe_kline(
        &self,
        symbol: &str,
        interval: Interval,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        self.subscribe(symbol, StreamSpec::Kline(interval), provider)
            .await
    }

    /// Order book depth for `symbol`.
    ///
    /// # Errors
    /// See [`subscribe`](Self::subscribe).
    pub async fn subscribe_depth(
        &self,
        symbol: &str,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        self.subscribe(symbol, StreamSpec::Depth, provider).await
    }

    async fn open_each<S: AsRef<str>>(
        &self,
        symbols: &[S],
        spec: StreamSpec,
        provider: Option<&str>,
    ) -> Result<(Arc<dyn StreamProvider>, Vec<Subscription>), WrdataError> {
        if symbols.is_empty() {
            return Err(WrdataError::InvalidArg(
                "symbols list cannot be empty".into(),
            ));
        }
        let source = self.resolve(spec.kind(), provider)?;
        let mut subs = Vec::with_capacity(symbols.len());
        let mut errors = Vec::new();
        for symbol in symbols {
            match source.subscribe(symbol.as_ref(), spec).await {
                Ok(sub) => subs.push(sub),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(provider = source.name(), symbol = symbol.as_ref(), error = %e, "subscription refused");
                    errors.push(e);
                }
            }
        }
        if subs.is_empty() {
            return Err(collapse_errors(
                Capability::from(spec.kind()),
                true,
                errors,
                None,
            ));
        }
        Ok((source, subs))
    }

    /// Subscribe to several symbols and merge them into one subscription.
    ///
    /// Behavior and trade-offs:
    /// - One provider (resolved once) serves every symbol; each symbol still gets
    ///   its own connection task, so a symbol that fails or gives up does not stop
    ///   the others.
    /// - Symbols the provider refuses are skipped; the call fails only when every
    ///   symbol is refused.
    /// - The merged stream ends when every per-symbol stream has ended and reports
    ///   the close reason of the last one.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an empty list, `Unsupported` when no provider offers
    /// the stream, or the aggregated refusals when no symbol could be subscribed.
    pub async fn subscribe_many<S: AsRef<str>>(
        &self,
        symbols: &[S],
        spec: StreamSpec,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        let (source, subs) = self.open_each(symbols, spec, provider).await?;
        let label = subs
            .iter()
            .map(Subscription::symbol)
            .collect::<Vec<_>>()
            .join(",");

        let (tx, rx) = Subscription::channel(self.capacity);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(fan_in(subs, tx, stop_rx));
        Ok(Subscription::new(
            rx,
            StreamHandle::new(join, stop_tx),
            source.name(),
            label,
            spec.kind(),
        ))
    }

    /// Subscribe to several symbols and push every message to `on_message`.
    ///
    /// Behavior and trade-offs:
    /// - The callback runs on one task per symbol; a callback that panics ends
    ///   only that symbol's task.
    /// - Stopping or dropping the returned handle stops every symbol.
    ///
    /// # Errors
    /// Same as [`subscribe_many`](Self::subscribe_many).
    pub async fn subscribe_many_with<S, F>(
        &self,
        symbols: &[S],
        spec: StreamSpec,
        provider: Option<&str>,
        on_message: F,
    ) -> Result<StreamHandle, WrdataError>
    where
        S: AsRef<str>,
        F: Fn(StreamMessage) + Send + Sync + 'static,
    {
        let (_source, subs) = self.open_each(symbols, spec, provider).await?;
        let on_message = Arc::new(on_message);
        let handles: Vec<StreamHandle> = subs
            .into_iter()
            .map(|sub| {
                let cb = Arc::clone(&on_message);
                #[cfg(feature = "tracing")]
                let symbol = sub.symbol().to_string();
                sub.spawn_callback(
                    move |m| cb(m),
                    move |_reason| {
                        #[cfg(feature = "tracing")]
                        tracing::info!(symbol = %symbol, reason = ?_reason, "stream closed");
                    },
                )
            })
            .collect();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let _ = stop_rx.await;
            for h in handles {
                h.stop().await;
            }
        });
        Ok(StreamHandle::new(join, stop_tx))
    }

    /// Stop every connection every provider holds.
    pub async fn disconnect_all(&self) {
        for p in &self.providers {
            p.disconnect().await;
        }
    }

    /// Connection state per stream provider.
    #[must_use]
    pub fn status(&self) -> BTreeMap<String, bool> {
        self.providers
            .iter()
            .map(|p| (p.name().to_string(), p.is_connected()))
            .collect()
    }
}

async fn fan_in(subs: Vec<Subscription>, tx: EventSender, mut stop_rx: oneshot::Receiver<()>) {
    let mut children = JoinSet::new();
    for mut sub in subs {
        let tx = tx.clone();
        children.spawn(async move {
            while let Some(m) = sub.next_message().await {
                if !tx.send(m).await {
                    break;
                }
            }
            sub.close_reason().cloned().unwrap_or(CloseReason::Stopped)
        });
    }

    let mut last = CloseReason::EndOfStream;
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                children.shutdown().await;
                tx.close(CloseReason::Stopped).await;
                return;
            }
            next = children.join_next() => match next {
                Some(Ok(reason)) => last = reason,
                Some(Err(_err)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_err, "per-symbol stream task failed");
                }
                None => break,
            }
        }
    }
    tx.close(last).await;
}
