use wrdata_core::{StreamHandle, StreamMessage, StreamSpec, Subscription, WrdataError};

use crate::core::DataStream;

impl DataStream {
    /// Stream real-time data for one symbol.
    ///
    /// Behavior and trade-offs:
    /// - The provider is `provider` when it is registered and offers the stream,
    ///   otherwise the first registered stream provider that does.
    /// - The returned [`Subscription`] is a `futures::Stream`; when it ends,
    ///   [`Subscription::close_reason`] says whether the provider gave up, the feed
    ///   finished, or the subscription was stopped.
    /// - Dropping the subscription closes its connection.
    ///
    /// # Errors
    /// Returns `Unsupported` when no registered stream provider offers `spec`.
    pub async fn stream(
        &self,
        symbol: &str,
        spec: StreamSpec,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        self.streams.subscribe(symbol, spec, provider).await
    }

    /// Stream one symbol into a callback running on a background task.
    ///
    /// # Errors
    /// Same as [`stream`](Self::stream).
    pub async fn subscribe<F>(
        &self,
        symbol: &str,
        spec: StreamSpec,
        provider: Option<&str>,
        on_message: F,
    ) -> Result<StreamHandle, WrdataError>
    where
        F: FnMut(StreamMessage) + Send + 'static,
    {
        let sub = self.stream(symbol, spec, provider).await?;
        Ok(sub.spawn_callback(on_message, |_reason| {}))
    }

    /// Stream several symbols through one merged subscription.
    ///
    /// # Errors
    /// See [`StreamManager::subscribe_many`](crate::StreamManager::subscribe_many).
    pub async fn subscribe_many<S: AsRef<str>>(
        &self,
        symbols: &[S],
        spec: StreamSpec,
        provider: Option<&str>,
    ) -> Result<Subscription, WrdataError> {
        self.streams.subscribe_many(symbols, spec, provider).await
    }

    /// Stream several symbols into a callback, one task per symbol.
    ///
    /// # Errors
    /// See [`StreamManager::subscribe_many_with`](crate::StreamManager::subscribe_many_with).
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
        self.streams
            .subscribe_many_with(symbols, spec, provider, on_message)
            .await
    }

    /// Close every streaming connection.
    pub async fn disconnect_streams(&self) {
        self.streams.disconnect_all().await;
    }
}
