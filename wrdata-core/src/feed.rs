//! Supervised real-time feeds: connect, decode frames, reconnect with backoff.
//!
//! A provider supplies a [`FeedTransport`] (how to open a connection and
//! subscribe) and a [`FrameDecoder`] (how to turn text frames into
//! [`StreamMessage`]s). [`FeedDriver::spawn`] runs the pair on a task and hands
//! back a [`Subscription`].
//!
//! Reconnect policy: after a failed connect or a dropped connection the task
//! sleeps `BackoffConfig::delay_ms(failures)` (plus jitter) and tries again.
//! A successful connect resets the failure count. Once the configured attempt
//! budget is spent the subscription ends with `CloseReason::RetriesExhausted`.
//! Every sleep and every read races the stop signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio::time::{Duration, sleep};
use wrdata_types::{BackoffConfig, CloseReason, StreamKind, StreamMessage, WrdataError};

use crate::backoff::jitter_wait;
use crate::stream::StreamHandle;
use crate::subscription::{EventSender, Subscription};

/// An open connection yielding text frames.
#[async_trait]
pub trait FeedConnection: Send {
    /// Next text frame. `None` once the peer has closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String, WrdataError>>;

    /// Close the connection politely. Default: nothing to do.
    async fn close(&mut self) {}
}

/// Knows how to open (and subscribe on) a connection.
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    /// Open a connection and send whatever subscribe request the venue needs.
    async fn connect(&self) -> Result<Box<dyn FeedConnection>, WrdataError>;

    /// True when the upstream has nothing more to offer and reconnecting is
    /// pointless. Live venues never are.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Turns raw frames into messages.
pub trait FrameDecoder: Send + 'static {
    /// Called after every successful (re)connect, before the first frame.
    fn on_connect(&mut self) {}

    /// Decode one frame into zero or more messages.
    ///
    /// # Errors
    /// A decode error drops the frame; the connection stays up.
    fn decode(&mut self, frame: &str) -> Result<Vec<StreamMessage>, WrdataError>;
}

/// Shared connection bookkeeping for one provider.
///
/// Counts live connections (for `is_connected`) and broadcasts a shutdown
/// epoch so `disconnect` can stop every feed the provider started.
#[derive(Debug)]
pub struct ConnectionTracker {
    live: AtomicUsize,
    epoch: Mutex<watch::Sender<u64>>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self {
            live: AtomicUsize::new(0),
            epoch: Mutex::new(watch::channel(0).0),
        }
    }
}

impl ConnectionTracker {
    /// New shared tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// True while at least one feed holds an open connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.live() > 0
    }

    /// Number of open connections.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Stop every feed started before this call.
    pub fn disconnect_all(&self) {
        self.epoch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_modify(|e| *e = e.wrapping_add(1));
    }

    fn shutdown_signal(&self) -> watch::Receiver<u64> {
        self.epoch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe()
    }

    fn enter(self: &Arc<Self>) -> LiveGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        LiveGuard(Arc::clone(self))
    }
}

struct LiveGuard(Arc<ConnectionTracker>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs a transport/decoder pair under the reconnect policy.
pub struct FeedDriver<T, D> {
    provider: String,
    symbol: String,
    kind: StreamKind,
    transport: T,
    decoder: D,
    backoff: BackoffConfig,
    tracker: Option<Arc<ConnectionTracker>>,
    capacity: usize,
}

enum Step {
    Stop,
    Reconnect,
    ConsumerGone,
}

impl<T: FeedTransport, D: FrameDecoder> FeedDriver<T, D> {
    /// New driver with default backoff and a 1024-slot channel.
    pub fn new(
        provider: impl Into<String>,
        symbol: impl Into<String>,
        kind: StreamKind,
        transport: T,
        decoder: D,
    ) -> Self {
        Self {
            provider: provider.into(),
            symbol: symbol.into(),
            kind,
            transport,
            decoder,
            backoff: BackoffConfig::default(),
            tracker: None,
            capacity: 1024,
        }
    }

    /// Override the reconnect policy.
    #[must_use]
    pub const fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Report connections to (and obey disconnects from) `tracker`.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<ConnectionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Override the subscription channel size.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Start the feed task and return its subscription.
    pub fn spawn(self) -> Subscription {
        let (tx, rx) = Subscription::channel(self.capacity);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let provider = self.provider.clone();
        let symbol = self.symbol.clone();
        let kind = self.kind;
        let join = tokio::spawn(self.run(tx, stop_rx));
        Subscription::new(rx, StreamHandle::new(join, stop_tx), provider, symbol, kind)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata::feed::run",
            skip_all,
            fields(provider = %self.provider, symbol = %self.symbol, kind = %self.kind),
        )
    )]
    async fn run(mut self, tx: EventSender, mut stop_rx: oneshot::Receiver<()>) {
        let mut shutdown = self.tracker.as_ref().map(|t| t.shutdown_signal());
        let mut failures: u32 = 0;
        loop {
            let connected = tokio::select! {
                biased;
                _ = &mut stop_rx => {
                    tx.close(CloseReason::Stopped).await;
                    return;
                }
                () = shutdown_requested(&mut shutdown) => {
                    tx.close(CloseReason::Stopped).await;
                    return;
                }
                r = self.transport.connect() => r,
            };

            match connected {
                Ok(mut conn) => {
                    failures = 0;
                    self.decoder.on_connect();
                    let _live = self.tracker.as_ref().map(ConnectionTracker::enter);
                    #[cfg(feature = "tracing")]
                    tracing::info!("feed connected");
                    match self
                        .pump(conn.as_mut(), &tx, &mut stop_rx, &mut shutdown)
                        .await
                    {
                        Step::Stop => {
                            conn.close().await;
                            tx.close(CloseReason::Stopped).await;
                            return;
                        }
                        Step::ConsumerGone => {
                            conn.close().await;
                            return;
                        }
                        Step::Reconnect => {}
                    }
                }
                Err(err) if !err.is_transient() => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %err, "feed failed permanently");
                    tx.close(CloseReason::Failed(err)).await;
                    return;
                }
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_err, attempt = failures, "feed connect failed");
                }
            }

            if self.transport.is_exhausted() {
                tx.close(CloseReason::EndOfStream).await;
                return;
            }
            if self.backoff.exhausted(failures) {
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts = failures, "giving up on feed");
                tx.close(CloseReason::RetriesExhausted { attempts: failures })
                    .await;
                return;
            }

            let wait_ms = jitter_wait(
                self.backoff.delay_ms(failures),
                u32::from(self.backoff.jitter_percent.min(100)),
            );
            failures += 1;
            #[cfg(feature = "tracing")]
            tracing::info!(delay_ms = wait_ms, attempt = failures, "reconnecting feed");

            tokio::select! {
                biased;
                _ = &mut stop_rx => {
                    tx.close(CloseReason::Stopped).await;
                    return;
                }
                () = shutdown_requested(&mut shutdown) => {
                    tx.close(CloseReason::Stopped).await;
                    return;
                }
                () = sleep(Duration::from_millis(wait_ms)) => {}
            }
        }
    }

    async fn pump(
        &mut self,
        conn: &mut dyn FeedConnection,
        tx: &EventSender,
        stop_rx: &mut oneshot::Receiver<()>,
        shutdown: &mut Option<watch::Receiver<u64>>,
    ) -> Step {
        loop {
            tokio::select! {
                biased;
                _ = &mut *stop_rx => return Step::Stop,
                () = shutdown_requested(shutdown) => return Step::Stop,
                frame = conn.next_frame() => match frame {
                    Some(Ok(text)) => match self.decoder.decode(&text) {
                        Ok(messages) => {
                            for m in messages {
                                if !tx.send(m).await {
                                    return Step::ConsumerGone;
                                }
                            }
                        }
                        Err(_err) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(error = %_err, "skipping undecodable frame");
                        }
                    },
                    Some(Err(_err)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %_err, "feed read failed");
                        return Step::Reconnect;
                    }
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::info!("feed closed by peer");
                        return Step::Reconnect;
                    }
                }
            }
        }
    }
}

async fn shutdown_requested(rx: &mut Option<watch::Receiver<u64>>) {
    if let Some(rx) = rx
        && rx.changed().await.is_ok()
    {
        return;
    }
    futures::future::pending::<()>().await;
}
