//! A live subscription: one channel, consumed either as a `Stream` or by a callback.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use wrdata_types::{CloseReason, StreamKind, StreamMessage, WrdataError};

use crate::stream::StreamHandle;

/// Item carried on a subscription channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A data update.
    Message(StreamMessage),
    /// Terminal marker; nothing follows it.
    Closed(CloseReason),
}

/// Producer half of a subscription channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSender {
    /// Forward one message. Returns `false` once the consumer is gone.
    pub async fn send(&self, msg: StreamMessage) -> bool {
        self.tx.send(StreamEvent::Message(msg)).await.is_ok()
    }

    /// Emit the terminal marker. Best-effort: a departed consumer is ignored.
    pub async fn close(&self, reason: CloseReason) {
        let _ = self.tx.send(StreamEvent::Closed(reason)).await;
    }
}

/// Consumer half of a real-time subscription.
///
/// Implements [`futures::Stream`] yielding [`StreamMessage`]s. When the stream
/// ends, [`Subscription::close_reason`] tells whether the provider gave up,
/// the feed finished, or the subscription was stopped. Dropping the
/// subscription stops the producing task.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<StreamEvent>,
    handle: Option<StreamHandle>,
    close_reason: Option<CloseReason>,
    provider: String,
    symbol: String,
    kind: StreamKind,
}

impl Subscription {
    /// Create a bounded channel for a subscription.
    #[must_use]
    pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSender { tx }, rx)
    }

    /// Assemble a subscription from its receiver and the task producing into it.
    pub fn new(
        rx: mpsc::Receiver<StreamEvent>,
        handle: StreamHandle,
        provider: impl Into<String>,
        symbol: impl Into<String>,
        kind: StreamKind,
    ) -> Self {
        Self {
            rx,
            handle: Some(handle),
            close_reason: None,
            provider: provider.into(),
            symbol: symbol.into(),
            kind,
        }
    }

    /// Provider serving this subscription.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Subscribed symbol (comma-joined for multi-symbol subscriptions).
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Kind of messages carried.
    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Why the stream ended, once it has.
    ///
    /// `None` while messages may still arrive. A producer that vanished
    /// without a marker is reported as `Stopped`.
    #[must_use]
    pub const fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    /// Error that ended the stream, if it ended abnormally.
    #[must_use]
    pub fn close_error(&self) -> Option<WrdataError> {
        self.close_reason
            .as_ref()
            .and_then(|r| r.to_error(&self.provider))
    }

    /// Receive the next message, or `None` when the stream has ended.
    pub async fn next_message(&mut self) -> Option<StreamMessage> {
        if self.close_reason.is_some() {
            return None;
        }
        match self.rx.recv().await {
            Some(StreamEvent::Message(m)) => Some(m),
            Some(StreamEvent::Closed(reason)) => {
                self.close_reason = Some(reason);
                None
            }
            None => {
                self.close_reason = Some(CloseReason::Stopped);
                None
            }
        }
    }

    /// Stop the producing task and wait for it to finish.
    pub async fn stop(mut self) {
        self.rx.close();
        if let Some(h) = self.handle.take() {
            h.stop().await;
        }
    }

    /// Drive this subscription on a task, invoking `on_message` for every update.
    ///
    /// The returned handle owns both the forwarding task and the producer;
    /// stopping or dropping it ends both. `on_close` runs once with the
    /// terminal reason.
    pub fn spawn_callback<F, C>(mut self, mut on_message: F, on_close: C) -> StreamHandle
    where
        F: FnMut(StreamMessage) + Send + 'static,
        C: FnOnce(CloseReason) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        self.stop().await;
                        on_close(CloseReason::Stopped);
                        return;
                    }
                    next = self.next_message() => match next {
                        Some(m) => on_message(m),
                        None => {
                            let reason = self.close_reason.take().unwrap_or(CloseReason::Stopped);
                            on_close(reason);
                            return;
                        }
                    }
                }
            }
        });
        StreamHandle::new(join, stop_tx)
    }
}

impl Stream for Subscription {
    type Item = StreamMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.close_reason.is_some() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(StreamEvent::Message(m))) => Poll::Ready(Some(m)),
            Poll::Ready(Some(StreamEvent::Closed(reason))) => {
                self.close_reason = Some(reason);
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                self.close_reason = Some(CloseReason::Stopped);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
