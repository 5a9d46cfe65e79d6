//! Ownership of feed tasks.
//!
//! The two small traits let the drop protocol be model-checked with stand-in
//! task and signal types.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running feed task that can be cancelled.
pub trait Abortable {
    /// Cancel the task; a no-op once it has finished.
    fn abort(&mut self);
    /// Whether the task has already run to completion.
    fn is_finished(&self) -> bool;
}

impl Abortable for JoinHandle<()> {
    fn abort(&mut self) {
        Self::abort(self);
    }

    fn is_finished(&self) -> bool {
        Self::is_finished(self)
    }
}

/// Stop request for a feed task. Delivery is best-effort.
pub trait Stoppable {
    /// Ask the task to wind down; a departed receiver is ignored.
    fn send(self);
}

impl Stoppable for oneshot::Sender<()> {
    fn send(self) {
        let _ = Self::send(self, ());
    }
}

/// Release a feed task: request a stop, then cancel it if it is still running.
pub fn drop_impl<H, S>(inner: &mut Option<H>, stop_tx: &mut Option<S>)
where
    H: Abortable,
    S: Stoppable,
{
    if let Some(tx) = stop_tx.take() {
        Stoppable::send(tx);
    }
    if let Some(mut task) = inner.take()
        && !task.is_finished()
    {
        task.abort();
    }
}

/// Owner of a background streaming task.
///
/// `stop()` asks the task to finish and waits for it; dropping the handle sends
/// the same signal and aborts the task if it is still running.
#[derive(Debug)]
pub struct StreamHandle {
    inner: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    /// Wrap a spawned task and the sender half of its stop signal.
    #[must_use]
    pub const fn new(inner: JoinHandle<()>, stop_tx: oneshot::Sender<()>) -> Self {
        Self {
            inner: Some(inner),
            stop_tx: Some(stop_tx),
        }
    }

    /// Signal the task to stop and wait until it has finished.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.inner.take() {
            let _ = h.await;
        }
    }

    /// True once the task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        drop_impl(&mut self.inner, &mut self.stop_tx);
    }
}
