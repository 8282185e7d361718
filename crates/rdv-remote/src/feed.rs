//! Live change feed subscription.
//!
//! A [`Subscription`] is a cancellable handle over an ordered, at-least-once
//! sequence of [`ChangeEvent`]s.  Cancellation is first-class: call
//! [`Subscription::cancel`] (or drop the handle) and no further changes are
//! delivered.  After a reconnect the feed may redeliver an already-applied
//! change; consumers must apply changes idempotently.

use rdv_shared::ChangeEvent;
use tokio::sync::broadcast;

/// Receiving half of the remote change feed.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next change.  Returns `None` once the feed is closed
    /// (the remote store was dropped).
    ///
    /// A slow consumer can fall behind the feed's buffer; skipped changes
    /// are logged and the subscription keeps going, since any gap is
    /// repaired by the next full reconciliation pass.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "change feed lagged, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving changes.  Equivalent to dropping the handle.
    pub fn cancel(self) {}
}
