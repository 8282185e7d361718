//! Incremental live-update consumer.
//!
//! Keeps the local `events` and `events_participants` tables fresh between
//! reconciler passes by applying the remote change feed as it arrives.
//! Delivery is at-least-once and may overlap a concurrent reconciler pass,
//! so every application is idempotent, keyed by the record's own identifier:
//! re-applying an identical `added` change is a no-op after the first
//! application.
//!
//! One bad change must never halt the stream: a per-change local failure is
//! logged and skipped, and the loop keeps listening.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rdv_remote::Subscription;
use rdv_shared::{ChangeEvent, ChangeKind, ChangeRecord, SyncStatus};
use rdv_store::Database;

/// Incremental live-update consumer.  See [`ChangeStreamListener::start`].
pub struct ChangeStreamListener;

/// Handle to a running listener task.  Stop it explicitly with
/// [`ListenerHandle::stop`] when the consuming screen goes away; dropping
/// the handle also ends the task.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Signal the task to stop and wait for it to finish.  A change already
    /// dequeued completes its local write before the task exits.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl ChangeStreamListener {
    /// Spawn the listener task over an established subscription.
    pub fn start(db: Arc<Mutex<Database>>, mut subscription: Subscription) -> ListenerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!("change stream listener started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("change stream listener stopping");
                        break;
                    }
                    change = subscription.next() => match change {
                        Some(change) => apply_change(&db, change).await,
                        None => {
                            info!("change feed closed, listener exiting");
                            break;
                        }
                    }
                }
            }
        });

        ListenerHandle { shutdown, task }
    }
}

/// Apply one change to the local cache.  A failure here is logged and
/// skipped; the subscription keeps going.
pub(crate) async fn apply_change(db: &Mutex<Database>, change: ChangeEvent) {
    let db = db.lock().await;

    let result = match (&change.kind, &change.record) {
        (ChangeKind::Added | ChangeKind::Modified, ChangeRecord::Event(event)) => {
            debug!(event_id = %event.id, kind = ?change.kind, "applying event change");
            db.upsert_event(event, SyncStatus::Synced)
        }
        (ChangeKind::Removed, ChangeRecord::Event(event)) => {
            debug!(event_id = %event.id, "applying event removal");
            db.delete_participations_for_event(&event.id)
                .and_then(|_| db.delete_event(&event.id).map(|_| ()))
        }
        (ChangeKind::Added | ChangeKind::Modified, ChangeRecord::Participation(p)) => {
            debug!(event_id = %p.event_id, participant_id = %p.participant_id, "applying join");
            db.upsert_participation(p)
        }
        (ChangeKind::Removed, ChangeRecord::Participation(p)) => {
            debug!(event_id = %p.event_id, participant_id = %p.participant_id, "applying unjoin");
            db.delete_participation(&p.event_id, &p.participant_id)
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        warn!(error = %e, "failed to apply change locally, skipping");
    }
}
