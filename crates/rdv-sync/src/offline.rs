//! Holding area for event writes made while disconnected.
//!
//! An offline create/edit never reaches the remote and is never silently
//! dropped: it lands in the local `events` table tagged
//! `sync_status = 'unsynced'`.  On the next successful connectivity check
//! [`OfflineMutationQueue::sync_offline_data`] pushes every pending row via
//! the same `put_event` call the online path uses and flips it to `synced`.
//! A failed push leaves the row `unsynced` for the next pass; there is no
//! backoff here, pass frequency is the caller's decision (app foreground,
//! timer, or explicit user action).

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use rdv_remote::RemoteStore;
use rdv_shared::{Event, SyncStatus};
use rdv_store::Database;

use crate::error::SyncResult;

pub struct OfflineMutationQueue<R> {
    db: Arc<Mutex<Database>>,
    remote: Arc<R>,
}

impl<R> Clone for OfflineMutationQueue<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            remote: self.remote.clone(),
        }
    }
}

impl<R: RemoteStore> OfflineMutationQueue<R> {
    pub fn new(db: Arc<Mutex<Database>>, remote: Arc<R>) -> Self {
        Self { db, remote }
    }

    /// Record an event mutation locally, pending remote delivery.
    pub async fn queue_event(&self, event: &Event) -> SyncResult<()> {
        self.db
            .lock()
            .await
            .upsert_event(event, SyncStatus::Unsynced)?;
        info!(event_id = %event.id, "event queued for sync");
        Ok(())
    }

    /// Push every `unsynced` row to the remote store, flipping each to
    /// `synced` on success.  Returns the number of rows pushed; rows whose
    /// push failed stay `unsynced` and are retried on the next pass.
    pub async fn sync_offline_data(&self) -> SyncResult<usize> {
        let pending = self.db.lock().await.unsynced_events()?;
        if pending.is_empty() {
            return Ok(0);
        }

        info!(count = pending.len(), "pushing offline events");

        let mut pushed = 0;
        for event in pending {
            match self.remote.put_event(&event).await {
                Ok(()) => {
                    self.db.lock().await.mark_event_synced(&event.id)?;
                    pushed += 1;
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "offline push failed, will retry");
                }
            }
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rdv_remote::MemoryRemote;
    use rdv_shared::{EventDraft, EventId, UserId};

    fn draft() -> EventDraft {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();
        EventDraft {
            name: "Atelier".to_string(),
            description: None,
            start_date: start,
            end_date: start + chrono::Duration::hours(1),
            location: "Belleville".to_string(),
            seats: 8,
            guest: None,
            image: None,
        }
    }

    fn setup() -> (Arc<Mutex<Database>>, Arc<MemoryRemote>, OfflineMutationQueue<MemoryRemote>) {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let remote = Arc::new(MemoryRemote::new());
        let queue = OfflineMutationQueue::new(db.clone(), remote.clone());
        (db, remote, queue)
    }

    #[tokio::test]
    async fn flush_pushes_and_marks_synced() {
        let (db, remote, queue) = setup();

        let event = draft().into_event(EventId::provisional(), UserId::from("u1"));
        queue.queue_event(&event).await.unwrap();
        assert!(remote.get_all_events().await.unwrap().is_empty());

        assert_eq!(queue.sync_offline_data().await.unwrap(), 1);

        assert_eq!(remote.get_all_events().await.unwrap(), vec![event.clone()]);
        assert_eq!(
            db.lock().await.event_sync_status(&event.id).unwrap(),
            SyncStatus::Synced
        );
    }

    #[tokio::test]
    async fn failed_push_keeps_the_row_unsynced() {
        let (db, remote, queue) = setup();

        let event = draft().into_event(EventId::provisional(), UserId::from("u1"));
        queue.queue_event(&event).await.unwrap();

        remote.fail_next(1);
        assert_eq!(queue.sync_offline_data().await.unwrap(), 0);
        assert_eq!(
            db.lock().await.event_sync_status(&event.id).unwrap(),
            SyncStatus::Unsynced
        );

        // Next pass succeeds.
        assert_eq!(queue.sync_offline_data().await.unwrap(), 1);
        assert_eq!(
            db.lock().await.event_sync_status(&event.id).unwrap(),
            SyncStatus::Synced
        );
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let (_db, _remote, queue) = setup();
        assert_eq!(queue.sync_offline_data().await.unwrap(), 0);
    }
}
