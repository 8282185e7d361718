//! Full-collection synchronization.
//!
//! A reconciler pass brings one local table into full agreement with the
//! remote collection: fetch the complete remote state, then delete-all +
//! reinsert-all inside one local transaction.  Full replacement (rather than
//! diff-and-patch) guarantees the local table ends exactly equal to the
//! remote snapshot no matter how many intermediate changes were missed while
//! offline.  The cost is a transient window inside the transaction where the
//! table is empty; readers outside the transaction see either fully-old or
//! fully-new state, never the gap, but local reads during an in-flight pass
//! must be treated as potentially incomplete.
//!
//! A fetch error aborts the pass before the local table is touched; a local
//! error rolls the transaction back whole.  Either way the previous contents
//! survive.

use std::sync::Arc;

use tokio::sync::Mutex;

use rdv_remote::RemoteStore;
use rdv_store::Database;

use crate::error::SyncResult;

/// Full-collection resync component.
pub struct Reconciler<R> {
    db: Arc<Mutex<Database>>,
    remote: Arc<R>,
}

impl<R> Clone for Reconciler<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            remote: self.remote.clone(),
        }
    }
}

impl<R: RemoteStore> Reconciler<R> {
    pub fn new(db: Arc<Mutex<Database>>, remote: Arc<R>) -> Self {
        Self { db, remote }
    }

    /// Reconcile all three kinds in dependency order: users before events
    /// before participation, so (re)inserted rows always precede the rows
    /// that reference them.
    pub async fn reconcile_all(&self) -> SyncResult<()> {
        self.reconcile_users().await?;
        self.reconcile_events().await?;
        self.reconcile_participants().await?;
        Ok(())
    }

    pub async fn reconcile_users(&self) -> SyncResult<()> {
        let users = self.remote.get_all_users().await?;
        self.db.lock().await.replace_all_users(&users)?;
        tracing::info!(count = users.len(), "users reconciled");
        Ok(())
    }

    /// Reconcile the events table.  Rows tagged `unsynced` are pending
    /// offline writes the remote has never seen; the replacement keeps them.
    pub async fn reconcile_events(&self) -> SyncResult<()> {
        let events = self.remote.get_all_events().await?;
        self.db.lock().await.replace_all_events(&events)?;
        tracing::info!(count = events.len(), "events reconciled");
        Ok(())
    }

    pub async fn reconcile_participants(&self) -> SyncResult<()> {
        let participations = self.remote.get_all_participations().await?;
        self.db
            .lock()
            .await
            .replace_all_participations(&participations)?;
        tracing::info!(count = participations.len(), "participation reconciled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rdv_remote::MemoryRemote;
    use rdv_shared::{Event, EventId, NewUser, Participation, SyncStatus, UserId};

    fn sample_event(id: &str, host: &str) -> Event {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();
        Event {
            id: EventId::from(id),
            name: "Brunch".to_string(),
            description: None,
            start_date: start,
            end_date: start + chrono::Duration::hours(3),
            location: "Canal Saint-Martin".to_string(),
            seats: 6,
            guest: None,
            image: None,
            host_id: UserId::from(host),
        }
    }

    fn setup() -> (Arc<Mutex<Database>>, Arc<MemoryRemote>, Reconciler<MemoryRemote>) {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let remote = Arc::new(MemoryRemote::new());
        let reconciler = Reconciler::new(db.clone(), remote.clone());
        (db, remote, reconciler)
    }

    #[tokio::test]
    async fn events_table_equals_remote_snapshot() {
        let (db, remote, reconciler) = setup();

        // Stale local row the remote no longer has.
        db.lock()
            .await
            .upsert_event(&sample_event("E9", "h1"), SyncStatus::Synced)
            .unwrap();

        remote.put_event(&sample_event("E1", "h1")).await.unwrap();
        remote.put_event(&sample_event("E2", "h2")).await.unwrap();

        reconciler.reconcile_events().await.unwrap();

        let local = db.lock().await.get_all_events().unwrap();
        let snapshot = remote.get_all_events().await.unwrap();
        assert_eq!(local, snapshot);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_local_contents_untouched() {
        let (db, remote, reconciler) = setup();

        for id in ["E1", "E2", "E3"] {
            db.lock()
                .await
                .upsert_event(&sample_event(id, "h1"), SyncStatus::Synced)
                .unwrap();
        }

        remote.fail_next(1);
        assert!(reconciler.reconcile_events().await.is_err());

        assert_eq!(db.lock().await.get_all_events().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unsynced_rows_survive_reconciliation() {
        let (db, remote, reconciler) = setup();

        let pending = sample_event("local-draft", "h1");
        db.lock()
            .await
            .upsert_event(&pending, SyncStatus::Unsynced)
            .unwrap();
        remote.put_event(&sample_event("E1", "h1")).await.unwrap();

        reconciler.reconcile_events().await.unwrap();

        let db = db.lock().await;
        assert_eq!(db.get_all_events().unwrap().len(), 2);
        assert_eq!(
            db.event_sync_status(&pending.id).unwrap(),
            SyncStatus::Unsynced
        );
    }

    #[tokio::test]
    async fn reconcile_all_covers_every_kind() {
        let (db, remote, reconciler) = setup();

        let host = remote
            .create_user(NewUser {
                name: "Ada".to_string(),
                pfp: None,
                phone: None,
                email: "ada@example.com".to_string(),
            })
            .await
            .unwrap();
        let event = sample_event("E1", host.id.as_str());
        remote.put_event(&event).await.unwrap();
        remote
            .join(&Participation::new(event.id.clone(), host.id.clone()))
            .await
            .unwrap();

        reconciler.reconcile_all().await.unwrap();

        let db = db.lock().await;
        assert_eq!(db.get_all_users().unwrap().len(), 1);
        assert_eq!(db.get_all_events().unwrap().len(), 1);
        assert_eq!(db.participation_count(&event.id).unwrap(), 1);
    }
}
