//! Orchestration entry point.
//!
//! Every caller-visible read and write goes through the [`SyncCoordinator`].
//! It checks connectivity at the start of each operation (never caching the
//! answer), drives the remote-then-local write order when online, routes
//! event writes through the offline queue when not, and on each return to
//! the foreground runs the full resync sequence: reconcile all kinds in
//! dependency order, flush the offline queue, then (re)start the change
//! stream listener.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{info, warn};

use rdv_remote::RemoteStore;
use rdv_shared::{Event, EventDraft, EventId, NewUser, Participation, SyncStatus, User, UserId};
use rdv_store::{Database, StoreError};

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::listener::{ChangeStreamListener, ListenerHandle};
use crate::offline::OfflineMutationQueue;
use crate::reconciler::Reconciler;

/// The authenticated user this coordinator acts for.  Passed in explicitly;
/// nothing in the engine reads the current user from ambient state.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

pub struct SyncCoordinator<R, C> {
    db: Arc<Mutex<Database>>,
    remote: Arc<R>,
    connectivity: C,
    session: Session,
    reconciler: Reconciler<R>,
    queue: OfflineMutationQueue<R>,
    listener: Option<ListenerHandle>,
}

impl<R: RemoteStore, C: ConnectivityMonitor> SyncCoordinator<R, C> {
    pub fn new(db: Database, remote: Arc<R>, connectivity: C, session: Session) -> Self {
        let db = Arc::new(Mutex::new(db));
        let reconciler = Reconciler::new(db.clone(), remote.clone());
        let queue = OfflineMutationQueue::new(db.clone(), remote.clone());
        Self {
            db,
            remote,
            connectivity,
            session,
            reconciler,
            queue,
            listener: None,
        }
    }

    /// Current connectivity, re-probed on every call.
    pub async fn is_online(&self) -> bool {
        self.connectivity.is_connected().await
    }

    // ------------------------------------------------------------------
    // Event mutations
    // ------------------------------------------------------------------

    /// Create an event hosted by the session user.
    ///
    /// Online: allocate an id from the remote counter, `put` the document,
    /// mirror it locally, then run a best-effort catch-up pass.  Offline:
    /// mint a provisional id and queue the event locally as `unsynced`; no
    /// remote call is attempted.
    pub async fn create_event(&self, draft: EventDraft) -> SyncResult<Event> {
        validate(&draft.name, draft.start_date, draft.end_date, draft.seats)?;

        if self.is_online().await {
            let id = self.remote.next_event_id().await?;
            let event = draft.into_event(id, self.session.user_id.clone());
            self.remote.put_event(&event).await?;
            self.db
                .lock()
                .await
                .upsert_event(&event, SyncStatus::Synced)?;
            self.catch_up_events().await;
            info!(event_id = %event.id, "event created");
            Ok(event)
        } else {
            let event = draft.into_event(EventId::provisional(), self.session.user_id.clone());
            self.queue.queue_event(&event).await?;
            Ok(event)
        }
    }

    /// Edit an event.  Only the host may edit; the host itself never
    /// changes.  Offline edits are queued as `unsynced` and pushed whole on
    /// the next flush (writes are last-writer-wins at record granularity).
    /// An event still pending in the queue is edited in place, even when
    /// connectivity has returned: the remote has never seen it, so the
    /// flush delivers the edited version.
    pub async fn edit_event(&self, mut event: Event) -> SyncResult<()> {
        validate(&event.name, event.start_date, event.end_date, event.seats)?;

        let online = self.is_online().await;
        let existing = self.get_event_snapshot(&event.id, online).await?;
        self.ensure_host(&existing)?;
        event.host_id = existing.host_id;

        if online && !self.pending_locally(&event.id).await {
            self.remote.update_event(&event).await?;
            self.db
                .lock()
                .await
                .upsert_event(&event, SyncStatus::Synced)?;
            self.catch_up_events().await;
        } else {
            self.queue.queue_event(&event).await?;
        }
        Ok(())
    }

    /// Cancel (delete) an event.  Only the host may cancel.  An event still
    /// pending in the queue is simply dropped locally, connected or not.
    /// Otherwise, online, the remote document and its participant
    /// subcollection go first, then the local mirror.  Offline, a synced
    /// event cannot be canceled: no tombstone survives to replay the
    /// delete.
    pub async fn cancel_event(&self, id: &EventId) -> SyncResult<()> {
        let online = self.is_online().await;
        let existing = self.get_event_snapshot(id, online).await?;
        self.ensure_host(&existing)?;

        if self.pending_locally(id).await {
            // Never reached the remote; dropping the local row is the
            // whole cancellation.
        } else if online {
            self.remote.delete_event(id).await?;
        } else {
            return Err(SyncError::Offline);
        }

        let db = self.db.lock().await;
        db.delete_participations_for_event(id)?;
        db.delete_event(id)?;
        info!(event_id = %id, "event canceled");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Participation
    // ------------------------------------------------------------------

    /// Join an event as the session user.  Requires connectivity.
    ///
    /// The capacity check runs against a snapshot of the participant count
    /// fetched moments earlier; concurrent joiners on other devices can
    /// both pass it and oversubscribe the event.  That check-then-act race
    /// is an accepted part of the design, not an oversight.
    pub async fn join_event(&self, event_id: &EventId) -> SyncResult<()> {
        if !self.is_online().await {
            return Err(SyncError::Offline);
        }

        let event = self.remote.get_event(event_id).await?;
        let participants = self.remote.participants_of(event_id).await?;

        if participants
            .iter()
            .any(|p| p.participant_id == self.session.user_id)
        {
            // Already joined; joining is a set, re-joining is a no-op.
            return Ok(());
        }
        if participants.len() as u32 >= event.seats {
            return Err(SyncError::EventFull);
        }

        let participation = Participation::new(event_id.clone(), self.session.user_id.clone());
        self.remote.join(&participation).await?;
        self.db.lock().await.upsert_participation(&participation)?;
        info!(event_id = %event_id, "joined event");
        Ok(())
    }

    /// Leave an event.  Requires connectivity.
    pub async fn unjoin_event(&self, event_id: &EventId) -> SyncResult<()> {
        if !self.is_online().await {
            return Err(SyncError::Offline);
        }

        self.remote.leave(event_id, &self.session.user_id).await?;
        self.db
            .lock()
            .await
            .delete_participation(event_id, &self.session.user_id)?;
        info!(event_id = %event_id, "left event");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Register a new user.  The remote store assigns the identifier, so
    /// registration requires connectivity.
    pub async fn register_user(&self, profile: NewUser) -> SyncResult<User> {
        if !self.is_online().await {
            return Err(SyncError::Offline);
        }

        let user = self.remote.create_user(profile).await?;
        self.db.lock().await.upsert_user(&user)?;
        Ok(user)
    }

    /// Update the session user's own profile.  Requires connectivity.
    pub async fn update_profile(&self, user: User) -> SyncResult<()> {
        if user.id != self.session.user_id {
            return Err(SyncError::PermissionDenied(
                "can only edit your own profile".to_string(),
            ));
        }
        if !self.is_online().await {
            return Err(SyncError::Offline);
        }

        self.remote.update_user(&user).await?;
        self.db.lock().await.upsert_user(&user)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads (remote when online, cache otherwise)
    // ------------------------------------------------------------------

    /// Events whose start date falls on the given calendar day (UTC).
    pub async fn events_on(&self, date: NaiveDate) -> SyncResult<Vec<Event>> {
        if self.is_online().await {
            let mut events: Vec<Event> = self
                .remote
                .get_all_events()
                .await?
                .into_iter()
                .filter(|e| e.start_date.date_naive() == date)
                .collect();
            events.sort_by(|a, b| a.start_date.cmp(&b.start_date));
            Ok(events)
        } else {
            Ok(self.db.lock().await.get_events_by_date(date)?)
        }
    }

    /// Events hosted by the session user.
    pub async fn hosted_events(&self) -> SyncResult<Vec<Event>> {
        if self.is_online().await {
            Ok(self.remote.get_events_by_host(&self.session.user_id).await?)
        } else {
            Ok(self
                .db
                .lock()
                .await
                .get_events_by_host(&self.session.user_id)?)
        }
    }

    /// Events the session user has joined.
    pub async fn joined_events(&self) -> SyncResult<Vec<Event>> {
        if self.is_online().await {
            return Ok(self.remote.events_joined_by(&self.session.user_id).await?);
        }

        let db = self.db.lock().await;
        let mut events = Vec::new();
        for participation in db.events_joined_by(&self.session.user_id)? {
            match db.get_event(&participation.event_id) {
                Ok(event) => events.push(event),
                // The event may not be cached yet; skip until the next pass.
                Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(events)
    }

    /// Participation rows for an event (host's attendee list).
    pub async fn participants_of(&self, event_id: &EventId) -> SyncResult<Vec<Participation>> {
        if self.is_online().await {
            Ok(self.remote.participants_of(event_id).await?)
        } else {
            Ok(self.db.lock().await.participants_for_event(event_id)?)
        }
    }

    /// The session user's profile.
    pub async fn current_profile(&self) -> SyncResult<User> {
        if self.is_online().await {
            Ok(self.remote.get_user(&self.session.user_id).await?)
        } else {
            Ok(self.db.lock().await.get_user(&self.session.user_id)?)
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// App came to the foreground (or connectivity returned).
    ///
    /// Online: reconcile all kinds in dependency order, flush the offline
    /// queue, then (re)start the change stream listener.  Offline: stop the
    /// listener.  A reconciliation error is surfaced so the caller can
    /// retry on the next foreground.
    pub async fn on_foreground(&mut self) -> SyncResult<()> {
        if self.is_online().await {
            info!("entering online state");
            self.reconciler.reconcile_all().await?;

            match self.queue.sync_offline_data().await {
                Ok(0) => {}
                Ok(pushed) => info!(pushed, "offline queue flushed"),
                Err(e) => warn!(error = %e, "offline queue flush failed"),
            }

            self.stop_listener().await;
            self.listener = Some(ChangeStreamListener::start(
                self.db.clone(),
                self.remote.subscribe(),
            ));
        } else {
            info!("entering offline state");
            self.stop_listener().await;
        }
        Ok(())
    }

    /// Release the listener and its subscription.
    pub async fn shutdown(&mut self) {
        self.stop_listener().await;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn stop_listener(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.stop().await;
        }
    }

    /// Whether the event is a locally-minted row the remote has never seen
    /// (provisional id, still tagged `unsynced`).
    async fn pending_locally(&self, id: &EventId) -> bool {
        id.is_provisional()
            && matches!(
                self.db.lock().await.event_sync_status(id),
                Ok(SyncStatus::Unsynced)
            )
    }

    async fn get_event_snapshot(&self, id: &EventId, online: bool) -> SyncResult<Event> {
        if online && !self.pending_locally(id).await {
            Ok(self.remote.get_event(id).await?)
        } else {
            Ok(self.db.lock().await.get_event(id)?)
        }
    }

    fn ensure_host(&self, event: &Event) -> SyncResult<()> {
        if event.host_id != self.session.user_id {
            return Err(SyncError::PermissionDenied(
                "only the host may modify this event".to_string(),
            ));
        }
        Ok(())
    }

    /// Best-effort catch-up after an authoritative event write.  Its failure
    /// is logged, never surfaced: the write itself already succeeded.
    async fn catch_up_events(&self) {
        if let Err(e) = self.reconciler.reconcile_events().await {
            warn!(error = %e, "post-write catch-up failed");
        }
    }
}

fn validate(
    name: &str,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    seats: u32,
) -> SyncResult<()> {
    if name.trim().is_empty() {
        return Err(SyncError::InvalidEvent("name must not be empty".to_string()));
    }
    if end < start {
        return Err(SyncError::InvalidEvent(
            "end date must not precede start date".to_string(),
        ));
    }
    if seats == 0 {
        return Err(SyncError::InvalidEvent(
            "seat capacity must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::SharedConnectivity;
    use chrono::{TimeZone, Utc};
    use rdv_remote::MemoryRemote;

    fn draft(seats: u32) -> EventDraft {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();
        EventDraft {
            name: "Concert".to_string(),
            description: Some("Acoustic set".to_string()),
            start_date: start,
            end_date: start + chrono::Duration::hours(2),
            location: "Olympia".to_string(),
            seats,
            guest: None,
            image: None,
        }
    }

    fn coordinator(
        online: bool,
        user: &str,
    ) -> (
        SyncCoordinator<MemoryRemote, SharedConnectivity>,
        Arc<MemoryRemote>,
        SharedConnectivity,
    ) {
        let remote = Arc::new(MemoryRemote::new());
        let connectivity = SharedConnectivity::new(online);
        let coordinator = SyncCoordinator::new(
            Database::open_in_memory().unwrap(),
            remote.clone(),
            connectivity.clone(),
            Session::new(UserId::from(user)),
        );
        (coordinator, remote, connectivity)
    }

    #[tokio::test]
    async fn online_create_allocates_counter_id_and_mirrors() {
        let (coordinator, remote, _) = coordinator(true, "host");

        let event = coordinator.create_event(draft(10)).await.unwrap();
        assert_eq!(event.id.as_str(), "E1");
        assert_eq!(event.host_id, UserId::from("host"));

        assert_eq!(remote.get_all_events().await.unwrap(), vec![event.clone()]);
        let local = coordinator.db.lock().await.get_event(&event.id).unwrap();
        assert_eq!(local, event);
    }

    #[tokio::test]
    async fn offline_create_queues_locally_without_remote_call() {
        let (coordinator, remote, _) = coordinator(false, "host");

        let event = coordinator.create_event(draft(10)).await.unwrap();
        assert!(event.id.is_provisional());

        assert!(remote.get_all_events().await.unwrap().is_empty());
        let db = coordinator.db.lock().await;
        assert_eq!(
            db.event_sync_status(&event.id).unwrap(),
            SyncStatus::Unsynced
        );
    }

    #[tokio::test]
    async fn join_on_a_full_event_is_refused() {
        let (coordinator, remote, _) = coordinator(true, "joiner");

        let event = draft(1).into_event(EventId::from("E1"), UserId::from("host"));
        remote.put_event(&event).await.unwrap();
        remote
            .join(&Participation::new(event.id.clone(), UserId::from("other")))
            .await
            .unwrap();

        let err = coordinator.join_event(&event.id).await.unwrap_err();
        assert!(matches!(err, SyncError::EventFull));
    }

    #[tokio::test]
    async fn rejoining_is_a_no_op_even_when_full() {
        let (coordinator, remote, _) = coordinator(true, "joiner");

        let event = draft(1).into_event(EventId::from("E1"), UserId::from("host"));
        remote.put_event(&event).await.unwrap();
        coordinator.join_event(&event.id).await.unwrap();

        // Seats exhausted by our own membership; re-join still succeeds.
        coordinator.join_event(&event.id).await.unwrap();
        assert_eq!(remote.participants_of(&event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offline_join_is_rejected() {
        let (coordinator, _, _) = coordinator(false, "joiner");
        let err = coordinator
            .join_event(&EventId::from("E1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Offline));
    }

    #[tokio::test]
    async fn non_host_cannot_edit_or_cancel() {
        let (coordinator, remote, _) = coordinator(true, "stranger");

        let event = draft(5).into_event(EventId::from("E1"), UserId::from("host"));
        remote.put_event(&event).await.unwrap();

        let err = coordinator.edit_event(event.clone()).await.unwrap_err();
        assert!(matches!(err, SyncError::PermissionDenied(_)));

        let err = coordinator.cancel_event(&event.id).await.unwrap_err();
        assert!(matches!(err, SyncError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected() {
        let (coordinator, _, _) = coordinator(true, "host");

        let mut bad_dates = draft(5);
        bad_dates.end_date = bad_dates.start_date - chrono::Duration::hours(1);
        assert!(matches!(
            coordinator.create_event(bad_dates).await.unwrap_err(),
            SyncError::InvalidEvent(_)
        ));

        assert!(matches!(
            coordinator.create_event(draft(0)).await.unwrap_err(),
            SyncError::InvalidEvent(_)
        ));
    }

    #[tokio::test]
    async fn cancel_clears_remote_and_local_participation() {
        let (mut coordinator, remote, _) = coordinator(true, "host");

        let event = coordinator.create_event(draft(5)).await.unwrap();
        remote
            .join(&Participation::new(event.id.clone(), UserId::from("u2")))
            .await
            .unwrap();
        coordinator.on_foreground().await.unwrap();

        coordinator.cancel_event(&event.id).await.unwrap();

        assert!(remote.get_event(&event.id).await.is_err());
        let db = coordinator.db.lock().await;
        assert!(db.get_event(&event.id).is_err());
        assert_eq!(db.participation_count(&event.id).unwrap(), 0);

        drop(db);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn offline_cancel_of_synced_event_is_rejected() {
        let (coordinator, remote, connectivity) = coordinator(true, "host");

        let event = coordinator.create_event(draft(5)).await.unwrap();
        connectivity.set_online(false);

        let err = coordinator.cancel_event(&event.id).await.unwrap_err();
        assert!(matches!(err, SyncError::Offline));
        assert!(remote.get_event(&event.id).await.is_ok());
    }

    #[tokio::test]
    async fn offline_cancel_of_provisional_event_deletes_locally() {
        let (coordinator, _, _) = coordinator(false, "host");

        let event = coordinator.create_event(draft(5)).await.unwrap();
        coordinator.cancel_event(&event.id).await.unwrap();

        assert!(coordinator.db.lock().await.get_event(&event.id).is_err());
    }

    #[tokio::test]
    async fn pending_event_can_be_canceled_after_reconnect() {
        let (mut coordinator, remote, connectivity) = coordinator(false, "host");

        let event = coordinator.create_event(draft(5)).await.unwrap();

        // Back online, but the queue has not flushed yet: the remote has
        // never seen this event, so the cancel must not go there.
        connectivity.set_online(true);
        coordinator.cancel_event(&event.id).await.unwrap();
        assert!(coordinator.db.lock().await.get_event(&event.id).is_err());

        // The flush has nothing left to deliver.
        coordinator.on_foreground().await.unwrap();
        assert!(remote.get_all_events().await.unwrap().is_empty());

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn pending_event_edit_after_reconnect_stays_queued() {
        let (mut coordinator, remote, connectivity) = coordinator(false, "host");

        let mut event = coordinator.create_event(draft(5)).await.unwrap();

        connectivity.set_online(true);
        event.name = "Concert (moved)".to_string();
        coordinator.edit_event(event.clone()).await.unwrap();

        assert_eq!(
            coordinator
                .db
                .lock()
                .await
                .event_sync_status(&event.id)
                .unwrap(),
            SyncStatus::Unsynced
        );

        // The flush delivers the edited version.
        coordinator.on_foreground().await.unwrap();
        assert_eq!(
            remote.get_event(&event.id).await.unwrap().name,
            "Concert (moved)"
        );

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn reads_fall_back_to_the_cache_when_offline() {
        let (mut coordinator, _, connectivity) = coordinator(true, "host");

        let event = coordinator.create_event(draft(5)).await.unwrap();
        coordinator.on_foreground().await.unwrap();
        connectivity.set_online(false);
        coordinator.on_foreground().await.unwrap();

        let day = event.start_date.date_naive();
        let cached = coordinator.events_on(day).await.unwrap();
        assert_eq!(cached, vec![event]);

        coordinator.shutdown().await;
    }
}
