//! In-process [`RemoteStore`] backend.
//!
//! Holds the three collections in memory behind an async `RwLock`, feeds a
//! broadcast channel with document changes, and keeps the event counter
//! behind its own `Mutex` that is held across the whole
//! read-increment-write, which is what makes allocation atomic against
//! concurrent callers.  Tests use [`MemoryRemote::fail_next`] to make the
//! following N operations fail, exercising the engine's failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, RwLock};

use rdv_shared::{
    ChangeEvent, ChangeRecord, Event, EventId, NewUser, Participation, User, UserId,
};

use crate::error::{RemoteError, RemoteResult};
use crate::feed::Subscription;
use crate::store::RemoteStore;

/// Buffered feed capacity before a slow subscriber starts lagging.
const FEED_CAPACITY: usize = 64;

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    events: HashMap<String, Event>,
    /// `event_id -> participant_id -> participation document`.
    participants: HashMap<String, HashMap<String, Participation>>,
}

/// In-memory remote document store.
pub struct MemoryRemote {
    collections: RwLock<Collections>,
    /// The `counters/eventCounter` document.
    counter: Mutex<u64>,
    feed: broadcast::Sender<ChangeEvent>,
    fail_next: AtomicU32,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            collections: RwLock::new(Collections::default()),
            counter: Mutex::new(0),
            feed,
            fail_next: AtomicU32::new(0),
        }
    }

    /// Make the next `n` store operations fail with
    /// [`RemoteError::Unavailable`], simulating a network drop mid-sync.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    fn fault(&self) -> RemoteResult<()> {
        let tripped = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(RemoteError::Unavailable("injected fault".to_string()))
        } else {
            Ok(())
        }
    }

    fn publish(&self, change: ChangeEvent) {
        // No subscribers is fine; the feed only matters while a listener runs.
        let _ = self.feed.send(change);
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    async fn create_user(&self, profile: NewUser) -> RemoteResult<User> {
        self.fault()?;
        let mut guard = self.collections.write().await;

        if guard.users.values().any(|u| u.email == profile.email) {
            return Err(RemoteError::Conflict(format!(
                "email '{}' already registered",
                profile.email
            )));
        }

        let user = profile.into_user(UserId::generate());
        guard.users.insert(user.id.0.clone(), user.clone());
        tracing::debug!(user_id = %user.id, "user registered");
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        if !guard.users.contains_key(&user.id.0) {
            return Err(RemoteError::NotFound);
        }
        guard.users.insert(user.id.0.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> RemoteResult<User> {
        self.fault()?;
        let guard = self.collections.read().await;
        guard.users.get(&id.0).cloned().ok_or(RemoteError::NotFound)
    }

    async fn get_all_users(&self) -> RemoteResult<Vec<User>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut users: Vec<User> = guard.users.values().cloned().collect();
        users.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    async fn put_event(&self, event: &Event) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        let previous = guard.events.insert(event.id.0.clone(), event.clone());
        drop(guard);

        let record = ChangeRecord::Event(event.clone());
        if previous.is_some() {
            self.publish(ChangeEvent::modified(record));
        } else {
            self.publish(ChangeEvent::added(record));
        }
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        if !guard.events.contains_key(&event.id.0) {
            return Err(RemoteError::NotFound);
        }
        guard.events.insert(event.id.0.clone(), event.clone());
        drop(guard);

        self.publish(ChangeEvent::modified(ChangeRecord::Event(event.clone())));
        Ok(())
    }

    async fn delete_event(&self, id: &EventId) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        let removed = guard.events.remove(&id.0).ok_or(RemoteError::NotFound)?;
        let participants = guard.participants.remove(&id.0).unwrap_or_default();
        drop(guard);

        for participation in participants.into_values() {
            self.publish(ChangeEvent::removed(ChangeRecord::Participation(
                participation,
            )));
        }
        self.publish(ChangeEvent::removed(ChangeRecord::Event(removed)));
        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> RemoteResult<Event> {
        self.fault()?;
        let guard = self.collections.read().await;
        guard.events.get(&id.0).cloned().ok_or(RemoteError::NotFound)
    }

    async fn get_all_events(&self) -> RemoteResult<Vec<Event>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut events: Vec<Event> = guard.events.values().cloned().collect();
        events.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(events)
    }

    async fn get_events_by_host(&self, host_id: &UserId) -> RemoteResult<Vec<Event>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut events: Vec<Event> = guard
            .events
            .values()
            .filter(|e| &e.host_id == host_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Participation
    // ------------------------------------------------------------------

    async fn join(&self, participation: &Participation) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        if !guard.events.contains_key(&participation.event_id.0) {
            return Err(RemoteError::NotFound);
        }
        guard
            .participants
            .entry(participation.event_id.0.clone())
            .or_default()
            .insert(participation.participant_id.0.clone(), participation.clone());
        drop(guard);

        self.publish(ChangeEvent::added(ChangeRecord::Participation(
            participation.clone(),
        )));
        Ok(())
    }

    async fn leave(&self, event_id: &EventId, participant_id: &UserId) -> RemoteResult<()> {
        self.fault()?;
        let mut guard = self.collections.write().await;
        let removed = guard
            .participants
            .get_mut(&event_id.0)
            .and_then(|m| m.remove(&participant_id.0));
        drop(guard);

        match removed {
            Some(participation) => {
                self.publish(ChangeEvent::removed(ChangeRecord::Participation(
                    participation,
                )));
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn participants_of(&self, event_id: &EventId) -> RemoteResult<Vec<Participation>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut rows: Vec<Participation> = guard
            .participants
            .get(&event_id.0)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.participant_id.0.cmp(&b.participant_id.0));
        Ok(rows)
    }

    async fn events_joined_by(&self, participant_id: &UserId) -> RemoteResult<Vec<Event>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut events: Vec<Event> = guard
            .participants
            .iter()
            .filter(|(_, members)| members.contains_key(&participant_id.0))
            .filter_map(|(event_id, _)| guard.events.get(event_id).cloned())
            .collect();
        events.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(events)
    }

    async fn get_all_participations(&self) -> RemoteResult<Vec<Participation>> {
        self.fault()?;
        let guard = self.collections.read().await;
        let mut rows: Vec<Participation> = guard
            .participants
            .values()
            .flat_map(|m| m.values().cloned())
            .collect();
        rows.sort_by(|a, b| {
            (a.event_id.0.as_str(), a.participant_id.0.as_str())
                .cmp(&(b.event_id.0.as_str(), b.participant_id.0.as_str()))
        });
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Counter and change feed
    // ------------------------------------------------------------------

    async fn next_event_id(&self) -> RemoteResult<EventId> {
        self.fault()?;
        // The lock is held across read, increment, and write: concurrent
        // allocators serialize here and can never observe the same value.
        let mut counter = self.counter.lock().await;
        *counter += 1;
        Ok(EventId::from_counter(*counter))
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.feed.subscribe())
    }
}
