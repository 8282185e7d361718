//! The [`RemoteStore`] trait: per-entity CRUD, the queries the app needs,
//! the transactional event id allocator, and the live change feed.

use async_trait::async_trait;

use rdv_shared::{Event, EventId, NewUser, Participation, User, UserId};

use crate::error::RemoteResult;
use crate::feed::Subscription;

/// The authoritative remote document store.
///
/// Every write is a last-writer-wins document `set`/`update` at record
/// granularity.  The one exception is [`next_event_id`], which must be a
/// transaction against the singleton counter document: two clients
/// allocating concurrently must never receive the same identifier.
///
/// [`next_event_id`]: RemoteStore::next_event_id
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ------------------------------------------------------------------
    // Users (`users/{user_id}`)
    // ------------------------------------------------------------------

    /// Register a user.  The store assigns the identifier and rejects a
    /// duplicate email with [`RemoteError::Conflict`].
    ///
    /// [`RemoteError::Conflict`]: crate::RemoteError::Conflict
    async fn create_user(&self, profile: NewUser) -> RemoteResult<User>;

    /// Overwrite a user document (profile edit).
    async fn update_user(&self, user: &User) -> RemoteResult<()>;

    async fn get_user(&self, id: &UserId) -> RemoteResult<User>;

    async fn get_all_users(&self) -> RemoteResult<Vec<User>>;

    // ------------------------------------------------------------------
    // Events (`events/{event_id}`)
    // ------------------------------------------------------------------

    /// Set the event document keyed by `event.id`, creating or overwriting
    /// it whole (last-writer-wins).  Used by both the online create path
    /// and the offline queue flush.
    async fn put_event(&self, event: &Event) -> RemoteResult<()>;

    /// Update an existing event document; fails with `NotFound` if the
    /// document does not exist.
    async fn update_event(&self, event: &Event) -> RemoteResult<()>;

    /// Delete an event document and clear its participant subcollection.
    async fn delete_event(&self, id: &EventId) -> RemoteResult<()>;

    async fn get_event(&self, id: &EventId) -> RemoteResult<Event>;

    async fn get_all_events(&self) -> RemoteResult<Vec<Event>>;

    /// Equality query on `host_id`.
    async fn get_events_by_host(&self, host_id: &UserId) -> RemoteResult<Vec<Event>>;

    // ------------------------------------------------------------------
    // Participation (`events/{event_id}/eventParticipant/{participant_id}`)
    // ------------------------------------------------------------------

    /// Set the participant document keyed by the participant id.  Joining
    /// the same event twice is idempotent.
    async fn join(&self, participation: &Participation) -> RemoteResult<()>;

    /// Delete the participant document.
    async fn leave(&self, event_id: &EventId, participant_id: &UserId) -> RemoteResult<()>;

    async fn participants_of(&self, event_id: &EventId) -> RemoteResult<Vec<Participation>>;

    /// Membership resolution across subcollections: the events the given
    /// user has joined.
    async fn events_joined_by(&self, participant_id: &UserId) -> RemoteResult<Vec<Event>>;

    /// Every participation record across all events (used by the full
    /// reconciliation pass).
    async fn get_all_participations(&self) -> RemoteResult<Vec<Participation>>;

    // ------------------------------------------------------------------
    // Counter (`counters/eventCounter`) and change feed
    // ------------------------------------------------------------------

    /// Allocate the next event identifier (`E1, E2, …`) via an atomic
    /// read-increment-write on the shared counter document.
    async fn next_event_id(&self) -> RemoteResult<EventId>;

    /// Subscribe to the live change feed for events and participation.
    fn subscribe(&self) -> Subscription;
}
