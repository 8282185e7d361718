//! Domain model structs mirrored between the remote document store and the
//! local SQLite cache.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.  Timestamps are `DateTime<Utc>` in memory and
//! normalized to RFC-3339 text at the SQLite boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EventId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user.  The remote `users/{user_id}` document is
/// authoritative; the local row is a mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Remote-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Profile picture reference (URI), if set.
    pub pfp: Option<String>,
    /// Phone number, if set.
    pub phone: Option<String>,
    /// Email address, unique across users.
    pub email: String,
}

/// Profile fields supplied at registration, before the remote store has
/// assigned an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub pfp: Option<String>,
    pub phone: Option<String>,
    pub email: String,
}

impl NewUser {
    /// Attach a remote-assigned identifier.
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            pfp: self.pfp,
            phone: self.phone,
            email: self.email,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A scheduled event.  The remote `events/{event_id}` document is
/// authoritative; the local row is a mirror plus a `sync_status` flag kept
/// by the store layer for offline-originated writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    /// Start instant.  Invariant: `end_date >= start_date`.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Free-text or geocoded location string.
    pub location: String,
    /// Seat capacity, always >= 1.
    pub seats: u32,
    /// Optional single guest email.
    pub guest: Option<String>,
    /// Image reference (URI), if set.
    pub image: Option<String>,
    /// The hosting user.  Only the host may edit or cancel the event.
    pub host_id: UserId,
}

/// Event fields supplied by the host at creation time, before an identifier
/// has been allocated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub seats: u32,
    pub guest: Option<String>,
    pub image: Option<String>,
}

impl EventDraft {
    /// Attach an identifier and host to produce a full [`Event`].
    pub fn into_event(self, id: EventId, host_id: UserId) -> Event {
        Event {
            id,
            name: self.name,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            seats: self.seats,
            guest: self.guest,
            image: self.image,
            host_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Participation
// ---------------------------------------------------------------------------

/// A user joined to an event.  Composite key `(event_id, participant_id)`;
/// a participant may join a given event at most once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participation {
    pub event_id: EventId,
    pub participant_id: UserId,
    /// Whether the participant wants change notifications for this event.
    pub notification_status: bool,
}

impl Participation {
    pub fn new(event_id: EventId, participant_id: UserId) -> Self {
        Self {
            event_id,
            participant_id,
            notification_status: false,
        }
    }
}
