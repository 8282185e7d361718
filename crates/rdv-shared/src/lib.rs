//! # rdv-shared
//!
//! Domain types shared by every Rendez-Vous crate: the three record kinds
//! (users, events, participation), their identifier newtypes, and the change
//! feed types emitted by the remote store's live subscription.

pub mod change;
pub mod models;
pub mod types;

pub use change::{ChangeEvent, ChangeKind, ChangeRecord};
pub use models::{Event, EventDraft, NewUser, Participation, User};
pub use types::{EventId, SyncStatus, UserId};
