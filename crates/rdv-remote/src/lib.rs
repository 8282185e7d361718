//! # rdv-remote
//!
//! The authoritative remote document store for Rendez-Vous.
//!
//! [`RemoteStore`] abstracts the backend behind the document layout the app
//! relies on: `users/{user_id}`, `events/{event_id}`, the
//! `events/{event_id}/eventParticipant/{participant_id}` subcollection, and
//! the singleton `counters/eventCounter` document backing event id
//! allocation.  [`MemoryRemote`] is the in-process reference backend used by
//! tests and local development; it implements the same last-writer-wins
//! write semantics and at-least-once change feed a hosted document store
//! provides.

pub mod feed;
pub mod memory;
pub mod store;

mod error;

pub use error::{RemoteError, RemoteResult};
pub use feed::Subscription;
pub use memory::MemoryRemote;
pub use store::RemoteStore;
