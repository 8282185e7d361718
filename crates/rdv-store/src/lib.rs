//! # rdv-store
//!
//! Local relational cache for the Rendez-Vous application, backed by SQLite.
//!
//! The remote document store is the single source of truth; this crate only
//! mirrors it so the app stays usable offline.  The crate exposes a
//! synchronous `Database` handle that owns a `rusqlite::Connection` and
//! provides typed CRUD helpers for the three mirrored tables (`users`,
//! `events`, `events_participants`), plus the `sync_status` bookkeeping used
//! for event writes made while disconnected.

pub mod database;
pub mod events;
pub mod migrations;
pub mod participants;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
