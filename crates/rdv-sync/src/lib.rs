//! # rdv-sync
//!
//! The Rendez-Vous synchronization engine: keeps the local SQLite cache and
//! the authoritative remote document store consistent, propagates remote
//! changes in near-real-time, and degrades gracefully when connectivity is
//! absent.
//!
//! Components, leaf-first:
//! - [`ConnectivityMonitor`] -- reachability probe, re-checked per operation.
//! - [`Reconciler`] -- full-collection resync: fetch everything remote, then
//!   delete-all + reinsert-all in one local transaction per table.
//! - [`ChangeStreamListener`] -- applies the live change feed incrementally
//!   between reconciler passes.
//! - [`OfflineMutationQueue`] -- holds event writes made while disconnected
//!   (`sync_status = 'unsynced'`) and replays them on reconnect.
//! - [`SyncCoordinator`] -- the orchestration entry point the UI layers
//!   call for every read and write.

pub mod connectivity;
pub mod coordinator;
pub mod listener;
pub mod offline;
pub mod reconciler;

mod error;

pub use connectivity::{ConnectivityMonitor, ProbeConnectivity, SharedConnectivity};
pub use coordinator::{Session, SyncCoordinator};
pub use error::{SyncError, SyncResult};
pub use listener::{ChangeStreamListener, ListenerHandle};
pub use offline::OfflineMutationQueue;
pub use reconciler::Reconciler;
