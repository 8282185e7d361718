use thiserror::Error;

use rdv_remote::RemoteError;
use rdv_store::StoreError;

/// Errors surfaced by the sync engine to its callers.
///
/// Nothing here is fatal to the process: every variant is either retried on
/// the next sync opportunity or shown to the user as a recoverable
/// condition.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Failure in the local cache (schema violation, I/O).  A failure during
    /// a reconciliation pass rolls that pass back whole.
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// Failure against the remote store.  Writes are retried only via the
    /// offline queue, never automatically.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// The operation requires connectivity and the device is offline.
    #[error("Offline: this operation requires a connection")]
    Offline,

    /// The session user is not allowed to perform this mutation (e.g.
    /// editing an event they do not host).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A join was refused because the event has no seats left.
    #[error("Event is full")]
    EventFull,

    /// The event fields fail validation (`end >= start`, `seats >= 1`).
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
