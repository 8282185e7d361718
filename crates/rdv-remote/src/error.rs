use thiserror::Error;

/// Errors produced by remote store operations.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The referenced document does not exist.
    #[error("Remote document not found")]
    NotFound,

    /// The operation failed in transit or the backend is unreachable.
    /// Retry happens via the offline queue for writes, never automatically.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint was violated (e.g. duplicate email on
    /// registration).
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Convenience alias used throughout the crate.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
