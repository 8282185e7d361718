use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a user document, assigned by the remote store on
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a fresh random identifier (used by the remote store when a
    /// user registers).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an event document.
///
/// Online creation allocates `E1, E2, …` from the remote counter document.
/// Offline creation has no access to the counter, so it mints a provisional
/// `local-<uuid>` identifier which survives the later push (remote writes
/// are keyed by document id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub String);

impl EventId {
    /// Identifier for counter value `n`, i.e. `E<n>`.
    pub fn from_counter(n: u64) -> Self {
        Self(format!("E{n}"))
    }

    /// Mint a provisional identifier for an event created while offline.
    pub fn provisional() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    /// Whether this identifier was minted locally and has never been
    /// allocated by the remote counter.
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-row flag marking a locally-originated event as pending (`unsynced`)
/// or confirmed (`synced`) remote delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Unsynced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Unsynced => "unsynced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "synced" => Some(Self::Synced),
            "unsynced" => Some(Self::Unsynced),
            _ => None,
        }
    }
}
