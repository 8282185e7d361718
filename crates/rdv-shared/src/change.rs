//! Change feed types delivered by the remote store's live subscription.

use serde::{Deserialize, Serialize};

use crate::models::{Event, Participation};

/// What happened to the document carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// The document a change refers to.  Removed changes carry the last known
/// document state; only its key is needed to apply the removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeRecord {
    Event(Event),
    Participation(Participation),
}

/// One entry in the live change feed.
///
/// Delivery is at-least-once: the same change may be redelivered after a
/// reconnect, so consumers must apply changes idempotently, keyed by the
/// record's own identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: ChangeRecord,
}

impl ChangeEvent {
    pub fn added(record: ChangeRecord) -> Self {
        Self {
            kind: ChangeKind::Added,
            record,
        }
    }

    pub fn modified(record: ChangeRecord) -> Self {
        Self {
            kind: ChangeKind::Modified,
            record,
        }
    }

    pub fn removed(record: ChangeRecord) -> Self {
        Self {
            kind: ChangeKind::Removed,
            record,
        }
    }
}
