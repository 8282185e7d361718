//! v001 -- Initial schema creation.
//!
//! Creates the three mirrored tables: `users`, `events`, and
//! `events_participants`.  Foreign keys document the referential shape of
//! the remote collections; enforcement is left off (see `database.rs`).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY NOT NULL,        -- remote document id
    name    TEXT NOT NULL,
    pfp     TEXT,                             -- profile picture URI
    phone   TEXT,
    email   TEXT NOT NULL UNIQUE
);

-- ----------------------------------------------------------------
-- Events
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS events (
    event_id    TEXT PRIMARY KEY NOT NULL,    -- "E<n>" or provisional "local-<uuid>"
    name        TEXT NOT NULL,
    description TEXT,
    start_date  TEXT NOT NULL,                -- ISO-8601 / RFC-3339, UTC
    end_date    TEXT NOT NULL,
    location    TEXT NOT NULL,
    seats       INTEGER NOT NULL,
    guest       TEXT,
    image       TEXT,
    host_id     TEXT REFERENCES users(user_id),
    sync_status TEXT NOT NULL DEFAULT 'synced'  -- 'synced' | 'unsynced'
);

CREATE INDEX IF NOT EXISTS idx_events_host_id ON events(host_id);
CREATE INDEX IF NOT EXISTS idx_events_start_date ON events(start_date);
CREATE INDEX IF NOT EXISTS idx_events_sync_status ON events(sync_status);

-- ----------------------------------------------------------------
-- Event participation (many-to-many users <-> events)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS events_participants (
    event_id            TEXT NOT NULL,
    participant_id      TEXT NOT NULL,
    notification_status INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1

    PRIMARY KEY (event_id, participant_id),
    FOREIGN KEY (event_id) REFERENCES events(event_id),
    FOREIGN KEY (participant_id) REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_participants_participant_id
    ON events_participants(participant_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
