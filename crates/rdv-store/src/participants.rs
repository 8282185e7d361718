//! CRUD operations for [`Participation`] rows (the many-to-many join
//! between users and events).

use rusqlite::params;

use rdv_shared::{EventId, Participation, UserId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert or replace a participation row (composite-key upsert).
    /// Re-applying the same join is a no-op after the first application.
    pub fn upsert_participation(&self, participation: &Participation) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO events_participants
                 (event_id, participant_id, notification_status)
             VALUES (?1, ?2, ?3)",
            params![
                participation.event_id.as_str(),
                participation.participant_id.as_str(),
                participation.notification_status,
            ],
        )?;
        Ok(())
    }

    /// Remove a participant from an event.  Returns `true` if a row was
    /// deleted.
    pub fn delete_participation(&self, event_id: &EventId, participant_id: &UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM events_participants
             WHERE event_id = ?1 AND participant_id = ?2",
            params![event_id.as_str(), participant_id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Remove every participation row for an event (event cancellation).
    pub fn delete_participations_for_event(&self, event_id: &EventId) -> Result<()> {
        self.conn().execute(
            "DELETE FROM events_participants WHERE event_id = ?1",
            params![event_id.as_str()],
        )?;
        Ok(())
    }

    /// Replace the entire `events_participants` table with the given
    /// records, inside one transaction.  On any error the previous contents
    /// are left untouched.
    pub fn replace_all_participations(&mut self, participations: &[Participation]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM events_participants", [])?;
        for p in participations {
            tx.execute(
                "INSERT OR REPLACE INTO events_participants
                     (event_id, participant_id, notification_status)
                 VALUES (?1, ?2, ?3)",
                params![
                    p.event_id.as_str(),
                    p.participant_id.as_str(),
                    p.notification_status,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = participations.len(), "participation table replaced");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List participation rows for an event.
    pub fn participants_for_event(&self, event_id: &EventId) -> Result<Vec<Participation>> {
        let mut stmt = self.conn().prepare(
            "SELECT event_id, participant_id, notification_status
             FROM events_participants
             WHERE event_id = ?1",
        )?;

        let rows = stmt.query_map(params![event_id.as_str()], row_to_participation)?;

        let mut participations = Vec::new();
        for row in rows {
            participations.push(row?);
        }
        Ok(participations)
    }

    /// Number of participants currently joined to an event.
    pub fn participation_count(&self, event_id: &EventId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM events_participants WHERE event_id = ?1",
            params![event_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// List participation rows for a given participant (the "joined events"
    /// screen resolves these to event rows).
    pub fn events_joined_by(&self, participant_id: &UserId) -> Result<Vec<Participation>> {
        let mut stmt = self.conn().prepare(
            "SELECT event_id, participant_id, notification_status
             FROM events_participants
             WHERE participant_id = ?1",
        )?;

        let rows = stmt.query_map(params![participant_id.as_str()], row_to_participation)?;

        let mut participations = Vec::new();
        for row in rows {
            participations.push(row?);
        }
        Ok(participations)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Participation`].
fn row_to_participation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Participation> {
    Ok(Participation {
        event_id: EventId(row.get(0)?),
        participant_id: UserId(row.get(1)?),
        notification_status: row.get(2)?,
    })
}
