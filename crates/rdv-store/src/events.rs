//! CRUD operations for [`Event`] rows, including the `sync_status`
//! bookkeeping used by the offline write path.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use rdv_shared::{Event, EventId, SyncStatus, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

const EVENT_COLUMNS: &str =
    "event_id, name, description, start_date, end_date, location, seats, guest, image, host_id";

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert or replace an event row (primary-key upsert).  Applying the
    /// same record twice yields the same row.
    pub fn upsert_event(&self, event: &Event, status: SyncStatus) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO events
                 (event_id, name, description, start_date, end_date,
                  location, seats, guest, image, host_id, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.id.as_str(),
                event.name,
                event.description,
                event.start_date.to_rfc3339(),
                event.end_date.to_rfc3339(),
                event.location,
                event.seats,
                event.guest,
                event.image,
                event.host_id.as_str(),
                status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Delete an event by id.  Returns `true` if a row was deleted.
    pub fn delete_event(&self, id: &EventId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM events WHERE event_id = ?1",
            params![id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Replace the `events` table with the given remote snapshot, inside one
    /// transaction.  Rows tagged `unsynced` are locally-originated writes the
    /// remote has never seen; they are kept, not clobbered.  On any error the
    /// previous contents are left untouched.
    pub fn replace_all_events(&mut self, events: &[Event]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        // A pending local write supersedes the fetched copy of the same
        // document: it will overwrite the remote at the next queue flush.
        let pending: std::collections::HashSet<String> = {
            let mut stmt =
                tx.prepare("SELECT event_id FROM events WHERE sync_status = 'unsynced'")?;
            let ids = stmt.query_map([], |row| row.get(0))?;
            ids.collect::<rusqlite::Result<_>>()?
        };

        tx.execute("DELETE FROM events WHERE sync_status = 'synced'", [])?;
        for event in events {
            if pending.contains(event.id.as_str()) {
                continue;
            }
            tx.execute(
                "INSERT OR REPLACE INTO events
                     (event_id, name, description, start_date, end_date,
                      location, seats, guest, image, host_id, sync_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    event.id.as_str(),
                    event.name,
                    event.description,
                    event.start_date.to_rfc3339(),
                    event.end_date.to_rfc3339(),
                    event.location,
                    event.seats,
                    event.guest,
                    event.image,
                    event.host_id.as_str(),
                    SyncStatus::Synced.as_str(),
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = events.len(), "events table replaced");
        Ok(())
    }

    /// Flip an event's `sync_status` to `synced` after a successful remote
    /// push.
    pub fn mark_event_synced(&self, id: &EventId) -> Result<()> {
        self.conn().execute(
            "UPDATE events SET sync_status = 'synced' WHERE event_id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single event by id.
    pub fn get_event(&self, id: &EventId) -> Result<Event> {
        self.conn()
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
                params![id.as_str()],
                row_to_event,
            )
            .map_err(not_found)
    }

    /// List all events, ordered by start date.
    pub fn get_all_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date ASC"
        ))?;
        let rows = stmt.query_map([], row_to_event)?;
        collect_events(rows)
    }

    /// List events whose start date falls on the given calendar day (UTC).
    pub fn get_events_by_date(&self, date: NaiveDate) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE DATE(start_date) = ?1
             ORDER BY start_date ASC"
        ))?;
        let day = date.format("%Y-%m-%d").to_string();
        let rows = stmt.query_map(params![day], row_to_event)?;
        collect_events(rows)
    }

    /// List events hosted by the given user.
    pub fn get_events_by_host(&self, host_id: &UserId) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE host_id = ?1
             ORDER BY start_date ASC"
        ))?;
        let rows = stmt.query_map(params![host_id.as_str()], row_to_event)?;
        collect_events(rows)
    }

    /// List events pending remote delivery (`sync_status = 'unsynced'`).
    pub fn unsynced_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE sync_status = 'unsynced'"
        ))?;
        let rows = stmt.query_map([], row_to_event)?;
        collect_events(rows)
    }

    /// Read an event's `sync_status` flag.
    pub fn event_sync_status(&self, id: &EventId) -> Result<SyncStatus> {
        let raw: String = self
            .conn()
            .query_row(
                "SELECT sync_status FROM events WHERE event_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(not_found)?;

        SyncStatus::parse(&raw)
            .ok_or_else(|| StoreError::Migration(format!("invalid sync_status '{raw}'")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

fn collect_events(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<Event>>,
) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Map a `rusqlite::Row` to an [`Event`].
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;

    let start_date = parse_instant(&start_str, 3)?;
    let end_date = parse_instant(&end_str, 4)?;

    Ok(Event {
        id: EventId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        start_date,
        end_date,
        location: row.get(5)?,
        seats: row.get(6)?,
        guest: row.get(7)?,
        image: row.get(8)?,
        host_id: UserId(row.get(9)?),
    })
}

fn parse_instant(s: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(id: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: EventId::from(id),
            name: "Picnic".to_string(),
            description: Some("Bring snacks".to_string()),
            start_date: start,
            end_date: start + chrono::Duration::hours(2),
            location: "Parc des Buttes-Chaumont".to_string(),
            seats: 10,
            guest: None,
            image: None,
            host_id: UserId::from("u1"),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn upsert_overwrites_by_primary_key() {
        let db = Database::open_in_memory().unwrap();

        let mut event = sample("E1", at(2026, 9, 1, 10));
        db.upsert_event(&event, SyncStatus::Synced).unwrap();

        event.name = "Picnic (rescheduled)".to_string();
        event.start_date = at(2026, 9, 2, 10);
        db.upsert_event(&event, SyncStatus::Synced).unwrap();

        assert_eq!(db.get_all_events().unwrap().len(), 1);
        assert_eq!(db.get_event(&event.id).unwrap(), event);
    }

    #[test]
    fn query_by_date_and_host() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_event(&sample("E1", at(2026, 9, 1, 10)), SyncStatus::Synced)
            .unwrap();
        db.upsert_event(&sample("E2", at(2026, 9, 1, 18)), SyncStatus::Synced)
            .unwrap();
        db.upsert_event(&sample("E3", at(2026, 9, 2, 10)), SyncStatus::Synced)
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let on_day = db.get_events_by_date(day).unwrap();
        assert_eq!(on_day.len(), 2);
        assert_eq!(on_day[0].id.as_str(), "E1");

        let hosted = db.get_events_by_host(&UserId::from("u1")).unwrap();
        assert_eq!(hosted.len(), 3);
        assert!(db
            .get_events_by_host(&UserId::from("nobody"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn replace_all_keeps_unsynced_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_event(&sample("E1", at(2026, 9, 1, 10)), SyncStatus::Synced)
            .unwrap();
        let pending = sample("local-abc", at(2026, 9, 3, 10));
        db.upsert_event(&pending, SyncStatus::Unsynced).unwrap();

        // Remote snapshot no longer contains E1.
        db.replace_all_events(&[sample("E2", at(2026, 9, 4, 10))])
            .unwrap();

        let all = db.get_all_events().unwrap();
        let ids: Vec<&str> = all.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["local-abc", "E2"]);
        assert_eq!(
            db.event_sync_status(&pending.id).unwrap(),
            SyncStatus::Unsynced
        );
    }

    #[test]
    fn fetched_copy_does_not_clobber_a_pending_edit() {
        let mut db = Database::open_in_memory().unwrap();
        let mut edited = sample("E1", at(2026, 9, 1, 10));
        edited.name = "renamed offline".into();
        db.upsert_event(&edited, SyncStatus::Unsynced).unwrap();

        // Remote still holds the stale copy of the same document.
        db.replace_all_events(&[sample("E1", at(2026, 9, 1, 10))])
            .unwrap();

        let stored = db.get_event(&edited.id).unwrap();
        assert_eq!(stored.name, "renamed offline");
        assert_eq!(
            db.event_sync_status(&edited.id).unwrap(),
            SyncStatus::Unsynced
        );
    }

    #[test]
    fn mark_synced_flips_status() {
        let db = Database::open_in_memory().unwrap();
        let event = sample("local-xyz", at(2026, 9, 1, 10));
        db.upsert_event(&event, SyncStatus::Unsynced).unwrap();
        assert_eq!(db.unsynced_events().unwrap().len(), 1);

        db.mark_event_synced(&event.id).unwrap();
        assert!(db.unsynced_events().unwrap().is_empty());
        assert_eq!(
            db.event_sync_status(&event.id).unwrap(),
            SyncStatus::Synced
        );
    }

    #[test]
    fn timestamps_survive_the_boundary() {
        let db = Database::open_in_memory().unwrap();
        let event = sample("E1", at(2026, 12, 31, 23));
        db.upsert_event(&event, SyncStatus::Synced).unwrap();

        let stored = db.get_event(&event.id).unwrap();
        assert_eq!(stored.start_date, event.start_date);
        assert_eq!(stored.end_date, event.end_date);
    }
}
