//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees
//! that migrations are run before any other operation.  There is exactly one
//! handle per session, opened once at startup and passed explicitly to the
//! components that need it; nothing in this crate resurrects a connection
//! from ambient global state.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/rendezvous/rendezvous.db`
    /// - macOS:   `~/Library/Application Support/com.rendezvous.rendezvous/rendezvous.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\rendezvous\rendezvous\data\rendezvous.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "rendezvous", "rendezvous").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("rendezvous.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a transient in-memory database (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Foreign keys are declared in the schema to document the referential
        // shape, but enforcement must stay off: the reconciler rebuilds each
        // table by wholesale replacement in dependency order (users, events,
        // participation) across separate transactions, and enforcement would
        // reject that valid replacement sequence mid-way.  The compiled-in
        // default varies between SQLite builds, so it is set explicitly.
        conn.pragma_update(None, "foreign_keys", "OFF")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed CRUD helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection (needed for
    /// multi-statement transactions such as full-table replacement).
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}
