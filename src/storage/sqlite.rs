//! `SQLite`-backed storage of named state records.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::common::errors::{SidekickError, SidekickResult};

use super::StateStorage;

/// One named record in a `SQLite` table.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    table: String,
    key: String,
}

impl SqliteStorage {
    /// Table name for state records.
    pub const DEFAULT_TABLE: &'static str = "session_records";

    /// Open (or create) the database at `path` and address the record `key`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, key: &str) -> SidekickResult<Self> {
        Self::with_connection(Connection::open(path)?, key)
    }

    /// Storage backed by a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn open_in_memory(key: &str) -> SidekickResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, key)
    }

    fn with_connection(conn: Connection, key: &str) -> SidekickResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table,
            key: key.to_string(),
        })
    }
}

impl StateStorage for SqliteStorage {
    fn load(&self) -> SidekickResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| SidekickError::StoragePoisoned)?;
        let table = &self.table;
        let value = conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE key = ?1"),
                rusqlite::params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, blob: &str) -> SidekickResult<()> {
        let conn = self.conn.lock().map_err(|_| SidekickError::StoragePoisoned)?;
        let table = &self.table;
        let now_ms = chrono::Utc::now().timestamp_millis();
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {table} (key, value, updated_at)
                 VALUES (?1, ?2, ?3)"
            ),
            rusqlite::params![self.key, blob, now_ms],
        )?;
        Ok(())
    }
}
