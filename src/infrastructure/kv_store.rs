//! SQLite-backed key-value storage.
//!
//! The same table layout serves both storage layers: a file database for
//! durable data and an in-memory database for per-session data.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{AppError, Result};

/// Key-value repository using SQLite.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Opens or creates a durable store at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::database)?;

        let store = Self { conn };
        store.init_schema()?;

        tracing::debug!(path = %path.display(), "Opened durable store");
        Ok(store)
    }

    /// Creates a store that lives only as long as this value.
    ///
    /// # Errors
    /// Returns error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::database)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Read the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(AppError::database)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            ",
                params![key, value],
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(AppError::database)?;
        Ok(())
    }

    /// Remove every key.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv", [])
            .map_err(AppError::database)?;
        Ok(())
    }
}
