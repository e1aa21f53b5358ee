//! Slovnyk Storage -- rusqlite wrapper for history, favorites and settings.
//!
//! One database file per user. WAL mode + busy_timeout so a second client
//! instance does not trip over the first.

pub mod session;

pub use session::SessionStore;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// History rows kept after every insert.
pub const HISTORY_LIMIT: usize = 50;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },
    #[error("empty word")]
    EmptyWord,
    #[error("lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub word: String,
    pub translation: String,
    pub searched_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub word: String,
    pub translation: String,
    pub added_at: String,
}

/// Fallible store operations. Listings are most recent first.
pub trait Storage: Send + Sync {
    /// Insert or refresh `word`, then evict beyond the history limit.
    fn add_history(&self, word: &str, translation: &str) -> Result<()>;
    fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;
    fn history_words(&self, limit: usize) -> Result<Vec<String>>;
    fn remove_history(&self, word: &str) -> Result<bool>;
    fn clear_history(&self) -> Result<usize>;

    /// `false` when the word is already a favorite.
    fn add_favorite(&self, word: &str, translation: &str) -> Result<bool>;
    fn remove_favorite(&self, word: &str) -> Result<bool>;
    fn is_favorite(&self, word: &str) -> Result<bool>;
    fn favorites(&self) -> Result<Vec<FavoriteEntry>>;

    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn check_word(word: &str) -> Result<&str> {
    let word = word.trim();
    if word.is_empty() {
        return Err(StorageError::EmptyWord);
    }
    Ok(word)
}

/// SQLite-backed storage.
/// Connection wrapped in Mutex for Send + Sync (rusqlite Connection is !Sync).
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    history_limit: usize,
}

impl SqliteStorage {
    fn db(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let storage = Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
            history_limit: HISTORY_LIMIT,
        };

        storage.ensure_schema()?;
        tracing::debug!(path = %db_path.display(), "storage opened");
        Ok(storage)
    }

    /// Keep `limit` history rows instead of [`HISTORY_LIMIT`]. Zero is
    /// treated as one.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.db()?;
        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            conn.execute_batch(include_str!("schema_v1.sql"))?;
            tracing::info!(version = SCHEMA_VERSION, "storage: created schema");
        }

        let version: u32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        if version != SCHEMA_VERSION {
            return Err(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: version,
            });
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn add_history(&self, word: &str, translation: &str) -> Result<()> {
        let word = check_word(word)?;
        let mut conn = self.db()?;
        let tx = conn.transaction()?;
        // Delete + insert so a refreshed word also gets the newest id; ids
        // break ties between equal timestamps.
        tx.execute("DELETE FROM search_history WHERE word = ?1", params![word])?;
        tx.execute(
            "INSERT INTO search_history (word, translation, searched_at) VALUES (?1, ?2, ?3)",
            params![word, translation, now()],
        )?;
        let evicted = tx.execute(
            "DELETE FROM search_history WHERE id NOT IN (
                SELECT id FROM search_history ORDER BY searched_at DESC, id DESC LIMIT ?1
             )",
            params![self.history_limit as i64],
        )?;
        tx.commit()?;
        if evicted > 0 {
            tracing::debug!(evicted, limit = self.history_limit, "history trimmed");
        }
        Ok(())
    }

    fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(
            "SELECT word, translation, searched_at FROM search_history
             ORDER BY searched_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(HistoryEntry {
                    word: row.get(0)?,
                    translation: row.get(1)?,
                    searched_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn history_words(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(
            "SELECT word FROM search_history ORDER BY searched_at DESC, id DESC LIMIT ?1",
        )?;
        let words = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(words)
    }

    fn remove_history(&self, word: &str) -> Result<bool> {
        let conn = self.db()?;
        let n = conn.execute(
            "DELETE FROM search_history WHERE word = ?1",
            params![word.trim()],
        )?;
        Ok(n > 0)
    }

    fn clear_history(&self) -> Result<usize> {
        let conn = self.db()?;
        Ok(conn.execute("DELETE FROM search_history", [])?)
    }

    fn add_favorite(&self, word: &str, translation: &str) -> Result<bool> {
        let word = check_word(word)?;
        let conn = self.db()?;
        let n = conn.execute(
            "INSERT OR IGNORE INTO favorites (word, translation, added_at) VALUES (?1, ?2, ?3)",
            params![word, translation, now()],
        )?;
        Ok(n > 0)
    }

    fn remove_favorite(&self, word: &str) -> Result<bool> {
        let conn = self.db()?;
        let n = conn.execute("DELETE FROM favorites WHERE word = ?1", params![word.trim()])?;
        Ok(n > 0)
    }

    fn is_favorite(&self, word: &str) -> Result<bool> {
        let conn = self.db()?;
        let found: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM favorites WHERE word = ?1",
            params![word.trim()],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn favorites(&self) -> Result<Vec<FavoriteEntry>> {
        let conn = self.db()?;
        let mut stmt = conn.prepare(
            "SELECT word, translation, added_at FROM favorites ORDER BY added_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FavoriteEntry {
                    word: row.get(0)?,
                    translation: row.get(1)?,
                    added_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
