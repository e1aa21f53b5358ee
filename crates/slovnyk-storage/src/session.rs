//! Best-effort facade used by the UI layer.
//!
//! Failures are logged and collapse to `false`, an empty list or the given
//! default. Nothing here returns an error.

use std::path::Path;

use crate::{FavoriteEntry, HistoryEntry, SqliteStorage, Storage};

pub struct SessionStore {
    storage: Box<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// Open the SQLite store at `path` keeping `history_limit` rows.
    pub fn open(path: &Path, history_limit: usize) -> crate::Result<Self> {
        let storage = SqliteStorage::open(path)?.with_history_limit(history_limit);
        Ok(Self::new(storage))
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn add_history(&self, word: &str, translation: &str) -> bool {
        match self.storage.add_history(word, translation) {
            Ok(()) => {
                tracing::debug!(word, "added to history");
                true
            }
            Err(e) => {
                tracing::warn!(word, error = %e, "failed to add history entry");
                false
            }
        }
    }

    pub fn get_history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.storage.history(limit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read history");
            Vec::new()
        })
    }

    pub fn get_history_words(&self, limit: usize) -> Vec<String> {
        self.storage.history_words(limit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read history");
            Vec::new()
        })
    }

    pub fn remove_history(&self, word: &str) -> bool {
        self.storage.remove_history(word).unwrap_or_else(|e| {
            tracing::warn!(word, error = %e, "failed to remove history entry");
            false
        })
    }

    pub fn clear_history(&self) -> bool {
        match self.storage.clear_history() {
            Ok(n) => {
                tracing::info!(removed = n, "history cleared");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear history");
                false
            }
        }
    }

    pub fn add_favorite(&self, word: &str, translation: &str) -> bool {
        self.storage.add_favorite(word, translation).unwrap_or_else(|e| {
            tracing::warn!(word, error = %e, "failed to add favorite");
            false
        })
    }

    pub fn remove_favorite(&self, word: &str) -> bool {
        self.storage.remove_favorite(word).unwrap_or_else(|e| {
            tracing::warn!(word, error = %e, "failed to remove favorite");
            false
        })
    }

    pub fn is_favorite(&self, word: &str) -> bool {
        self.storage.is_favorite(word).unwrap_or_else(|e| {
            tracing::warn!(word, error = %e, "failed to check favorite");
            false
        })
    }

    /// `(word, translation)` pairs, most recent first.
    pub fn get_favorites(&self) -> Vec<(String, String)> {
        self.get_favorite_entries()
            .into_iter()
            .map(|f| (f.word, f.translation))
            .collect()
    }

    pub fn get_favorite_entries(&self) -> Vec<FavoriteEntry> {
        self.storage.favorites().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read favorites");
            Vec::new()
        })
    }

    pub fn get_setting(&self, key: &str, default: &str) -> String {
        match self.storage.get_setting(key) {
            Ok(Some(value)) => value,
            Ok(None) => default.to_string(),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read setting");
                default.to_string()
            }
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> bool {
        match self.storage.set_setting(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to write setting");
                false
            }
        }
    }
}
