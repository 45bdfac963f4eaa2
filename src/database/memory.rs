//! In-memory word store, for tests and throwaway sessions.
use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{Result, WordStore};
use crate::error::StoreError;
use crate::models::{WordEntry, normalize_key};

#[derive(Default)]
pub struct InMemoryWordStore {
    entries: Mutex<BTreeMap<String, WordEntry>>,
    now: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryWordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = WordEntry>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.entries.lock() {
            for entry in entries {
                map.insert(entry.record.word_key.clone(), entry);
            }
        }
        store
    }

    /// Pins the store's clock; `None` follows the system clock.
    pub fn set_now(&self, now: Option<DateTime<Utc>>) {
        if let Ok(mut pinned) = self.now.lock() {
            *pinned = now;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, WordEntry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("word map lock poisoned".to_string()))
    }
}

impl WordStore for InMemoryWordStore {
    fn get_all(&self) -> Result<Vec<WordEntry>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn get(&self, word_key: &str) -> Result<Option<WordEntry>> {
        Ok(self.lock()?.get(&normalize_key(word_key)).cloned())
    }

    fn upsert(&self, entry: &WordEntry) -> Result<()> {
        self.lock()?
            .insert(entry.record.word_key.clone(), entry.clone());
        Ok(())
    }

    fn delete(&self, word_key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(&normalize_key(word_key)).is_some())
    }

    fn current_date(&self) -> Result<DateTime<Utc>> {
        let pinned = self
            .now
            .lock()
            .map_err(|_| StoreError::Unavailable("clock lock poisoned".to_string()))?;
        Ok(pinned.unwrap_or_else(Utc::now))
    }
}
