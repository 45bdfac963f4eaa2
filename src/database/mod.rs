//! Persistence port for word entries.
//!
//! The session controller only needs a keyed store that returns the last
//! written state for a key; SQLite and in-memory implementations live here.

pub mod db;
pub mod memory;

pub use db::SqliteWordStore;
pub use memory::InMemoryWordStore;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Category, WordDetails, WordEntry, normalize_key};

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait WordStore {
    fn get_all(&self) -> Result<Vec<WordEntry>>;

    fn get(&self, word_key: &str) -> Result<Option<WordEntry>>;

    /// Inserts or replaces the entry stored under its key.
    fn upsert(&self, entry: &WordEntry) -> Result<()>;

    /// Returns whether an entry was removed.
    fn delete(&self, word_key: &str) -> Result<bool>;

    /// Entries due at `now`, oldest due date first.
    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<WordEntry>> {
        let mut due: Vec<WordEntry> = self
            .get_all()?
            .into_iter()
            .filter(|entry| entry.record.is_due(now))
            .collect();
        sort_by_due_date(&mut due);
        Ok(due)
    }

    /// The store's notion of "now" used for due checks and scheduling.
    fn current_date(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }
}

pub fn sort_by_due_date(entries: &mut [WordEntry]) {
    entries.sort_by(|a, b| {
        a.record
            .next_review_at
            .cmp(&b.record.next_review_at)
            .then_with(|| a.record.word_key.cmp(&b.record.word_key))
    });
}

/// Adds a word with a fresh review record, due now.
///
/// If the word is already in the set its entry is returned unchanged, so
/// re-adding never resets learning progress.
pub fn add_word<S: WordStore + ?Sized>(
    store: &S,
    details: WordDetails,
    category: Category,
) -> Result<WordEntry> {
    if let Some(existing) = store.get(&normalize_key(&details.text))? {
        return Ok(existing);
    }
    let entry = WordEntry::new(details, category, store.current_date()?);
    store.upsert(&entry)?;
    tracing::info!(word = %entry.key(), %category, "Word added");
    Ok(entry)
}
