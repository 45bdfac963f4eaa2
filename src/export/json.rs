//! JSON import/export of the learner's word set.
//! Entries carry their scheduling state, so a round trip keeps progress.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::database::{Result, WordStore};
use crate::models::sm2::MAX_INTERVAL;
use crate::models::{MasteryHint, ReviewRecord, WordEntry, normalize_key};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordSet {
    pub name: String,
    pub words: Vec<WordEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    /// Words already in the store; their progress is left untouched.
    pub skipped: Vec<String>,
}

/// Writes the word set to `path` as pretty-printed JSON.
pub fn export_json_to_path(set: &WordSet, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(set)?;
    fs::write(path, json_string)?;
    info!(words = set.words.len(), "Exported '{}' to {}", set.name, path.display());
    Ok(())
}

pub fn import_json(path: &Path) -> Result<WordSet> {
    let contents = fs::read_to_string(path)?;
    let set: WordSet = serde_json::from_str(&contents)?;
    info!(words = set.words.len(), "Read '{}' from {}", set.name, path.display());
    Ok(set)
}

/// Re-keys an imported entry and pulls its scheduling state back into range.
fn sanitize(entry: &WordEntry) -> WordEntry {
    let mut entry = entry.clone();
    let record = &mut entry.record;
    record.word_key = normalize_key(&record.word_key);
    if !record.ease_factor.is_finite() || record.ease_factor < ReviewRecord::MIN_EASE {
        warn!(word = %record.word_key, ease = record.ease_factor, "Imported ease below floor");
        record.ease_factor = ReviewRecord::MIN_EASE;
    }
    record.interval = record.interval.min(MAX_INTERVAL);
    record.mastery_hint = MasteryHint::derive(record.repetitions, record.interval);
    entry
}

/// Adds every imported word that is not in the store yet.
pub fn import_into<S: WordStore + ?Sized>(store: &S, set: &WordSet) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    for entry in set.words.iter().map(sanitize) {
        if entry.key().is_empty() || store.get(entry.key())?.is_some() {
            report.skipped.push(entry.key().to_string());
            continue;
        }
        store.upsert(&entry)?;
        report.added += 1;
    }
    Ok(report)
}
