//! SQLite word store
//!
//! Handles database initialization, CRUD for word entries, and the simulated
//! day offset used to practice ahead of the calendar.

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use super::{Result, WordStore};
use crate::error::StoreError;
use crate::models::{Category, MasteryHint, ReviewRecord, WordEntry, normalize_key};

const SELECT_COLUMNS: &str = "SELECT word_key, category, ease_factor, interval_days, repetitions,
        next_review_at, last_reviewed_at, mastery_hint, details FROM words";

pub struct SqliteWordStore {
    conn: Connection,
}

impl SqliteWordStore {
    /// Opens (or creates) the database file and its tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened word database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // One row per word; linguistic details kept as JSON text
        conn.execute(
            "CREATE TABLE IF NOT EXISTS words (
                word_key TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval_days INTEGER NOT NULL DEFAULT 0,
                repetitions INTEGER NOT NULL DEFAULT 0,
                next_review_at INTEGER NOT NULL,
                last_reviewed_at INTEGER,
                mastery_hint TEXT NOT NULL DEFAULT 'new',
                details TEXT NOT NULL
            )",
            (),
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            (),
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('day_offset', '0')",
            (),
        )?;

        Ok(Self { conn })
    }

    /// Days the simulated calendar runs ahead of the system clock.
    pub fn day_offset(&self) -> Result<i64> {
        let value: String = self.conn.query_row(
            "SELECT value FROM app_state WHERE key = 'day_offset'",
            [],
            |row| row.get(0),
        )?;
        value
            .parse::<i64>()
            .map_err(|_| StoreError::InvalidValue(format!("day_offset = {value}")))
    }

    /// Advances the simulated date by 24 hours.
    pub fn advance_day(&self) -> Result<()> {
        let current = self.day_offset()?;
        let offset = current
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidValue(format!("day_offset = {current}")))?;
        self.conn.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'day_offset'",
            params![offset.to_string()],
        )?;
        info!(offset, "Advanced simulated date");
        Ok(())
    }

    /// Returns the simulated calendar to today.
    pub fn reset_day_offset(&self) -> Result<()> {
        self.conn.execute(
            "UPDATE app_state SET value = '0' WHERE key = 'day_offset'",
            (),
        )?;
        Ok(())
    }
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(StoreError::InvalidTimestamp(millis))
}

/// Raw column values, converted into a `WordEntry` outside the row callback
/// so JSON and enum errors keep their own error variants.
struct WordRow {
    word_key: String,
    category: String,
    ease_factor: f64,
    interval: u32,
    repetitions: u32,
    next_review_at: i64,
    last_reviewed_at: Option<i64>,
    mastery_hint: String,
    details: String,
}

impl WordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            word_key: row.get(0)?,
            category: row.get(1)?,
            ease_factor: row.get(2)?,
            interval: row.get(3)?,
            repetitions: row.get(4)?,
            next_review_at: row.get(5)?,
            last_reviewed_at: row.get(6)?,
            mastery_hint: row.get(7)?,
            details: row.get(8)?,
        })
    }

    fn into_entry(self) -> Result<WordEntry> {
        let category = self
            .category
            .parse::<Category>()
            .map_err(|_| StoreError::InvalidValue(format!("category = {}", self.category)))?;
        let mastery_hint = self
            .mastery_hint
            .parse::<MasteryHint>()
            .map_err(|_| StoreError::InvalidValue(format!("mastery_hint = {}", self.mastery_hint)))?;

        Ok(WordEntry {
            record: ReviewRecord {
                word_key: self.word_key,
                category,
                ease_factor: self.ease_factor,
                interval: self.interval,
                repetitions: self.repetitions,
                next_review_at: from_millis(self.next_review_at)?,
                last_reviewed_at: self.last_reviewed_at.map(from_millis).transpose()?,
                mastery_hint,
            },
            details: serde_json::from_str(&self.details)?,
        })
    }
}

impl WordStore for SqliteWordStore {
    fn get_all(&self) -> Result<Vec<WordEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY word_key"))?;
        let rows = stmt
            .query_map([], WordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(WordRow::into_entry).collect()
    }

    fn get(&self, word_key: &str) -> Result<Option<WordEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE word_key = ?1"),
                params![normalize_key(word_key)],
                WordRow::from_row,
            )
            .optional()?;
        row.map(WordRow::into_entry).transpose()
    }

    fn upsert(&self, entry: &WordEntry) -> Result<()> {
        let record = &entry.record;
        let details = serde_json::to_string(&entry.details)?;
        self.conn.execute(
            "INSERT INTO words (word_key, category, ease_factor, interval_days, repetitions,
                                next_review_at, last_reviewed_at, mastery_hint, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(word_key) DO UPDATE SET
                category = excluded.category,
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review_at = excluded.next_review_at,
                last_reviewed_at = excluded.last_reviewed_at,
                mastery_hint = excluded.mastery_hint,
                details = excluded.details",
            params![
                record.word_key,
                record.category.to_string(),
                record.ease_factor,
                record.interval,
                record.repetitions,
                to_millis(record.next_review_at),
                record.last_reviewed_at.map(to_millis),
                record.mastery_hint.to_string(),
                details,
            ],
        )?;
        debug!(word = %record.word_key, interval = record.interval, "Stored word");
        Ok(())
    }

    fn delete(&self, word_key: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM words WHERE word_key = ?1",
            params![normalize_key(word_key)],
        )?;
        Ok(removed > 0)
    }

    /// Words where next_review_at <= now, ordered oldest first.
    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<WordEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE next_review_at <= ?1 ORDER BY next_review_at ASC, word_key ASC"
        ))?;
        let rows = stmt
            .query_map(params![to_millis(now)], WordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(WordRow::into_entry).collect()
    }

    fn current_date(&self) -> Result<DateTime<Utc>> {
        let offset = self.day_offset()?;
        TimeDelta::try_days(offset)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or_else(|| StoreError::InvalidValue(format!("day_offset = {offset}")))
    }
}
