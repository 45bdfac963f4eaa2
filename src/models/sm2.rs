//! SM-2 (SuperMemo 2) scheduling for review records.
//!
//! - Quality grades 0-2: repetitions reset, interval pinned to 1 day, ease factor untouched
//! - Quality grades 3-5: ease factor adjusted, interval grows 1 day → 6 days → interval × EF
//! - Ease factor never falls below 1.3
//! - Intervals are capped at [`MAX_INTERVAL`] days
//! - Every graded review sets `last_reviewed_at` and `next_review_at = now + interval`

use super::ReviewRecord;
use super::review_record::MasteryHint;
use crate::error::SchedulingError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest interval the scheduler hands out, roughly a hundred years.
pub const MAX_INTERVAL: u32 = 36_500;

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Recall quality on the 0-5 SM-2 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const BLACKOUT: Quality = Quality(0);
    pub const AGAIN: Quality = Quality(1);
    pub const FAIL: Quality = Quality(2);
    pub const HARD: Quality = Quality(3);
    pub const GOOD: Quality = Quality(4);
    pub const PERFECT: Quality = Quality(5);

    pub fn new(value: u8) -> Result<Self, SchedulingError> {
        if value <= 5 {
            Ok(Quality(value))
        } else {
            Err(SchedulingError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl TryFrom<u8> for Quality {
    type Error = SchedulingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> u8 {
        quality.0
    }
}

/// Calculates the record after a review graded with `quality` at `now`.
/// Fails with `InvalidQuality` for scores above 5 instead of clamping them.
pub fn calculate_next_review(
    record: &ReviewRecord,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<ReviewRecord, SchedulingError> {
    let quality = Quality::new(quality)?;
    Ok(apply_quality(record, quality, now))
}

/// Infallible core of [`calculate_next_review`] for an already validated score.
pub fn apply_quality(record: &ReviewRecord, quality: Quality, now: DateTime<Utc>) -> ReviewRecord {
    let (ease_factor, interval, repetitions) = if quality.is_passing() {
        let q = quality.value() as f64;
        let ease = (record.ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
            .max(ReviewRecord::MIN_EASE);

        let repetitions = record.repetitions + 1;
        let interval = match repetitions {
            1 => 1,
            2 => 6,
            _ => (record.interval as f64 * ease)
                .round()
                .min(MAX_INTERVAL as f64) as u32,
        };
        (ease, interval.min(MAX_INTERVAL), repetitions)
    } else {
        // Lapse: ease is frozen, no backoff beyond one day
        (record.ease_factor, 1, 0)
    };

    ReviewRecord {
        word_key: record.word_key.clone(),
        category: record.category,
        ease_factor,
        interval,
        repetitions,
        next_review_at: now + Duration::days(interval as i64),
        last_reviewed_at: Some(now),
        mastery_hint: MasteryHint::derive(repetitions, interval),
    }
}

/// Intervals (days) the record would get for "again", "hard", "good" and "easy".
pub fn preview_intervals(record: &ReviewRecord, now: DateTime<Utc>) -> [u32; 4] {
    [Quality::AGAIN, Quality::HARD, Quality::GOOD, Quality::PERFECT]
        .map(|quality| apply_quality(record, quality, now).interval)
}
