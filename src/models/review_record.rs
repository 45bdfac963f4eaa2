//! Per-word scheduling state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Grammatical category of a word. Drives which exercises are eligible.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Preposition,
    Conjunction,
    Other,
}

/// Cached mastery signal. Biases selection and filtering, never scheduling math.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MasteryHint {
    New,
    InProgress,
    Learned,
}

impl MasteryHint {
    /// Repetitions a word needs before it can count as learned.
    pub const LEARNED_REPETITIONS: u32 = 3;
    /// Interval (days) a word needs before it can count as learned.
    pub const LEARNED_INTERVAL: u32 = 21;

    pub fn derive(repetitions: u32, interval: u32) -> Self {
        if repetitions == 0 && interval == 0 {
            MasteryHint::New
        } else if repetitions >= Self::LEARNED_REPETITIONS && interval >= Self::LEARNED_INTERVAL {
            MasteryHint::Learned
        } else {
            MasteryHint::InProgress
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub word_key: String,
    pub category: Category,
    pub ease_factor: f64,
    pub interval: u32,
    pub repetitions: u32,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub mastery_hint: MasteryHint,
}

impl ReviewRecord {
    pub const INITIAL_EASE: f64 = 2.5;
    pub const MIN_EASE: f64 = 1.3;

    /// Fresh record for a word just added to the learner's set. Due immediately.
    pub fn new(word: &str, category: Category, now: DateTime<Utc>) -> Self {
        Self {
            word_key: normalize_key(word),
            category,
            ease_factor: Self::INITIAL_EASE,
            interval: 0,
            repetitions: 0,
            next_review_at: now,
            last_reviewed_at: None,
            mastery_hint: MasteryHint::New,
        }
    }

    /// Never reviewed successfully and never lapsed: shown as an introduction.
    pub fn is_unseen(&self) -> bool {
        self.repetitions == 0 && self.interval == 0
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }
}

/// Case-insensitive key for a word's citation form.
pub fn normalize_key(word: &str) -> String {
    word.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
