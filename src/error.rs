//! Error types shared across the trainer.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Archetype, SessionState};

/// Raised by the scheduling engine. Only a broken caller can trigger it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Invalid quality score {0}: expected 0..=5")]
    InvalidQuality(u8),
}

/// Failures of the reasoning/content service boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Content generation failed for {archetype}: {message}")]
    ContentGeneration {
        archetype: Archetype,
        message: String,
    },

    #[error("Grading failed: {0}")]
    Grading(String),

    #[error("Service did not answer within {0} ms")]
    Timeout(u64),
}

/// Failures of the persistence port.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid weight for {name}: {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("Service timeout must be greater than zero")]
    ZeroTimeout,
}

/// Errors returned by the session API.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown session: {0}")]
    UnknownSession(Uuid),

    #[error("No words are due; {candidates} words can be reviewed anyway")]
    NothingDue { candidates: usize },

    #[error("No words match the filter")]
    NoWords,

    #[error("Operation `{operation}` is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Answer does not fit a {0} exercise")]
    AnswerMismatch(Archetype),

    #[error("Cannot go back from the first word")]
    AtFirstWord,

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Scheduling(#[from] SchedulingError),
}

impl SessionError {
    /// Transient failures the learner can retry without losing state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Service(_))
    }
}
