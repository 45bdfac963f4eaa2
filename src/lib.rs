pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use controller::{Advance, SessionController, SessionId, WordFilter};
pub use database::{InMemoryWordStore, SqliteWordStore, WordStore};
pub use error::{ConfigError, SchedulingError, ServiceError, SessionError, StoreError};
pub use models::{
    Answer, Archetype, Category, ExercisePresentation, Outcome, Recall, ReviewRecord,
    SessionState, WordDetails, WordEntry,
};
pub use service::{LocalReasoningService, ReasoningService};
