//! Runtime configuration.
//!
//! Load order: built-in defaults, then a JSON file (`VOCAB_TRAINER_CONFIG` or
//! `config.json` in the platform config directory), then `VOCAB_TRAINER_DB`
//! for the database path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "VOCAB_TRAINER_CONFIG";
pub const DATABASE_ENV: &str = "VOCAB_TRAINER_DB";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "vocab-trainer", "vocab-trainer")
}

/// Weights and ease thresholds for the exercise draw.
///
/// Grammar drills only join the draw while the word's ease factor is below
/// their threshold, i.e. while the learner is still shaky on that feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub multiple_choice: f64,
    pub cloze_sentence: f64,
    pub free_recall: f64,
    pub article_drill: f64,
    pub article_drill_max_ease: f64,
    pub verb_form_drill: f64,
    pub verb_form_drill_max_ease: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            multiple_choice: 0.25,
            cloze_sentence: 0.4,
            free_recall: 0.35,
            article_drill: 0.3,
            article_drill_max_ease: 2.8,
            verb_form_drill: 0.35,
            verb_form_drill_max_ease: 3.0,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("multiple_choice", self.multiple_choice),
            ("cloze_sentence", self.cloze_sentence),
            ("free_recall", self.free_recall),
            ("article_drill", self.article_drill),
            ("verb_form_drill", self.verb_form_drill),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        for (name, value) in [
            ("article_drill_max_ease", self.article_drill_max_ease),
            ("verb_form_drill_max_ease", self.verb_form_drill_max_ease),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound on a single content or grading call.
    pub service_timeout_ms: u64,
    /// Fixed seed for the exercise draw; random when absent.
    pub rng_seed: Option<u64>,
    /// Queue size used when a filter does not set its own limit.
    pub default_queue_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_timeout_ms: 15_000,
            rng_seed: None,
            default_queue_limit: Some(50),
        }
    }
}

impl SessionConfig {
    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured path, else `vocab.sqlite3` in the platform data directory,
    /// else the working directory.
    pub fn resolve_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join("vocab.sqlite3"),
            None => PathBuf::from("vocab.sqlite3"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub selection: SelectionConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Loads configuration from the environment and the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join("config.json")));

        let mut config = match file {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::from_path(&path)?
            }
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        if let Some(db) = std::env::var_os(DATABASE_ENV) {
            config.storage.database_path = Some(PathBuf::from(db));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.selection.validate()?;
        if self.session.service_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
