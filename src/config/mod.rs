//! Typed configuration from environment variables and TOML.
//!
//! Loads once at startup and fails fast on missing or malformed values.
//! The database URL is wrapped in `secrecy::SecretString` so it cannot end
//! up in logs.

use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{QueueName, check_increment};
use secrecy::SecretString;
use serde::Deserialize;

const DEFAULT_QUEUE: &str = "tasks";
const DEFAULT_INCREMENT_SECS: f64 = 30.0;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub scheduler: SchedulerSettings,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Defaults the CLI and long-running workers use when a call does not
/// name its own queue or increment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSettings {
    /// Queue to operate on.
    #[serde(default = "default_queue")]
    pub queue: QueueName,
    /// Score step added to every acquired task, in seconds.
    #[serde(default = "default_increment")]
    pub increment_secs: f64,
}

fn default_queue() -> QueueName {
    QueueName::new(DEFAULT_QUEUE).expect("default queue name is non-empty")
}

fn default_increment() -> f64 {
    DEFAULT_INCREMENT_SECS
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            queue: default_queue(),
            increment_secs: DEFAULT_INCREMENT_SECS,
        }
    }
}

/// Top-level TOML wrapper: settings live under `[scheduler]`.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    scheduler: SchedulerSettings,
}

impl SchedulerSettings {
    /// Parse settings from TOML text with a `[scheduler]` table.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| Error::Config(format!("bad settings: {e}")))?;
        file.scheduler.validated()
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    fn validated(self) -> Result<Self> {
        check_increment(self.increment_secs)
            .map_err(|e| Error::Config(format!("increment_secs: {e}")))?;
        Ok(self)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let queue = match std::env::var("RANGELEASE_QUEUE") {
            Ok(name) => QueueName::new(name)
                .map_err(|_| Error::Config("RANGELEASE_QUEUE must not be empty".to_string()))?,
            Err(_) => default_queue(),
        };
        let increment_secs = match std::env::var("RANGELEASE_INCREMENT_SECS") {
            Ok(raw) => raw.parse::<f64>().map_err(|e| {
                Error::Config(format!("RANGELEASE_INCREMENT_SECS={raw:?} is not a number: {e}"))
            })?,
            Err(_) => DEFAULT_INCREMENT_SECS,
        };

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            scheduler: SchedulerSettings {
                queue,
                increment_secs,
            }
            .validated()?,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
