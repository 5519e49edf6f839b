//! Runtime configuration for embedding callers and the CLI.
//!
//! # Responsibility
//! - Resolve database, logging, and executor settings from the environment.
//! - Keep defaults in one place.
//!
//! # Invariants
//! - Resolution never panics; malformed values are reported, not ignored.
//! - Empty variables count as unset.

use crate::command::SessionBehavior;
use crate::logging::default_log_level;
use crate::service::executor::ExecutorConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "VERSIONING_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "VERSIONING_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "VERSIONING_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "VERSIONING_BUSY_TIMEOUT_MS";
pub const ENV_MAX_ATTEMPTS: &str = "VERSIONING_MAX_ATTEMPTS";
pub const ENV_SESSION_BEHAVIOR: &str = "VERSIONING_SESSION_BEHAVIOR";

const DEFAULT_DB_FILE_NAME: &str = "versioning.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Configuration resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    InvalidValue { key: &'static str, value: String },
    /// Variable parses but lies outside the accepted range.
    OutOfRange {
        key: &'static str,
        value: String,
        max: u64,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::OutOfRange { key, value, max } => {
                write!(f, "value `{value}` for {key} must be between 1 and {max}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` keeps file logging off.
    pub log_dir: Option<PathBuf>,
    pub executor: ExecutorConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            executor: ExecutorConfig {
                busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
                ..ExecutorConfig::default()
            },
        }
    }
}

impl CoreConfig {
    /// Resolves settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis = raw
                .parse::<u64>()
                .map_err(|_| invalid(ENV_BUSY_TIMEOUT_MS, &raw))?;
            config.executor.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = read(ENV_MAX_ATTEMPTS) {
            let attempts = raw
                .parse::<u32>()
                .map_err(|_| invalid(ENV_MAX_ATTEMPTS, &raw))?;
            if attempts == 0 || attempts > MAX_ATTEMPTS_LIMIT {
                return Err(ConfigError::OutOfRange {
                    key: ENV_MAX_ATTEMPTS,
                    value: raw,
                    max: u64::from(MAX_ATTEMPTS_LIMIT),
                });
            }
            config.executor.max_attempts = attempts;
        }
        if let Some(raw) = read(ENV_SESSION_BEHAVIOR) {
            config.executor.behavior =
                SessionBehavior::parse(&raw).ok_or_else(|| invalid(ENV_SESSION_BEHAVIOR, &raw))?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}
