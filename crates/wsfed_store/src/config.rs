//! Store and logging configuration.
//!
//! # Responsibility
//! - Describe where the relying party database lives and how connections are
//!   tuned, in a shape hosts can deserialize from their own config files.
//! - Reject unusable values before any connection is opened.
//!
//! # Invariants
//! - A validated `StoreConfig` never points at an empty file path.
//! - A validated `LoggingConfig` has a known level and an absolute directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("database path cannot be empty")]
    EmptyDatabasePath,
    #[error("busy_timeout_ms must be greater than zero")]
    ZeroBusyTimeout,
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    UnsupportedLogLevel(String),
    #[error("log_dir cannot be empty")]
    EmptyLogDir,
    #[error("log_dir must be an absolute path, got `{0}`")]
    RelativeLogDir(String),
}

/// Location of the backing SQLite database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseLocation {
    /// Database file on disk, created when missing.
    File { path: PathBuf },
    /// Private in-memory database, discarded when the context is dropped.
    InMemory,
}

/// Options for opening a configuration context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database: DatabaseLocation,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseLocation::InMemory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Config for a database file at `path` with default tuning.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseLocation::File { path: path.into() },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let DatabaseLocation::File { path } = &self.database {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDatabasePath);
            }
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }
        Ok(())
    }
}

/// Options for [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level_owned")]
    pub level: String,
    pub log_dir: PathBuf,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Returns the canonical level name and the log directory.
    pub fn normalized(&self) -> ConfigResult<(&'static str, &Path)> {
        Ok((normalize_level(&self.level)?, normalize_log_dir(&self.log_dir)?))
    }
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn default_log_level_owned() -> String {
    default_log_level().to_string()
}

fn normalize_level(level: &str) -> ConfigResult<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(ConfigError::UnsupportedLogLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> ConfigResult<&Path> {
    if log_dir.as_os_str().is_empty() {
        return Err(ConfigError::EmptyLogDir);
    }
    if !log_dir.is_absolute() {
        return Err(ConfigError::RelativeLogDir(log_dir.display().to_string()));
    }
    Ok(log_dir)
}
