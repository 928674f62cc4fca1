//! Configuration management for sql-guard.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.

use crate::constants::{
    DEFAULT_BUSY_TIMEOUT, DEFAULT_HISTORY_SIZE, DEFAULT_MAX_QUERY_LENGTH,
    DEFAULT_MAX_RESULT_ROWS, DEFAULT_QUERY_TIMEOUT, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_SAMPLE_VALUES,
};
use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database location
    pub database: DatabaseConfig,

    /// Validator configuration
    pub security: SecurityConfig,

    /// Query execution configuration
    pub query: QueryConfig,

    /// Schema discovery configuration
    pub schema: SchemaConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: Option<PathBuf>,

    /// How long to wait on a locked database file
    pub busy_timeout: Duration,
}

/// Validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum query length (characters)
    pub max_query_length: usize,
}

/// Query execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum result rows per query, also the appended LIMIT
    pub max_rows: usize,

    /// Query timeout
    pub timeout: Duration,

    /// Number of executed queries kept in history
    pub history_size: usize,
}

/// Schema discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Sample values kept per column in the data dictionary
    pub sample_values: usize,

    /// JSON file the data dictionary is cached in across runs
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SQL_GUARD_DATABASE`: SQLite database path
    /// - `SQL_GUARD_MAX_QUERY_LENGTH`: Maximum query length (default: 10000)
    /// - `SQL_GUARD_MAX_ROWS`: Maximum result rows (default: 10000)
    /// - `SQL_GUARD_QUERY_TIMEOUT`: Query timeout in seconds (default: 30)
    /// - `SQL_GUARD_HISTORY_SIZE`: Query history size (default: 100)
    /// - `SQL_GUARD_SAMPLE_VALUES`: Sample values per column (default: 5)
    /// - `SQL_GUARD_DICTIONARY_CACHE`: Data dictionary cache file (default: none)
    pub fn from_env() -> Result<Self, GuardError> {
        let path = env_path("SQL_GUARD_DATABASE");
        let cache_path = env_path("SQL_GUARD_DICTIONARY_CACHE");

        let max_query_length = env_or("SQL_GUARD_MAX_QUERY_LENGTH", DEFAULT_MAX_QUERY_LENGTH);
        let max_rows = env_or("SQL_GUARD_MAX_ROWS", DEFAULT_MAX_RESULT_ROWS);
        let timeout_secs = env_or("SQL_GUARD_QUERY_TIMEOUT", DEFAULT_QUERY_TIMEOUT_SECS);
        let history_size = env_or("SQL_GUARD_HISTORY_SIZE", DEFAULT_HISTORY_SIZE);
        let sample_values = env_or("SQL_GUARD_SAMPLE_VALUES", DEFAULT_SAMPLE_VALUES);

        let config = Config {
            database: DatabaseConfig {
                path,
                busy_timeout: DEFAULT_BUSY_TIMEOUT,
            },
            security: SecurityConfig { max_query_length },
            query: QueryConfig {
                max_rows,
                timeout: Duration::from_secs(timeout_secs),
                history_size,
            },
            schema: SchemaConfig {
                sample_values,
                cache_path,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every query fail.
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.security.max_query_length == 0 {
            return Err(GuardError::config("max_query_length must be positive"));
        }
        if self.query.max_rows == 0 {
            return Err(GuardError::config("max_rows must be positive"));
        }
        if self.query.timeout.is_zero() {
            return Err(GuardError::config("query timeout must be positive"));
        }
        Ok(())
    }

    /// Get the database path, failing when none is configured.
    pub fn database_path(&self) -> Result<&PathBuf, GuardError> {
        self.database.path.as_ref().ok_or_else(|| {
            GuardError::config("No database configured: pass --database or set SQL_GUARD_DATABASE")
        })
    }
}

/// Path from an environment variable; blank counts as unset.
fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_RESULT_ROWS,
            timeout: DEFAULT_QUERY_TIMEOUT,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sample_values: DEFAULT_SAMPLE_VALUES,
            cache_path: None,
        }
    }
}
