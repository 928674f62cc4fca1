//! Error types for sql-guard.
//!
//! Validation rejections are data, not faults: the validator reports them
//! through [`ValidationResult`](crate::security::ValidationResult). They only
//! become a [`GuardError`] when a caller tries to execute a rejected query.

use crate::security::Rejection;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Domain-specific errors for sql-guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database open/connection error
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query was refused by the read-only gate
    #[error("Query validation failed: {0}")]
    Rejected(#[from] Rejection),

    /// Query execution error
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Query timeout
    #[error("Query timeout: operation exceeded {timeout:?}")]
    Timeout { timeout: Duration },

    /// Object not found (table, column)
    #[error("{object_type} not found: {name}")]
    ObjectNotFound { object_type: String, name: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a database error with a source.
    pub fn database_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query execution error.
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Create an object not found error.
    pub fn object_not_found(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            object_type: object_type.into(),
            name: name.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The validation rejection behind this error, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your environment variables and command-line flags"),
            Self::Database { .. } => Some("Check the database path and file permissions"),
            Self::Rejected(Rejection::WriteOperation { .. }) => {
                Some("Only read-only SELECT queries are permitted")
            }
            Self::Rejected(Rejection::InjectionPattern) => {
                Some("Remove comments, tautologies and delay functions from the query")
            }
            Self::Rejected(_) => Some("Submit a single SELECT or WITH statement"),
            Self::Timeout { .. } => Some("Try a simpler query or add a more selective WHERE clause"),
            Self::ObjectNotFound { .. } => Some("List the available tables with the schema command"),
            Self::InvalidInput(_) => {
                Some("Identifiers may only contain letters, digits and underscores")
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GuardError {
    fn from(e: rusqlite::Error) -> Self {
        let code = match &e {
            rusqlite::Error::SqliteFailure(err, _) => Some(err.code),
            _ => None,
        };

        match code {
            Some(rusqlite::ErrorCode::CannotOpen) => {
                GuardError::database_with_source("Unable to open database file", e)
            }
            Some(rusqlite::ErrorCode::OperationInterrupted) => {
                GuardError::query_error("Query was interrupted")
            }
            _ => GuardError::query_error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display_is_wrapped() {
        let err = GuardError::from(Rejection::MultipleStatements);
        assert_eq!(
            err.to_string(),
            "Query validation failed: multiple statements not allowed"
        );
        assert_eq!(err.rejection(), Some(&Rejection::MultipleStatements));
    }

    #[test]
    fn test_suggestions() {
        let write = GuardError::from(Rejection::WriteOperation {
            keyword: "DROP".to_string(),
        });
        assert_eq!(
            write.suggestion(),
            Some("Only read-only SELECT queries are permitted")
        );
        assert!(GuardError::timeout(Duration::from_secs(30))
            .suggestion()
            .is_some());
        assert!(GuardError::internal("boom").suggestion().is_none());
    }

    #[test]
    fn test_object_not_found_message() {
        let err = GuardError::object_not_found("Table", "missing");
        assert_eq!(err.to_string(), "Table not found: missing");
        assert!(err.rejection().is_none());
    }

    #[test]
    fn test_sub_second_timeout_message() {
        let err = GuardError::timeout(Duration::from_millis(500));
        assert_eq!(
            err.to_string(),
            "Query timeout: operation exceeded 500ms"
        );
        assert_eq!(
            GuardError::timeout(Duration::from_secs(30)).to_string(),
            "Query timeout: operation exceeded 30s"
        );
    }

    #[test]
    fn test_from_sqlite_error() {
        let err: GuardError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, GuardError::QueryExecution(_)));
    }
}
