//! # SQL Guard
//!
//! A read-only SQL gate for LLM-generated queries.
//!
//! This crate provides:
//! - **Validation**: Reject anything that is not a single read statement
//! - **Execution**: Run validated queries against a read-only SQLite database
//! - **Discovery**: Introspect tables and columns, build a data dictionary
//! - **Export**: Render results as CSV, JSON or Markdown
//! - **Insights**: Suggest charts and summarize findings for a result
//!
//! ## Quick start
//!
//! ```
//! use sql_guard::SqlValidator;
//!
//! let validator = SqlValidator::new(10_000);
//! assert!(validator.validate("SELECT name FROM countries").is_valid);
//!
//! let result = validator.validate("SELECT * FROM countries; DELETE FROM countries");
//! assert!(!result.is_valid);
//! assert_eq!(result.reason, "write operation detected: DELETE");
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod export;
pub mod insights;
pub mod security;

pub use cache::SchemaCache;
pub use config::Config;
pub use error::GuardError;
pub use security::{Rejection, SqlValidator, ValidationResult};

use constants::LOG_QUERY_TRUNCATE_LENGTH;

/// Truncate a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str) -> String {
    match s.char_indices().nth(LOG_QUERY_TRUNCATE_LENGTH) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("SELECT 1"), "SELECT 1");

        let long = "é".repeat(LOG_QUERY_TRUNCATE_LENGTH + 5);
        let truncated = truncate_for_log(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), LOG_QUERY_TRUNCATE_LENGTH + 3);
    }
}
