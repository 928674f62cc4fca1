//! Read-only query validation.
//!
//! A static gate in front of the database connection: it accepts read-only
//! analytical SQL (joins, CTEs, aggregates, unions, subqueries) and rejects
//! write statements and known injection idioms without parsing SQL.

use super::identifiers;
use super::injection::InjectionDetector;
use crate::constants::DEFAULT_MAX_QUERY_LENGTH;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keywords that denote mutation or schema change.
pub const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE", "MERGE",
    "GRANT", "REVOKE", "EXEC", "EXECUTE", "CALL",
];

/// Read-oriented keywords expected in analytical queries.
///
/// Advisory only. Enforcing this as an allow-list would reject functions
/// and operators that are not enumerated here.
pub const ALLOWED_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "CROSS", "ON", "AND",
    "OR", "NOT", "IN", "BETWEEN", "LIKE", "IS", "NULL", "ORDER", "BY", "ASC", "DESC", "LIMIT",
    "OFFSET", "GROUP", "HAVING", "DISTINCT", "AS", "CASE", "WHEN", "THEN", "ELSE", "END", "CAST",
    "COALESCE", "COUNT", "SUM", "AVG", "MIN", "MAX", "ROUND", "UPPER", "LOWER", "SUBSTR",
    "LENGTH", "TRIM", "DATE", "YEAR", "MONTH", "DAY", "WITH", "UNION", "EXCEPT", "INTERSECT",
];

/// Leading statement kind: plain SELECT or a CTE.
static STATEMENT_KIND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(SELECT|WITH)\b")
        .unwrap_or_else(|e| panic!("Internal error: invalid statement pattern: {}", e))
});

/// Whole-word disjunction of [`WRITE_KEYWORDS`].
static WRITE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\b(?:{})\b", WRITE_KEYWORDS.join("|"));
    Regex::new(&pattern)
        .unwrap_or_else(|e| panic!("Internal error: invalid write keyword pattern: {}", e))
});

/// Why a query was refused.
///
/// The `Display` text is the reason string reported by [`SqlValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty query")]
    Empty,

    #[error("query exceeds maximum length of {max_length} characters")]
    TooLong { max_length: usize },

    #[error("query must start with SELECT or WITH")]
    WrongLeadingKeyword,

    #[error("write operation detected: {keyword}")]
    WriteOperation { keyword: String },

    #[error("potential SQL injection pattern detected")]
    InjectionPattern,

    #[error("multiple statements not allowed")]
    MultipleStatements,

    #[error("semicolon only allowed at end of query")]
    MisplacedSemicolon,
}

impl Rejection {
    /// Short machine-readable category name.
    pub fn category(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty_query",
            Rejection::TooLong { .. } => "length_exceeded",
            Rejection::WrongLeadingKeyword => "wrong_leading_keyword",
            Rejection::WriteOperation { .. } => "write_operation",
            Rejection::InjectionPattern => "injection_pattern",
            Rejection::MultipleStatements => "multiple_statements",
            Rejection::MisplacedSemicolon => "misplaced_semicolon",
        }
    }
}

/// Verdict of a validation: a flag plus a reason that is empty when valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the query may be executed
    pub is_valid: bool,
    /// Human-readable rejection reason, empty when valid
    pub reason: String,
}

impl ValidationResult {
    /// An accepting verdict.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: String::new(),
        }
    }

    /// A rejecting verdict.
    pub fn rejected(rejection: &Rejection) -> Self {
        Self {
            is_valid: false,
            reason: rejection.to_string(),
        }
    }

    /// Split into the `(is_valid, reason)` pair.
    pub fn into_parts(self) -> (bool, String) {
        (self.is_valid, self.reason)
    }
}

impl From<Result<(), Rejection>> for ValidationResult {
    fn from(outcome: Result<(), Rejection>) -> Self {
        match outcome {
            Ok(()) => Self::valid(),
            Err(rejection) => Self::rejected(&rejection),
        }
    }
}

/// Read-only SQL validator.
///
/// Holds no mutable state; one instance can be shared across threads and
/// reused for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    max_query_length: usize,
    injection: InjectionDetector,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUERY_LENGTH)
    }
}

impl SqlValidator {
    /// Create a validator, compiling every pattern up front.
    pub fn new(max_query_length: usize) -> Self {
        Lazy::force(&STATEMENT_KIND);
        Lazy::force(&WRITE_PATTERN);

        Self {
            max_query_length,
            injection: InjectionDetector::new(),
        }
    }

    /// Maximum accepted query length in characters.
    pub fn max_query_length(&self) -> usize {
        self.max_query_length
    }

    /// Validate a query, reporting the verdict as data.
    ///
    /// Never panics and never errors: every outcome is a [`ValidationResult`].
    pub fn validate(&self, sql: &str) -> ValidationResult {
        self.check(sql).into()
    }

    /// Validate a query, returning the first failing check.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// emptiness, length, leading keyword, write keywords, injection
    /// signatures, then semicolon placement.
    pub fn check(&self, sql: &str) -> Result<(), Rejection> {
        let normalized = sql.trim();
        if normalized.is_empty() {
            return Err(Rejection::Empty);
        }

        // Before any regex pass.
        if exceeds_length(sql, self.max_query_length) {
            debug!(max_length = self.max_query_length, "Rejected over-long query");
            return Err(Rejection::TooLong {
                max_length: self.max_query_length,
            });
        }

        if !STATEMENT_KIND.is_match(normalized) {
            debug!(
                query = %crate::truncate_for_log(normalized),
                "Rejected query with wrong leading keyword"
            );
            return Err(Rejection::WrongLeadingKeyword);
        }

        // Matches inside string literals too.
        if let Some(found) = WRITE_PATTERN.find(normalized) {
            debug!(keyword = found.as_str(), "Rejected write operation");
            return Err(Rejection::WriteOperation {
                keyword: found.as_str().to_string(),
            });
        }

        if let Some(signature) = self.injection.detect(normalized) {
            debug!(
                signature,
                query = %crate::truncate_for_log(normalized),
                "Rejected query matching injection signature"
            );
            return Err(Rejection::InjectionPattern);
        }

        match normalized.matches(';').count() {
            0 => {}
            1 if normalized.ends_with(';') => {}
            1 => return Err(Rejection::MisplacedSemicolon),
            _ => return Err(Rejection::MultipleStatements),
        }

        Ok(())
    }

    /// See [`identifiers::sanitize_identifier`].
    pub fn sanitize_identifier(&self, identifier: &str) -> String {
        identifiers::sanitize_identifier(identifier)
    }

    /// See [`identifiers::is_safe_identifier`].
    pub fn is_safe_identifier(&self, identifier: &str) -> bool {
        identifiers::is_safe_identifier(identifier)
    }
}

/// Character-length bound without counting short inputs.
fn exceeds_length(sql: &str, max_length: usize) -> bool {
    sql.len() > max_length && sql.chars().count() > max_length
}
