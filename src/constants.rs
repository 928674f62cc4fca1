//! Centralized constants for sql-guard.
//!
//! This module contains all magic numbers and default values used throughout
//! the codebase, making them easy to find, understand, and modify.

use std::time::Duration;

// =============================================================================
// Validation Constants
// =============================================================================

/// Default maximum query length in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default query timeout as Duration.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

/// Virtual machine steps between deadline checks of a running statement.
pub const PROGRESS_HANDLER_OPS: i32 = 1_000;

/// How long SQLite waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Result Size Constants
// =============================================================================

/// Default maximum result rows.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 10_000;

/// Default number of executed queries kept in history.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

// =============================================================================
// Schema Discovery Constants
// =============================================================================

/// Default number of sample values stored per column in the data dictionary.
pub const DEFAULT_SAMPLE_VALUES: usize = 5;

/// Upper bound on sample rows returned for a table.
pub const MAX_SAMPLE_ROWS: usize = 10;

/// Sample rows shown in table details.
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Default number of distinct values returned for a column.
pub const DEFAULT_COLUMN_VALUES_LIMIT: usize = 100;

/// Data dictionary format version.
pub const DATA_DICTIONARY_VERSION: &str = "1.0";

/// Columns with at most this many distinct values list their samples in the
/// Markdown data dictionary.
pub const MARKDOWN_SAMPLE_MAX_DISTINCT: i64 = 20;

// =============================================================================
// Export Constants
// =============================================================================

/// Maximum rows rendered in a markdown export.
pub const MARKDOWN_EXPORT_MAX_ROWS: usize = 100;

/// Cell values longer than this are truncated in markdown exports.
pub const MARKDOWN_CELL_MAX_CHARS: usize = 50;

/// Text columns with at most this many unique values list them in summaries.
pub const SUMMARY_MAX_UNIQUE_VALUES: usize = 10;

// =============================================================================
// Insight Constants
// =============================================================================

/// Maximum chart suggestions returned for one result.
pub const MAX_CHART_SUGGESTIONS: usize = 5;

/// Pie charts are only suggested up to this many categories.
pub const PIE_CHART_MAX_CATEGORIES: usize = 10;

/// Entries listed in top and bottom rankings.
pub const RANKING_SIZE: usize = 5;

/// Interquartile range multiplier for outlier detection.
pub const OUTLIER_IQR_FACTOR: f64 = 1.5;

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for query logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 100;
