//! Query execution and result handling.
//!
//! Every statement goes through the [`SqlValidator`] first; a rejected query
//! never reaches the connection.

use crate::config::QueryConfig;
use crate::constants::PROGRESS_HANDLER_OPS;
use crate::database::types::SqlValue;
use crate::database::Database;
use crate::error::GuardError;
use crate::security::SqlValidator;
use crate::truncate_for_log;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use rusqlite::{Connection, Params};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static LIMIT_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bLIMIT\b")
        .unwrap_or_else(|e| panic!("Internal error: invalid limit pattern: {}", e))
});

/// A single row of query results, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRow {
    pub values: Vec<SqlValue>,
}

impl ResultRow {
    /// Create a new result row.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Get a value by column position.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }
}

/// Result of a query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in order.
    pub columns: Vec<String>,

    /// Result rows.
    pub rows: Vec<ResultRow>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,

    /// Whether results were truncated due to row limit.
    pub truncated: bool,
}

impl QueryResult {
    /// Create an empty query result.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0,
            truncated: false,
        }
    }

    /// Number of rows returned.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over one column's values.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &SqlValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(&row.values)
                    .map(|(name, value)| {
                        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                        (name.clone(), json)
                    })
                    .collect()
            })
            .collect()
    }

    /// Format the rows as a pretty-printed JSON array of objects.
    pub fn to_json(&self) -> Result<String, GuardError> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    /// Format the result as CSV.
    pub fn to_csv(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut output = String::new();

        // Header row
        let headers: Vec<String> = self.columns.iter().map(|c| escape_csv(c)).collect();
        output.push_str(&headers.join(","));
        output.push('\n');

        // Data rows
        for row in &self.rows {
            let values: Vec<String> = row
                .values
                .iter()
                .map(|v| match v {
                    SqlValue::Null => String::new(),
                    other => escape_csv(&other.to_display_string()),
                })
                .collect();
            output.push_str(&values.join(","));
            output.push('\n');
        }

        output
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Outcome of a dry-run validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One executed query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The statement as executed, including any appended LIMIT.
    pub query: String,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub executed_at: DateTime<Utc>,
}

/// Query executor for running validated SQL.
pub struct QueryExecutor {
    db: Database,
    validator: SqlValidator,
    config: QueryConfig,
    history: RwLock<VecDeque<HistoryEntry>>,
}

impl QueryExecutor {
    /// Create a new query executor.
    pub fn new(db: Database, validator: SqlValidator, config: QueryConfig) -> Self {
        Self {
            db,
            validator,
            config,
            history: RwLock::new(VecDeque::new()),
        }
    }

    /// The validator gating this executor.
    pub fn validator(&self) -> &SqlValidator {
        &self.validator
    }

    /// Validate a query without executing it.
    pub fn validate_query(&self, sql: &str) -> ValidationReport {
        let (is_valid, reason) = self.validator.validate(sql).into_parts();
        ValidationReport {
            is_valid,
            query: sql.to_string(),
            error: (!is_valid).then_some(reason),
        }
    }

    /// Validate, bound and execute a query.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, GuardError> {
        if let Err(rejection) = self.validator.check(sql) {
            warn!(
                reason = %rejection,
                "Refusing query: {}",
                truncate_for_log(sql.trim())
            );
            return Err(rejection.into());
        }

        let query = self.ensure_limit(sql);
        debug!("Executing query: {}", truncate_for_log(&query));

        let start = Instant::now();
        let timeout = self.config.timeout;
        let deadline = start + timeout;
        let db = self.db.clone();
        let max_rows = self.config.max_rows;
        let statement = query.clone();
        let task = tokio::task::spawn_blocking(move || {
            db.with_connection(|conn| {
                fetch_rows_before(conn, &statement, max_rows, deadline, timeout)
            })
        });

        let outcome = tokio::time::timeout(timeout, task).await;
        let fetched = match outcome {
            Ok(joined) => {
                joined.map_err(|e| GuardError::internal(format!("Query task failed: {}", e)))?
            }
            // The task gives up on its own once it sees the deadline.
            Err(_) => Err(GuardError::timeout(timeout)),
        };
        let (columns, rows, truncated) = fetched.map_err(|e| {
            if matches!(e, GuardError::Timeout { .. }) {
                warn!(
                    "Query timed out after {:?}: {}",
                    timeout,
                    truncate_for_log(&query)
                );
            }
            e
        })?;

        let result = QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
            truncated,
        };

        debug!(
            "Query completed: {} rows in {} ms",
            result.row_count(),
            result.execution_time_ms
        );

        self.record(HistoryEntry {
            query,
            row_count: result.row_count(),
            execution_time_ms: result.execution_time_ms,
            executed_at: Utc::now(),
        });

        Ok(result)
    }

    /// Append `LIMIT max_rows` unless the query already has a LIMIT.
    ///
    /// A terminal semicolon stays terminal.
    pub fn ensure_limit(&self, sql: &str) -> String {
        if LIMIT_CLAUSE.is_match(sql) {
            return sql.to_string();
        }

        let trimmed = sql.trim_end();
        let (body, terminator) = match trimmed.strip_suffix(';') {
            Some(body) => (body.trim_end(), ";"),
            None => (trimmed, ""),
        };

        // A trailing line comment would swallow the clause.
        let separator = match body.lines().last() {
            Some(line) if line.contains("--") => "\n",
            _ => " ",
        };

        format!(
            "{}{}LIMIT {}{}",
            body, separator, self.config.max_rows, terminator
        )
    }

    /// Most recent executed queries, oldest first.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let history = self.history.read();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Forget all executed queries.
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    fn record(&self, entry: HistoryEntry) {
        if self.config.history_size == 0 {
            return;
        }
        let mut history = self.history.write();
        while history.len() >= self.config.history_size {
            history.pop_front();
        }
        history.push_back(entry);
    }
}

/// Run a statement under a deadline.
///
/// A statement still queued for the connection when the deadline passes is
/// never started; a running one is aborted through the progress handler.
fn fetch_rows_before(
    conn: &Connection,
    sql: &str,
    max_rows: usize,
    deadline: Instant,
    timeout: Duration,
) -> Result<(Vec<String>, Vec<ResultRow>, bool), GuardError> {
    if Instant::now() >= deadline {
        return Err(GuardError::timeout(timeout));
    }

    conn.progress_handler(
        PROGRESS_HANDLER_OPS,
        Some(move || Instant::now() >= deadline),
    );
    let outcome = fetch_rows(conn, sql, [], max_rows);
    conn.progress_handler(PROGRESS_HANDLER_OPS, None::<fn() -> bool>);

    match outcome {
        Err(GuardError::QueryExecution(_)) if Instant::now() >= deadline => {
            Err(GuardError::timeout(timeout))
        }
        other => other,
    }
}

/// Run a statement and collect at most `max_rows` rows.
///
/// Returns the column names, the rows and whether rows were left unread.
pub(crate) fn fetch_rows<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    max_rows: usize,
) -> Result<(Vec<String>, Vec<ResultRow>, bool), GuardError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(params)?;
    let mut collected = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows.next()? {
        if collected.len() >= max_rows {
            truncated = true;
            break;
        }
        let values = (0..width)
            .map(|idx| row.get_ref(idx).map(SqlValue::from))
            .collect::<Result<Vec<_>, _>>()?;
        collected.push(ResultRow::new(values));
    }

    Ok((columns, collected, truncated))
}
