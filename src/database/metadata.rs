//! SQLite schema introspection and the data dictionary.
//!
//! Catalog lookups bind names as parameters. Where a table or column name has
//! to be spliced into SQL it is gated by [`quote_identifier`] first.

use crate::constants::{
    DATA_DICTIONARY_VERSION, DEFAULT_SAMPLE_ROWS, MARKDOWN_SAMPLE_MAX_DISTINCT, MAX_SAMPLE_ROWS,
};
use crate::database::query::{fetch_rows, QueryResult};
use crate::database::types::SqlValue;
use crate::database::Database;
use crate::error::GuardError;
use crate::security::{is_safe_identifier, quote_identifier};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Column metadata as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

/// Column metadata with statistics, as kept in the data dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sample_values: Vec<SqlValue>,
    pub distinct_count: Option<i64>,
    #[serde(default)]
    pub null_count: Option<i64>,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Detailed view of one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableDetails {
    pub name: String,
    pub row_count: i64,
    pub columns: Vec<ColumnDetails>,
    pub sample: QueryResult,
}

/// A column with its distinct value count.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDetails {
    #[serde(flatten)]
    pub column: TableColumn,
    pub distinct_values: Option<i64>,
}

/// A distinct column value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: SqlValue,
    pub count: i64,
}

/// A column whose name matched a search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMatch {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

/// Snapshot of the database schema with per-column samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    pub database: String,
    pub tables: Vec<TableInfo>,
    pub generated_at: DateTime<Utc>,
    pub version: String,
}

impl DataDictionary {
    /// Look up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Total number of columns across all tables.
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Copy non-empty table and column descriptions over from `previous`.
    ///
    /// Descriptions are hand-written into a saved dictionary; a rebuild
    /// would otherwise drop them.
    pub fn merge_descriptions(&mut self, previous: &DataDictionary) {
        for table in &mut self.tables {
            let Some(old) = previous.get_table(&table.name) else {
                continue;
            };
            if table.description.is_empty() {
                table.description = old.description.clone();
            }
            for column in &mut table.columns {
                if !column.description.is_empty() {
                    continue;
                }
                if let Some(old_column) = old.columns.iter().find(|c| c.name == column.name) {
                    column.description = old_column.description.clone();
                }
            }
        }
    }

    /// Markdown schema description for a language model prompt.
    pub fn to_llm_context(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.database),
            String::new(),
            "## Available Tables".to_string(),
            String::new(),
        ];

        for table in &self.tables {
            lines.push(format!("### {}", table.name));
            lines.push(format!("**Rows:** {}", format_thousands(table.row_count)));
            lines.push(String::new());
            lines.push("| Column | Type | Sample Values |".to_string());
            lines.push("|--------|------|---------------|".to_string());

            for col in &table.columns {
                let mut samples = col
                    .sample_values
                    .iter()
                    .take(3)
                    .map(SqlValue::to_display_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                if col.sample_values.len() > 3 {
                    samples.push_str("...");
                }
                let pk = if col.primary_key { " (PK)" } else { "" };
                lines.push(format!(
                    "| {}{} | {} | {} |",
                    col.name, pk, col.data_type, samples
                ));
            }

            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Full Markdown documentation of the dictionary.
    pub fn to_markdown(&self) -> String {
        let total_rows: i64 = self.tables.iter().map(|t| t.row_count).sum();
        let mut lines = vec![
            format!("# {} - Data Dictionary", self.database),
            String::new(),
            format!("*Generated: {}*", self.generated_at.to_rfc3339()),
            String::new(),
            "## Overview".to_string(),
            String::new(),
            format!("**Total Tables:** {}", self.tables.len()),
            format!("**Total Columns:** {}", self.column_count()),
            format!("**Total Rows:** {}", format_thousands(total_rows)),
            String::new(),
            "---".to_string(),
            String::new(),
        ];

        for table in &self.tables {
            lines.push(format!("## {}", table.name));
            lines.push(String::new());
            if !table.description.is_empty() {
                lines.push(format!("> {}", table.description));
                lines.push(String::new());
            }
            lines.push(format!(
                "**Row Count:** {}",
                format_thousands(table.row_count)
            ));
            lines.push(String::new());
            lines.push("### Columns".to_string());
            lines.push(String::new());
            lines.push("| Column | Type | Nullable | Nulls | Description |".to_string());
            lines.push("|--------|------|----------|-------|-------------|".to_string());

            for col in &table.columns {
                let pk = if col.primary_key { " **(PK)**" } else { "" };
                let nullable = if col.nullable { "Yes" } else { "No" };
                let nulls = col
                    .null_count
                    .map(format_thousands)
                    .unwrap_or_default();
                lines.push(format!(
                    "| {}{} | `{}` | {} | {} | {} |",
                    col.name, pk, col.data_type, nullable, nulls, col.description
                ));
            }
            lines.push(String::new());

            // Only low-cardinality columns; samples of an ID column say nothing.
            let categorical: Vec<_> = table
                .columns
                .iter()
                .filter(|c| !c.sample_values.is_empty())
                .filter(|c| {
                    c.distinct_count
                        .is_some_and(|n| n > 0 && n <= MARKDOWN_SAMPLE_MAX_DISTINCT)
                })
                .collect();
            if !categorical.is_empty() {
                lines.push("### Sample Values".to_string());
                lines.push(String::new());
                for col in categorical {
                    let values = col
                        .sample_values
                        .iter()
                        .map(|v| format!("`{}`", v.to_display_string()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    lines.push(format!("- **{}**: {}", col.name, values));
                }
                lines.push(String::new());
            }

            lines.push("---".to_string());
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String, GuardError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the dictionary to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GuardError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a dictionary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Schema discovery over a read-only [`Database`].
#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    db: Database,
}

impl SchemaIntrospector {
    /// Create an introspector for a database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// User tables and views, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>, GuardError> {
        self.db.with_connection(list_tables)
    }

    /// Column metadata for a table.
    pub fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>, GuardError> {
        self.db.with_connection(|conn| {
            ensure_table(conn, table)?;
            list_columns(conn, table)
        })
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: &str) -> Result<i64, GuardError> {
        self.db.with_connection(|conn| {
            ensure_table(conn, table)?;
            count_rows(conn, table)
        })
    }

    /// Up to `limit` rows of a table, never more than [`MAX_SAMPLE_ROWS`].
    pub fn sample_rows(&self, table: &str, limit: usize) -> Result<QueryResult, GuardError> {
        self.db.with_connection(|conn| {
            ensure_table(conn, table)?;
            sample(conn, table, limit)
        })
    }

    /// Distinct non-null values of a column with counts, most frequent first.
    pub fn column_values(
        &self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Vec<ValueCount>, GuardError> {
        self.db.with_connection(|conn| {
            ensure_column(conn, table, column)?;
            let t = quote_identifier(table)?;
            let c = quote_identifier(column)?;
            let sql = format!(
                "SELECT {c}, COUNT(*) AS count FROM {t} WHERE {c} IS NOT NULL \
                 GROUP BY {c} ORDER BY count DESC, {c} LIMIT ?1"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(ValueCount {
                    value: SqlValue::from(row.get_ref(0)?),
                    count: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Columns whose name contains `term`, case-insensitively.
    pub fn search_columns(&self, term: &str) -> Result<Vec<ColumnMatch>, GuardError> {
        let needle = term.to_lowercase();
        self.db.with_connection(|conn| {
            let mut matches = Vec::new();
            for table in list_tables(conn)? {
                for column in list_columns(conn, &table)? {
                    if column.name.to_lowercase().contains(&needle) {
                        matches.push(ColumnMatch {
                            table: table.clone(),
                            column: column.name,
                            data_type: column.data_type,
                        });
                    }
                }
            }
            Ok(matches)
        })
    }

    /// Columns, distinct counts and sample rows of one table.
    pub fn describe_table(&self, table: &str) -> Result<TableDetails, GuardError> {
        self.db.with_connection(|conn| {
            ensure_table(conn, table)?;
            let row_count = count_rows(conn, table)?;

            let columns = list_columns(conn, table)?
                .into_iter()
                .map(|column| {
                    let distinct_values = distinct_count(conn, table, &column.name).ok();
                    ColumnDetails {
                        column,
                        distinct_values,
                    }
                })
                .collect();

            Ok(TableDetails {
                name: table.to_string(),
                row_count,
                columns,
                sample: sample(conn, table, DEFAULT_SAMPLE_ROWS)?,
            })
        })
    }

    /// Build a data dictionary with up to `sample_values` samples per column.
    pub fn build_dictionary(&self, sample_values: usize) -> Result<DataDictionary, GuardError> {
        let start = Instant::now();
        let tables = self.db.with_connection(|conn| {
            let mut tables = Vec::new();
            for name in list_tables(conn)? {
                if !is_safe_identifier(&name) {
                    warn!("Skipping table with unquotable name: {:?}", name);
                    continue;
                }
                tables.push(describe_for_dictionary(conn, name, sample_values)?);
            }
            Ok(tables)
        })?;

        info!(
            "Built data dictionary: {} tables in {} ms",
            tables.len(),
            start.elapsed().as_millis()
        );

        Ok(DataDictionary {
            database: self.db.label().to_string(),
            tables,
            generated_at: Utc::now(),
            version: DATA_DICTIONARY_VERSION.to_string(),
        })
    }
}

/// Catalog filter for the objects that can be queried: tables and views,
/// without SQLite's internal tables.
const USER_RELATIONS: &str = "type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'";

fn list_tables(conn: &Connection) -> Result<Vec<String>, GuardError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name FROM sqlite_master WHERE {USER_RELATIONS} ORDER BY name"
    ))?;
    let names = stmt.query_map([], |row| row.get(0))?;
    Ok(names.collect::<Result<Vec<String>, _>>()?)
}

fn list_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumn>, GuardError> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk \
         FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt.query_map([table], |row| {
        Ok(TableColumn {
            name: row.get(0)?,
            data_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            nullable: row.get::<_, i64>(2)? == 0,
            default_value: row.get(3)?,
            primary_key: row.get::<_, i64>(4)? > 0,
        })
    })?;
    Ok(columns.collect::<Result<Vec<_>, _>>()?)
}

fn ensure_table(conn: &Connection, table: &str) -> Result<(), GuardError> {
    let found: Option<String> = conn
        .query_row(
            &format!("SELECT name FROM sqlite_master WHERE {USER_RELATIONS} AND name = ?1"),
            [table],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(GuardError::object_not_found("Table", table)),
    }
}

fn ensure_column(conn: &Connection, table: &str, column: &str) -> Result<(), GuardError> {
    ensure_table(conn, table)?;
    if list_columns(conn, table)?.iter().any(|c| c.name == column) {
        Ok(())
    } else {
        Err(GuardError::object_not_found(
            "Column",
            format!("{}.{}", table, column),
        ))
    }
}

fn count_rows(conn: &Connection, table: &str) -> Result<i64, GuardError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

fn distinct_count(conn: &Connection, table: &str, column: &str) -> Result<i64, GuardError> {
    let sql = format!(
        "SELECT COUNT(DISTINCT {}) FROM {}",
        quote_identifier(column)?,
        quote_identifier(table)?
    );
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

fn null_count(conn: &Connection, table: &str, column: &str) -> Result<i64, GuardError> {
    let sql = format!(
        "SELECT COUNT(*) - COUNT({}) FROM {}",
        quote_identifier(column)?,
        quote_identifier(table)?
    );
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

fn sample(conn: &Connection, table: &str, limit: usize) -> Result<QueryResult, GuardError> {
    let limit = limit.min(MAX_SAMPLE_ROWS);
    let start = Instant::now();
    let sql = format!("SELECT * FROM {} LIMIT ?1", quote_identifier(table)?);
    let (columns, rows, truncated) = fetch_rows(conn, &sql, params![limit as i64], limit)?;
    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start.elapsed().as_millis() as u64,
        truncated,
    })
}

fn describe_for_dictionary(
    conn: &Connection,
    table: String,
    sample_values: usize,
) -> Result<TableInfo, GuardError> {
    let row_count = count_rows(conn, &table)?;
    let mut columns = Vec::new();

    for column in list_columns(conn, &table)? {
        // Unquotable column names keep their metadata but get no statistics.
        let (samples, distinct, nulls) =
            match column_samples(conn, &table, &column.name, sample_values) {
                Ok(samples) => (
                    samples,
                    distinct_count(conn, &table, &column.name).ok(),
                    null_count(conn, &table, &column.name).ok(),
                ),
                Err(e) => {
                    debug!("Skipping statistics for {}.{}: {}", table, column.name, e);
                    (Vec::new(), None, None)
                }
            };

        columns.push(ColumnInfo {
            name: column.name,
            data_type: column.data_type,
            nullable: column.nullable,
            primary_key: column.primary_key,
            description: String::new(),
            sample_values: samples,
            distinct_count: distinct,
            null_count: nulls,
        });
    }

    Ok(TableInfo {
        name: table,
        description: String::new(),
        row_count,
        columns,
    })
}

fn column_samples(
    conn: &Connection,
    table: &str,
    column: &str,
    limit: usize,
) -> Result<Vec<SqlValue>, GuardError> {
    let c = quote_identifier(column)?;
    let sql = format!(
        "SELECT DISTINCT {c} FROM {} WHERE {c} IS NOT NULL LIMIT ?1",
        quote_identifier(table)?
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt.query_map(params![limit as i64], |row| {
        Ok(SqlValue::from(row.get_ref(0)?))
    })?;
    Ok(values.collect::<Result<Vec<_>, _>>()?)
}

/// Format an integer with comma thousands separators.
pub(crate) fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn introspector() -> SchemaIntrospector {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE countries (
                 id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 region TEXT NOT NULL,
                 population INTEGER
             );
             CREATE TABLE health_metrics (
                 id INTEGER PRIMARY KEY,
                 country_id INTEGER,
                 metric_name TEXT NOT NULL,
                 value REAL NOT NULL,
                 year INTEGER NOT NULL DEFAULT 2023
             );
             CREATE TABLE notes (id INTEGER PRIMARY KEY, \"weird-col\" TEXT);
             CREATE TABLE \"odd name\" (label TEXT);
             INSERT INTO notes VALUES (1, 'checked');
             INSERT INTO countries VALUES (1, 'Ghana', 'West Africa', 31000000);
             INSERT INTO countries VALUES (2, 'Kenya', 'East Africa', 54000000);
             INSERT INTO countries VALUES (3, 'Nigeria', 'West Africa', 206000000);
             INSERT INTO health_metrics VALUES (1, 1, 'life_expectancy', 64.1, 2023);
             INSERT INTO health_metrics VALUES (2, 1, 'infant_mortality', 32.5, 2023);
             INSERT INTO health_metrics VALUES (3, 2, 'life_expectancy', 66.7, 2023);
             INSERT INTO health_metrics VALUES (4, NULL, 'life_expectancy', 70.2, 2023);
             CREATE VIEW west_africa AS
                 SELECT id, region, population FROM countries WHERE region = 'West Africa';",
        )
        .unwrap();
        SchemaIntrospector::new(Database::from_connection(conn).unwrap())
    }

    #[test]
    fn test_table_names() {
        assert_eq!(
            introspector().table_names().unwrap(),
            vec!["countries", "health_metrics", "notes", "odd name", "west_africa"]
        );
    }

    #[test]
    fn test_listed_names_are_describable() {
        let schema = introspector();
        for name in schema.table_names().unwrap() {
            if !is_safe_identifier(&name) {
                continue;
            }
            let details = schema.describe_table(&name).unwrap();
            assert!(!details.columns.is_empty(), "{} has no columns", name);
            assert_eq!(details.row_count, schema.row_count(&name).unwrap());
        }

        let view = schema.describe_table("west_africa").unwrap();
        assert_eq!(view.row_count, 2);
        assert_eq!(view.sample.columns, vec!["id", "region", "population"]);
    }

    #[test]
    fn test_table_columns() {
        let columns = introspector().table_columns("health_metrics").unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].name, "id");
        assert!(columns[0].primary_key);
        assert!(!columns[2].nullable);
        assert!(columns[1].nullable);
        assert_eq!(columns[3].data_type, "REAL");
        assert_eq!(columns[4].default_value.as_deref(), Some("2023"));
    }

    #[test]
    fn test_unknown_table() {
        let err = introspector().table_columns("missing").unwrap_err();
        assert!(matches!(err, GuardError::ObjectNotFound { .. }));
    }

    #[test]
    fn test_unsafe_identifier_rejected() {
        let err = introspector().row_count("odd name").unwrap_err();
        assert!(matches!(err, GuardError::InvalidInput(_)));
    }

    #[test]
    fn test_row_count_and_sample() {
        let schema = introspector();
        assert_eq!(schema.row_count("countries").unwrap(), 3);

        let sample = schema.sample_rows("countries", 50).unwrap();
        assert_eq!(sample.row_count(), 3);
        assert_eq!(sample.columns, vec!["id", "name", "region", "population"]);

        assert_eq!(schema.sample_rows("countries", 2).unwrap().row_count(), 2);
    }

    #[test]
    fn test_column_values() {
        let values = introspector()
            .column_values("countries", "region", 100)
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value, SqlValue::Text("West Africa".to_string()));
        assert_eq!(values[0].count, 2);

        let err = introspector()
            .column_values("countries", "missing", 10)
            .unwrap_err();
        assert_eq!(err.to_string(), "Column not found: countries.missing");
    }

    #[test]
    fn test_search_columns() {
        let schema = introspector();
        let matches = schema.search_columns("NAME").unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().any(|m| m.table == "countries" && m.column == "name"));
        assert!(matches
            .iter()
            .any(|m| m.table == "health_metrics" && m.column == "metric_name"));

        assert!(schema.search_columns("zzz").unwrap().is_empty());
    }

    #[test]
    fn test_describe_table() {
        let details = introspector().describe_table("countries").unwrap();
        assert_eq!(details.row_count, 3);
        let region = details
            .columns
            .iter()
            .find(|c| c.column.name == "region")
            .unwrap();
        assert_eq!(region.distinct_values, Some(2));
        assert_eq!(details.sample.row_count(), 3);
    }

    #[test]
    fn test_build_dictionary() {
        let dictionary = introspector().build_dictionary(2).unwrap();
        assert_eq!(dictionary.tables.len(), 4);
        assert_eq!(dictionary.column_count(), 4 + 5 + 2 + 3);
        assert_eq!(dictionary.version, DATA_DICTIONARY_VERSION);

        let countries = dictionary.get_table("countries").unwrap();
        assert_eq!(countries.row_count, 3);
        assert_eq!(countries.column_names(), vec!["id", "name", "region", "population"]);
        assert_eq!(countries.columns[1].sample_values.len(), 2);
        assert_eq!(countries.columns[2].distinct_count, Some(2));
        assert_eq!(countries.columns[3].null_count, Some(0));

        let metrics = dictionary.get_table("health_metrics").unwrap();
        assert_eq!(metrics.columns[1].name, "country_id");
        assert_eq!(metrics.columns[1].null_count, Some(1));

        assert_eq!(dictionary.get_table("west_africa").unwrap().row_count, 2);

        // Unquotable column: metadata only.
        let notes = dictionary.get_table("notes").unwrap();
        assert_eq!(notes.columns[1].name, "weird-col");
        assert!(notes.columns[1].sample_values.is_empty());
        assert!(notes.columns[1].distinct_count.is_none());
        assert!(notes.columns[1].null_count.is_none());

        // Unquotable table: skipped.
        assert!(dictionary.get_table("odd name").is_none());
    }

    #[test]
    fn test_llm_context() {
        let context = introspector().build_dictionary(5).unwrap().to_llm_context();
        assert!(context.contains("## Available Tables"));
        assert!(context.contains("### health_metrics"));
        assert!(context.contains("| id (PK) | INTEGER |"));
        assert!(context.contains("**Rows:** 3"));
    }

    #[test]
    fn test_markdown() {
        let mut dictionary = introspector().build_dictionary(5).unwrap();
        dictionary.tables[0].description = "Countries covered by the survey".to_string();

        let markdown = dictionary.to_markdown();
        assert!(markdown.starts_with("# :memory: - Data Dictionary\n"));
        assert!(markdown.contains("**Total Tables:** 4"));
        assert!(markdown.contains("**Total Columns:** 14"));
        assert!(markdown.contains("**Total Rows:** 10"));
        assert!(markdown.contains("## countries\n\n> Countries covered by the survey"));
        assert!(markdown.contains("| name | `TEXT` | No | 0 |  |"));
        assert!(markdown.contains("| country_id | `INTEGER` | Yes | 1 |  |"));
        assert!(markdown.contains("| id **(PK)** | `INTEGER` |"));
        assert!(markdown.contains("- **region**: "));
        assert!(markdown.contains("`East Africa`"));
        // No samples, no entry.
        assert!(!markdown.contains("- **weird-col**"));
    }

    #[test]
    fn test_merge_descriptions() {
        let schema = introspector();
        let mut previous = schema.build_dictionary(2).unwrap();
        previous.tables[0].description = "Countries".to_string();
        previous.tables[0].columns[1].description = "Common name".to_string();

        let mut rebuilt = schema.build_dictionary(2).unwrap();
        rebuilt.tables[0].columns[2].description = "Kept".to_string();
        rebuilt.merge_descriptions(&previous);

        let countries = rebuilt.get_table("countries").unwrap();
        assert_eq!(countries.description, "Countries");
        assert_eq!(countries.columns[1].description, "Common name");
        assert_eq!(countries.columns[2].description, "Kept");
        assert!(rebuilt.get_table("notes").unwrap().description.is_empty());
    }

    #[test]
    fn test_dictionary_save_load() {
        let dictionary = introspector().build_dictionary(3).unwrap();
        let path = std::env::temp_dir().join(format!(
            "sql-guard-dictionary-{}.json",
            std::process::id()
        ));
        dictionary.save(&path).unwrap();
        let loaded = DataDictionary::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.database, dictionary.database);
        assert_eq!(loaded.generated_at, dictionary.generated_at);
        let names = |d: &DataDictionary| -> Vec<String> {
            d.tables.iter().map(|t| t.name.clone()).collect()
        };
        assert_eq!(names(&loaded), names(&dictionary));
        assert_eq!(
            loaded.get_table("countries").unwrap().columns[1].sample_values,
            dictionary.get_table("countries").unwrap().columns[1].sample_values
        );
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(206000000), "206,000,000");
        assert_eq!(format_thousands(-12345), "-12,345");
    }
}
