//! Export of query results to downloadable formats.

use crate::constants::{MARKDOWN_CELL_MAX_CHARS, MARKDOWN_EXPORT_MAX_ROWS, SUMMARY_MAX_UNIQUE_VALUES};
use crate::database::{QueryResult, SqlValue};
use crate::error::GuardError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Markdown => "text/markdown",
        }
    }

    /// Default download file name.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Csv => "query_results.csv",
            Self::Json => "query_results.json",
            Self::Markdown => "query_results.md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "markdown" | "md" | "table" => Ok(Self::Markdown),
            other => Err(GuardError::invalid_input(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }
}

/// An exported result ready to be written or downloaded.
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub format: ExportFormat,
    pub mime_type: &'static str,
    pub filename: &'static str,
    pub data: String,
    pub row_count: usize,
}

/// Render a query result in the requested format.
pub fn export(result: &QueryResult, format: ExportFormat) -> Result<Export, GuardError> {
    let data = match format {
        ExportFormat::Csv => result.to_csv(),
        ExportFormat::Json => result.to_json()?,
        ExportFormat::Markdown => to_markdown(result, MARKDOWN_EXPORT_MAX_ROWS),
    };

    Ok(Export {
        format,
        mime_type: format.mime_type(),
        filename: format.filename(),
        data,
        row_count: result.row_count(),
    })
}

/// Markdown table of at most `max_rows` rows.
pub fn to_markdown(result: &QueryResult, max_rows: usize) -> String {
    if result.columns.is_empty() || result.rows.is_empty() {
        return "No data".to_string();
    }

    let mut lines = Vec::with_capacity(result.rows.len().min(max_rows) + 2);
    lines.push(format!("| {} |", result.columns.join(" | ")));
    lines.push(format!(
        "| {} |",
        vec!["---"; result.columns.len()].join(" | ")
    ));

    for row in result.rows.iter().take(max_rows) {
        let cells: Vec<String> = row.values.iter().map(markdown_cell).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    let mut output = lines.join("\n");
    if result.row_count() > max_rows {
        output.push_str(&format!(
            "\n\n*Showing {} of {} rows*",
            max_rows,
            result.row_count()
        ));
    }
    output
}

fn markdown_cell(value: &SqlValue) -> String {
    let text = value.to_display_string().replace('|', "\\|").replace('\n', " ");
    if text.chars().count() > MARKDOWN_CELL_MAX_CHARS {
        let head: String = text.chars().take(MARKDOWN_CELL_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        text
    }
}

/// Per-column statistics of a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: BTreeMap<String, ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub non_null_count: usize,
    pub null_count: usize,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric {
        min: f64,
        max: f64,
        mean: f64,
    },
    Text {
        unique_count: usize,
        /// Present only when there are few distinct values.
        #[serde(skip_serializing_if = "Option::is_none")]
        unique_values: Option<Vec<String>>,
    },
}

/// Summarize each column of a result.
///
/// A column counts as numeric when any of its values is a number or parses
/// as one; the statistics cover those values only.
pub fn summary_stats(result: &QueryResult) -> SummaryStats {
    let columns = result
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), summarize_column(result, index)))
        .collect();

    SummaryStats {
        row_count: result.row_count(),
        column_count: result.columns.len(),
        columns,
    }
}

fn summarize_column(result: &QueryResult, index: usize) -> ColumnSummary {
    let values: Vec<&SqlValue> = result.column_values(index).filter(|v| !v.is_null()).collect();
    let non_null_count = values.len();
    let null_count = result.row_count() - non_null_count;

    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    let kind = if numbers.is_empty() {
        let unique: BTreeSet<String> = values.iter().map(|v| v.to_display_string()).collect();
        ColumnKind::Text {
            unique_count: unique.len(),
            unique_values: (unique.len() <= SUMMARY_MAX_UNIQUE_VALUES)
                .then(|| unique.into_iter().collect()),
        }
    } else {
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        ColumnKind::Numeric { min, max, mean }
    };

    ColumnSummary {
        non_null_count,
        null_count,
        kind,
    }
}
