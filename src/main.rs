//! sql-guard command line entry point.
//!
//! Validates queries, runs them read-only against a SQLite database and
//! prints schema information. Results go to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sql_guard::cache::SchemaCache;
use sql_guard::constants::DEFAULT_COLUMN_VALUES_LIMIT;
use sql_guard::database::{Database, QueryExecutor, SchemaIntrospector, TableDetails};
use sql_guard::export::{export, summary_stats, ExportFormat};
use sql_guard::insights::{derive_insights, suggest_charts};
use sql_guard::security::{is_safe_identifier, sanitize_identifier};
use sql_guard::{Config, GuardError, SqlValidator};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sql-guard", version, about = "Read-only SQL safety gate")]
struct Cli {
    /// SQLite database file (overrides SQL_GUARD_DATABASE)
    #[arg(long, short = 'd', global = true)]
    database: Option<PathBuf>,

    /// Maximum accepted query length in characters
    #[arg(long, global = true)]
    max_query_length: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check whether a query would be accepted
    Validate {
        /// SQL text; read from stdin when omitted
        sql: Option<String>,
    },

    /// Validate and execute a query
    Query {
        /// SQL text; read from stdin when omitted
        sql: Option<String>,

        /// Output format: table, csv or json
        #[arg(long, short = 'f', default_value = "table")]
        format: ExportFormat,

        /// Print per-column summary statistics after the rows
        #[arg(long)]
        summary: bool,

        /// Print chart suggestions and findings after the rows
        #[arg(long)]
        insights: bool,
    },

    /// Show the data dictionary or one table's details
    Schema {
        /// Describe a single table
        #[arg(long, short = 't')]
        table: Option<String>,

        /// Emit JSON instead of Markdown
        #[arg(long, conflicts_with = "full")]
        json: bool,

        /// Full Markdown documentation instead of the prompt summary
        #[arg(long)]
        full: bool,

        /// Rebuild the dictionary even when a cache file exists
        #[arg(long)]
        refresh: bool,
    },

    /// Find columns whose name contains a term
    Columns { term: String },

    /// List the most frequent values of a column
    Values {
        table: String,
        column: String,

        #[arg(long, short = 'n', default_value_t = DEFAULT_COLUMN_VALUES_LIMIT)]
        limit: usize,
    },

    /// Sanitize an identifier
    Sanitize { identifier: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.database {
        config.database.path = Some(path);
    }
    if let Some(max) = cli.max_query_length {
        config.security.max_query_length = max;
    }
    config.validate()?;

    let outcome = match cli.command {
        Command::Validate { sql } => return validate(&config, sql),
        Command::Query {
            sql,
            format,
            summary,
            insights,
        } => run_query(&config, sql, format, summary, insights).await,
        Command::Schema {
            table,
            json,
            full,
            refresh,
        } => schema(&config, table, SchemaOutput { json, full, refresh }),
        Command::Columns { term } => columns(&config, &term),
        Command::Values {
            table,
            column,
            limit,
        } => values(&config, &table, &column, limit),
        Command::Sanitize { identifier } => {
            println!("{}", sanitize_identifier(&identifier));
            println!("safe: {}", is_safe_identifier(&identifier));
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn validate(config: &Config, sql: Option<String>) -> Result<ExitCode> {
    let sql = sql_argument(sql)?;
    let validator = SqlValidator::new(config.security.max_query_length);
    let result = validator.validate(&sql);

    if result.is_valid {
        println!("valid");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid: {}", result.reason);
        Ok(ExitCode::FAILURE)
    }
}

async fn run_query(
    config: &Config,
    sql: Option<String>,
    format: ExportFormat,
    summary: bool,
    insights: bool,
) -> Result<(), GuardError> {
    let sql = sql_argument(sql).map_err(|e| GuardError::invalid_input(e.to_string()))?;
    let executor = QueryExecutor::new(
        open_database(config)?,
        SqlValidator::new(config.security.max_query_length),
        config.query.clone(),
    );

    let result = executor.execute(&sql).await?;
    let exported = export(&result, format)?;
    println!("{}", exported.data.trim_end());

    if result.truncated {
        eprintln!("Results truncated to {} rows", config.query.max_rows);
    }
    if summary {
        println!("{}", serde_json::to_string_pretty(&summary_stats(&result))?);
    }
    if insights {
        let report = serde_json::json!({
            "charts": suggest_charts(&result),
            "insights": derive_insights(&result),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// How `schema` prints the dictionary.
struct SchemaOutput {
    json: bool,
    full: bool,
    refresh: bool,
}

fn schema(config: &Config, table: Option<String>, output: SchemaOutput) -> Result<(), GuardError> {
    let introspector = SchemaIntrospector::new(open_database(config)?);

    if let Some(table) = table {
        let details = introspector.describe_table(&table)?;
        if output.json {
            println!("{}", serde_json::to_string_pretty(&details)?);
        } else {
            print_table_details(&details);
        }
        return Ok(());
    }

    let mut cache = SchemaCache::new(config.schema.sample_values);
    if let Some(path) = &config.schema.cache_path {
        cache = cache.with_cache_file(path);
    }
    let dictionary = if output.refresh {
        cache.refresh(&introspector)?
    } else {
        cache.get_or_load(&introspector)?
    };

    if output.json {
        println!("{}", dictionary.to_json()?);
    } else if output.full {
        println!("{}", dictionary.to_markdown());
    } else {
        println!("{}", dictionary.to_llm_context());
    }
    Ok(())
}

fn print_table_details(details: &TableDetails) {
    println!("{} ({} rows)", details.name, details.row_count);
    for column in &details.columns {
        let info = &column.column;
        let distinct = column
            .distinct_values
            .map(|n| format!(" [{} distinct]", n))
            .unwrap_or_default();
        println!(
            "  {} {}{}{}{}",
            info.name,
            info.data_type,
            if info.primary_key { " PRIMARY KEY" } else { "" },
            if info.nullable { "" } else { " NOT NULL" },
            distinct
        );
    }

    if let Ok(sample) = export(&details.sample, ExportFormat::Markdown) {
        println!();
        println!("{}", sample.data);
    }
}

fn columns(config: &Config, term: &str) -> Result<(), GuardError> {
    let introspector = SchemaIntrospector::new(open_database(config)?);
    for found in introspector.search_columns(term)? {
        println!("{}.{} {}", found.table, found.column, found.data_type);
    }
    Ok(())
}

fn values(config: &Config, table: &str, column: &str, limit: usize) -> Result<(), GuardError> {
    let introspector = SchemaIntrospector::new(open_database(config)?);
    for entry in introspector.column_values(table, column, limit)? {
        println!("{}\t{}", entry.count, entry.value.to_display_string());
    }
    Ok(())
}

fn open_database(config: &Config) -> Result<Database, GuardError> {
    Database::open(config.database_path()?, config.database.busy_timeout)
}

/// Use the positional SQL argument, or read it from stdin.
fn sql_argument(sql: Option<String>) -> Result<String> {
    match sql {
        Some(sql) => Ok(sql),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read SQL from stdin")?;
            Ok(buffer)
        }
    }
}

/// Initialize tracing subscriber with stderr output.
///
/// Logs MUST go to stderr because stdout carries query results.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,sql_guard=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
