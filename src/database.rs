//! Database connectivity, schema discovery and query execution.

mod connection;
pub mod metadata;
mod query;
pub mod types;

pub use connection::Database;
pub use metadata::{
    ColumnDetails, ColumnInfo, ColumnMatch, DataDictionary, SchemaIntrospector, TableColumn,
    TableDetails, TableInfo, ValueCount,
};
pub use query::{HistoryEntry, QueryExecutor, QueryResult, ResultRow, ValidationReport};
pub use types::SqlValue;
