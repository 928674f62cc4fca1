//! Read-only SQLite connection handle.

use crate::error::GuardError;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared handle to a read-only SQLite database.
///
/// Cloning is cheap; all clones use the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    label: Arc<str>,
}

impl Database {
    /// Open a database file read-only.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, GuardError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GuardError::database(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            GuardError::database_with_source(format!("Failed to open {}", path.display()), e)
        })?;
        conn.busy_timeout(busy_timeout)?;

        info!("Opened database {} (read-only)", path.display());
        Self::wrap(conn, path.display().to_string())
    }

    /// Wrap an existing connection, switching it to query-only mode.
    pub fn from_connection(conn: Connection) -> Result<Self, GuardError> {
        Self::wrap(conn, ":memory:".to_string())
    }

    fn wrap(conn: Connection, label: String) -> Result<Self, GuardError> {
        conn.execute_batch("PRAGMA query_only = ON;")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label: label.into(),
        })
    }

    /// Path or label of the database.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// Blocks; async callers go through `spawn_blocking`.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, GuardError>,
    ) -> Result<T, GuardError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Database {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO countries VALUES (1, 'Ghana');",
        )
        .unwrap();
        Database::from_connection(conn).unwrap()
    }

    #[test]
    fn test_reads_allowed() {
        let db = memory_db();
        let name: String = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT name FROM countries WHERE id = 1", [], |r| {
                    r.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(name, "Ghana");
    }

    #[test]
    fn test_writes_refused_by_connection() {
        let db = memory_db();
        let result = db.with_connection(|conn| {
            conn.execute("DELETE FROM countries", [])?;
            Ok(())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let result = Database::open("/nonexistent/sql-guard.db", Duration::from_secs(1));
        assert!(matches!(result, Err(GuardError::Database { .. })));
    }

    #[test]
    fn test_label() {
        assert_eq!(memory_db().label(), ":memory:");
    }
}
