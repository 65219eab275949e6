//! Record store backed by SQLite.
//!
//! A `Database` wraps one rusqlite connection behind a `Mutex`. Cloning a
//! handle shares that connection; [`Database::session`] opens an independent
//! connection to the same file so long-running work (ingestion batches) does
//! not contend with request-scoped handles. Concurrent sessions coordinate
//! through WAL mode and the busy timeout.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction};

pub mod document_repo;
pub mod error;
pub mod file_repo;
pub mod job_repo;
pub mod migrations;
pub mod selection_repo;
pub mod stats_repo;

pub use error::DatabaseError;

/// Owner of every row in the store. Supplied by the caller's auth layer.
pub type UserId = i64;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Thread-safe store handle. Cloning is cheap (inner `Arc`).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Location,
    busy_timeout: Duration,
}

impl Database {
    /// Opens (or creates) the database at `path` and runs pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`Database::open`] with an explicit busy timeout for lock waits.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = connect(path, busy_timeout)?;
        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Location::File(path.to_path_buf()),
            busy_timeout,
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Location::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// Returns a handle backed by its own connection.
    ///
    /// In-memory databases cannot be reopened, so their sessions share the
    /// existing connection.
    pub fn session(&self) -> Result<Self, DatabaseError> {
        match &self.location {
            Location::File(path) => Ok(Self {
                conn: Arc::new(Mutex::new(connect(path, self.busy_timeout)?)),
                location: self.location.clone(),
                busy_timeout: self.busy_timeout,
            }),
            Location::Memory => Ok(self.clone()),
        }
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn connect(path: &Path, busy_timeout: Duration) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Returns the canonical database path: `~/.deedindex/data/deedindex.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".deedindex").join("data").join("deedindex.db"))
}

/// Fixed-width UTC timestamp so stored values compare lexicographically.
pub(crate) fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Converts a stored counter to `u64`.
pub(crate) fn to_u64(column: &'static str, value: i64) -> Result<u64, DatabaseError> {
    u64::try_from(value).map_err(|_| DatabaseError::OutOfRange { column, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))?;
            assert!(count > 0);
            Ok(())
        })
        .unwrap();
        assert!(db.path().is_none());
    }

    #[test]
    fn test_open_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_session_sees_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("s.db")).unwrap();
        let session = db.session().unwrap();

        session
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO upload_jobs (user_id, table_name, total_files, created_at, updated_at)
                     VALUES (1, 'b', 1, '2026-01-01', '2026-01-01')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let count: u32 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM upload_jobs", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_with_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<(), DatabaseError> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO upload_jobs (user_id, table_name, total_files, created_at, updated_at)
                 VALUES (1, 'b', 1, '2026-01-01', '2026-01-01')",
                [],
            )?;
            Err(DatabaseError::LockPoisoned)
        });
        assert!(result.is_err());

        let count: u32 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM upload_jobs", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with("deedindex.db"));
        assert!(path.to_string_lossy().contains(".deedindex"));
    }

    #[test]
    fn test_to_u64_rejects_negative() {
        assert_eq!(to_u64("total_files", 3).unwrap(), 3);
        assert!(matches!(
            to_u64("total_files", -1),
            Err(DatabaseError::OutOfRange { column: "total_files", value: -1 })
        ));
    }
}
