//! Store-level error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the record store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored integer did not fit the type the caller asked for
    /// (negative counters, ids beyond i64).
    #[error("Value {value} out of range for column '{column}'")]
    OutOfRange { column: &'static str, value: i64 },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

