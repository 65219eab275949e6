use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeedIndexError {
    /// Missing or malformed caller input; nothing was written.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The entity does not exist or is owned by another user.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl DeedIndexError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported upload type '{0}' (expected xls, xlsx or csv)")]
    UnsupportedType(String),

    #[error("Invalid upload name: {0}")]
    InvalidName(String),

    #[error("No free file name for '{0}'")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Ingestion task for job {job_id} panicked or was aborted: {reason}")]
    Join { job_id: i64, reason: String },

    #[error("No async runtime available to run ingestion: {0}")]
    NoRuntime(String),

    #[error("Blocking store task failed: {0}")]
    Blocking(String),
}

pub type Result<T> = std::result::Result<T, DeedIndexError>;
