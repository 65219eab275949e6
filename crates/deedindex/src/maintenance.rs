//! Retention cleanup of old uploads.
//!
//! Deleting an uploaded-file row cascades to its documents and to any
//! selections of those documents.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::db::file_repo;
use crate::db::{Database, DatabaseError};
use crate::error::{Result, StorageError, WorkerError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Uploaded-file rows deleted.
    pub removed_files: u64,
    /// Files on disk that were already gone.
    pub missing_on_disk: u64,
}

/// Removes every upload registered more than `retention_days` ago.
///
/// A file that cannot be deleted from disk keeps its row and is retried on the
/// next run.
pub async fn cleanup_old_uploads(db: &Database, retention_days: u32) -> Result<CleanupReport> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    let stale = on_store(db, move |db| file_repo::find_uploaded_before(db, cutoff)).await?;

    let mut report = CleanupReport::default();
    for file in stale {
        match remove_from_disk(Path::new(&file.filepath)).await {
            Ok(existed) => {
                if !existed {
                    report.missing_on_disk += 1;
                }
            }
            Err(e) => {
                log::warn!("Keeping upload {} for now: {}", file.id, e);
                continue;
            }
        }

        let file_id = file.id;
        if on_store(db, move |db| file_repo::delete(db, file_id)).await? {
            report.removed_files += 1;
        }
    }

    if report.removed_files > 0 {
        log::info!(
            "Retention cleanup removed {} upload(s) older than {} day(s)",
            report.removed_files,
            retention_days
        );
    }
    Ok(report)
}

/// Runs a store call on the blocking pool; rusqlite holds the connection lock
/// for the whole call.
async fn on_store<T, F>(db: &Database, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> std::result::Result<T, DatabaseError> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    let value = tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| WorkerError::Blocking(e.to_string()))?;
    Ok(value?)
}

/// Returns whether the file existed.
async fn remove_from_disk(path: &Path) -> std::result::Result<bool, StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::RemoveFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Runs [`cleanup_old_uploads`] now and then every `interval` until the
/// returned task is aborted. Errors are logged and the loop continues.
pub fn spawn_periodic(db: Database, retention_days: u32, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = cleanup_old_uploads(&db, retention_days).await {
                log::error!("Retention cleanup failed: {}", e);
            }
        }
    })
}
