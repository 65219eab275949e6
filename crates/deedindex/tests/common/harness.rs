//! Test harness for isolated integration runs.
//!
//! Each `TestHarness` owns a temporary directory holding a file-backed
//! database and an upload root, so worker sessions use real separate
//! connections.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use deedindex::db::{Database, UserId};
use deedindex::ingest::{BatchReport, Ingestor, ProgressReporter};
use deedindex::storage::UploadStorage;

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub storage: UploadStorage,
    pub upload_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        let db = Database::open(&temp_dir.path().join("data").join("deedindex.db"))
            .expect("Failed to open test database");

        Self {
            storage: UploadStorage::new(&upload_dir),
            upload_dir,
            db,
            temp_dir,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(self.db.clone())
    }

    pub fn ingestor_with_progress(&self, progress: Arc<dyn ProgressReporter>) -> Ingestor {
        self.ingestor().with_progress(progress)
    }

    /// Saves one upload the way a request handler would.
    pub async fn upload(
        &self,
        user_id: UserId,
        batch_name: &str,
        filename: &str,
        bytes: &[u8],
    ) -> PathBuf {
        self.storage
            .save(user_id, batch_name, filename, bytes)
            .await
            .expect("Failed to save upload")
    }

    /// Submits `paths` as one batch and waits for the worker.
    pub async fn ingest(
        &self,
        user_id: UserId,
        batch_name: &str,
        paths: Vec<PathBuf>,
    ) -> BatchReport {
        self.ingestor()
            .submit(user_id, batch_name, paths)
            .expect("Failed to submit batch")
            .wait()
            .await
            .expect("Ingestion task failed")
    }

    /// Uploads `(filename, bytes)` pairs and ingests them as one batch.
    pub async fn ingest_files(
        &self,
        user_id: UserId,
        batch_name: &str,
        files: &[(&str, Vec<u8>)],
    ) -> BatchReport {
        let mut paths = Vec::with_capacity(files.len());
        for (name, bytes) in files {
            paths.push(self.upload(user_id, batch_name, name, bytes).await);
        }
        self.ingest(user_id, batch_name, paths).await
    }
}
