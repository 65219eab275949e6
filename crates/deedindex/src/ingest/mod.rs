//! Asynchronous ingestion of uploaded spreadsheets.
//!
//! [`Ingestor::submit`] validates a batch, creates its job synchronously and
//! hands the files to an [`IngestionWorker`] on a blocking tokio task. Callers
//! poll [`job::get_status`] or await the returned [`Submission`].

pub mod extractor;
pub mod job;
pub mod normalize;
pub mod progress;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

pub use extractor::{ExtractError, RawRow, RowExtractor, RowIter, SpreadsheetExtractor};
pub use job::JobProgress;
pub use progress::{BroadcastProgress, IngestEvent, NoopProgress, ProgressReporter};
pub use worker::{BatchReport, FileOutcome, IngestBatch, IngestionWorker};

use crate::db::job_repo::JobId;
use crate::db::{Database, UserId};
use crate::error::{DeedIndexError, Result, WorkerError};

/// A started ingestion batch.
pub struct Submission {
    pub job_id: JobId,
    pub handle: JoinHandle<BatchReport>,
}

impl Submission {
    /// Waits for the worker and returns its per-file report.
    pub async fn wait(self) -> Result<BatchReport> {
        self.handle.await.map_err(|e| {
            DeedIndexError::from(WorkerError::Join {
                job_id: self.job_id,
                reason: e.to_string(),
            })
        })
    }
}

#[derive(Clone)]
pub struct Ingestor {
    db: Database,
    extractor: Arc<dyn RowExtractor>,
    progress: Arc<dyn ProgressReporter>,
}

impl Ingestor {
    /// Ingestor using [`SpreadsheetExtractor`] and no progress reporting.
    pub fn new(db: Database) -> Self {
        Self::with_extractor(db, Arc::new(SpreadsheetExtractor::new()))
    }

    pub fn with_extractor(db: Database, extractor: Arc<dyn RowExtractor>) -> Self {
        Self {
            db,
            extractor,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Creates a job for `paths` and starts processing them in order.
    ///
    /// Must be called from within a tokio runtime. The files must already be
    /// saved; the job id is returned before any of them is parsed.
    pub fn submit(
        &self,
        user_id: UserId,
        batch_name: &str,
        paths: Vec<PathBuf>,
    ) -> Result<Submission> {
        let batch_name = batch_name.trim();
        if batch_name.is_empty() {
            return Err(DeedIndexError::validation("batch name must not be empty"));
        }
        if paths.is_empty() {
            return Err(DeedIndexError::validation("no files submitted"));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WorkerError::NoRuntime(e.to_string()))?;

        // Everything that can fail happens before the job row exists.
        let session = self.db.session()?;
        let job = job::create(&self.db, user_id, batch_name, paths.len() as u64)?;

        log::info!(
            "Created upload job {} for batch '{}' ({} file(s))",
            job.id,
            batch_name,
            paths.len()
        );

        let worker = IngestionWorker::new(session, self.extractor.clone(), self.progress.clone());
        let batch = IngestBatch {
            job_id: job.id,
            user_id,
            table_name: batch_name.to_string(),
            paths,
        };
        let handle = runtime.spawn_blocking(move || worker.run(&batch));

        Ok(Submission {
            job_id: job.id,
            handle,
        })
    }
}
