use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info_span;

use super::extractor::{ExtractError, RowExtractor};
use super::normalize::normalize;
use super::progress::{IngestEvent, ProgressReporter};
use crate::db::document_repo::{self, DocumentOwner, NewDocument};
use crate::db::file_repo::{self, FileId, NewUploadedFile};
use crate::db::job_repo::{self, JobId};
use crate::db::{Database, DatabaseError, UserId};
use crate::sanitize::redact_path;

/// Why a single file contributed no records.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to register file: {0}")]
    Register(#[source] DatabaseError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to store records: {0}")]
    Persist(#[source] DatabaseError),
}

/// Everything the worker needs to process one submitted batch.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    pub job_id: JobId,
    pub user_id: UserId,
    pub table_name: String,
    pub paths: Vec<PathBuf>,
}

/// Result of one file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub file_id: Option<FileId>,
    /// Records written, or the error message that made the file count as zero.
    pub result: Result<usize, String>,
}

/// Per-file outcomes of a finished batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub job_id: JobId,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn records_written(&self) -> usize {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().ok())
            .sum()
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.result.is_err())
    }
}

/// Drives extraction and persistence for a batch and advances its job.
///
/// A file that fails at any step is logged and counted as processed; the
/// rest of the batch continues. The job always ends in `done`.
pub struct IngestionWorker {
    db: Database,
    extractor: Arc<dyn RowExtractor>,
    progress: Arc<dyn ProgressReporter>,
}

impl IngestionWorker {
    pub fn new(
        db: Database,
        extractor: Arc<dyn RowExtractor>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            db,
            extractor,
            progress,
        }
    }

    pub fn run(&self, batch: &IngestBatch) -> BatchReport {
        let _span = info_span!(
            "ingest_batch",
            job_id = batch.job_id,
            user_id = batch.user_id,
            table_name = %batch.table_name,
            files = batch.paths.len()
        )
        .entered();

        log::info!(
            "Ingesting {} file(s) into '{}' for job {}",
            batch.paths.len(),
            batch.table_name,
            batch.job_id
        );

        let total = batch.paths.len();
        let mut files = Vec::with_capacity(total);

        for (index, path) in batch.paths.iter().enumerate() {
            let filename = redact_path(path);
            self.progress.report(IngestEvent::FileStarted {
                job_id: batch.job_id,
                filename: filename.clone(),
                index,
                total,
            });

            let mut file_id = None;
            let result = self.ingest_file(batch, path, &mut file_id);

            let outcome = match result {
                Ok(records) => {
                    log::info!("Stored {} record(s) from {}", records, filename);
                    self.progress.report(IngestEvent::FileCompleted {
                        job_id: batch.job_id,
                        filename,
                        records,
                    });
                    Ok(records)
                }
                Err(e) => {
                    log::warn!("Skipping {} in job {}: {}", filename, batch.job_id, e);
                    self.progress.report(IngestEvent::FileFailed {
                        job_id: batch.job_id,
                        filename,
                        error: e.to_string(),
                    });
                    Err(e.to_string())
                }
            };

            match job_repo::advance(&self.db, batch.job_id) {
                Ok(true) => {}
                Ok(false) => log::warn!(
                    "Job {} did not advance, counter already at total",
                    batch.job_id
                ),
                Err(e) => log::error!("Failed to advance job {}: {}", batch.job_id, e),
            }

            files.push(FileOutcome {
                path: path.clone(),
                file_id,
                result: outcome,
            });
        }

        if let Err(e) = job_repo::mark_done(&self.db, batch.job_id) {
            log::error!("Failed to mark job {} done: {}", batch.job_id, e);
        }

        let report = BatchReport {
            job_id: batch.job_id,
            files,
        };
        let records = report.records_written();
        log::info!(
            "Job {} done: {} record(s), {} failed file(s)",
            batch.job_id,
            records,
            report.failed_files().count()
        );
        self.progress.report(IngestEvent::BatchDone {
            job_id: batch.job_id,
            records,
        });

        report
    }

    fn ingest_file(
        &self,
        batch: &IngestBatch,
        path: &Path,
        file_id: &mut Option<FileId>,
    ) -> Result<usize, FileError> {
        let _span = info_span!("ingest_file", file = %redact_path(path)).entered();

        let new_file = NewUploadedFile {
            user_id: batch.user_id,
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            filepath: path.to_string_lossy().into_owned(),
            filesize: std::fs::metadata(path).ok().map(|m| m.len()),
            table_name: batch.table_name.clone(),
        };
        let id = file_repo::insert(&self.db, &new_file).map_err(FileError::Register)?;
        *file_id = Some(id);

        let rows = self.extractor.extract(path)?;
        let docs: Vec<NewDocument> = rows.map(normalize).collect();
        log::debug!("Extracted {} row(s)", docs.len());

        document_repo::insert_for_file(
            &self.db,
            DocumentOwner {
                user_id: batch.user_id,
                file_id: id,
                table_name: &batch.table_name,
            },
            &docs,
        )
        .map_err(FileError::Persist)
    }
}
