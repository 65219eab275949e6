//! Caller-facing view of upload jobs.

use serde::Serialize;

use crate::db::job_repo::{self, JobId, JobRow, JobStatus};
use crate::db::{Database, UserId};
use crate::error::{DeedIndexError, Result};

/// Progress of a job as reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    pub total: u64,
    pub processed: u64,
    pub status: JobStatus,
}

impl From<&JobRow> for JobProgress {
    fn from(job: &JobRow) -> Self {
        Self {
            total: job.total_files,
            processed: job.processed_files,
            status: job.status,
        }
    }
}

/// Creates a job for a batch of `file_count` files.
pub fn create(db: &Database, user_id: UserId, batch_name: &str, file_count: u64) -> Result<JobRow> {
    if batch_name.trim().is_empty() {
        return Err(DeedIndexError::validation("batch name must not be empty"));
    }
    if file_count == 0 {
        return Err(DeedIndexError::validation("a batch needs at least one file"));
    }
    Ok(job_repo::insert(db, user_id, batch_name, file_count)?)
}

/// Current progress of a job. Unknown ids and jobs of other users are both
/// reported as not found.
pub fn get_status(db: &Database, user_id: UserId, job_id: JobId) -> Result<JobProgress> {
    job_repo::find_for_user(db, user_id, job_id)?
        .map(|job| JobProgress::from(&job))
        .ok_or(DeedIndexError::NotFound {
            kind: "upload job",
            id: job_id,
        })
}
