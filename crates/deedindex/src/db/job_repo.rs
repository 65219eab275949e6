//! Upload job repository: the `upload_jobs` table.
//!
//! A job tracks one upload submission. `processed_files` only moves forward
//! and never passes `total_files`; `status` goes `processing -> done` once.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{timestamp, Database, DatabaseError, UserId};

pub type JobId = i64;

/// Lifecycle state of an upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
        }
    }

    fn parse(s: &str, job_id: JobId) -> Self {
        match s {
            "done" => JobStatus::Done,
            "processing" => JobStatus::Processing,
            other => {
                log::warn!(
                    "Unknown upload job status '{}' for job {}, treating as processing",
                    other,
                    job_id
                );
                JobStatus::Processing
            }
        }
    }
}

/// A job row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: JobId,
    pub user_id: UserId,
    pub table_name: String,
    pub total_files: u64,
    pub processed_files: u64,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let id: JobId = row.get("id")?;
        let status: String = row.get("status")?;
        Ok(Self {
            id,
            user_id: row.get("user_id")?,
            table_name: row.get("table_name")?,
            total_files: row.get("total_files")?,
            processed_files: row.get("processed_files")?,
            status: JobStatus::parse(&status, id),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// True once every file has been attempted.
    pub fn is_complete(&self) -> bool {
        self.processed_files >= self.total_files
    }
}

/// Creates a job in the `processing` state and returns it.
pub fn insert(
    db: &Database,
    user_id: UserId,
    table_name: &str,
    total_files: u64,
) -> Result<JobRow, DatabaseError> {
    let now = timestamp(Utc::now());

    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO upload_jobs (user_id, table_name, total_files, processed_files, status,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
            params![
                user_id,
                table_name,
                total_files as i64,
                JobStatus::Processing.as_str(),
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(JobRow {
            id,
            user_id,
            table_name: table_name.to_string(),
            total_files,
            processed_files: 0,
            status: JobStatus::Processing,
            created_at: now.clone(),
            updated_at: now,
        })
    })
}

/// Finds a job by id, regardless of owner.
pub fn find_by_id(db: &Database, id: JobId) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM upload_jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?)
    })
}

/// Finds a job by id only if it belongs to `user_id`.
pub fn find_for_user(
    db: &Database,
    user_id: UserId,
    id: JobId,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM upload_jobs WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                JobRow::from_row,
            )
            .optional()?)
    })
}

/// Adds one to `processed_files`. Returns `false` when the counter was
/// already at `total_files` (or the job does not exist) and nothing changed.
pub fn advance(db: &Database, id: JobId) -> Result<bool, DatabaseError> {
    let now = timestamp(Utc::now());
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE upload_jobs SET processed_files = processed_files + 1, updated_at = ?2
             WHERE id = ?1 AND processed_files < total_files",
            params![id, now],
        )?;
        Ok(changed == 1)
    })
}

/// Moves the job to its terminal state.
pub fn mark_done(db: &Database, id: JobId) -> Result<(), DatabaseError> {
    let now = timestamp(Utc::now());
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE upload_jobs SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, JobStatus::Done.as_str(), now],
        )?;
        Ok(())
    })
}

/// Lists a user's jobs, newest first.
pub fn list_for_user(db: &Database, user_id: UserId) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM upload_jobs WHERE user_id = ?1 ORDER BY id DESC")?;
        let rows = stmt
            .query_map(params![user_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let job = insert(&db, 7, "jan2024", 2).unwrap();

        let found = find_by_id(&db, job.id).unwrap().unwrap();
        assert_eq!(found, job);
        assert_eq!(found.status, JobStatus::Processing);
        assert_eq!(found.processed_files, 0);
        assert_eq!(found.total_files, 2);
    }

    #[test]
    fn test_find_for_user_hides_other_owners() {
        let db = test_db();
        let job = insert(&db, 1, "b", 1).unwrap();

        assert!(find_for_user(&db, 1, job.id).unwrap().is_some());
        assert!(find_for_user(&db, 2, job.id).unwrap().is_none());
        assert!(find_for_user(&db, 1, job.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_advance_is_bounded_by_total() {
        let db = test_db();
        let job = insert(&db, 1, "b", 2).unwrap();

        assert!(advance(&db, job.id).unwrap());
        assert!(advance(&db, job.id).unwrap());
        assert!(!advance(&db, job.id).unwrap());

        let found = find_by_id(&db, job.id).unwrap().unwrap();
        assert_eq!(found.processed_files, 2);
        assert!(found.is_complete());
    }

    #[test]
    fn test_advance_unknown_job() {
        let db = test_db();
        assert!(!advance(&db, 999).unwrap());
    }

    #[test]
    fn test_mark_done() {
        let db = test_db();
        let job = insert(&db, 1, "b", 0).unwrap();
        mark_done(&db, job.id).unwrap();

        let found = find_by_id(&db, job.id).unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Done);
    }

    #[test]
    fn test_list_for_user_newest_first() {
        let db = test_db();
        let a = insert(&db, 1, "a", 1).unwrap();
        let b = insert(&db, 1, "b", 1).unwrap();
        insert(&db, 2, "c", 1).unwrap();

        let jobs = list_for_user(&db, 1).unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"done\"");
    }
}
