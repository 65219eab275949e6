//! Per-user dashboard totals.

use rusqlite::params;
use serde::Serialize;

use super::{to_u64, Database, DatabaseError, UserId};

/// Counts shown on a user's dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Spreadsheet files registered by ingestion batches.
    pub total_uploads: u64,
    /// Documents extracted from those files.
    pub total_entries: u64,
    /// Documents currently marked for export.
    pub total_selected: u64,
}

/// Returns the dashboard totals for one user.
pub fn dashboard(db: &Database, user_id: UserId) -> Result<DashboardStats, DatabaseError> {
    db.with_conn(|conn| {
        let (uploads, documents, selected): (i64, i64, i64) = conn.query_row(
            "SELECT
               (SELECT COUNT(*) FROM uploaded_files WHERE user_id = ?1),
               (SELECT COUNT(*) FROM documents WHERE user_id = ?1),
               (SELECT COUNT(*) FROM selected_entries WHERE user_id = ?1)",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(DashboardStats {
            total_uploads: to_u64("uploaded_files", uploads)?,
            total_entries: to_u64("documents", documents)?,
            total_selected: to_u64("selected_entries", selected)?,
        })
    })
}
