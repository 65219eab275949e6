//! Documents marked for export, grouped by the batch they came from.

use serde::Serialize;

use crate::db::document_repo::DocumentId;
use crate::db::selection_repo::{self, SelectedDocumentRow, SelectionId};
use crate::db::{Database, UserId};
use crate::error::{DeedIndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// Newly selected documents.
    pub added: u64,
    /// Ids in the request, duplicates included.
    pub requested: usize,
}

/// Selections belonging to one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionGroup {
    pub table_name: String,
    pub rows: Vec<SelectedDocumentRow>,
}

/// Marks documents for export. Unknown, foreign and already-selected ids are
/// skipped without error.
pub fn add(db: &Database, user_id: UserId, document_ids: &[DocumentId]) -> Result<AddOutcome> {
    let added = selection_repo::insert_many(db, user_id, document_ids)?;
    log::debug!(
        "User {} selected {} of {} document(s)",
        user_id,
        added,
        document_ids.len()
    );
    Ok(AddOutcome {
        added,
        requested: document_ids.len(),
    })
}

/// Lists selections grouped by batch name.
///
/// Rows keep descending document order; groups appear in the order their
/// first row does. An empty id list means every selection.
pub fn list(
    db: &Database,
    user_id: UserId,
    document_ids: Option<&[DocumentId]>,
) -> Result<Vec<SelectionGroup>> {
    let rows = selection_repo::list(db, user_id, document_ids)?;

    let mut groups: Vec<SelectionGroup> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|g| g.table_name == row.table_name) {
            Some(group) => group.rows.push(row),
            None => groups.push(SelectionGroup {
                table_name: row.table_name.clone(),
                rows: vec![row],
            }),
        }
    }
    Ok(groups)
}

/// Removes one selection of the user.
pub fn remove_one(db: &Database, user_id: UserId, selection_id: SelectionId) -> Result<()> {
    if selection_repo::delete_one(db, user_id, selection_id)? {
        Ok(())
    } else {
        Err(DeedIndexError::NotFound {
            kind: "selection",
            id: selection_id,
        })
    }
}

/// Removes every selection of one batch and returns how many were deleted.
pub fn remove_group(db: &Database, user_id: UserId, batch_name: &str) -> Result<u64> {
    let batch_name = batch_name.trim();
    if batch_name.is_empty() {
        return Err(DeedIndexError::validation("batch name must not be empty"));
    }
    let deleted = selection_repo::delete_for_table(db, user_id, batch_name)?;
    log::debug!(
        "Removed {} selection(s) of '{}' for user {}",
        deleted,
        batch_name,
        user_id
    );
    Ok(deleted)
}
