//! Selection repository: the `selected_entries` table.
//!
//! A selection marks one of the user's documents for export. The pair
//! `(user_id, document_id)` is unique, so inserts use `INSERT OR IGNORE`.

use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, Row};
use serde::Serialize;

use super::document_repo::DocumentId;
use super::{timestamp, Database, DatabaseError, UserId};

pub type SelectionId = i64;

/// A selected document joined with the fields shown in export listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedDocumentRow {
    pub sel_id: SelectionId,
    pub document_id: DocumentId,
    pub table_name: String,
    pub docno: Option<String>,
    pub docname: Option<String>,
    pub registrationdate: Option<String>,
    pub sroname: Option<String>,
    pub sellername: Option<String>,
    pub purchasername: Option<String>,
    pub propertydescription: Option<String>,
    pub areaname: Option<String>,
    pub consideration_amt: Option<f64>,
    pub dateofexecution: Option<String>,
}

impl SelectedDocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            sel_id: row.get("sel_id")?,
            document_id: row.get("document_id")?,
            table_name: row.get("table_name")?,
            docno: row.get("docno")?,
            docname: row.get("docname")?,
            registrationdate: row.get("registrationdate")?,
            sroname: row.get("sroname")?,
            sellername: row.get("sellername")?,
            purchasername: row.get("purchasername")?,
            propertydescription: row.get("propertydescription")?,
            areaname: row.get("areaname")?,
            consideration_amt: row.get("consideration_amt")?,
            dateofexecution: row.get("dateofexecution")?,
        })
    }
}

/// Selects each document the user owns and has not selected yet.
///
/// Unknown, foreign and already-selected ids are skipped. Returns the number
/// of new selections.
pub fn insert_many(
    db: &Database,
    user_id: UserId,
    document_ids: &[DocumentId],
) -> Result<u64, DatabaseError> {
    let now = timestamp(Utc::now());
    db.with_tx(|tx| {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO selected_entries (user_id, document_id, table_name, label, created_at)
             SELECT d.user_id, d.id, d.table_name, d.table_name, ?3
             FROM documents d WHERE d.id = ?2 AND d.user_id = ?1",
        )?;

        let mut added = 0u64;
        for id in document_ids {
            added += stmt.execute(params![user_id, id, now])? as u64;
        }
        Ok(added)
    })
}

/// Most ids bound into one `IN` list; SQLite caps host parameters per statement.
const IDS_PER_QUERY: usize = 500;

const LIST_SQL: &str = "SELECT s.id AS sel_id, d.id AS document_id, d.table_name, d.docno, d.docname,
     d.registrationdate, d.sroname, d.sellername, d.purchasername,
     d.propertydescription, d.areaname, d.consideration_amt, d.dateofexecution
     FROM selected_entries s
     JOIN documents d ON d.id = s.document_id
     WHERE s.user_id = ?1 AND d.user_id = ?1";

/// Lists the user's selections, newest document first.
///
/// With `document_ids` present and non-empty, only those documents are
/// returned. Duplicate ids are ignored and long lists are queried in chunks.
pub fn list(
    db: &Database,
    user_id: UserId,
    document_ids: Option<&[DocumentId]>,
) -> Result<Vec<SelectedDocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let Some(ids) = document_ids.filter(|ids| !ids.is_empty()) else {
            let mut stmt = conn.prepare(&format!("{} ORDER BY d.id DESC", LIST_SQL))?;
            let rows = stmt
                .query_map(params![user_id], SelectedDocumentRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(rows);
        };

        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut rows = Vec::new();
        for chunk in ids.chunks(IDS_PER_QUERY) {
            let placeholders: Vec<String> =
                (0..chunk.len()).map(|i| format!("?{}", i + 2)).collect();
            let sql = format!("{} AND d.id IN ({})", LIST_SQL, placeholders.join(", "));

            let mut param_values: Vec<&dyn ToSql> = vec![&user_id];
            param_values.extend(chunk.iter().map(|id| id as &dyn ToSql));

            let mut stmt = conn.prepare(&sql)?;
            for row in stmt.query_map(param_values.as_slice(), SelectedDocumentRow::from_row)? {
                rows.push(row?);
            }
        }
        rows.sort_by(|a, b| b.document_id.cmp(&a.document_id));
        Ok(rows)
    })
}

/// Deletes one selection if it belongs to the user.
pub fn delete_one(
    db: &Database,
    user_id: UserId,
    selection_id: SelectionId,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM selected_entries WHERE id = ?1 AND user_id = ?2",
            params![selection_id, user_id],
        )?;
        Ok(changed == 1)
    })
}

/// Deletes every selection of the user whose document belongs to `table_name`.
pub fn delete_for_table(
    db: &Database,
    user_id: UserId,
    table_name: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM selected_entries
             WHERE user_id = ?1
               AND document_id IN (SELECT id FROM documents WHERE user_id = ?1 AND table_name = ?2)",
            params![user_id, table_name],
        )?;
        Ok(changed as u64)
    })
}
