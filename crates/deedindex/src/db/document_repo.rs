//! Document repository: parsed spreadsheet rows in the `documents` table.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::file_repo::FileId;
use super::{to_u64, Database, DatabaseError, UserId};

pub type DocumentId = i64;

/// A normalized record ready to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub docno: Option<String>,
    pub docname: Option<String>,
    pub registrationdate: Option<String>,
    pub registration_year: Option<i32>,
    pub dateofexecution: Option<String>,
    pub purchasername: Option<String>,
    pub sellername: Option<String>,
    pub propertydescription: Option<String>,
    pub areaname: Option<String>,
    pub sroname: Option<String>,
    pub consideration_amt: Option<f64>,
    pub marketvalue: Option<f64>,
    pub raw_json: Option<String>,
}

/// Ownership of the rows written by [`insert_for_file`].
#[derive(Debug, Clone, Copy)]
pub struct DocumentOwner<'a> {
    pub user_id: UserId,
    pub file_id: FileId,
    pub table_name: &'a str,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub user_id: UserId,
    pub file_id: FileId,
    pub table_name: String,
    pub docno: Option<String>,
    pub docname: Option<String>,
    pub registrationdate: Option<String>,
    pub registration_year: Option<i32>,
    pub dateofexecution: Option<String>,
    pub purchasername: Option<String>,
    pub sellername: Option<String>,
    pub propertydescription: Option<String>,
    pub areaname: Option<String>,
    pub sroname: Option<String>,
    pub consideration_amt: Option<f64>,
    pub marketvalue: Option<f64>,
    pub raw_json: Option<String>,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            file_id: row.get("file_id")?,
            table_name: row.get("table_name")?,
            docno: row.get("docno")?,
            docname: row.get("docname")?,
            registrationdate: row.get("registrationdate")?,
            registration_year: row.get("registration_year")?,
            dateofexecution: row.get("dateofexecution")?,
            purchasername: row.get("purchasername")?,
            sellername: row.get("sellername")?,
            propertydescription: row.get("propertydescription")?,
            areaname: row.get("areaname")?,
            sroname: row.get("sroname")?,
            consideration_amt: row.get("consideration_amt")?,
            marketvalue: row.get("marketvalue")?,
            raw_json: row.get("raw_json")?,
        })
    }
}

/// Writes all documents of one file in a single transaction.
///
/// Either every row is committed or none is.
pub fn insert_for_file(
    db: &Database,
    owner: DocumentOwner<'_>,
    docs: &[NewDocument],
) -> Result<usize, DatabaseError> {
    if docs.is_empty() {
        return Ok(0);
    }

    db.with_tx(|tx| {
        let mut stmt = tx.prepare(
            "INSERT INTO documents (user_id, file_id, table_name, docno, docname,
             registrationdate, registration_year, dateofexecution, purchasername, sellername,
             propertydescription, areaname, sroname, consideration_amt, marketvalue, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;

        for doc in docs {
            stmt.execute(params![
                owner.user_id,
                owner.file_id,
                owner.table_name,
                doc.docno,
                doc.docname,
                doc.registrationdate,
                doc.registration_year,
                doc.dateofexecution,
                doc.purchasername,
                doc.sellername,
                doc.propertydescription,
                doc.areaname,
                doc.sroname,
                doc.consideration_amt,
                doc.marketvalue,
                doc.raw_json,
            ])?;
        }

        Ok(docs.len())
    })
}

/// Finds a document only if it belongs to `user_id`.
pub fn find_for_user(
    db: &Database,
    user_id: UserId,
    id: DocumentId,
) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM documents WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                DocumentRow::from_row,
            )
            .optional()?)
    })
}

/// Number of documents a user holds in one batch.
pub fn count_for_table(
    db: &Database,
    user_id: UserId,
    table_name: &str,
) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE user_id = ?1 AND table_name = ?2",
            params![user_id, table_name],
            |r| r.get(0),
        )?;
        to_u64("documents", count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::file_repo::{self, NewUploadedFile};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn register_file(db: &Database, user_id: UserId, table: &str) -> FileId {
        file_repo::insert(
            db,
            &NewUploadedFile {
                user_id,
                filename: "f.xlsx".to_string(),
                filepath: "/tmp/f.xlsx".to_string(),
                filesize: None,
                table_name: table.to_string(),
            },
        )
        .unwrap()
    }

    fn doc(docno: &str) -> NewDocument {
        NewDocument {
            docno: Some(docno.to_string()),
            docname: Some("Sale Deed".to_string()),
            consideration_amt: Some(1_500_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_for_file_and_find() {
        let db = test_db();
        let file_id = register_file(&db, 1, "jan2024");
        let owner = DocumentOwner {
            user_id: 1,
            file_id,
            table_name: "jan2024",
        };

        let written = insert_for_file(&db, owner, &[doc("1/2024"), doc("2/2024")]).unwrap();
        assert_eq!(written, 2);
        assert_eq!(count_for_table(&db, 1, "jan2024").unwrap(), 2);

        let id: DocumentId = db
            .with_conn(|c| Ok(c.query_row("SELECT MIN(id) FROM documents", [], |r| r.get(0))?))
            .unwrap();
        let found = find_for_user(&db, 1, id).unwrap().unwrap();
        assert_eq!(found.docno.as_deref(), Some("1/2024"));
        assert_eq!(found.table_name, "jan2024");
        assert_eq!(found.marketvalue, None);
        assert!(find_for_user(&db, 2, id).unwrap().is_none());
    }

    #[test]
    fn test_insert_for_file_is_atomic() {
        let db = test_db();
        let owner = DocumentOwner {
            user_id: 1,
            file_id: 4242,
            table_name: "orphans",
        };

        // Unknown file id violates the foreign key on the first row.
        let result = insert_for_file(&db, owner, &[doc("a"), doc("b")]);
        assert!(result.is_err());
        assert_eq!(count_for_table(&db, 1, "orphans").unwrap(), 0);
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let db = test_db();
        let owner = DocumentOwner {
            user_id: 1,
            file_id: 1,
            table_name: "t",
        };
        assert_eq!(insert_for_file(&db, owner, &[]).unwrap(), 0);
    }

    #[test]
    fn test_file_delete_cascades_to_documents() {
        let db = test_db();
        let file_id = register_file(&db, 1, "t");
        let owner = DocumentOwner {
            user_id: 1,
            file_id,
            table_name: "t",
        };
        insert_for_file(&db, owner, &[doc("x")]).unwrap();

        file_repo::delete(&db, file_id).unwrap();
        assert_eq!(count_for_table(&db, 1, "t").unwrap(), 0);
    }
}
