//! Uploaded-file repository: one row per spreadsheet processed by a batch.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{timestamp, Database, DatabaseError, UserId};

pub type FileId = i64;

/// Metadata for a file about to be parsed.
#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    pub user_id: UserId,
    pub filename: String,
    pub filepath: String,
    pub filesize: Option<u64>,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileRow {
    pub id: FileId,
    pub user_id: UserId,
    pub filename: String,
    pub filepath: String,
    pub filesize: Option<u64>,
    pub table_name: String,
    pub upload_date: String,
}

impl UploadedFileRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            filename: row.get("filename")?,
            filepath: row.get("filepath")?,
            filesize: row.get("filesize")?,
            table_name: row.get("table_name")?,
            upload_date: row.get("upload_date")?,
        })
    }
}

/// Registers a file and returns its id. `upload_date` is the current time.
pub fn insert(db: &Database, file: &NewUploadedFile) -> Result<FileId, DatabaseError> {
    insert_at(db, file, Utc::now())
}

/// Registers a file with an explicit upload time.
pub fn insert_at(
    db: &Database,
    file: &NewUploadedFile,
    uploaded_at: DateTime<Utc>,
) -> Result<FileId, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO uploaded_files (user_id, filename, filepath, filesize, table_name, upload_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.user_id,
                file.filename,
                file.filepath,
                file.filesize.map(|s| s as i64),
                file.table_name,
                timestamp(uploaded_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Distinct batch names the user has ever uploaded, alphabetical.
pub fn list_table_names(db: &Database, user_id: UserId) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT table_name FROM uploaded_files WHERE user_id = ?1 ORDER BY table_name",
        )?;
        let names = stmt
            .query_map(params![user_id], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    })
}

/// All files of one batch for a user, in registration order.
pub fn list_for_table(
    db: &Database,
    user_id: UserId,
    table_name: &str,
) -> Result<Vec<UploadedFileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM uploaded_files WHERE user_id = ?1 AND table_name = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id, table_name], UploadedFileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Files registered strictly before `cutoff`, across all users.
pub fn find_uploaded_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<UploadedFileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM uploaded_files WHERE upload_date < ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![timestamp(cutoff)], UploadedFileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a file row. Its documents and their selections cascade.
pub fn delete(db: &Database, id: FileId) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM uploaded_files WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample(user_id: UserId, table: &str, name: &str) -> NewUploadedFile {
        NewUploadedFile {
            user_id,
            filename: name.to_string(),
            filepath: format!("/uploads/{}/{}/{}", user_id, table, name),
            filesize: Some(1024),
            table_name: table.to_string(),
        }
    }

    #[test]
    fn test_insert_and_list_for_table() {
        let db = test_db();
        let a = insert(&db, &sample(1, "jan2024", "a.xlsx")).unwrap();
        let b = insert(&db, &sample(1, "jan2024", "b.xlsx")).unwrap();
        insert(&db, &sample(1, "feb2024", "c.xlsx")).unwrap();

        let rows = list_for_table(&db, 1, "jan2024").unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(rows[0].filesize, Some(1024));
    }

    #[test]
    fn test_list_table_names_distinct_sorted_and_scoped() {
        let db = test_db();
        insert(&db, &sample(1, "mar", "1.csv")).unwrap();
        insert(&db, &sample(1, "jan", "2.csv")).unwrap();
        insert(&db, &sample(1, "mar", "3.csv")).unwrap();
        insert(&db, &sample(2, "apr", "4.csv")).unwrap();

        assert_eq!(list_table_names(&db, 1).unwrap(), vec!["jan", "mar"]);
        assert_eq!(list_table_names(&db, 2).unwrap(), vec!["apr"]);
        assert!(list_table_names(&db, 3).unwrap().is_empty());
    }

    #[test]
    fn test_find_uploaded_before() {
        let db = test_db();
        let now = Utc::now();
        let old = insert_at(&db, &sample(1, "t", "old.csv"), now - Duration::days(40)).unwrap();
        insert_at(&db, &sample(1, "t", "new.csv"), now).unwrap();

        let stale = find_uploaded_before(&db, now - Duration::days(30)).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        let id = insert(&db, &sample(1, "t", "x.csv")).unwrap();
        assert!(delete(&db, id).unwrap());
        assert!(!delete(&db, id).unwrap());
    }
}
