//! Submission repository: CRUD operations for the `submissions` table.
//!
//! The `*_in` variants run on a caller-provided connection so they can take
//! part in a transaction.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw submission row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub id: String,
    pub owner: String,
    pub source_kind: String,
    pub format: String,
    pub original_filename: Option<String>,
    pub raw_content: Option<Vec<u8>>,
    pub extracted_text: Option<String>,
    pub mode: String,
    pub status: String,
    pub short_summary: Option<String>,
    pub detailed_notes: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub lease: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl SubmissionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner: row.get("owner")?,
            source_kind: row.get("source_kind")?,
            format: row.get("format")?,
            original_filename: row.get("original_filename")?,
            raw_content: row.get("raw_content")?,
            extracted_text: row.get("extracted_text")?,
            mode: row.get("mode")?,
            status: row.get("status")?,
            short_summary: row.get("short_summary")?,
            detailed_notes: row.get("detailed_notes")?,
            error_kind: row.get("error_kind")?,
            error_message: row.get("error_message")?,
            retry_count: row.get("retry_count")?,
            lease: row.get("lease")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Query filter parameters for submission listing.
#[derive(Debug, Default, Clone)]
pub struct SubmissionFilter {
    pub owner: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new submission row.
pub fn insert(db: &Database, submission: &SubmissionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO submissions (id, owner, source_kind, format, original_filename,
             raw_content, extracted_text, mode, status, short_summary, detailed_notes,
             error_kind, error_message, retry_count, lease, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                submission.id,
                submission.owner,
                submission.source_kind,
                submission.format,
                submission.original_filename,
                submission.raw_content,
                submission.extracted_text,
                submission.mode,
                submission.status,
                submission.short_summary,
                submission.detailed_notes,
                submission.error_kind,
                submission.error_message,
                submission.retry_count,
                submission.lease,
                submission.created_at,
                submission.updated_at,
                submission.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites the mutable columns of an existing row. Returns false when no
/// row has the given id.
pub fn update_in(conn: &Connection, submission: &SubmissionRow) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE submissions SET raw_content=?2, extracted_text=?3, status=?4,
         short_summary=?5, detailed_notes=?6, error_kind=?7, error_message=?8,
         retry_count=?9, lease=?10, updated_at=?11, completed_at=?12
         WHERE id=?1",
        params![
            submission.id,
            submission.raw_content,
            submission.extracted_text,
            submission.status,
            submission.short_summary,
            submission.detailed_notes,
            submission.error_kind,
            submission.error_message,
            submission.retry_count,
            submission.lease,
            submission.updated_at,
            submission.completed_at,
        ],
    )?;
    Ok(changed > 0)
}

pub fn find_in(conn: &Connection, id: &str) -> Result<Option<SubmissionRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM submissions WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id], SubmissionRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Finds a submission by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<SubmissionRow>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

/// Sets `extracted_text` only if it is still NULL, discarding the raw bytes.
/// Returns whether the row changed.
pub fn set_extracted_text(
    db: &Database,
    id: &str,
    text: &str,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE submissions SET extracted_text = ?2, raw_content = NULL, updated_at = ?3
             WHERE id = ?1 AND extracted_text IS NULL",
            params![id, text, updated_at],
        )?;
        Ok(changed > 0)
    })
}

/// Queries submissions newest first, returning (rows, total_count).
pub fn query(
    db: &Database,
    filter: &SubmissionFilter,
) -> Result<(Vec<SubmissionRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref owner) = filter.owner {
            conditions.push(format!("owner = ?{}", param_values.len() + 1));
            param_values.push(Box::new(owner.clone()));
        }
        if let Some(ref status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM submissions {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM submissions {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<SubmissionRow> = stmt
            .query_map(params_ref.as_slice(), SubmissionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Counts submissions with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes a submission. Returns whether a row was removed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM submissions WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_row(id: &str) -> SubmissionRow {
        SubmissionRow {
            id: id.to_string(),
            owner: "alice".to_string(),
            source_kind: "UPLOADED_FILE".to_string(),
            format: "TXT".to_string(),
            original_filename: Some("notes.txt".to_string()),
            raw_content: Some(b"hello".to_vec()),
            extracted_text: None,
            mode: "BOTH".to_string(),
            status: "PENDING".to_string(),
            short_summary: None,
            detailed_notes: None,
            error_kind: None,
            error_message: None,
            retry_count: 0,
            lease: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample_row("s-1")).unwrap();

        let found = find_by_id(&db, "s-1").unwrap().unwrap();
        assert_eq!(found, sample_row("s-1"));
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let db = test_db();
        insert(&db, &sample_row("dup")).unwrap();
        assert!(insert(&db, &sample_row("dup")).is_err());
    }

    #[test]
    fn test_update_in() {
        let db = test_db();
        let mut row = sample_row("s-2");
        insert(&db, &row).unwrap();

        row.status = "FAILED".to_string();
        row.error_kind = Some("NO_TEXT_FOUND".to_string());
        row.error_message = Some("empty".to_string());
        row.completed_at = Some("2026-01-01T00:01:00.000000Z".to_string());
        let updated = db.with_conn(|conn| update_in(conn, &row)).unwrap();
        assert!(updated);

        let found = find_by_id(&db, "s-2").unwrap().unwrap();
        assert_eq!(found.status, "FAILED");
        assert_eq!(found.error_kind.as_deref(), Some("NO_TEXT_FOUND"));
    }

    #[test]
    fn test_update_missing_row() {
        let db = test_db();
        let updated = db
            .with_conn(|conn| update_in(conn, &sample_row("ghost")))
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_set_extracted_text_once() {
        let db = test_db();
        insert(&db, &sample_row("s-3")).unwrap();

        assert!(set_extracted_text(&db, "s-3", "hello", "2026-01-01T00:00:01Z").unwrap());
        assert!(!set_extracted_text(&db, "s-3", "other", "2026-01-01T00:00:02Z").unwrap());

        let found = find_by_id(&db, "s-3").unwrap().unwrap();
        assert_eq!(found.extracted_text.as_deref(), Some("hello"));
        assert!(found.raw_content.is_none());
    }

    #[test]
    fn test_query_by_owner_newest_first() {
        let db = test_db();
        for i in 0..5 {
            let mut row = sample_row(&format!("q{}", i));
            row.created_at = format!("2026-01-0{}T00:00:00.000000Z", i + 1);
            if i == 4 {
                row.owner = "bob".to_string();
            }
            insert(&db, &row).unwrap();
        }

        let (rows, total) = query(
            &db,
            &SubmissionFilter {
                owner: Some("alice".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 4);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["q3", "q2", "q1", "q0"]);
    }

    #[test]
    fn test_query_pagination_and_status() {
        let db = test_db();
        for i in 0..6 {
            let mut row = sample_row(&format!("p{}", i));
            row.created_at = format!("2026-02-0{}T00:00:00.000000Z", i + 1);
            if i % 2 == 0 {
                row.status = "PROCESSING".to_string();
                row.extracted_text = Some("text".to_string());
            }
            insert(&db, &row).unwrap();
        }

        let (rows, total) = query(
            &db,
            &SubmissionFilter {
                status: Some("PROCESSING".to_string()),
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 3);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p0"]);
    }

    #[test]
    fn test_count_by_status_and_delete() {
        let db = test_db();
        insert(&db, &sample_row("c1")).unwrap();
        insert(&db, &sample_row("c2")).unwrap();

        assert_eq!(count_by_status(&db, "PENDING").unwrap(), 2);
        assert!(delete(&db, "c1").unwrap());
        assert!(!delete(&db, "c1").unwrap());
        assert_eq!(count_by_status(&db, "PENDING").unwrap(), 1);
    }
}
