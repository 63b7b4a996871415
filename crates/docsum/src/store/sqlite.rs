//! Status store with persistent database storage.

use chrono::{DateTime, SecondsFormat, Utc};
use super::{StatusStore, SubmissionFilter};
use crate::db::submission_repo::{self, SubmissionRow};
use crate::db::Database;
use crate::error::{ErrorKind, StoreError};
use crate::submission::{
    ErrorInfo, Format, Mode, OwnerId, Precondition, SourceKind, StatusChange, Submission,
    SubmissionId, SubmissionStatus, SummaryResult,
};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn corrupt(id: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn parse_timestamp(s: &str, id: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(id, format!("bad timestamp '{}': {}", s, e)))
}

fn to_row(sub: &Submission) -> SubmissionRow {
    let (short_summary, detailed_notes) = match &sub.result {
        Some(result) => (result.short_summary.clone(), result.detailed_notes.clone()),
        None => (None, None),
    };
    let (error_kind, error_message) = match &sub.error_info {
        Some(info) => (
            Some(info.kind.as_str().to_string()),
            Some(info.message.clone()),
        ),
        None => (None, None),
    };

    SubmissionRow {
        id: sub.id.to_string(),
        owner: sub.owner.to_string(),
        source_kind: sub.source_kind.as_str().to_string(),
        format: sub.format.as_str().to_string(),
        original_filename: sub.original_filename.clone(),
        raw_content: sub.raw_content.clone(),
        extracted_text: sub.extracted_text.clone(),
        mode: sub.mode.as_str().to_string(),
        status: sub.status.as_str().to_string(),
        short_summary,
        detailed_notes,
        error_kind,
        error_message,
        retry_count: i64::from(sub.retry_count),
        lease: sub.lease.clone(),
        created_at: format_timestamp(sub.created_at),
        updated_at: format_timestamp(sub.updated_at),
        completed_at: sub.completed_at.map(format_timestamp),
    }
}

fn from_row(row: SubmissionRow) -> Result<Submission, StoreError> {
    let id = row.id.as_str();
    let source_kind = SourceKind::parse(&row.source_kind)
        .ok_or_else(|| corrupt(id, format!("unknown source kind '{}'", row.source_kind)))?;
    let format = Format::parse(&row.format)
        .ok_or_else(|| corrupt(id, format!("unknown format '{}'", row.format)))?;
    let mode = Mode::parse(&row.mode)
        .ok_or_else(|| corrupt(id, format!("unknown mode '{}'", row.mode)))?;
    let status = SubmissionStatus::parse(&row.status)
        .ok_or_else(|| corrupt(id, format!("unknown status '{}'", row.status)))?;

    let result = if row.short_summary.is_some() || row.detailed_notes.is_some() {
        Some(SummaryResult {
            short_summary: row.short_summary,
            detailed_notes: row.detailed_notes,
        })
    } else {
        None
    };

    let error_info = match row.error_kind {
        Some(kind) => {
            let kind = ErrorKind::parse(&kind)
                .ok_or_else(|| corrupt(id, format!("unknown error kind '{}'", kind)))?;
            Some(ErrorInfo::new(kind, row.error_message.unwrap_or_default()))
        }
        None => None,
    };

    let retry_count = u32::try_from(row.retry_count)
        .map_err(|_| corrupt(id, format!("bad retry count {}", row.retry_count)))?;

    let created_at = parse_timestamp(&row.created_at, id)?;
    let updated_at = parse_timestamp(&row.updated_at, id)?;
    let completed_at = row
        .completed_at
        .as_deref()
        .map(|s| parse_timestamp(s, id))
        .transpose()?;

    Ok(Submission {
        id: SubmissionId::from(row.id),
        owner: OwnerId::new(row.owner),
        source_kind,
        format,
        original_filename: row.original_filename,
        raw_content: row.raw_content,
        extracted_text: row.extracted_text,
        mode,
        status,
        result,
        error_info,
        retry_count,
        lease: row.lease,
        created_at,
        updated_at,
        completed_at,
    })
}

// ─── SqliteStore ────────────────────────────────────────────────────────────

/// Status store persisted in the `submissions` table.
///
/// Compare-and-set runs inside an IMMEDIATE transaction so the read, the
/// precondition check and the write cannot interleave with another writer,
/// even across processes sharing the database file.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl StatusStore for SqliteStore {
    fn insert(&self, submission: &Submission) -> Result<(), StoreError> {
        if submission_repo::find_by_id(&self.db, submission.id.as_str())?.is_some() {
            return Err(StoreError::Duplicate(submission.id.to_string()));
        }
        submission_repo::insert(&self.db, &to_row(submission))?;
        Ok(())
    }

    fn get(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        submission_repo::find_by_id(&self.db, id.as_str())?
            .map(from_row)
            .transpose()
    }

    fn compare_and_set(
        &self,
        id: &SubmissionId,
        expected: &Precondition,
        change: StatusChange,
    ) -> Result<Option<Submission>, StoreError> {
        // Domain outcomes ride in the inner result; they are decided before
        // any write, so committing the transaction is harmless.
        self.db.with_immediate_tx(|tx| {
            let Some(row) = submission_repo::find_in(tx, id.as_str())? else {
                return Ok(Err(StoreError::NotFound(id.to_string())));
            };
            let mut submission = match from_row(row) {
                Ok(submission) => submission,
                Err(e) => return Ok(Err(e)),
            };

            if !submission.satisfies(expected) {
                return Ok(Ok(None));
            }
            if let Err(reason) = submission.apply(change, Utc::now()) {
                return Ok(Err(StoreError::InvalidTransition {
                    id: id.to_string(),
                    reason,
                }));
            }

            submission_repo::update_in(tx, &to_row(&submission))?;
            Ok(Ok(Some(submission)))
        })?
    }

    fn record_extraction(&self, id: &SubmissionId, text: &str) -> Result<bool, StoreError> {
        let updated = submission_repo::set_extracted_text(
            &self.db,
            id.as_str(),
            text,
            &format_timestamp(Utc::now()),
        )?;
        if !updated && submission_repo::find_by_id(&self.db, id.as_str())?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(updated)
    }

    fn list(&self, filter: &SubmissionFilter) -> Result<(Vec<Submission>, u64), StoreError> {
        let repo_filter = submission_repo::SubmissionFilter {
            owner: filter.owner.as_ref().map(|o| o.to_string()),
            status: filter.status.map(|s| s.as_str().to_string()),
            limit: filter.limit,
            offset: filter.offset,
        };
        let (rows, total) = submission_repo::query(&self.db, &repo_filter)?;
        let submissions = rows
            .into_iter()
            .map(from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((submissions, total))
    }

    fn delete(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        Ok(submission_repo::delete(&self.db, id.as_str())?)
    }
}
