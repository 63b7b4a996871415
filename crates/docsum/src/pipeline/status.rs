use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::submission::{
    ErrorInfo, Format, Mode, SourceKind, Submission, SubmissionId, SubmissionStatus, SummaryResult,
};

const PENDING_MESSAGE: &str = "Summary generation queued. Please check back shortly.";
const PROCESSING_MESSAGE: &str = "Summary is being generated. Please check back in a moment.";
const FAILED_MESSAGE: &str = "Summary generation failed. You can retry.";
const COMPLETE_MESSAGE: &str = "Summary is ready.";

pub fn status_message(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Pending => PENDING_MESSAGE,
        SubmissionStatus::Processing => PROCESSING_MESSAGE,
        SubmissionStatus::Complete => COMPLETE_MESSAGE,
        SubmissionStatus::Failed => FAILED_MESSAGE,
    }
}

/// Read-only projection of a submission returned by status queries.
///
/// Carries no raw content or extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub id: SubmissionId,
    pub status: SubmissionStatus,
    pub source_kind: SourceKind,
    pub format: Format,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SummaryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
    pub retry_count: u32,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusView {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<&Submission> for StatusView {
    fn from(sub: &Submission) -> Self {
        Self {
            id: sub.id.clone(),
            status: sub.status,
            source_kind: sub.source_kind,
            format: sub.format,
            original_filename: sub.original_filename.clone(),
            mode: sub.mode,
            result: sub.result.clone(),
            error_info: sub.error_info.clone(),
            retry_count: sub.retry_count,
            message: status_message(sub.status).to_string(),
            created_at: sub.created_at,
            updated_at: sub.updated_at,
            completed_at: sub.completed_at,
        }
    }
}
