//! Submission record and its status state machine.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Unique identifier of a submission, assigned at intake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque owner identifier supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    UploadedFile,
    RawText,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::UploadedFile => "UPLOADED_FILE",
            SourceKind::RawText => "RAW_TEXT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UPLOADED_FILE" => Some(SourceKind::UploadedFile),
            "RAW_TEXT" => Some(SourceKind::RawText),
            _ => None,
        }
    }
}

/// Input formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Format {
    Pdf,
    Docx,
    Txt,
    Plain,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Format::Pdf),
            "docx" => Some(Format::Docx),
            "txt" | "text" | "md" => Some(Format::Txt),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Pdf => "PDF",
            Format::Docx => "DOCX",
            Format::Txt => "TXT",
            Format::Plain => "PLAIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PDF" => Some(Format::Pdf),
            "DOCX" => Some(Format::Docx),
            "TXT" => Some(Format::Txt),
            "PLAIN" => Some(Format::Plain),
            _ => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested summary style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Short,
    Detailed,
    #[default]
    Both,
}

impl Mode {
    pub fn wants_short(&self) -> bool {
        matches!(self, Mode::Short | Mode::Both)
    }

    pub fn wants_detailed(&self) -> bool {
        matches!(self, Mode::Detailed | Mode::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Short => "SHORT",
            Mode::Detailed => "DETAILED",
            Mode::Both => "BOTH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "SHORT" => Some(Mode::Short),
            "DETAILED" => Some(Mode::Detailed),
            "BOTH" => Some(Mode::Both),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::parse(s).ok_or_else(|| format!("unknown mode '{}' (short, detailed, both)", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Complete | SubmissionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Processing => "PROCESSING",
            SubmissionStatus::Complete => "COMPLETE",
            SubmissionStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Some(SubmissionStatus::Pending),
            "PROCESSING" => Some(SubmissionStatus::Processing),
            "COMPLETE" => Some(SubmissionStatus::Complete),
            "FAILED" => Some(SubmissionStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One user-provided unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub owner: OwnerId,
    pub source_kind: SourceKind,
    pub format: Format,
    pub original_filename: Option<String>,
    /// Raw bytes, dropped once extraction succeeds.
    pub raw_content: Option<Vec<u8>>,
    pub extracted_text: Option<String>,
    pub mode: Mode,
    pub status: SubmissionStatus,
    pub result: Option<SummaryResult>,
    pub error_info: Option<ErrorInfo>,
    pub retry_count: u32,
    /// Token of the execution currently owning a PROCESSING submission.
    pub lease: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new_upload(
        owner: OwnerId,
        format: Format,
        filename: Option<String>,
        content: Vec<u8>,
        mode: Mode,
    ) -> Self {
        Self::new(
            owner,
            SourceKind::UploadedFile,
            format,
            filename,
            content,
            mode,
        )
    }

    pub fn new_raw_text(owner: OwnerId, text: String, mode: Mode) -> Self {
        Self::new(
            owner,
            SourceKind::RawText,
            Format::Plain,
            None,
            text.into_bytes(),
            mode,
        )
    }

    fn new(
        owner: OwnerId,
        source_kind: SourceKind,
        format: Format,
        original_filename: Option<String>,
        content: Vec<u8>,
        mode: Mode,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubmissionId::new(),
            owner,
            source_kind,
            format,
            original_filename,
            raw_content: Some(content),
            extracted_text: None,
            mode,
            status: SubmissionStatus::Pending,
            result: None,
            error_info: None,
            retry_count: 0,
            lease: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }

    pub fn satisfies(&self, expected: &Precondition) -> bool {
        if self.status != expected.status {
            return false;
        }
        match &expected.lease {
            Some(lease) => self.lease.as_deref() == Some(lease.as_str()),
            None => true,
        }
    }

    /// Sets the extracted text if none was recorded yet. Returns false when
    /// text was already present, in which case nothing changes.
    pub fn record_extraction(&mut self, text: String, now: DateTime<Utc>) -> bool {
        if self.extracted_text.is_some() {
            return false;
        }
        self.extracted_text = Some(text);
        self.raw_content = None;
        self.updated_at = now;
        true
    }

    /// Applies a status change, enforcing the lifecycle rules.
    pub fn apply(&mut self, change: StatusChange, now: DateTime<Utc>) -> Result<(), String> {
        use SubmissionStatus::*;

        match (self.status, change) {
            (Pending, StatusChange::Dispatch { lease }) => {
                if self.extracted_text.is_none() {
                    return Err("cannot dispatch before text is extracted".to_string());
                }
                self.status = Processing;
                self.lease = Some(lease);
            }
            (Processing, StatusChange::Claim { lease }) => {
                self.lease = Some(lease);
            }
            (Processing, StatusChange::Complete(result)) => {
                if result.short_summary.is_none() && result.detailed_notes.is_none() {
                    return Err("a completed submission needs a result".to_string());
                }
                self.status = Complete;
                self.result = Some(result);
                self.error_info = None;
                self.lease = None;
                self.completed_at = Some(now);
            }
            (Pending | Processing, StatusChange::Fail(info)) => {
                self.status = Failed;
                self.error_info = Some(info);
                self.result = None;
                self.lease = None;
                self.completed_at = Some(now);
            }
            (Failed, StatusChange::Retry) => {
                self.status = Pending;
                self.error_info = None;
                self.retry_count += 1;
                self.completed_at = None;
            }
            (status, change) => {
                return Err(format!("{} is not allowed from {}", change.name(), status));
            }
        }

        self.updated_at = now;
        Ok(())
    }
}

/// Expected state for a compare-and-set transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub status: SubmissionStatus,
    pub lease: Option<String>,
}

impl Precondition {
    pub fn status(status: SubmissionStatus) -> Self {
        Self {
            status,
            lease: None,
        }
    }

    /// PROCESSING and owned by the given lease.
    pub fn leased(lease: &str) -> Self {
        Self {
            status: SubmissionStatus::Processing,
            lease: Some(lease.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    /// PENDING -> PROCESSING.
    Dispatch { lease: String },
    /// Hands a PROCESSING submission to a new execution.
    Claim { lease: String },
    Complete(SummaryResult),
    Fail(ErrorInfo),
    /// FAILED -> PENDING.
    Retry,
}

impl StatusChange {
    pub fn name(&self) -> &'static str {
        match self {
            StatusChange::Dispatch { .. } => "dispatch",
            StatusChange::Claim { .. } => "claim",
            StatusChange::Complete(_) => "complete",
            StatusChange::Fail(_) => "fail",
            StatusChange::Retry => "retry",
        }
    }
}

pub fn new_lease() -> String {
    uuid::Uuid::new_v4().to_string()
}
