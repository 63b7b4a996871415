use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::submission::SubmissionStatus;

/// Failure taxonomy reported on FAILED submissions and by precondition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    TooLarge,
    NoTextFound,
    DecodeError,
    ExtractionFailed,
    SummarizationFailed,
    Timeout,
    NotFailed,
    UnsupportedFormat,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TooLarge => "TOO_LARGE",
            ErrorKind::NoTextFound => "NO_TEXT_FOUND",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::ExtractionFailed => "EXTRACTION_FAILED",
            ErrorKind::SummarizationFailed => "SUMMARIZATION_FAILED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NotFailed => "NOT_FAILED",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TOO_LARGE" => Some(ErrorKind::TooLarge),
            "NO_TEXT_FOUND" => Some(ErrorKind::NoTextFound),
            "DECODE_ERROR" => Some(ErrorKind::DecodeError),
            "EXTRACTION_FAILED" => Some(ErrorKind::ExtractionFailed),
            "SUMMARIZATION_FAILED" => Some(ErrorKind::SummarizationFailed),
            "TIMEOUT" => Some(ErrorKind::Timeout),
            "NOT_FAILED" => Some(ErrorKind::NotFailed),
            "UNSUPPORTED_FORMAT" => Some(ErrorKind::UnsupportedFormat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum DocsumError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Summarization error: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    EnvOverride { name: String, value: String },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'. Supported formats: PDF, DOCX, TXT")]
    UnsupportedFormat(String),

    #[error("Document is {size} bytes, exceeding the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("No extractable text found in document")]
    NoTextFound,

    #[error("Unable to decode text content: {0}")]
    Decode(String),

    #[error("Failed to process PDF: {0}")]
    Pdf(String),

    #[error("Failed to process DOCX: {0}")]
    Docx(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ExtractError::TooLarge { .. } => ErrorKind::TooLarge,
            ExtractError::NoTextFound => ErrorKind::NoTextFound,
            ExtractError::Decode(_) => ErrorKind::DecodeError,
            ExtractError::Pdf(_) | ExtractError::Docx(_) | ExtractError::Extraction(_) => {
                ErrorKind::ExtractionFailed
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Summarization backend failed: {0}")]
    Backend(#[from] crate::summarizer::BackendError),

    #[error("Summarization backend returned no {0} output")]
    EmptyOutput(&'static str),

    #[error("Nothing to summarize: input text is empty")]
    EmptyInput,

    #[error("Summarization timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Summarization was abandoned before completing")]
    Aborted,
}

impl SummarizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummarizeError::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::SummarizationFailed,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Submission not found: {0}")]
    NotFound(String),

    #[error("Submission already exists: {0}")]
    Duplicate(String),

    #[error("Stored submission '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Invalid transition for submission '{id}': {reason}")]
    InvalidTransition { id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job queue is full, cannot enqueue submission {0}")]
    QueueFull(String),
}

/// Errors returned synchronously by the orchestrator API.
///
/// Failures inside extraction and summarization never surface here; they are
/// recorded on the submission as a FAILED transition instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file type '{0}'. Supported formats: PDF, DOCX, TXT")]
    UnsupportedFormat(String),

    #[error("Submission not found: {0}")]
    NotFound(String),

    #[error("Submission {id} is not in failed state (current: {status})")]
    NotFailed {
        id: String,
        status: SubmissionStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Maps precondition violations onto the shared taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PipelineError::UnsupportedFormat(_) => Some(ErrorKind::UnsupportedFormat),
            PipelineError::NotFailed { .. } => Some(ErrorKind::NotFailed),
            PipelineError::NotFound(_) | PipelineError::Store(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocsumError>;
