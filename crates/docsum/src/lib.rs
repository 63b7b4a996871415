pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod store;
pub mod submission;
pub mod summarizer;
pub mod telemetry;
pub mod worker;

pub use broadcast::{EventBroadcaster, SubmissionEvent};
pub use config::{load_config, load_with_env, Config};
pub use error::{
    ConfigError, DocsumError, ErrorKind, ExtractError, PipelineError, Result, StoreError,
    SummarizeError, WorkerError,
};
pub use pipeline::{
    Content, Orchestrator, PipelineSettings, StatusView, SubmissionRequest,
};
pub use store::{MemoryStore, SqliteStore, StatusStore, SubmissionFilter};
pub use submission::{Format, Mode, OwnerId, SubmissionId, SubmissionStatus, SummaryResult};
pub use summarizer::{SummarizationBackend, SummarizationEngine};
