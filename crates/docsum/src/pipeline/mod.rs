//! Submission lifecycle: intake, extraction, dispatch, summarization, retry.

pub mod dispatch;
pub mod executor;
pub mod orchestrator;
pub mod settings;
pub mod status;

pub use dispatch::{decide, Dispatch};
pub use executor::Executor;
pub use orchestrator::{Content, Orchestrator, SubmissionRequest};
pub use settings::PipelineSettings;
pub use status::{status_message, StatusView};
