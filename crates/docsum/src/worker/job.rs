use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::pipeline::PipelineSettings;
use crate::submission::{Precondition, SubmissionId, SubmissionStatus};

/// A queued summarization of one PROCESSING submission.
#[derive(Debug, Clone)]
pub struct SummarizeJob {
    pub id: String,
    pub submission_id: SubmissionId,
    /// Lease the submission held when the job was enqueued. `None` claims
    /// any PROCESSING submission.
    pub lease: Option<String>,
    /// Settings captured at dispatch time.
    pub settings: Arc<PipelineSettings>,
    pub enqueued_at: DateTime<Utc>,
}

impl SummarizeJob {
    pub fn new(submission_id: SubmissionId, lease: String, settings: Arc<PipelineSettings>) -> Self {
        Self::with_lease(submission_id, Some(lease), settings)
    }

    /// Job for a submission found PROCESSING at startup, carrying whatever
    /// lease is stored for it.
    pub fn resume(
        submission_id: SubmissionId,
        lease: Option<String>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self::with_lease(submission_id, lease, settings)
    }

    fn with_lease(
        submission_id: SubmissionId,
        lease: Option<String>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            submission_id,
            lease,
            settings,
            enqueued_at: Utc::now(),
        }
    }

    /// What the submission must look like for a worker to claim it.
    pub fn claim_precondition(&self) -> Precondition {
        match &self.lease {
            Some(lease) => Precondition::leased(lease),
            None => Precondition::status(SubmissionStatus::Processing),
        }
    }
}
