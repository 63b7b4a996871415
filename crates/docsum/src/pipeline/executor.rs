use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::broadcast::{EventBroadcaster, SubmissionEvent};
use crate::error::{ErrorKind, StoreError};
use crate::store::StatusStore;
use crate::submission::{
    new_lease, ErrorInfo, Precondition, StatusChange, Submission, SubmissionId,
};
use crate::summarizer::SummarizationEngine;
use crate::worker::{JobHandler, SummarizeJob};

use super::settings::PipelineSettings;

/// Performs guarded status transitions and runs summarization for
/// PROCESSING submissions, inline or on a worker.
pub struct Executor {
    store: Arc<dyn StatusStore>,
    engine: SummarizationEngine,
    events: EventBroadcaster,
}

impl Executor {
    pub fn new(
        store: Arc<dyn StatusStore>,
        engine: SummarizationEngine,
        events: EventBroadcaster,
    ) -> Self {
        Self {
            store,
            engine,
            events,
        }
    }

    /// Compare-and-set through the store, announcing status changes.
    pub fn transition(
        &self,
        id: &SubmissionId,
        expected: &Precondition,
        change: StatusChange,
    ) -> Result<Option<Submission>, StoreError> {
        let change_name = change.name();
        let updated = self.store.compare_and_set(id, expected, change)?;

        match &updated {
            Some(sub) if sub.status != expected.status => {
                debug!(submission_id = %id, from = %expected.status, to = %sub.status, "transition");
                self.events
                    .send(SubmissionEvent::from_submission(sub, Some(expected.status)));
            }
            Some(_) => {}
            None => {
                debug!(submission_id = %id, change = change_name, "precondition no longer holds");
            }
        }

        Ok(updated)
    }

    /// Summarizes a PROCESSING submission held under `lease` and records the
    /// terminal state. Returns `None` if the lease was lost along the way.
    pub fn execute(
        &self,
        id: &SubmissionId,
        lease: &str,
        settings: &PipelineSettings,
    ) -> Result<Option<Submission>, StoreError> {
        let held = Precondition::leased(lease);
        let submission = self
            .store
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let _span = info_span!(
            "pipeline.execute",
            submission_id = %id,
            mode = %submission.mode,
            backend = self.engine.backend_name()
        )
        .entered();

        if !submission.satisfies(&held) {
            debug!("lease no longer held, skipping");
            return Ok(None);
        }

        let change = match submission.extracted_text.as_deref() {
            Some(text) => {
                match self
                    .engine
                    .summarize(text, submission.mode, &settings.summary_options())
                {
                    Ok(result) => StatusChange::Complete(result),
                    Err(e) => {
                        warn!(kind = %e.kind(), "summarization failed: {}", e);
                        StatusChange::Fail(ErrorInfo::new(e.kind(), e.to_string()))
                    }
                }
            }
            None => StatusChange::Fail(ErrorInfo::new(
                ErrorKind::ExtractionFailed,
                "Submission was dispatched without extracted text",
            )),
        };

        let updated = self.transition(id, &held, change)?;
        match &updated {
            Some(sub) => info!(status = %sub.status, "submission finished"),
            None => warn!("lease lost before the result could be recorded"),
        }
        Ok(updated)
    }

    /// Claims a queued job by swapping its lease for a fresh one, then
    /// executes it. A job whose lease is stale is dropped.
    pub fn run_job(&self, job: SummarizeJob) -> Result<Option<Submission>, StoreError> {
        let lease = new_lease();
        let claimed = self.transition(
            &job.submission_id,
            &job.claim_precondition(),
            StatusChange::Claim {
                lease: lease.clone(),
            },
        )?;

        if claimed.is_none() {
            info!(submission_id = %job.submission_id, job_id = %job.id, "job already claimed, dropping");
            return Ok(None);
        }

        self.execute(&job.submission_id, &lease, &job.settings)
    }
}

impl JobHandler for Executor {
    fn handle(&self, job: SummarizeJob) {
        let submission_id = job.submission_id.clone();
        if let Err(e) = self.run_job(job) {
            // Without a store the outcome cannot be recorded; the submission
            // stays PROCESSING.
            error!(submission_id = %submission_id, "job failed: {}", e);
        }
    }
}
