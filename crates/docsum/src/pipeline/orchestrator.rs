use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn};

use crate::broadcast::{EventBroadcaster, SubmissionEvent};
use crate::config::Config;
use crate::db::{default_database_path, Database};
use crate::error::{
    ConfigError, DocsumError, ErrorKind, PipelineError, StoreError, SummarizeError,
};
use crate::extractor::ExtractorRegistry;
use crate::store::{SqliteStore, StatusStore, SubmissionFilter};
use crate::submission::{
    new_lease, ErrorInfo, Format, Mode, OwnerId, Precondition, StatusChange, Submission,
    SubmissionId, SubmissionStatus, SummaryResult,
};
use crate::summarizer::{build_backend, SummarizationEngine};
use crate::worker::{SummarizeJob, WorkerPool};

use super::dispatch::{decide, Dispatch};
use super::executor::Executor;
use super::settings::PipelineSettings;
use super::status::StatusView;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Page size used when scanning for work to resume at startup.
const RESUME_PAGE_SIZE: u64 = 100;

/// What the user handed in.
#[derive(Debug, Clone)]
pub enum Content {
    File {
        format: Format,
        bytes: Vec<u8>,
        filename: Option<String>,
    },
    RawText(String),
}

#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub owner: OwnerId,
    pub content: Content,
    pub mode: Mode,
}

/// Drives submissions through PENDING, PROCESSING and a terminal state.
///
/// Extraction and summarization failures never surface from these methods;
/// they land on the submission as FAILED with an [`ErrorKind`].
pub struct Orchestrator {
    store: Arc<dyn StatusStore>,
    executor: Arc<Executor>,
    engine: SummarizationEngine,
    extractors: ExtractorRegistry,
    settings: RwLock<Arc<PipelineSettings>>,
    events: EventBroadcaster,
    pool: WorkerPool,
}

impl Orchestrator {
    /// Builds the orchestrator and re-queues every submission the store
    /// still holds as PROCESSING.
    pub fn new(
        store: Arc<dyn StatusStore>,
        engine: SummarizationEngine,
        settings: PipelineSettings,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, DocsumError> {
        let events = EventBroadcaster::default();
        let executor = Arc::new(Executor::new(
            Arc::clone(&store),
            engine.clone(),
            events.clone(),
        ));
        let pool = WorkerPool::new(executor.clone(), worker_count, queue_capacity)?;

        let orchestrator = Self {
            store,
            executor,
            engine,
            extractors: ExtractorRegistry::new(),
            settings: RwLock::new(Arc::new(settings)),
            events,
            pool,
        };
        orchestrator.resume_processing()?;
        Ok(orchestrator)
    }

    /// Production constructor: SQLite store, configured backend and pool.
    pub fn from_config(config: &Config) -> Result<Self, DocsumError> {
        let db_path = match &config.database_path {
            Some(path) => path.clone(),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "cannot determine home directory for the database".to_string(),
            })?,
        };
        let db = Database::open(&db_path)?;
        let backend = build_backend(&config.summarizer)?;

        info!(
            database = %db_path.display(),
            backend = backend.name(),
            workers = config.worker_count,
            "orchestrator starting"
        );

        Self::new(
            Arc::new(SqliteStore::new(db)),
            SummarizationEngine::new(backend),
            PipelineSettings::from_config(config),
            config.worker_count,
            config.queue_capacity,
        )
    }

    // ─── Intake ─────────────────────────────────────────────────────────────

    /// Records a new submission and drives it as far as dispatch allows.
    ///
    /// Texts within the sync threshold come back COMPLETE or FAILED; larger
    /// ones come back PROCESSING and finish on a worker.
    pub fn submit(&self, request: SubmissionRequest) -> Result<StatusView, PipelineError> {
        let submission = match request.content {
            Content::File {
                format,
                bytes,
                filename,
            } => Submission::new_upload(request.owner, format, filename, bytes, request.mode),
            Content::RawText(text) => {
                Submission::new_raw_text(request.owner, text, request.mode)
            }
        };

        let _span = info_span!(
            "pipeline.intake",
            submission_id = %submission.id,
            format = %submission.format,
            mode = %submission.mode
        )
        .entered();

        self.store.insert(&submission)?;
        self.events
            .send(SubmissionEvent::from_submission(&submission, None));
        info!(
            bytes = submission.raw_content.as_ref().map_or(0, |c| c.len()),
            "submission received"
        );

        self.advance(&submission.id, self.settings())?;
        self.status(&submission.id)
    }

    /// Intake for an uploaded file; the format comes from the file extension.
    pub fn submit_upload(
        &self,
        owner: OwnerId,
        filename: &str,
        bytes: Vec<u8>,
        mode: Mode,
    ) -> Result<StatusView, PipelineError> {
        let format = Format::from_filename(filename)
            .ok_or_else(|| PipelineError::UnsupportedFormat(filename.to_string()))?;

        self.submit(SubmissionRequest {
            owner,
            content: Content::File {
                format,
                bytes,
                filename: Some(filename.to_string()),
            },
            mode,
        })
    }

    pub fn submit_text(
        &self,
        owner: OwnerId,
        text: String,
        mode: Mode,
    ) -> Result<StatusView, PipelineError> {
        self.submit(SubmissionRequest {
            owner,
            content: Content::RawText(text),
            mode,
        })
    }

    /// Extracts if needed, then dispatches a PENDING submission. Does
    /// nothing when the submission is no longer PENDING.
    fn advance(
        &self,
        id: &SubmissionId,
        settings: Arc<PipelineSettings>,
    ) -> Result<(), PipelineError> {
        let submission = self
            .store
            .get(id)?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;
        if submission.status != SubmissionStatus::Pending {
            debug!(submission_id = %id, status = %submission.status, "not pending, skipping");
            return Ok(());
        }

        let text = match submission.extracted_text {
            Some(text) => text,
            None => {
                let raw = submission.raw_content.as_deref().unwrap_or_default();
                match self
                    .extractors
                    .extract(raw, submission.format, &settings.extract_limits())
                {
                    Ok(text) => {
                        if !self.store.record_extraction(id, &text)? {
                            debug!(submission_id = %id, "text was already recorded");
                        }
                        text
                    }
                    Err(e) => {
                        warn!(submission_id = %id, kind = %e.kind(), "extraction failed: {}", e);
                        self.executor.transition(
                            id,
                            &Precondition::status(SubmissionStatus::Pending),
                            StatusChange::Fail(ErrorInfo::new(e.kind(), e.to_string())),
                        )?;
                        return Ok(());
                    }
                }
            }
        };

        let lease = new_lease();
        let dispatched = self.executor.transition(
            id,
            &Precondition::status(SubmissionStatus::Pending),
            StatusChange::Dispatch {
                lease: lease.clone(),
            },
        )?;
        if dispatched.is_none() {
            debug!(submission_id = %id, "dispatched elsewhere");
            return Ok(());
        }

        let chars = text.chars().count();
        match decide(&text, settings.sync_size_threshold_chars) {
            Dispatch::Inline => {
                debug!(submission_id = %id, chars, "summarizing inline");
                self.executor.execute(id, &lease, &settings)?;
            }
            Dispatch::Queued => {
                debug!(submission_id = %id, chars, "queueing summarization");
                self.enqueue(SummarizeJob::new(id.clone(), lease, settings))?;
            }
        }

        Ok(())
    }

    /// Queues a job. When the queue stays full or is closed the submission
    /// fails, so it can be retried.
    fn enqueue(&self, job: SummarizeJob) -> Result<bool, StoreError> {
        let id = job.submission_id.clone();
        let expected = job.claim_precondition();
        match self.pool.submit(job) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(submission_id = %id, "could not enqueue job: {}", e);
                self.executor.transition(
                    &id,
                    &expected,
                    StatusChange::Fail(ErrorInfo::new(
                        ErrorKind::SummarizationFailed,
                        format!("Job queue unavailable: {}", e),
                    )),
                )?;
                Ok(false)
            }
        }
    }

    /// Re-queues PROCESSING submissions left by an earlier run. Each job
    /// carries the stored lease, so at most one execution claims it.
    fn resume_processing(&self) -> Result<usize, StoreError> {
        let mut stranded = Vec::new();
        let mut offset = 0;
        loop {
            let (page, _) = self.store.list(&SubmissionFilter {
                status: Some(SubmissionStatus::Processing),
                limit: Some(RESUME_PAGE_SIZE),
                offset: Some(offset),
                ..Default::default()
            })?;
            let fetched = page.len() as u64;
            stranded.extend(page);
            if fetched < RESUME_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        if stranded.is_empty() {
            return Ok(0);
        }

        let settings = self.settings();
        let mut resumed = 0;
        for submission in stranded {
            let job = SummarizeJob::resume(
                submission.id.clone(),
                submission.lease.clone(),
                Arc::clone(&settings),
            );
            if self.enqueue(job)? {
                resumed += 1;
            }
        }
        info!(resumed, "resumed processing submissions");
        Ok(resumed)
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn status(&self, id: &SubmissionId) -> Result<StatusView, PipelineError> {
        self.find(id).map(|sub| StatusView::from(&sub))
    }

    /// Like [`status`](Self::status), but submissions of other owners are
    /// reported as not found.
    pub fn status_for_owner(
        &self,
        id: &SubmissionId,
        owner: &OwnerId,
    ) -> Result<StatusView, PipelineError> {
        self.find_owned(id, owner).map(|sub| StatusView::from(&sub))
    }

    /// Lists the owner's submissions, newest first. Returns the page and the
    /// total number of matches.
    pub fn list(
        &self,
        owner: &OwnerId,
        mut filter: SubmissionFilter,
    ) -> Result<(Vec<StatusView>, u64), PipelineError> {
        filter.owner = Some(owner.clone());
        let (page, total) = self.store.list(&filter)?;
        Ok((page.iter().map(StatusView::from).collect(), total))
    }

    /// Polls until the submission is terminal or `timeout` elapses, and
    /// returns the last observed state either way.
    pub fn wait_for_terminal(
        &self,
        id: &SubmissionId,
        timeout: Duration,
    ) -> Result<StatusView, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            let view = self.status(id)?;
            if view.is_terminal() || Instant::now() >= deadline {
                return Ok(view);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    // ─── Retry ──────────────────────────────────────────────────────────────

    /// Moves a FAILED submission back to PENDING and dispatches it again
    /// under the current settings. Any other status yields `NotFailed`
    /// without touching the submission.
    pub fn retry(&self, id: &SubmissionId) -> Result<StatusView, PipelineError> {
        let submission = self.find(id)?;
        self.retry_submission(submission)
    }

    pub fn retry_for_owner(
        &self,
        id: &SubmissionId,
        owner: &OwnerId,
    ) -> Result<StatusView, PipelineError> {
        let submission = self.find_owned(id, owner)?;
        self.retry_submission(submission)
    }

    fn retry_submission(&self, submission: Submission) -> Result<StatusView, PipelineError> {
        let id = submission.id.clone();
        if submission.status != SubmissionStatus::Failed {
            return Err(PipelineError::NotFailed {
                id: id.to_string(),
                status: submission.status,
            });
        }

        let _span = info_span!("pipeline.retry", submission_id = %id).entered();

        let retried = self.executor.transition(
            &id,
            &Precondition::status(SubmissionStatus::Failed),
            StatusChange::Retry,
        )?;
        let Some(retried) = retried else {
            // Someone else retried first.
            let current = self.find(&id)?;
            return Err(PipelineError::NotFailed {
                id: id.to_string(),
                status: current.status,
            });
        };
        info!(retry_count = retried.retry_count, "submission retried");

        self.advance(&id, self.settings())?;
        self.status(&id)
    }

    // ─── Direct summarization ───────────────────────────────────────────────

    /// Summarizes text directly, without creating a submission.
    pub fn summarize_text(&self, text: &str, mode: Mode) -> Result<SummaryResult, SummarizeError> {
        let settings = self.settings();
        let text = crate::extractor::truncate_chars(text.trim(), settings.max_extract_chars);
        self.engine
            .summarize(&text, mode, &settings.summary_options())
    }

    // ─── Settings, events, lifecycle ────────────────────────────────────────

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<PipelineSettings> {
        match self.settings.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => {
                warn!("Settings lock was poisoned, recovering");
                Arc::clone(&*poisoned.into_inner())
            }
        }
    }

    /// Replaces the settings used by future dispatches.
    pub fn update_settings(&self, settings: PipelineSettings) {
        let mut guard = match self.settings.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = Arc::new(settings);
        info!("pipeline settings updated");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    pub fn delete_for_owner(&self, id: &SubmissionId, owner: &OwnerId) -> Result<(), PipelineError> {
        self.find_owned(id, owner)?;
        self.store.delete(id)?;
        Ok(())
    }

    /// Stops intake, lets the workers finish every queued job, then joins
    /// them.
    pub fn shutdown(self) {
        self.pool.shutdown();
        self.pool.wait();
    }

    fn find(&self, id: &SubmissionId) -> Result<Submission, PipelineError> {
        self.store
            .get(id)?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    fn find_owned(&self, id: &SubmissionId, owner: &OwnerId) -> Result<Submission, PipelineError> {
        match self.find(id) {
            Ok(sub) if sub.is_owned_by(owner) => Ok(sub),
            Ok(_) => Err(PipelineError::NotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }
}
