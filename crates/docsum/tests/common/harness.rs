//! Test harness wiring an orchestrator to an isolated store.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use docsum::db::Database;
use docsum::pipeline::{Orchestrator, PipelineSettings, StatusView};
use docsum::store::{MemoryStore, SqliteStore, StatusStore};
use docsum::submission::{OwnerId, SubmissionId};
use docsum::summarizer::{ExtractiveBackend, SummarizationBackend, SummarizationEngine};

const WORKERS: usize = 2;
const QUEUE_CAPACITY: usize = 16;

/// Owns a temporary directory and an orchestrator built on top of it.
pub struct TestHarness {
    pub temp_dir: TempDir,
    orchestrator: Option<Orchestrator>,
}

impl TestHarness {
    /// In-memory store, extractive backend, default settings.
    pub fn new() -> Self {
        Self::with_backend(
            Arc::new(ExtractiveBackend::default()),
            PipelineSettings::default(),
        )
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self::with_backend(Arc::new(ExtractiveBackend::default()), settings)
    }

    pub fn with_backend(
        backend: Arc<dyn SummarizationBackend>,
        settings: PipelineSettings,
    ) -> Self {
        Self::build(Arc::new(MemoryStore::new()), backend, settings)
    }

    /// SQLite store in the harness's temp directory.
    pub fn with_sqlite(settings: PipelineSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("docsum.db")).expect("Failed to open database");
        let orchestrator = Orchestrator::new(
            Arc::new(SqliteStore::new(db)),
            SummarizationEngine::new(Arc::new(ExtractiveBackend::default())),
            settings,
            WORKERS,
            QUEUE_CAPACITY,
        )
        .expect("Failed to build orchestrator");

        Self {
            temp_dir,
            orchestrator: Some(orchestrator),
        }
    }

    /// SQLite store at a caller-owned path, so tests can stop one
    /// orchestrator and start another on the same file.
    pub fn with_sqlite_at(
        db_path: &Path,
        backend: Arc<dyn SummarizationBackend>,
        settings: PipelineSettings,
    ) -> Self {
        let db = Database::open(db_path).expect("Failed to open database");
        Self::build(Arc::new(SqliteStore::new(db)), backend, settings)
    }

    pub fn build(
        store: Arc<dyn StatusStore>,
        backend: Arc<dyn SummarizationBackend>,
        settings: PipelineSettings,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let orchestrator = Orchestrator::new(
            store,
            SummarizationEngine::new(backend),
            settings,
            WORKERS,
            QUEUE_CAPACITY,
        )
        .expect("Failed to build orchestrator");

        Self {
            temp_dir,
            orchestrator: Some(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        self.orchestrator
            .as_ref()
            .expect("orchestrator already shut down")
    }

    pub fn owner(&self) -> OwnerId {
        OwnerId::new("alice")
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("docsum.db")
    }

    /// Waits up to ten seconds for a terminal status.
    pub fn wait(&self, id: &SubmissionId) -> StatusView {
        self.orchestrator()
            .wait_for_terminal(id, Duration::from_secs(10))
            .expect("status lookup failed")
    }

    /// Stops the workers, keeping the temp directory alive.
    pub fn shutdown(&mut self) {
        if let Some(orchestrator) = self.orchestrator.take() {
            orchestrator.shutdown();
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown();
    }
}
