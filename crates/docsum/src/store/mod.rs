//! Status store: the single source of truth for submission lifecycle state.
//!
//! Every status write goes through [`StatusStore::compare_and_set`], which
//! applies a [`StatusChange`] atomically only when the stored record still
//! matches the expected [`Precondition`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::submission::{
    OwnerId, Precondition, StatusChange, Submission, SubmissionId, SubmissionStatus,
};

/// Listing parameters. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub owner: Option<OwnerId>,
    pub status: Option<SubmissionStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SubmissionFilter {
    pub fn for_owner(owner: &OwnerId) -> Self {
        Self {
            owner: Some(owner.clone()),
            ..Default::default()
        }
    }
}

pub trait StatusStore: Send + Sync {
    /// Persists a new submission. Fails with `Duplicate` if the id exists.
    fn insert(&self, submission: &Submission) -> Result<(), StoreError>;

    fn get(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// Applies `change` if the record satisfies `expected`.
    ///
    /// Returns `Ok(None)` when the precondition does not hold (another actor
    /// got there first) and the updated record otherwise.
    fn compare_and_set(
        &self,
        id: &SubmissionId,
        expected: &Precondition,
        change: StatusChange,
    ) -> Result<Option<Submission>, StoreError>;

    /// Stores extracted text once; later calls are ignored and return false.
    fn record_extraction(&self, id: &SubmissionId, text: &str) -> Result<bool, StoreError>;

    /// Returns the matching page plus the total number of matches.
    fn list(&self, filter: &SubmissionFilter) -> Result<(Vec<Submission>, u64), StoreError>;

    fn delete(&self, id: &SubmissionId) -> Result<bool, StoreError>;
}
