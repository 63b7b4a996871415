//! In-process status store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{StatusStore, SubmissionFilter};
use crate::error::StoreError;
use crate::submission::{Precondition, StatusChange, Submission, SubmissionId};

struct Entry {
    /// Insertion order, used to break created_at ties.
    seq: u64,
    submission: Submission,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    entries: HashMap<SubmissionId, Entry>,
}

/// Status store backed by a `RwLock<HashMap>`.
///
/// The write lock is held across read-check-write, which makes every
/// compare-and-set atomic with respect to other callers.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl StatusStore for MemoryStore {
    fn insert(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.entries.contains_key(&submission.id) {
            return Err(StoreError::Duplicate(submission.id.to_string()));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            submission.id.clone(),
            Entry {
                seq,
                submission: submission.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.read().entries.get(id).map(|e| e.submission.clone()))
    }

    fn compare_and_set(
        &self,
        id: &SubmissionId,
        expected: &Precondition,
        change: StatusChange,
    ) -> Result<Option<Submission>, StoreError> {
        let mut inner = self.write();
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !entry.submission.satisfies(expected) {
            return Ok(None);
        }

        // Apply to a copy so a rejected change leaves the record untouched.
        let mut updated = entry.submission.clone();
        updated
            .apply(change, Utc::now())
            .map_err(|reason| StoreError::InvalidTransition {
                id: id.to_string(),
                reason,
            })?;
        entry.submission = updated.clone();
        Ok(Some(updated))
    }

    fn record_extraction(&self, id: &SubmissionId, text: &str) -> Result<bool, StoreError> {
        let mut inner = self.write();
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(entry
            .submission
            .record_extraction(text.to_string(), Utc::now()))
    }

    fn list(&self, filter: &SubmissionFilter) -> Result<(Vec<Submission>, u64), StoreError> {
        let inner = self.read();
        let mut matches: Vec<&Entry> = inner
            .entries
            .values()
            .filter(|e| {
                filter
                    .owner
                    .as_ref()
                    .is_none_or(|owner| e.submission.is_owned_by(owner))
            })
            .filter(|e| filter.status.is_none_or(|s| e.submission.status == s))
            .collect();

        matches.sort_by(|a, b| {
            b.submission
                .created_at
                .cmp(&a.submission.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let total = matches.len() as u64;
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.unwrap_or(100) as usize;
        let page = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|e| e.submission.clone())
            .collect();

        Ok((page, total))
    }

    fn delete(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        Ok(self.write().entries.remove(id).is_some())
    }
}
