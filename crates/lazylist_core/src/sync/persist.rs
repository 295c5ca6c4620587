//! Persist collaborator contract and an in-process implementation.
//!
//! # Responsibility
//! - Define the async seam the engine calls to store a full document.
//! - Provide `MemoryPersister` for hosts without a backend and for tests.
//!
//! # Invariants
//! - A persist call replaces the whole stored document for the container;
//!   repeating the same call is therefore safe.

use crate::sync::error::PersistError;
use crate::sync::payload::UpdateDocument;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Remote store accepting full replacement documents.
#[async_trait]
pub trait Persister: Send + Sync {
    async fn persist(
        &self,
        container_id: &str,
        document: &UpdateDocument,
        user_id: &str,
    ) -> Result<(), PersistError>;
}

/// One call observed by `MemoryPersister`.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistCall {
    pub container_id: String,
    pub user_id: String,
    pub document: UpdateDocument,
    pub succeeded: bool,
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<String, UpdateDocument>,
    calls: Vec<PersistCall>,
    scripted_failures: VecDeque<PersistError>,
    always_fail: Option<PersistError>,
}

/// In-process persister with scripted failures and optional latency.
#[derive(Default)]
pub struct MemoryPersister {
    latency: Duration,
    state: Mutex<MemoryState>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends every call for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            state: Mutex::default(),
        }
    }

    /// Makes the next calls fail, one scripted error per call.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = PersistError>) {
        self.lock_state().scripted_failures.extend(errors);
    }

    /// Makes every call fail with `error` until cleared with `None`.
    pub fn fail_always(&self, error: Option<PersistError>) {
        self.lock_state().always_fail = error;
    }

    pub fn call_count(&self) -> usize {
        self.lock_state().calls.len()
    }

    pub fn calls(&self) -> Vec<PersistCall> {
        self.lock_state().calls.clone()
    }

    /// Last successfully stored document for `container_id`.
    pub fn document(&self, container_id: &str) -> Option<UpdateDocument> {
        self.lock_state().documents.get(container_id).cloned()
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Persister for MemoryPersister {
    async fn persist(
        &self,
        container_id: &str,
        document: &UpdateDocument,
        user_id: &str,
    ) -> Result<(), PersistError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.lock_state();
        let failure = match state.scripted_failures.pop_front() {
            Some(err) => Some(err),
            None => state.always_fail.clone(),
        };
        state.calls.push(PersistCall {
            container_id: container_id.to_string(),
            user_id: user_id.to_string(),
            document: document.clone(),
            succeeded: failure.is_none(),
        });
        if let Some(err) = failure {
            return Err(err);
        }
        state
            .documents
            .insert(container_id.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryPersister, Persister};
    use crate::model::shopping::Container;
    use crate::sync::error::PersistError;
    use crate::sync::payload::build_update_document;

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let persister = MemoryPersister::new();
        let document = build_update_document(&Container::new("t1", "Groceries"));
        persister.fail_next([PersistError::Timeout]);

        let first = persister.persist("t1", &document, "u1").await;
        assert_eq!(first, Err(PersistError::Timeout));
        assert!(persister.document("t1").is_none());

        persister
            .persist("t1", &document, "u1")
            .await
            .expect("second call should succeed");
        assert_eq!(persister.call_count(), 2);
        assert_eq!(persister.document("t1"), Some(document));
        assert!(!persister.calls()[0].succeeded);
    }
}
