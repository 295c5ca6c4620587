//! Bounded diagnostic log of sync outcomes.
//!
//! # Responsibility
//! - Keep the most recent sync outcomes for debugging tools.
//! - Mirror the buffer into a process-local key-value store.
//!
//! # Invariants
//! - At most `capacity` entries are kept; the oldest entry is evicted first.
//! - Store failures are logged and never surface to engine callers.
//! - The store write happens synchronously inside `record`, after the
//!   operation outcome is final and never across an await. Mirrored stores
//!   must be local and fast (`MemoryKvStore`, `SqliteKvStore`); a store that
//!   can block on I/O should not be mirrored; use `SyncLog::in_memory` and
//!   export `entries()` instead.

use crate::repo::kv_repo::KeyValueStore;
use crate::sync::config::DEFAULT_LOG_CAPACITY;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage key read by external debugging tools.
pub const SYNC_LOG_STORAGE_KEY: &str = "shoppingListSyncLogs";

/// One recorded operation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub timestamp: DateTime<Utc>,
    pub container_id: String,
    pub operation: String,
    pub success: bool,
    pub details: String,
}

struct SyncLogState {
    entries: VecDeque<SyncLogEntry>,
    store: Option<Box<dyn KeyValueStore>>,
}

/// Ring buffer of `SyncLogEntry` values.
pub struct SyncLog {
    capacity: usize,
    state: Mutex<SyncLogState>,
}

impl Default for SyncLog {
    fn default() -> Self {
        Self::in_memory(DEFAULT_LOG_CAPACITY)
    }
}

impl SyncLog {
    /// Creates a log that is not mirrored anywhere.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(SyncLogState {
                entries: VecDeque::new(),
                store: None,
            }),
        }
    }

    /// Creates a log mirrored into `store`, restoring entries already there.
    ///
    /// Unreadable stored data is discarded with a warning.
    pub fn load(store: Box<dyn KeyValueStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = match store.get(SYNC_LOG_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SyncLogEntry>>(&raw) {
                Ok(entries) => VecDeque::from(entries),
                Err(err) => {
                    warn!("event=sync_log_load module=sync status=error error_code=decode_failed error={err}");
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(err) => {
                warn!("event=sync_log_load module=sync status=error error_code=store_read_failed error={err}");
                VecDeque::new()
            }
        };
        while entries.len() > capacity {
            entries.pop_front();
        }

        Self {
            capacity,
            state: Mutex::new(SyncLogState {
                entries,
                store: Some(store),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends one entry stamped with the current time.
    pub fn record(
        &self,
        container_id: &str,
        operation: &str,
        success: bool,
        details: impl Into<String>,
    ) {
        self.push(SyncLogEntry {
            timestamp: Utc::now(),
            container_id: container_id.to_string(),
            operation: operation.to_string(),
            success,
            details: details.into(),
        });
    }

    pub fn push(&self, entry: SyncLogEntry) {
        let mut state = self.lock_state();
        state.entries.push_back(entry);
        while state.entries.len() > self.capacity {
            state.entries.pop_front();
        }
        persist_entries(&mut state);
    }

    /// Returns entries oldest first.
    pub fn entries(&self) -> Vec<SyncLogEntry> {
        self.lock_state().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.entries.clear();
        if let Some(store) = state.store.as_mut() {
            if let Err(err) = store.remove(SYNC_LOG_STORAGE_KEY) {
                warn!("event=sync_log_clear module=sync status=error error={err}");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncLogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn persist_entries(state: &mut SyncLogState) {
    let SyncLogState { entries, store } = state;
    let Some(store) = store.as_mut() else {
        return;
    };
    let raw = match serde_json::to_string(&*entries) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("event=sync_log_persist module=sync status=error error_code=encode_failed error={err}");
            return;
        }
    };
    if let Err(err) = store.set(SYNC_LOG_STORAGE_KEY, &raw) {
        warn!("event=sync_log_persist module=sync status=error error_code=store_write_failed error={err}");
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncLog, SyncLogEntry, SYNC_LOG_STORAGE_KEY};
    use crate::repo::kv_repo::{KeyValueStore, KvResult, MemoryKvStore};
    use std::sync::{Arc, Mutex};

    /// Store sharing its map with the test so writes can be inspected.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryKvStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> KvResult<Option<String>> {
            self.0.lock().unwrap().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
            self.0.lock().unwrap().set(key, value)
        }

        fn remove(&mut self, key: &str) -> KvResult<()> {
            self.0.lock().unwrap().remove(key)
        }
    }

    #[test]
    fn evicts_oldest_entries_beyond_capacity() {
        let log = SyncLog::in_memory(3);
        for index in 0..5 {
            log.record("t1", "add_or_update_item", true, format!("n={index}"));
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].details, "n=2");
        assert_eq!(entries[2].details, "n=4");
    }

    #[test]
    fn mirrors_entries_under_storage_key_and_reloads_them() {
        let store = SharedStore::default();
        let log = SyncLog::load(Box::new(store.clone()), 50);
        log.record("t1", "delete_item", false, "persist failed");

        let raw = store
            .get(SYNC_LOG_STORAGE_KEY)
            .unwrap()
            .expect("entries should be mirrored");
        let stored: Vec<SyncLogEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(raw.contains("\"containerId\":\"t1\""));

        let reloaded = SyncLog::load(Box::new(store), 50);
        assert_eq!(reloaded.entries(), log.entries());
    }

    #[test]
    fn corrupt_stored_value_is_discarded() {
        let mut store = MemoryKvStore::new();
        store.set(SYNC_LOG_STORAGE_KEY, "{not json").unwrap();
        let log = SyncLog::load(Box::new(store), 50);
        assert!(log.is_empty());
    }

    #[test]
    fn clear_removes_stored_value() {
        let store = SharedStore::default();
        let log = SyncLog::load(Box::new(store.clone()), 50);
        log.record("t1", "toggle_item_completion", true, "ok");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(store.get(SYNC_LOG_STORAGE_KEY).unwrap(), None);
    }
}
