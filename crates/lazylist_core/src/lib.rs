//! Core sync logic for LazyList shopping lists.
//! This crate is the single source of truth for shopping list invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::shopping::{Category, Container, ContainerId, Item, ShoppingSummary};
pub use repo::kv_repo::{KeyValueStore, KvStoreError, MemoryKvStore, SqliteKvStore};
pub use sync::config::{ConfigError, RetryConfig, SyncConfig};
pub use sync::consistency::{check_consistency, ConsistencyIssue, ConsistencyReport};
pub use sync::engine::{
    CategoryTarget, CollectionCommit, DetailCommit, SyncEngine, SyncReport,
};
pub use sync::error::{NotFoundTarget, PersistError, SyncError};
pub use sync::lock::{OperationKey, OperationKind, OperationLockRegistry};
pub use sync::payload::{build_update_document, UpdateDocument};
pub use sync::persist::{MemoryPersister, PersistCall, Persister};
pub use sync::retry::{run_with_retry, Retried, RetryExhausted};
pub use sync::sanitize::{sanitize_categories, sanitize_raw, SanitizeReport};
pub use sync::snapshot::snapshot_container;
pub use sync::sync_log::{SyncLog, SyncLogEntry, SYNC_LOG_STORAGE_KEY};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
