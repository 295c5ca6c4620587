//! Client-side shopping list synchronization engine.
//!
//! # Responsibility
//! - Keep caller-owned container state consistent with a remote store that
//!   accepts full replacement documents.
//! - Compose deep copy, sanitization, document building, bounded retry and
//!   per-item locking into `SyncEngine` operations.
//!
//! # Invariants
//! - Persist resolves strictly before caller-visible state changes.
//! - Only sanitized lists are ever persisted or committed.
//!
//! # See also
//! - crate::model::shopping

pub mod config;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod lock;
pub mod payload;
pub mod persist;
pub mod retry;
pub mod sanitize;
pub mod snapshot;
pub mod sync_log;
