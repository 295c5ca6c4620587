//! Local persistence for engine diagnostics.
//!
//! # Responsibility
//! - Define the process-local key-value contract used by the sync log.
//! - Isolate SQLite details from the sync layer.
//!
//! # Invariants
//! - Writes replace the whole value stored under a key.

pub mod kv_repo;
