//! Error taxonomy for shopping list synchronization.
//!
//! # Responsibility
//! - Define the failures that cross the engine boundary.
//! - Define the failure shape persist collaborators report.
//!
//! # Invariants
//! - Only `SyncError` values are returned to callers of engine operations.
//! - Validation warnings are never errors; see `sanitize::SanitizeReport`.

use crate::sync::lock::OperationKey;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a persist collaborator for one attempt.
///
/// Every variant is treated as transient by the retry executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// Request did not resolve in the collaborator's time budget.
    Timeout,
    /// Network or transport level failure.
    Transport(String),
    /// Remote store answered with a non-success status.
    Rejected { status: u16, message: String },
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "persist request timed out"),
            Self::Transport(message) => write!(f, "persist transport failure: {message}"),
            Self::Rejected { status, message } => {
                write!(f, "persist rejected with status {status}: {message}")
            }
        }
    }
}

impl Error for PersistError {}

/// Entity an operation referenced but could not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundTarget {
    Container(String),
    Category { container_id: String, category_id: String },
    Item { container_id: String, category_id: String, item_id: String },
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(id) => write!(f, "container not found: {id}"),
            Self::Category {
                container_id,
                category_id,
            } => write!(
                f,
                "category not found: {category_id} (container {container_id})"
            ),
            Self::Item {
                container_id,
                category_id,
                item_id,
            } => write!(
                f,
                "item not found: {item_id} (container {container_id}, category {category_id})"
            ),
        }
    }
}

/// Terminal result of a failed engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Same operation on the same item is already in flight.
    LockConflict(OperationKey),
    /// Referenced entity is absent from the supplied collection.
    NotFound(NotFoundTarget),
    /// Persist failed on every attempt.
    TerminalPersist { attempts: u32, source: PersistError },
}

impl SyncError {
    /// Stable machine-readable code used in logs and diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockConflict(_) => "lock_conflict",
            Self::NotFound(_) => "not_found",
            Self::TerminalPersist { .. } => "terminal_persist",
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockConflict(key) => write!(f, "operation already in flight: {key}"),
            Self::NotFound(target) => write!(f, "{target}"),
            Self::TerminalPersist { attempts, source } => {
                write!(f, "persist failed after {attempts} attempt(s): {source}")
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TerminalPersist { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<NotFoundTarget> for SyncError {
    fn from(value: NotFoundTarget) -> Self {
        Self::NotFound(value)
    }
}
