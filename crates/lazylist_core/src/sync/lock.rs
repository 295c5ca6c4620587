//! Per-item operation lock registry.
//!
//! # Responsibility
//! - Reject overlapping operations on the same item instead of queueing them.
//!
//! # Invariants
//! - Exclusivity is per `(container_id, item_id)`; the operation kind is
//!   carried for diagnostics only.
//! - A slot is held iff an operation holding it has not reached a terminal
//!   state.
//! - `try_acquire` never blocks and never yields between check and insert.

use crate::sync::error::SyncError;
use log::warn;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Kind of engine mutation holding a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AddOrUpdate,
    Delete,
    ToggleCompletion,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddOrUpdate => "add_or_update_item",
            Self::Delete => "delete_item",
            Self::ToggleCompletion => "toggle_item_completion",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub container_id: String,
    pub item_id: String,
    pub kind: OperationKind,
}

impl OperationKey {
    pub fn new(
        container_id: impl Into<String>,
        item_id: impl Into<String>,
        kind: OperationKind,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            item_id: item_id.into(),
            kind,
        }
    }

    fn slot(&self) -> ItemSlot {
        (self.container_id.clone(), self.item_id.clone())
    }
}

type ItemSlot = (String, String);

impl Display for OperationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.container_id, self.item_id, self.kind)
    }
}

/// Items with an operation in flight, mapped to the kind holding them.
#[derive(Debug, Default)]
pub struct OperationLockRegistry {
    active: Mutex<HashMap<ItemSlot, OperationKind>>,
}

impl OperationLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the item named by `key`, or fails with `SyncError::LockConflict`
    /// when any operation already holds that item.
    ///
    /// The returned guard releases the item when dropped.
    pub fn try_acquire(&self, key: OperationKey) -> Result<OperationGuard<'_>, SyncError> {
        let mut active = self.lock_set();
        if let Some(held) = active.get(&key.slot()) {
            warn!(
                "event=lock_acquire module=sync status=conflict key={} held_by={}",
                key, held
            );
            return Err(SyncError::LockConflict(key));
        }
        active.insert(key.slot(), key.kind);
        Ok(OperationGuard {
            registry: self,
            key: Some(key),
        })
    }

    /// Frees the item if `key` is the operation holding it.
    pub fn release(&self, key: &OperationKey) {
        let mut active = self.lock_set();
        let slot = key.slot();
        if active.get(&slot) == Some(&key.kind) {
            active.remove(&slot);
        }
    }

    /// `true` when `key` itself holds its item.
    pub fn is_held(&self, key: &OperationKey) -> bool {
        self.lock_set().get(&key.slot()) == Some(&key.kind)
    }

    /// `true` when any operation holds the item.
    pub fn is_item_held(&self, container_id: &str, item_id: &str) -> bool {
        self.lock_set()
            .contains_key(&(container_id.to_string(), item_id.to_string()))
    }

    pub fn active_count(&self) -> usize {
        self.lock_set().len()
    }

    fn lock_set(&self) -> MutexGuard<'_, HashMap<ItemSlot, OperationKind>> {
        // The map stays consistent even if a holder panicked mid-operation.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held operation key; released on drop.
#[derive(Debug)]
pub struct OperationGuard<'a> {
    registry: &'a OperationLockRegistry,
    key: Option<OperationKey>,
}

impl OperationGuard<'_> {
    pub fn key(&self) -> Option<&OperationKey> {
        self.key.as_ref()
    }

    /// Releases the key now instead of at drop.
    pub fn release(mut self) {
        if let Some(key) = self.key.take() {
            self.registry.release(&key);
        }
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.release(&key);
        }
    }
}
