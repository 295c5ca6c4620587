//! Shopping list sync orchestrator.
//!
//! # Responsibility
//! - Run add/update, delete and toggle operations through one pipeline:
//!   lock, deep copy, mutate, sanitize, build document, persist with retry,
//!   commit.
//! - Track `is_syncing` / `last_sync_error` and record outcomes in the
//!   diagnostic sync log.
//!
//! # Invariants
//! - Caller state is mutated only through the supplied commit seams, and only
//!   after the persist collaborator accepted the document.
//! - On any failure no commit seam is called.
//! - The committed list is exactly the list that was persisted.
//! - The engine never keeps a reference to caller state between calls.

use crate::model::shopping::{Category, Container, Item, ShoppingSummary};
use crate::sync::config::{RetryConfig, SyncConfig};
use crate::sync::error::{NotFoundTarget, SyncError};
use crate::sync::lock::{OperationKey, OperationKind, OperationLockRegistry};
use crate::sync::payload::build_update_document;
use crate::sync::persist::Persister;
use crate::sync::retry::run_with_retry;
use crate::sync::sanitize::sanitize_categories;
use crate::sync::snapshot::snapshot_container;
use crate::sync::sync_log::SyncLog;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const MAX_LOGGED_WARNINGS: usize = 5;

/// How `add_or_update_item` finds the destination category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryTarget {
    /// Exact category id. A missing id is `NotFound`.
    Id(String),
    /// Convenience lookup by trimmed name; a new category is synthesized when
    /// no category carries that name.
    Name(String),
}

impl CategoryTarget {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }
}

/// Commit seam for the caller's collection of containers.
pub trait CollectionCommit {
    /// Replaces the shopping list of `container_id` with `shopping_list`.
    fn commit(&mut self, container_id: &str, shopping_list: &[Category]);
}

impl<F> CollectionCommit for F
where
    F: FnMut(&str, &[Category]),
{
    fn commit(&mut self, container_id: &str, shopping_list: &[Category]) {
        self(container_id, shopping_list)
    }
}

impl CollectionCommit for Vec<Container> {
    fn commit(&mut self, container_id: &str, shopping_list: &[Category]) {
        if let Some(container) = self.iter_mut().find(|c| c.id == container_id) {
            container.shopping_list = shopping_list.to_vec();
        }
    }
}

/// Commit seam for an optional "currently selected" container view.
pub trait DetailCommit {
    fn selected_container_id(&self) -> Option<&str>;
    fn commit(&mut self, shopping_list: &[Category]);
}

impl DetailCommit for Option<Container> {
    fn selected_container_id(&self) -> Option<&str> {
        self.as_ref().map(|container| container.id.as_str())
    }

    fn commit(&mut self, shopping_list: &[Category]) {
        if let Some(container) = self.as_mut() {
            container.shopping_list = shopping_list.to_vec();
        }
    }
}

/// Successful operation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub container_id: String,
    /// Sanitized list that was persisted and committed.
    pub shopping_list: Vec<Category>,
    /// Sanitization warnings; informational only.
    pub warnings: Vec<String>,
    /// Persist attempts used, `1` when the first attempt succeeded.
    pub attempts: u32,
}

/// Pipeline phase, logged as the operation advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    LockAcquired,
    Cloned,
    Validated,
    Persisting,
    Committed,
}

impl SyncPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::LockAcquired => "lock_acquired",
            Self::Cloned => "cloned",
            Self::Validated => "validated",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
        }
    }
}

/// Client-side synchronization engine for container shopping lists.
///
/// Operation futures borrow the caller's collection and commit seams, and the
/// seams are not required to be `Send`. Drive them on the caller's task
/// (`join!`, a current-thread runtime or a `LocalSet`) rather than handing
/// them to `tokio::spawn`.
pub struct SyncEngine {
    persister: Arc<dyn Persister>,
    config: SyncConfig,
    locks: OperationLockRegistry,
    sync_log: SyncLog,
    last_error: Mutex<Option<SyncError>>,
}

impl SyncEngine {
    /// Creates an engine with an in-memory sync log.
    pub fn new(persister: Arc<dyn Persister>, config: SyncConfig) -> Self {
        let sync_log = SyncLog::in_memory(config.log_capacity);
        Self::with_sync_log(persister, config, sync_log)
    }

    /// Creates an engine recording into `sync_log`.
    ///
    /// The supplied log keeps its own capacity; `config.log_capacity` only
    /// sizes the log built by `new`.
    pub fn with_sync_log(
        persister: Arc<dyn Persister>,
        config: SyncConfig,
        sync_log: SyncLog,
    ) -> Self {
        if sync_log.capacity() != config.log_capacity {
            warn!(
                "event=engine_init module=sync status=warn sync_log_capacity={} config_log_capacity={}",
                sync_log.capacity(),
                config.log_capacity
            );
        }
        Self {
            persister,
            config,
            locks: OperationLockRegistry::new(),
            sync_log,
            last_error: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn sync_log(&self) -> &SyncLog {
        &self.sync_log
    }

    /// `true` while any operation holds its lock.
    pub fn is_syncing(&self) -> bool {
        self.locks.active_count() > 0
    }

    /// Most recent failed operation result.
    pub fn last_sync_error(&self) -> Option<SyncError> {
        self.lock_last_error().clone()
    }

    pub fn clear_last_sync_error(&self) {
        *self.lock_last_error() = None;
    }

    /// Adds `item` to the target category, or replaces the item with the same
    /// id there.
    ///
    /// An item with the same id in another category of the container is moved.
    pub async fn add_or_update_item(
        &self,
        container_id: &str,
        category: CategoryTarget,
        item: Item,
        collection: &[Container],
        commit: &mut dyn CollectionCommit,
        detail: Option<&mut dyn DetailCommit>,
    ) -> Result<SyncReport, SyncError> {
        let key = OperationKey::new(container_id, item.id.as_str(), OperationKind::AddOrUpdate);
        let retry = self.config.standard_retry;
        self.run_operation(
            key,
            &retry,
            collection,
            |container| apply_add_or_update(container, &category, item),
            commit,
            detail,
        )
        .await
    }

    /// Removes one item; its category is dropped when it becomes empty.
    pub async fn delete_item(
        &self,
        container_id: &str,
        category_id: &str,
        item_id: &str,
        collection: &[Container],
        commit: &mut dyn CollectionCommit,
        detail: Option<&mut dyn DetailCommit>,
    ) -> Result<SyncReport, SyncError> {
        let key = OperationKey::new(container_id, item_id, OperationKind::Delete);
        let retry = self.config.standard_retry;
        self.run_operation(
            key,
            &retry,
            collection,
            |container| apply_delete(container, category_id, item_id),
            commit,
            detail,
        )
        .await
    }

    /// Flips `completed` on one item using the fast retry profile.
    pub async fn toggle_item_completion(
        &self,
        container_id: &str,
        category_id: &str,
        item_id: &str,
        collection: &[Container],
        commit: &mut dyn CollectionCommit,
        detail: Option<&mut dyn DetailCommit>,
    ) -> Result<SyncReport, SyncError> {
        let key = OperationKey::new(container_id, item_id, OperationKind::ToggleCompletion);
        let retry = self.config.fast_retry;
        self.run_operation(
            key,
            &retry,
            collection,
            |container| apply_toggle(container, category_id, item_id),
            commit,
            detail,
        )
        .await
    }

    async fn run_operation<M>(
        &self,
        key: OperationKey,
        retry: &RetryConfig,
        collection: &[Container],
        mutate: M,
        commit: &mut dyn CollectionCommit,
        detail: Option<&mut dyn DetailCommit>,
    ) -> Result<SyncReport, SyncError>
    where
        M: FnOnce(&mut Container) -> Result<(), SyncError>,
    {
        let started_at = Instant::now();
        let container_id = key.container_id.clone();
        let operation = key.kind;
        info!(
            "event={} module=sync status=start container_id={} item_id={}",
            operation, key.container_id, key.item_id
        );

        let result = self
            .execute(key, retry, collection, mutate, commit, detail)
            .await;

        match &result {
            Ok(report) => {
                info!(
                    "event={} module=sync status=ok container_id={} attempts={} duration_ms={}",
                    operation,
                    container_id,
                    report.attempts,
                    started_at.elapsed().as_millis()
                );
                self.sync_log.record(
                    &container_id,
                    operation.as_str(),
                    true,
                    format!(
                        "attempts={} categories={} warnings={}",
                        report.attempts,
                        report.shopping_list.len(),
                        report.warnings.len()
                    ),
                );
            }
            Err(err) => {
                warn!(
                    "event={} module=sync status=error container_id={} error_code={} duration_ms={} error={}",
                    operation,
                    container_id,
                    err.code(),
                    started_at.elapsed().as_millis(),
                    err
                );
                *self.lock_last_error() = Some(err.clone());
                self.sync_log
                    .record(&container_id, operation.as_str(), false, err.to_string());
            }
        }
        result
    }

    async fn execute<M>(
        &self,
        key: OperationKey,
        retry: &RetryConfig,
        collection: &[Container],
        mutate: M,
        commit: &mut dyn CollectionCommit,
        detail: Option<&mut dyn DetailCommit>,
    ) -> Result<SyncReport, SyncError>
    where
        M: FnOnce(&mut Container) -> Result<(), SyncError>,
    {
        let guard = self.locks.try_acquire(key.clone())?;
        trace_phase(&key, SyncPhase::LockAcquired);

        let mut working = snapshot_container(collection, &key.container_id)
            .ok_or_else(|| NotFoundTarget::Container(key.container_id.clone()))?;
        trace_phase(&key, SyncPhase::Cloned);

        mutate(&mut working)?;
        let report = sanitize_categories(&working.shopping_list);
        if !report.is_valid {
            warn!(
                "event=sanitize module=sync status=warn container_id={} warnings={}",
                key.container_id,
                report.warnings.len()
            );
            for warning in report.warnings.iter().take(MAX_LOGGED_WARNINGS) {
                debug!(
                    "event=sanitize_warning module=sync container_id={} detail={}",
                    key.container_id, warning
                );
            }
        }
        working.shopping_list = report.sanitized;
        trace_phase(&key, SyncPhase::Validated);

        let document = build_update_document(&working);
        let context = format!("{}:{}", key.kind, key.container_id);
        let persister = self.persister.as_ref();
        let user_id = self.config.user_id.as_str();
        let container_id = key.container_id.as_str();
        let document_ref = &document;
        trace_phase(&key, SyncPhase::Persisting);
        let retried = run_with_retry(
            move |_attempt| persister.persist(container_id, document_ref, user_id),
            retry,
            &context,
        )
        .await
        .map_err(|exhausted| SyncError::TerminalPersist {
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        })?;

        commit.commit(container_id, &document.shopping_list);
        if let Some(detail) = detail {
            if detail.selected_container_id() == Some(container_id) {
                detail.commit(&document.shopping_list);
            }
        }
        trace_phase(&key, SyncPhase::Committed);

        let summary = ShoppingSummary::of(&document.shopping_list);
        info!(
            "event=shopping_list_commit module=sync status=ok container_id={} categories={} items={} completed_items={}",
            container_id, summary.categories, summary.items, summary.completed_items
        );

        guard.release();
        Ok(SyncReport {
            container_id: key.container_id.clone(),
            shopping_list: document.shopping_list,
            warnings: report.warnings,
            attempts: retried.attempts,
        })
    }

    fn lock_last_error(&self) -> MutexGuard<'_, Option<SyncError>> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn trace_phase(key: &OperationKey, phase: SyncPhase) {
    debug!(
        "event=sync_phase module=sync key={} phase={}",
        key,
        phase.as_str()
    );
}

fn apply_add_or_update(
    container: &mut Container,
    target: &CategoryTarget,
    item: Item,
) -> Result<(), SyncError> {
    let index = match target {
        CategoryTarget::Id(category_id) => container
            .shopping_list
            .iter()
            .position(|category| &category.id == category_id)
            .ok_or_else(|| NotFoundTarget::Category {
                container_id: container.id.clone(),
                category_id: category_id.clone(),
            })?,
        CategoryTarget::Name(name) => {
            let wanted = name.trim();
            match container
                .shopping_list
                .iter()
                .position(|category| category.name.trim() == wanted)
            {
                Some(index) => index,
                None => {
                    container.shopping_list.push(Category::new(wanted));
                    container.shopping_list.len() - 1
                }
            }
        }
    };

    // Item ids stay unique within a container: an id found elsewhere moves.
    for (position, category) in container.shopping_list.iter_mut().enumerate() {
        if position != index {
            category.items.retain(|existing| existing.id != item.id);
        }
    }

    let category = &mut container.shopping_list[index];
    match category.position_of(&item.id) {
        Some(position) => category.items[position] = item,
        None => category.items.push(item),
    }
    Ok(())
}

fn apply_delete(
    container: &mut Container,
    category_id: &str,
    item_id: &str,
) -> Result<(), SyncError> {
    let (category_index, item_index) = locate_item(container, category_id, item_id)?;
    let category = &mut container.shopping_list[category_index];
    category.items.remove(item_index);
    if category.items.is_empty() {
        container.shopping_list.remove(category_index);
    }
    Ok(())
}

fn apply_toggle(
    container: &mut Container,
    category_id: &str,
    item_id: &str,
) -> Result<(), SyncError> {
    let (category_index, item_index) = locate_item(container, category_id, item_id)?;
    let item = &mut container.shopping_list[category_index].items[item_index];
    item.completed = !item.completed;
    Ok(())
}

fn locate_item(
    container: &Container,
    category_id: &str,
    item_id: &str,
) -> Result<(usize, usize), NotFoundTarget> {
    let category_index = container
        .shopping_list
        .iter()
        .position(|category| category.id == category_id)
        .ok_or_else(|| NotFoundTarget::Category {
            container_id: container.id.clone(),
            category_id: category_id.to_string(),
        })?;
    let item_index = container.shopping_list[category_index]
        .position_of(item_id)
        .ok_or_else(|| NotFoundTarget::Item {
            container_id: container.id.clone(),
            category_id: category_id.to_string(),
            item_id: item_id.to_string(),
        })?;
    Ok((category_index, item_index))
}
