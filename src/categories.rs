//! Category tree repository.
//!
//! Owns the published view of the two-level category tree and decides, per
//! call, whether the authoritative store or the local fallback cache backs
//! it. Transport failures switch tiers silently; validation runs before any
//! store is touched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use ts_rs::TS;

use crate::cache::CacheHandle;
use crate::error::RemoteError;
use crate::guard::{IntegrityGuard, UsageReport};
use crate::id::{IdSource, UuidV7Ids};
use crate::model::{cascade_ids, Category, CategoryTree, NewCategory};
use crate::remote::RemoteStore;
use crate::slug::fold_key;
use crate::{AppError, AppResult};

/// Which store produced a [`CategorySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Tier {
    Remote,
    Fallback,
}

/// The full category set as last seen by the repository. Always the whole
/// post-mutation state, never a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CategorySet {
    pub categories: Vec<Category>,
    pub source: Tier,
}

impl CategorySet {
    fn empty() -> Self {
        Self {
            categories: Vec::new(),
            source: Tier::Fallback,
        }
    }

    pub fn tree(&self) -> CategoryTree {
        CategoryTree::from_categories(&self.categories)
    }

    pub fn find(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

pub struct CategoryRepository {
    remote: Arc<dyn RemoteStore>,
    cache: CacheHandle,
    ids: Arc<dyn IdSource>,
    guard: IntegrityGuard,
    published: watch::Sender<CategorySet>,
    loaded: AtomicBool,
}

impl CategoryRepository {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: CacheHandle) -> Self {
        Self::with_id_source(remote, cache, Arc::new(UuidV7Ids))
    }

    pub fn with_id_source(
        remote: Arc<dyn RemoteStore>,
        cache: CacheHandle,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        let guard = IntegrityGuard::new(remote.clone(), cache.clone());
        let (published, _) = watch::channel(CategorySet::empty());
        Self {
            remote,
            cache,
            ids,
            guard,
            published,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn guard(&self) -> &IntegrityGuard {
        &self.guard
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    /// Receiver that observes every republished set.
    pub fn subscribe(&self) -> watch::Receiver<CategorySet> {
        self.published.subscribe()
    }

    /// Last published set; empty until the first load.
    pub fn current(&self) -> CategorySet {
        self.published.borrow().clone()
    }

    fn publish(&self, set: CategorySet) -> CategorySet {
        self.published.send_replace(set.clone());
        self.loaded.store(true, Ordering::Release);
        set
    }

    /// Reads the whole category set. Never fails: when both tiers are
    /// unusable the result is an empty fallback set.
    pub async fn load(&self) -> CategorySet {
        match self.remote.list_categories().await {
            Ok(categories) => self.publish(CategorySet {
                categories,
                source: Tier::Remote,
            }),
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "category_tier_fallback",
                    operation = "load",
                    error = %err
                );
                let categories = self.fallback_snapshot();
                self.publish(CategorySet {
                    categories,
                    source: Tier::Fallback,
                })
            }
        }
    }

    fn fallback_snapshot(&self) -> Vec<Category> {
        if let Some(categories) = self.cache.read_categories() {
            return categories;
        }
        if let Err(err) = self.cache.write_categories(&[]) {
            warn!(
                target: "stockcat",
                event = "fallback_snapshot_init_failed",
                error = %err
            );
        }
        Vec::new()
    }

    /// Last published set, loading once if nothing has been published yet.
    pub async fn view(&self) -> CategorySet {
        if self.loaded.load(Ordering::Acquire) {
            self.current()
        } else {
            self.load().await
        }
    }

    /// Create a category. `parent_id`, when given, must name a root
    /// category in the current view; a sub-category cannot take children.
    pub async fn create(&self, name: &str, parent_id: Option<&str>) -> AppResult<CategorySet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::new(
                "CATEGORY/NAME_REQUIRED",
                "Category name is required",
            ));
        }
        let parent_id = match parent_id.map(str::trim) {
            Some("") => {
                return Err(AppError::new(
                    "CATEGORY/PARENT_REQUIRED",
                    "Choose a main category for the sub-category",
                ))
            }
            other => other,
        };

        let view = self.view().await;
        if let Some(parent) = parent_id {
            validate_parent(&view.categories, parent)?;
        }
        ensure_unique_sibling(&view.categories, name, parent_id)?;

        let new = NewCategory {
            id: self.ids.next_id(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        };

        match self.remote.create_category(&new).await {
            Ok(()) => {
                info!(
                    target: "stockcat",
                    event = "category_created",
                    id = %new.id,
                    parent_id = ?new.parent_id
                );
                Ok(self.load().await)
            }
            Err(err) if !err.falls_back() => Err(create_rejection(err, &new)),
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "category_tier_fallback",
                    operation = "create",
                    id = %new.id,
                    error = %err
                );
                self.create_in_fallback(new, err)
            }
        }
    }

    fn create_in_fallback(&self, new: NewCategory, cause: RemoteError) -> AppResult<CategorySet> {
        let mut snapshot = self.cache.read_categories().unwrap_or_default();
        if let Some(parent) = new.parent_id.as_deref() {
            validate_parent(&snapshot, parent)?;
        }
        ensure_unique_sibling(&snapshot, &new.name, new.parent_id.as_deref())?;

        let id = new.id.clone();
        snapshot.push(Category::from(new));
        self.persist_fallback(snapshot, "create", &id, cause)
    }

    /// Delete a category and its direct children once the integrity guard
    /// confirms nothing references it.
    pub async fn delete(&self, id: &str) -> AppResult<CategorySet> {
        let id = id.trim();
        if id.is_empty() {
            return Err(not_found(id));
        }
        self.guard.approve_delete(id).await?;

        match self.remote.delete_category(id).await {
            Ok(()) => {
                info!(target: "stockcat", event = "category_deleted", id);
                Ok(self.load().await)
            }
            Err(RemoteError::NotFound(_)) => Err(not_found(id)),
            Err(err) if !err.falls_back() => Err(AppError::from(err).with_context("id", id)),
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "category_tier_fallback",
                    operation = "delete",
                    id,
                    error = %err
                );
                self.delete_in_fallback(id, err)
            }
        }
    }

    fn delete_in_fallback(&self, id: &str, cause: RemoteError) -> AppResult<CategorySet> {
        let Some(mut snapshot) = self.cache.read_categories() else {
            error!(
                target: "stockcat",
                event = "category_write_lost",
                operation = "delete",
                id,
                reason = "no_snapshot"
            );
            return Err(write_lost("delete", id).with_cause(cause));
        };
        let removed = cascade_ids(&snapshot, id);
        if removed.is_empty() {
            return Err(not_found(id));
        }
        snapshot.retain(|c| !removed.contains(&c.id));
        self.persist_fallback(snapshot, "delete", id, cause)
    }

    fn persist_fallback(
        &self,
        snapshot: Vec<Category>,
        operation: &'static str,
        id: &str,
        cause: RemoteError,
    ) -> AppResult<CategorySet> {
        if let Err(err) = self.cache.write_categories(&snapshot) {
            error!(
                target: "stockcat",
                event = "category_write_lost",
                operation,
                id,
                remote_error = %cause,
                cache_error = %err
            );
            return Err(write_lost(operation, id).with_cause(err));
        }
        info!(
            target: "stockcat",
            event = "category_fallback_write",
            operation,
            id,
            size = snapshot.len()
        );
        Ok(self.publish(CategorySet {
            categories: snapshot,
            source: Tier::Fallback,
        }))
    }

    /// Materialize implicit inventory categories. Returns how many rows were
    /// added; an unreachable store counts as zero.
    pub async fn sync(&self) -> u64 {
        match self.remote.sync_implicit_categories().await {
            Ok(materialized) => {
                info!(target: "stockcat", event = "category_sync", materialized);
                materialized
            }
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "category_sync_skipped",
                    error = %err
                );
                0
            }
        }
    }

    pub async fn usage(&self, id: &str) -> AppResult<UsageReport> {
        self.guard.check_usage(id).await
    }
}

fn validate_parent(categories: &[Category], parent_id: &str) -> AppResult<()> {
    match categories.iter().find(|c| c.id == parent_id) {
        None => Err(AppError::new(
            "CATEGORY/PARENT_NOT_FOUND",
            "The selected main category does not exist",
        )
        .with_context("parent_id", parent_id)),
        Some(parent) if !parent.is_root() => Err(AppError::new(
            "CATEGORY/PARENT_NOT_ROOT",
            "Sub-categories can only be added under a main category",
        )
        .with_context("parent_id", parent_id)),
        Some(_) => Ok(()),
    }
}

fn ensure_unique_sibling(
    categories: &[Category],
    name: &str,
    parent_id: Option<&str>,
) -> AppResult<()> {
    let key = fold_key(name);
    let clash = categories
        .iter()
        .find(|c| c.parent_id.as_deref() == parent_id && fold_key(&c.name) == key);
    match clash {
        Some(existing) => Err(AppError::new(
            "CATEGORY/DUPLICATE_NAME",
            format!("A category named \"{}\" already exists here", existing.name),
        )
        .with_context("existing_id", existing.id.clone())),
        None => Ok(()),
    }
}

fn create_rejection(err: RemoteError, new: &NewCategory) -> AppError {
    match err {
        RemoteError::Conflict(_) => AppError::new(
            "CATEGORY/DUPLICATE_NAME",
            format!("A category named \"{}\" already exists here", new.name),
        )
        .with_cause(err),
        RemoteError::NotFound(_) => AppError::new(
            "CATEGORY/PARENT_NOT_FOUND",
            "The selected main category does not exist",
        )
        .with_context("parent_id", new.parent_id.clone().unwrap_or_default())
        .with_cause(err),
        other => AppError::from(other),
    }
}

fn not_found(id: &str) -> AppError {
    AppError::new("CATEGORY/NOT_FOUND", "Category not found").with_context("id", id)
}

fn write_lost(operation: &str, id: &str) -> AppError {
    AppError::new(
        "CATEGORY/WRITE_LOST",
        "The change could not be saved to the server or to this device",
    )
    .with_context("operation", operation)
    .with_context("id", id)
}
