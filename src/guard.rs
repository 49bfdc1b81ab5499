//! Referential integrity checks run before a category is deleted.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use ts_rs::TS;

use crate::cache::CacheHandle;
use crate::error::RemoteError;
use crate::remote::RemoteStore;
use crate::{AppError, AppResult};

/// Where a usage count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UsageSource {
    Remote,
    CachedStockCards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UsageReport {
    pub category_id: String,
    #[ts(type = "number")]
    pub count: u64,
    pub source: UsageSource,
}

#[derive(Clone)]
pub struct IntegrityGuard {
    remote: Arc<dyn RemoteStore>,
    cache: CacheHandle,
}

impl IntegrityGuard {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: CacheHandle) -> Self {
        Self { remote, cache }
    }

    /// Number of stock cards whose `category_id` is exactly `category_id`.
    ///
    /// Counts against the authoritative store when it answers, otherwise
    /// scans the cached stock-card list. With neither available the count
    /// cannot be verified and an error is returned. Answers from a live store
    /// are never bypassed: not-found means the category is unknown.
    pub async fn check_usage(&self, category_id: &str) -> AppResult<UsageReport> {
        match self.remote.count_category_usage(category_id).await {
            Ok(count) => Ok(UsageReport {
                category_id: category_id.to_string(),
                count,
                source: UsageSource::Remote,
            }),
            Err(RemoteError::NotFound(_)) => Err(AppError::new(
                "CATEGORY/NOT_FOUND",
                "Category not found",
            )
            .with_context("category_id", category_id.to_string())),
            Err(err) if !err.falls_back() => {
                Err(AppError::from(err).with_context("category_id", category_id.to_string()))
            }
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "usage_check_remote_failed",
                    category_id,
                    error = %err
                );
                let cards = self.cache.read_stock_cards().ok_or_else(|| {
                    AppError::new(
                        "CATEGORY/USAGE_UNVERIFIABLE",
                        "Cannot verify whether products use this category while offline",
                    )
                    .with_context("category_id", category_id.to_string())
                    .with_cause(err)
                })?;
                let count = cards
                    .iter()
                    .filter(|card| card.category_id.as_deref() == Some(category_id))
                    .count() as u64;
                Ok(UsageReport {
                    category_id: category_id.to_string(),
                    count,
                    source: UsageSource::CachedStockCards,
                })
            }
        }
    }

    /// Approve a deletion only when nothing references the category.
    pub async fn approve_delete(&self, category_id: &str) -> AppResult<UsageReport> {
        let report = self.check_usage(category_id).await?;
        if report.count > 0 {
            info!(
                target: "stockcat",
                event = "category_delete_blocked",
                category_id,
                usage = report.count,
                source = ?report.source
            );
            return Err(AppError::new(
                "CATEGORY/IN_USE",
                format!(
                    "{} products use this category. Move or delete them first.",
                    report.count
                ),
            )
            .with_context("category_id", category_id.to_string())
            .with_context("usage", report.count.to_string()));
        }
        Ok(report)
    }
}
