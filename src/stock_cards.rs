use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheHandle;
use crate::categories::CategoryRepository;
use crate::error::RemoteError;
use crate::id::{IdSource, UuidV7Ids};
use crate::model::{StockCard, StockCardDraft, DEFAULT_UNIT};
use crate::remote::RemoteStore;
use crate::{AppError, AppResult};

/// Stock-card reads and writes. Writes need the authoritative store; reads
/// fall back to the cached product list, which also feeds the integrity
/// guard while offline.
pub struct StockCardService {
    remote: Arc<dyn RemoteStore>,
    cache: CacheHandle,
    categories: Arc<CategoryRepository>,
    ids: Arc<dyn IdSource>,
}

impl StockCardService {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: CacheHandle,
        categories: Arc<CategoryRepository>,
    ) -> Self {
        Self::with_id_source(remote, cache, categories, Arc::new(UuidV7Ids))
    }

    pub fn with_id_source(
        remote: Arc<dyn RemoteStore>,
        cache: CacheHandle,
        categories: Arc<CategoryRepository>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            remote,
            cache,
            categories,
            ids,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<StockCard>> {
        match self.remote.list_stock_cards().await {
            Ok(cards) => {
                if let Err(err) = self.cache.write_stock_cards(&cards) {
                    warn!(
                        target: "stockcat",
                        event = "stock_card_cache_refresh_failed",
                        error = %err
                    );
                }
                Ok(cards)
            }
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "stock_card_tier_fallback",
                    error = %err
                );
                self.cache
                    .read_stock_cards()
                    .ok_or_else(|| remote_unavailable(err))
            }
        }
    }

    pub async fn create(&self, draft: StockCardDraft) -> AppResult<StockCard> {
        let draft = normalize(draft)?;
        self.ensure_category_known(draft.category_id.as_deref()).await?;
        self.ensure_barcode_free(&draft.barcode, None).await?;

        let id = self.ids.next_id();
        let card = self
            .remote
            .create_stock_card(&id, &draft)
            .await
            .map_err(|err| write_rejection(err, &draft))?;
        info!(
            target: "stockcat",
            event = "stock_card_created",
            id = %card.id,
            category_id = ?card.category_id
        );
        self.remember(&card);
        Ok(card)
    }

    /// Replace the editable fields of `id`. The category may change freely
    /// as long as it still exists.
    pub async fn update(&self, id: &str, draft: StockCardDraft) -> AppResult<StockCard> {
        let draft = normalize(draft)?;
        self.ensure_category_known(draft.category_id.as_deref()).await?;
        self.ensure_barcode_free(&draft.barcode, Some(id)).await?;

        let card = self
            .remote
            .update_stock_card(id, &draft)
            .await
            .map_err(|err| match err {
                RemoteError::NotFound(_) => {
                    AppError::new("STOCK_CARD/NOT_FOUND", "Stock card not found")
                        .with_context("id", id)
                }
                other => write_rejection(other, &draft),
            })?;
        info!(target: "stockcat", event = "stock_card_updated", id);
        self.remember(&card);
        Ok(card)
    }

    async fn ensure_category_known(&self, category_id: Option<&str>) -> AppResult<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let view = self.categories.view().await;
        if view.find(category_id).is_some() {
            return Ok(());
        }
        // The published view may predate a category created elsewhere.
        if self.categories.load().await.find(category_id).is_some() {
            return Ok(());
        }
        Err(AppError::new(
            "STOCK_CARD/CATEGORY_NOT_FOUND",
            "The selected category does not exist",
        )
        .with_context("category_id", category_id))
    }

    async fn ensure_barcode_free(&self, barcode: &str, owner: Option<&str>) -> AppResult<()> {
        match self.remote.find_stock_card_by_barcode(barcode).await {
            Ok(Some(existing)) if Some(existing.id.as_str()) != owner => {
                Err(duplicate_barcode(barcode).with_context("existing_id", existing.id))
            }
            Ok(_) => Ok(()),
            Err(err) => Err(remote_unavailable(err)),
        }
    }

    fn remember(&self, card: &StockCard) {
        let Some(mut cached) = self.cache.read_stock_cards() else {
            return;
        };
        match cached.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => *slot = card.clone(),
            None => cached.push(card.clone()),
        }
        if let Err(err) = self.cache.write_stock_cards(&cached) {
            warn!(
                target: "stockcat",
                event = "stock_card_cache_refresh_failed",
                id = %card.id,
                error = %err
            );
        }
    }
}

fn normalize(mut draft: StockCardDraft) -> AppResult<StockCardDraft> {
    fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    draft.barcode = draft.barcode.trim().to_string();
    draft.name = draft.name.trim().to_string();
    if draft.barcode.is_empty() {
        return Err(AppError::new(
            "STOCK_CARD/BARCODE_REQUIRED",
            "Barcode is required",
        ));
    }
    if draft.name.is_empty() {
        return Err(AppError::new(
            "STOCK_CARD/NAME_REQUIRED",
            "Product name is required",
        ));
    }
    let unit = draft.unit.trim();
    draft.unit = if unit.is_empty() {
        DEFAULT_UNIT.to_string()
    } else {
        unit.to_string()
    };
    draft.brand = clean(draft.brand);
    draft.category_id = clean(draft.category_id);
    draft.description = clean(draft.description);
    draft.supplier_id = clean(draft.supplier_id);
    Ok(draft)
}

fn duplicate_barcode(barcode: &str) -> AppError {
    AppError::new(
        "STOCK_CARD/DUPLICATE_BARCODE",
        "Another product already uses this barcode",
    )
    .with_context("barcode", barcode)
}

fn remote_unavailable(err: RemoteError) -> AppError {
    AppError::new(
        "STOCK_CARD/REMOTE_UNAVAILABLE",
        "Products can only be saved while the server is reachable",
    )
    .with_cause(err)
}

fn write_rejection(err: RemoteError, draft: &StockCardDraft) -> AppError {
    match err {
        RemoteError::Conflict(_) => duplicate_barcode(&draft.barcode).with_cause(err),
        RemoteError::NotFound(_) => AppError::new(
            "STOCK_CARD/CATEGORY_NOT_FOUND",
            "The selected category does not exist",
        )
        .with_cause(err),
        other => remote_unavailable(other),
    }
}
