//! Stand-in backend for an authoritative store that could not be opened.

use async_trait::async_trait;

use super::{RemoteResult, RemoteStore};
use crate::error::RemoteError;
use crate::model::{Category, NewCategory, StockCard, StockCardDraft};

/// Answers every call with [`RemoteError::Unavailable`] so callers switch to
/// the fallback tier exactly as they would for a dropped connection.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    reason: String,
}

impl OfflineStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable<T>(&self) -> RemoteResult<T> {
        Err(RemoteError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl RemoteStore for OfflineStore {
    async fn sync_implicit_categories(&self) -> RemoteResult<u64> {
        self.unavailable()
    }

    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        self.unavailable()
    }

    async fn create_category(&self, _category: &NewCategory) -> RemoteResult<()> {
        self.unavailable()
    }

    async fn delete_category(&self, _id: &str) -> RemoteResult<()> {
        self.unavailable()
    }

    async fn count_category_usage(&self, _category_id: &str) -> RemoteResult<u64> {
        self.unavailable()
    }

    async fn list_stock_cards(&self) -> RemoteResult<Vec<StockCard>> {
        self.unavailable()
    }

    async fn find_stock_card_by_barcode(&self, _barcode: &str) -> RemoteResult<Option<StockCard>> {
        self.unavailable()
    }

    async fn create_stock_card(&self, _id: &str, _draft: &StockCardDraft) -> RemoteResult<StockCard> {
        self.unavailable()
    }

    async fn update_stock_card(&self, _id: &str, _draft: &StockCardDraft) -> RemoteResult<StockCard> {
        self.unavailable()
    }
}
