//! Authoritative store abstraction.
//!
//! The category core only talks to the backend through [`RemoteStore`]; the
//! SQLite and HTTP implementations are interchangeable and either may be
//! unreachable at any time.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::{Category, NewCategory, StockCard, StockCardDraft};

pub mod http;
pub mod offline;
pub mod sqlite;

pub use http::HttpStore;
pub use offline::OfflineStore;
pub use sqlite::SqliteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Materialize categories referenced by inventory rows but never created.
    /// Returns how many rows were inserted; repeated calls insert nothing new.
    async fn sync_implicit_categories(&self) -> RemoteResult<u64>;

    async fn list_categories(&self) -> RemoteResult<Vec<Category>>;

    async fn create_category(&self, category: &NewCategory) -> RemoteResult<()>;

    /// Removes the category and its direct children.
    async fn delete_category(&self, id: &str) -> RemoteResult<()>;

    async fn count_category_usage(&self, category_id: &str) -> RemoteResult<u64>;

    async fn list_stock_cards(&self) -> RemoteResult<Vec<StockCard>>;

    async fn find_stock_card_by_barcode(&self, barcode: &str) -> RemoteResult<Option<StockCard>>;

    async fn create_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard>;

    async fn update_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard>;
}
