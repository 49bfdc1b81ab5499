#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use stockcat_lib::cache::CacheHandle;
use stockcat_lib::categories::CategoryRepository;
use stockcat_lib::error::RemoteError;
use stockcat_lib::id::SequentialIds;
use stockcat_lib::model::{cascade_ids, Category, NewCategory, StockCard, StockCardDraft};
use stockcat_lib::remote::{RemoteResult, RemoteStore};
use stockcat_lib::slug::{fold_key, free_implicit_category_id};

pub async fn temp_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    stockcat_lib::migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    pool
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    stock_cards: Vec<StockCard>,
    inventory_categories: Vec<String>,
}

/// In-memory authoritative store that can be switched off mid-test.
/// Every call is recorded, including the ones refused while unreachable.
#[derive(Default)]
pub struct FlakyRemote {
    down: AtomicBool,
    usage_not_found: AtomicBool,
    tables: Mutex<Tables>,
    calls: Mutex<Vec<String>>,
}

impl FlakyRemote {
    pub fn reachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unreachable() -> Arc<Self> {
        let remote = Self::default();
        remote.down.store(true, Ordering::SeqCst);
        Arc::new(remote)
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn come_back(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    /// Usage counts answer not-found while the store stays reachable.
    pub fn refuse_usage_counts(&self) {
        self.usage_not_found.store(true, Ordering::SeqCst);
    }

    pub fn seed_category(&self, category: Category) {
        self.tables.lock().unwrap().categories.push(category);
    }

    pub fn seed_stock_card(&self, id: &str, barcode: &str, category_id: Option<&str>) {
        self.tables.lock().unwrap().stock_cards.push(stock_card(id, barcode, category_id));
    }

    pub fn seed_inventory_category(&self, name: &str) {
        self.tables
            .lock()
            .unwrap()
            .inventory_categories
            .push(name.to_string());
    }

    pub fn categories(&self) -> Vec<Category> {
        self.tables.lock().unwrap().categories.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that would have changed remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create") || c.starts_with("delete") || c.starts_with("update")
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn enter(&self, call: String) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.down.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

pub fn stock_card(id: &str, barcode: &str, category_id: Option<&str>) -> StockCard {
    StockCard {
        id: id.to_string(),
        barcode: barcode.to_string(),
        name: format!("Ürün {id}"),
        brand: None,
        unit: "ADET".to_string(),
        category_id: category_id.map(str::to_string),
        description: None,
        supplier_id: None,
        created_at: "2026-01-05T09:00:00.000Z".to_string(),
        updated_at: "2026-01-05T09:00:00.000Z".to_string(),
    }
}

#[async_trait]
impl RemoteStore for FlakyRemote {
    async fn sync_implicit_categories(&self) -> RemoteResult<u64> {
        self.enter("sync".into())?;
        let mut tables = self.tables.lock().unwrap();
        let mut materialized = 0;
        let names = tables.inventory_categories.clone();
        for name in names {
            let key = fold_key(&name);
            let exists = tables
                .categories
                .iter()
                .any(|c| c.is_root() && fold_key(&c.name) == key);
            if !exists {
                let taken: HashSet<String> = tables.categories.iter().map(|c| c.id.clone()).collect();
                let id = free_implicit_category_id(&name, &taken);
                tables.categories.push(Category::root(id, name.trim()));
                materialized += 1;
            }
        }
        Ok(materialized)
    }

    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        self.enter("list_categories".into())?;
        Ok(self.categories())
    }

    async fn create_category(&self, category: &NewCategory) -> RemoteResult<()> {
        self.enter(format!("create_category {}", category.id))?;
        let mut tables = self.tables.lock().unwrap();
        if tables.categories.iter().any(|c| c.id == category.id) {
            return Err(RemoteError::Conflict(category.id.clone()));
        }
        // Same answer SQLite gives for a dangling foreign key.
        if let Some(parent) = category.parent_id.as_deref() {
            if !tables.categories.iter().any(|c| c.id == parent) {
                return Err(RemoteError::NotFound(parent.to_string()));
            }
        }
        let mut created = Category::from(category.clone());
        created.created_at = Some("2026-01-05T09:00:00.000Z".into());
        tables.categories.push(created);
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> RemoteResult<()> {
        self.enter(format!("delete_category {id}"))?;
        let mut tables = self.tables.lock().unwrap();
        let removed = cascade_ids(&tables.categories, id);
        if removed.is_empty() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        tables.categories.retain(|c| !removed.contains(&c.id));
        Ok(())
    }

    async fn count_category_usage(&self, category_id: &str) -> RemoteResult<u64> {
        self.enter(format!("usage {category_id}"))?;
        if self.usage_not_found.load(Ordering::SeqCst) {
            return Err(RemoteError::NotFound(format!("category {category_id}")));
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .stock_cards
            .iter()
            .filter(|card| card.category_id.as_deref() == Some(category_id))
            .count() as u64)
    }

    async fn list_stock_cards(&self) -> RemoteResult<Vec<StockCard>> {
        self.enter("list_stock_cards".into())?;
        Ok(self.tables.lock().unwrap().stock_cards.clone())
    }

    async fn find_stock_card_by_barcode(&self, barcode: &str) -> RemoteResult<Option<StockCard>> {
        self.enter(format!("find_barcode {barcode}"))?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .stock_cards
            .iter()
            .find(|card| card.barcode == barcode)
            .cloned())
    }

    async fn create_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        self.enter(format!("create_stock_card {id}"))?;
        let mut tables = self.tables.lock().unwrap();
        if tables.stock_cards.iter().any(|c| c.barcode == draft.barcode) {
            return Err(RemoteError::Conflict(draft.barcode.clone()));
        }
        let mut card = stock_card(id, &draft.barcode, draft.category_id.as_deref());
        card.name = draft.name.clone();
        card.unit = draft.unit.clone();
        tables.stock_cards.push(card.clone());
        Ok(card)
    }

    async fn update_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        self.enter(format!("update_stock_card {id}"))?;
        let mut tables = self.tables.lock().unwrap();
        let card = tables
            .stock_cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        card.barcode = draft.barcode.clone();
        card.name = draft.name.clone();
        card.unit = draft.unit.clone();
        card.category_id = draft.category_id.clone();
        Ok(card.clone())
    }
}

/// Repository over `remote` with ids "1", "2", ... and an in-memory cache.
pub fn repository(remote: Arc<FlakyRemote>) -> (Arc<CategoryRepository>, CacheHandle) {
    repository_with_ids(remote, 1)
}

pub fn repository_with_ids(
    remote: Arc<FlakyRemote>,
    first_id: u64,
) -> (Arc<CategoryRepository>, CacheHandle) {
    let cache = CacheHandle::in_memory();
    let repo = CategoryRepository::with_id_source(
        remote,
        cache.clone(),
        Arc::new(SequentialIds::starting_at(first_id)),
    );
    (Arc::new(repo), cache)
}

pub fn names(categories: &[Category]) -> Vec<String> {
    let mut names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();
    names.sort();
    names
}
