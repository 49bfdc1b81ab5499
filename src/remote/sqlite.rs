use std::collections::HashSet;

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info};

use super::{RemoteResult, RemoteStore};
use crate::db::run_in_tx;
use crate::error::RemoteError;
use crate::model::{Category, NewCategory, StockCard, StockCardDraft};
use crate::slug::{fold_key, free_implicit_category_id};
use crate::time::now_rfc3339;

const STOCK_CARD_COLUMNS: &str = "id, barcode, name, brand, unit, category_id, description, supplier_id, created_at, updated_at";

/// Authoritative store backed by the product database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TryFrom<&SqliteRow> for Category {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            parent_id: row.try_get("parent_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<&SqliteRow> for StockCard {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            barcode: row.try_get("barcode")?,
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            unit: row.try_get("unit")?,
            category_id: row.try_get("category_id")?,
            description: row.try_get("description")?,
            supplier_id: row.try_get("supplier_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

async fn fetch_stock_card(pool: &SqlitePool, id: &str) -> RemoteResult<StockCard> {
    let sql = format!("SELECT {STOCK_CARD_COLUMNS} FROM stock_cards WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RemoteError::NotFound(format!("stock card {id}")))?;
    Ok(StockCard::try_from(&row)?)
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn sync_implicit_categories(&self) -> RemoteResult<u64> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT category FROM inventory_items WHERE category IS NOT NULL AND TRIM(category) != '' \
             GROUP BY category ORDER BY MIN(rowid)",
        )
        .fetch_all(&self.pool)
        .await?;
        let root_names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM categories WHERE parent_id IS NULL")
                .fetch_all(&self.pool)
                .await?;

        let mut taken: HashSet<String> = sqlx::query_scalar("SELECT id FROM categories")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect();

        let mut known: HashSet<String> = root_names.iter().map(|n| fold_key(n)).collect();
        let mut pending: Vec<(String, String)> = Vec::new();
        for name in names {
            let trimmed = name.trim().to_string();
            if known.insert(fold_key(&trimmed)) {
                let id = free_implicit_category_id(&trimmed, &taken);
                taken.insert(id.clone());
                pending.push((id, trimmed));
            }
        }
        if pending.is_empty() {
            debug!(target: "stockcat", event = "category_sync_noop");
            return Ok(0);
        }

        let now = now_rfc3339();
        let inserted = run_in_tx(&self.pool, |tx| {
            async move {
                let mut inserted = 0u64;
                for (id, name) in &pending {
                    let res = sqlx::query(
                        "INSERT OR IGNORE INTO categories (id, name, parent_id, created_at) VALUES (?, ?, NULL, ?)",
                    )
                    .bind(id)
                    .bind(name)
                    .bind(&now)
                    .execute(&mut **tx)
                    .await?;
                    inserted += res.rows_affected();
                }
                Ok::<_, sqlx::Error>(inserted)
            }
            .boxed()
        })
        .await?;

        info!(target: "stockcat", event = "category_sync_materialized", inserted);
        Ok(inserted)
    }

    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, parent_id, created_at FROM categories ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Category::try_from(row).map_err(RemoteError::from))
            .collect()
    }

    async fn create_category(&self, category: &NewCategory) -> RemoteResult<()> {
        sqlx::query("INSERT INTO categories (id, name, parent_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.parent_id)
            .bind(now_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> RemoteResult<()> {
        let target = id.to_string();
        let removed = run_in_tx(&self.pool, |tx| {
            async move {
                let res = sqlx::query("DELETE FROM categories WHERE id = ? OR parent_id = ?")
                    .bind(&target)
                    .bind(&target)
                    .execute(&mut **tx)
                    .await?;
                Ok::<_, sqlx::Error>(res.rows_affected())
            }
            .boxed()
        })
        .await?;
        if removed == 0 {
            return Err(RemoteError::NotFound(format!("category {id}")));
        }
        debug!(target: "stockcat", event = "category_rows_deleted", removed);
        Ok(())
    }

    async fn count_category_usage(&self, category_id: &str) -> RemoteResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_cards WHERE category_id = ?")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_stock_cards(&self) -> RemoteResult<Vec<StockCard>> {
        let sql = format!("SELECT {STOCK_CARD_COLUMNS} FROM stock_cards ORDER BY name, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| StockCard::try_from(row).map_err(RemoteError::from))
            .collect()
    }

    async fn find_stock_card_by_barcode(&self, barcode: &str) -> RemoteResult<Option<StockCard>> {
        let sql = format!("SELECT {STOCK_CARD_COLUMNS} FROM stock_cards WHERE barcode = ?");
        let row = sqlx::query(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(|row| StockCard::try_from(row))
            .transpose()
            .map_err(RemoteError::from)
    }

    async fn create_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO stock_cards (id, barcode, name, brand, unit, category_id, description, supplier_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&draft.barcode)
        .bind(&draft.name)
        .bind(&draft.brand)
        .bind(&draft.unit)
        .bind(&draft.category_id)
        .bind(&draft.description)
        .bind(&draft.supplier_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        fetch_stock_card(&self.pool, id).await
    }

    async fn update_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        let res = sqlx::query(
            "UPDATE stock_cards SET barcode = ?, name = ?, brand = ?, unit = ?, category_id = ?, \
             description = ?, supplier_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&draft.barcode)
        .bind(&draft.name)
        .bind(&draft.brand)
        .bind(&draft.unit)
        .bind(&draft.category_id)
        .bind(&draft.description)
        .bind(&draft.supplier_id)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RemoteError::NotFound(format!("stock card {id}")));
        }
        fetch_stock_card(&self.pool, id).await
    }
}
