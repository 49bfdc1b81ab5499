//! Category hierarchy and dual-store synchronization for the stock app.
//!
//! [`categories::CategoryRepository`] is the entry point: it publishes the
//! two-level category tree from whichever tier is usable, validates
//! mutations before touching a store and asks [`guard::IntegrityGuard`]
//! before anything is deleted.

pub mod cache;
pub mod categories;
pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod guard;
pub mod id;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod remote;
pub mod slug;
pub mod stock_cards;
pub mod time;

pub use error::{AppError, AppResult};
pub use logging::{init_file_logging, init_logging};

use std::sync::Arc;

use anyhow::Context;

use cache::CacheHandle;
use categories::CategoryRepository;
use config::AppConfig;
use remote::{HttpStore, OfflineStore, RemoteStore, SqliteStore};
use stock_cards::StockCardService;

/// Wired-up services for one process.
pub struct App {
    pub config: AppConfig,
    pub remote: Arc<dyn RemoteStore>,
    pub cache: CacheHandle,
    pub categories: Arc<CategoryRepository>,
    pub stock_cards: StockCardService,
}

impl App {
    /// Pick the backend from `config`, open the fallback cache and build the
    /// repository on top. The local database is migrated on open; when it
    /// cannot be opened every call goes to the fallback tier.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        let remote: Arc<dyn RemoteStore> = match config.remote_url.as_deref() {
            Some(url) => {
                tracing::info!(target: "stockcat", event = "backend_selected", backend = "http", url);
                Arc::new(HttpStore::new(url).context("build http client")?)
            }
            None => match open_local(&config).await {
                Ok(store) => {
                    tracing::info!(
                        target: "stockcat",
                        event = "backend_selected",
                        backend = "sqlite",
                        path = %config.database_path.display()
                    );
                    Arc::new(store)
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    tracing::warn!(
                        target: "stockcat",
                        event = "backend_unavailable",
                        backend = "sqlite",
                        path = %config.database_path.display(),
                        error = %reason
                    );
                    Arc::new(OfflineStore::new(reason))
                }
            },
        };
        Ok(Self::with_remote(config, remote))
    }

    pub fn with_remote(config: AppConfig, remote: Arc<dyn RemoteStore>) -> Self {
        let cache = CacheHandle::file(&config.cache_path);
        let categories = Arc::new(CategoryRepository::new(remote.clone(), cache.clone()));
        let stock_cards = StockCardService::new(remote.clone(), cache.clone(), categories.clone());
        Self {
            config,
            remote,
            cache,
            categories,
            stock_cards,
        }
    }
}

async fn open_local(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    let pool = db::open_sqlite_pool(&config.database_path)
        .await
        .with_context(|| format!("open {}", config.database_path.display()))?;
    migrate::apply_migrations(&pool)
        .await
        .context("apply migrations")?;
    Ok(SqliteStore::new(pool))
}
