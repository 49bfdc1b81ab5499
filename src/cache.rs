//! Local fallback cache.
//!
//! A small key-value file on the device. Each slot holds one JSON array and
//! is read and written wholesale; there are no partial updates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::db::write_atomic;
use crate::model::{Category, StockCard};
use crate::{AppError, AppResult};

/// Slot holding the fallback category snapshot.
pub const CATEGORIES_SLOT: &str = "categories";
/// Slot holding the last stock-card list read from the authoritative store.
pub const STOCK_CARDS_SLOT: &str = "stock_cards";

pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    /// Replace `key` with `value`. On error the slot keeps its previous value.
    fn put(&self, key: &str, value: Value) -> anyhow::Result<()>;
}

/// JSON object file persisted with [`write_atomic`].
pub struct FileStore {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Open `path`. A missing file starts empty; an unreadable or corrupt
    /// file is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(err) => {
                    warn!(
                        target: "stockcat",
                        event = "cache_file_corrupt",
                        path = %path.display(),
                        error = %err
                    );
                    Map::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "cache_file_unreadable",
                    path = %path.display(),
                    error = %err
                );
                Map::new()
            }
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &Map<String, Value>) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(data).context("serialize fallback cache")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create cache directory {}", parent.display()))?;
        }
        write_atomic(&self.path, &bytes)
            .with_context(|| format!("write fallback cache {}", self.path.display()))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = data.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *data = next;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn put(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<dyn SnapshotStore>,
}

impl CacheHandle {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::from_store(Arc::new(FileStore::open(path)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn from_store(inner: Arc<dyn SnapshotStore>) -> Self {
        Self { inner }
    }

    fn read_slot<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(
                    target: "stockcat",
                    event = "cache_slot_corrupt",
                    slot = key,
                    error = %err
                );
                None
            }
        }
    }

    fn write_slot<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let encoded = serde_json::to_value(value).map_err(AppError::from)?;
        self.inner.put(key, encoded).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "cache_save")
                .with_context("slot", key.to_string())
        })
    }

    /// `None` when the slot was never written or cannot be decoded.
    pub fn read_categories(&self) -> Option<Vec<Category>> {
        self.read_slot(CATEGORIES_SLOT)
    }

    pub fn write_categories(&self, categories: &[Category]) -> AppResult<()> {
        self.write_slot(CATEGORIES_SLOT, categories)
    }

    pub fn read_stock_cards(&self) -> Option<Vec<StockCard>> {
        self.read_slot(STOCK_CARDS_SLOT)
    }

    pub fn write_stock_cards(&self, cards: &[StockCard]) -> AppResult<()> {
        self.write_slot(STOCK_CARDS_SLOT, cards)
    }
}
