use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DATA_DIR_ENV: &str = "STOCKCAT_DATA_DIR";
pub const DB_ENV: &str = "STOCKCAT_DB";
pub const CACHE_ENV: &str = "STOCKCAT_CACHE";
pub const REMOTE_URL_ENV: &str = "STOCKCAT_REMOTE_URL";
pub const LOG_ENV: &str = "STOCKCAT_LOG";

pub const DEFAULT_LOG_FILTER: &str = "stockcat=info,sqlx=warn";
const APP_DIR: &str = "stockcat";
const DB_FILE: &str = "stockcat.sqlite3";
const CACHE_FILE: &str = "fallback-cache.json";

/// Where the backends and the fallback cache live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub cache_path: PathBuf,
    /// When set, the HTTP backend is used instead of the local database.
    pub remote_url: Option<String>,
    pub log_filter: String,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub remote_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok(), Overrides::default())
    }

    pub fn from_env_with(overrides: Overrides) -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok(), overrides)
    }

    /// Build a config from a variable lookup. Blank values count as unset.
    pub fn resolve<F>(lookup: F, overrides: Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = match var(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let database_path = overrides
            .database_path
            .or_else(|| var(DB_ENV).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join(DB_FILE));
        let cache_path = overrides
            .cache_path
            .or_else(|| var(CACHE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join(CACHE_FILE));
        let remote_url = overrides
            .remote_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| var(REMOTE_URL_ENV));
        let log_filter = var(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            database_path,
            cache_path,
            remote_url,
            log_filter,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let base = match dirs::data_dir() {
        Some(dir) => dir,
        None => std::env::current_dir().context("determine working directory")?,
    };
    Ok(base.join(APP_DIR))
}
