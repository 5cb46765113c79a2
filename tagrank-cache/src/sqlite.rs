//! SQLite-backed persistent cache.
//!
//! A single `cache(key, value)` table. Entries persist across restarts until
//! [`KeyValueCache::clear`] is called.
use crate::KeyValueCache;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tagrank_common::{Result, TagrankError};
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)";

#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

fn cache_err(err: sqlx::Error) -> TagrankError {
    TagrankError::Cache(err.to_string())
}

impl SqliteCache {
    /// Open (or create) the cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TagrankError::Cache(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(cache_err)?;
        info!(path = %path.display(), "cache.sqlite.opened");
        Self::from_pool(pool).await
    }

    /// Private in-memory database; lives as long as this value.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").map_err(cache_err)?;
        // every pooled connection would otherwise get its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(opts)
            .await
            .map_err(cache_err)?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(cache_err)?;
        Ok(Self { pool })
    }

    pub async fn len(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache")
            .fetch_one(&self.pool)
            .await
            .map_err(cache_err)?;
        Ok(n.max(0) as u64)
    }
}

#[async_trait]
impl KeyValueCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(cache_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(cache_err)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let res = sqlx::query("DELETE FROM cache")
            .execute(&self.pool)
            .await
            .map_err(cache_err)?;
        debug!(removed = res.rows_affected(), "cache.sqlite.cleared");
        Ok(())
    }
}
