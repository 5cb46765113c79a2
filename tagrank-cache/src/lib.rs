//! Flat string key-value cache used to memoise per-hashtag counts.
//!
//! [`KeyValueCache`] is the only interface the crawler sees. Two backends are
//! provided: [`MemoryCache`] for a single process and [`SqliteCache`], which
//! survives restarts until explicitly cleared. [`CacheManager`] adds the
//! optional once-per-day invalidation on top of any backend.
use async_trait::async_trait;
use std::sync::Arc;
use tagrank_common::Result;

pub mod manager;
pub mod memory;
pub mod sqlite;

pub use manager::{date_marker, CacheManager, DATE_MARKER_KEY};
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl<T: KeyValueCache + ?Sized> KeyValueCache for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}
