use crate::KeyValueCache;
use chrono::{Datelike, NaiveDate};
use tagrank_common::Result;
use tracing::info;

/// Reserved key holding the date of the last invalidation check.
pub const DATE_MARKER_KEY: &str = "cache_date";

/// `YYYY_M_D`, no zero padding.
///
/// ```
/// use chrono::NaiveDate;
/// use tagrank_cache::date_marker;
///
/// let d = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
/// assert_eq!(date_marker(d), "2026_3_7");
/// ```
pub fn date_marker(date: NaiveDate) -> String {
    format!("{}_{}_{}", date.year(), date.month(), date.day())
}

/// Explicit cache maintenance, kept out of the crawl path.
///
/// The caller decides when (and whether) to run daily invalidation and
/// supplies the date, so nothing here reads the wall clock.
pub struct CacheManager<C> {
    cache: C,
}

impl<C: KeyValueCache> CacheManager<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn into_inner(self) -> C {
        self.cache
    }

    /// Clear everything if the stored marker is from another day, then record `today`.
    ///
    /// A missing marker (first run) never clears. Returns whether a clear happened.
    pub async fn invalidate_if_stale(&self, today: NaiveDate) -> Result<bool> {
        let now = date_marker(today);
        let stored = self.cache.get(DATE_MARKER_KEY).await?;

        let stale = matches!(stored.as_deref(), Some(prev) if prev != now);
        if stale {
            info!(previous = ?stored, today = %now, "cache.invalidated");
            self.cache.clear().await?;
        }

        self.cache.set(DATE_MARKER_KEY, &now).await?;
        Ok(stale)
    }

    pub async fn clear(&self) -> Result<()> {
        info!("cache.cleared");
        self.cache.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCache;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn first_run_only_records_marker() {
        let mgr = CacheManager::new(MemoryCache::new());
        mgr.cache().set("example.social_art", "{}").await.unwrap();

        assert!(!mgr.invalidate_if_stale(day(19)).await.unwrap());
        assert_eq!(
            mgr.cache().get(DATE_MARKER_KEY).await.unwrap().as_deref(),
            Some("2026_10_19")
        );
        assert!(mgr.cache().get("example.social_art").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn same_day_keeps_entries() {
        let mgr = CacheManager::new(MemoryCache::new());
        mgr.invalidate_if_stale(day(19)).await.unwrap();
        mgr.cache().set("example.social_art", "{}").await.unwrap();

        assert!(!mgr.invalidate_if_stale(day(19)).await.unwrap());
        assert!(mgr.cache().get("example.social_art").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn new_day_clears_everything_then_records() {
        let mgr = CacheManager::new(MemoryCache::new());
        mgr.invalidate_if_stale(day(19)).await.unwrap();
        mgr.cache().set("example.social_art", "{}").await.unwrap();

        assert!(mgr.invalidate_if_stale(day(20)).await.unwrap());
        assert!(mgr.cache().get("example.social_art").await.unwrap().is_none());
        assert_eq!(mgr.cache().len(), 1);
        assert_eq!(
            mgr.cache().get(DATE_MARKER_KEY).await.unwrap().as_deref(),
            Some("2026_10_20")
        );
    }

    #[tokio::test]
    async fn explicit_clear_drops_marker_too() {
        let mgr = CacheManager::new(MemoryCache::new());
        mgr.invalidate_if_stale(day(19)).await.unwrap();
        mgr.clear().await.unwrap();
        assert!(mgr.cache().is_empty());
    }
}
