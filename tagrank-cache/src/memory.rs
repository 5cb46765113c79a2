use crate::KeyValueCache;
use async_trait::async_trait;
use dashmap::DashMap;
use tagrank_common::Result;

/// Process-local cache. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_overwrite_clear() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("a").await.unwrap(), None);

        cache.set("a", "1").await.unwrap();
        cache.set("a", "2").await.unwrap();
        cache.set("b", "3").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(cache.len(), 2);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.get("b").await.unwrap(), None);
    }
}
