use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

use super::{CacheKey, PersistenceCache};
use crate::error::CacheResult;

/// Process-local cache. Clones share storage, so dropping a page and opening
/// a new one over a clone behaves like a reload.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<CacheKey, Vec<u8>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains_key(key)
    }
}

#[async_trait]
impl PersistenceCache for MemoryCache {
    async fn put_raw(&self, key: &CacheKey, bytes: Vec<u8>) -> CacheResult<()> {
        self.entries.lock().insert(key.clone(), bytes);
        Ok(())
    }

    async fn get_raw(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn clear(&self, key: &CacheKey) -> CacheResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacstrack_model::{Category, Record};

    #[tokio::test]
    async fn typed_round_trip_is_deep_equal() {
        let cache: Arc<dyn PersistenceCache> = Arc::new(MemoryCache::new());
        let key = CacheKey::table("storage", Category::Primary);
        let rows = vec![
            Record::new().with("source", "CT_ROOM").with("imgs", 120),
            Record::new().with("source", "MR_ROOM").with("imgs", serde_json::Value::Null),
        ];

        cache.put_value(&key, &rows).await.unwrap();
        let restored: Option<Vec<Record>> = cache.get_value(&key).await.unwrap();
        assert_eq!(restored, Some(rows));
    }

    #[tokio::test]
    async fn absent_and_cleared_keys_read_as_none() {
        let cache: Arc<dyn PersistenceCache> = Arc::new(MemoryCache::new());
        let key = CacheKey::query("storage");
        assert_eq!(cache.get_value::<String>(&key).await.unwrap(), None);

        cache.put_value(&key, "today").await.unwrap();
        cache.clear(&key).await.unwrap();
        cache.clear(&key).await.unwrap();
        assert_eq!(cache.get_value::<String>(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_unconditionally() {
        let cache: Arc<dyn PersistenceCache> = Arc::new(MemoryCache::new());
        let key = CacheKey::query("studies");
        cache.put_value(&key, &1u32).await.unwrap();
        cache.put_value(&key, &2u32).await.unwrap();
        assert_eq!(cache.get_value::<u32>(&key).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn undecodable_entry_is_reported() {
        let backend = MemoryCache::new();
        let key = CacheKey::query("storage");
        backend.put_raw(&key, b"{not json".to_vec()).await.unwrap();

        let cache: Arc<dyn PersistenceCache> = Arc::new(backend);
        let err = cache.get_value::<String>(&key).await.unwrap_err();
        assert!(matches!(err, crate::error::CacheError::Decode { .. }));
    }
}
