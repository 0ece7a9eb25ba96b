//! Durable key/value storage for the last completed query of each page.
//!
//! Entries are overwritten on every successful job, read once when a page
//! opens, and never expired.

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use pacstrack_model::Category;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

use crate::error::{CacheError, CacheResult};

pub use disk::{DiskCache, ViewCacheRoot};
pub use memory::MemoryCache;

/// Stable key of a persisted value.
///
/// Keys are human-readable and versioned so a layout change can move to a
/// new prefix without reading stale entries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Rows of one result category shown on `page`.
    pub fn table(page: &str, category: Category) -> Self {
        Self(format!("views/v1/{page}/table/{}", category.as_str()))
    }

    /// Query parameters last submitted on `page`.
    pub fn query(page: &str) -> Self {
        Self(format!("views/v1/{page}/query"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.0).finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte-level persistence backend.
#[async_trait]
pub trait PersistenceCache: Send + Sync + fmt::Debug {
    /// Store `bytes` under `key`, replacing any previous value.
    async fn put_raw(&self, key: &CacheKey, bytes: Vec<u8>) -> CacheResult<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get_raw(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Removing an absent key succeeds.
    async fn clear(&self, key: &CacheKey) -> CacheResult<()>;
}

impl<'a> dyn PersistenceCache + 'a {
    /// Store `value` as JSON under `key`.
    pub async fn put_value<T>(&self, key: &CacheKey, value: &T) -> CacheResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = serde_json::to_vec(value).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.put_raw(key, bytes).await
    }

    /// Read the JSON value stored under `key`.
    pub async fn get_value<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let Some(bytes) = self.get_raw(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Decode {
                key: key.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_versioned_per_page_and_category() {
        assert_eq!(
            CacheKey::table("storage", Category::Ignored).as_str(),
            "views/v1/storage/table/ignored"
        );
        assert_eq!(CacheKey::query("studies").as_str(), "views/v1/studies/query");
    }
}
