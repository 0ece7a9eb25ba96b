use async_trait::async_trait;
use directories::ProjectDirs;
use sha2::Digest;
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{CacheKey, PersistenceCache};
use crate::error::{CacheError, CacheResult};

/// Root directory of the persisted view store.
///
/// `cacache` manages the directory internally (index + content-addressed
/// blobs).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ViewCacheRoot(PathBuf);

impl ViewCacheRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    /// Per-server directory below `base`, or below the platform cache
    /// directory when `base` is `None`.
    pub fn for_server(server_url: &str, base: Option<&Path>) -> CacheResult<Self> {
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => ProjectDirs::from("", "pacstrack", "pacstrack")
                .ok_or_else(|| {
                    CacheError::Io("failed to resolve ProjectDirs".to_string())
                })?
                .cache_dir()
                .to_path_buf(),
        };
        Ok(Self(base.join("views").join(namespace_for_server_url(server_url))))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for ViewCacheRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewCacheRoot").field(&self.0).finish()
    }
}

/// Persisted views stored with `cacache`; survives process restarts.
#[derive(Clone, Debug)]
pub struct DiskCache {
    root: ViewCacheRoot,
}

impl DiskCache {
    pub fn new(root: ViewCacheRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ViewCacheRoot {
        &self.root
    }
}

#[async_trait]
impl PersistenceCache for DiskCache {
    async fn put_raw(&self, key: &CacheKey, bytes: Vec<u8>) -> CacheResult<()> {
        let integrity = cacache::write(self.root.as_path(), key.as_str(), &bytes)
            .await
            .map_err(|e| CacheError::Io(format!("cacache write failed: {e}")))?;
        debug!(%key, %integrity, byte_len = bytes.len(), "view cache entry written");
        Ok(())
    }

    async fn get_raw(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        match cacache::read(self.root.as_path(), key.as_str()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(cacache::Error::IntegrityError(err)) => Err(CacheError::Integrity {
                key: key.to_string(),
                message: err.to_string(),
            }),
            Err(cacache::Error::SizeMismatch(wanted, actual)) => {
                Err(CacheError::Integrity {
                    key: key.to_string(),
                    message: format!("size mismatch: wanted={wanted}, actual={actual}"),
                })
            }
            Err(cacache::Error::IoError(_, msg)) => {
                Err(CacheError::Io(format!("cacache read I/O error: {msg}")))
            }
            Err(cacache::Error::SerdeError(_, msg)) => {
                Err(CacheError::Io(format!("cacache read serde error: {msg}")))
            }
        }
    }

    async fn clear(&self, key: &CacheKey) -> CacheResult<()> {
        let r_opts = cacache::index::RemoveOpts::new().remove_fully(true);
        match r_opts.remove(self.root.as_path(), key.as_str()).await {
            Ok(()) => Ok(()),
            Err(cacache::Error::IoError(err, _))
                if err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(e) => Err(CacheError::Io(format!("cacache remove failed: {e}"))),
        }
    }
}

fn namespace_for_server_url(server_url: &str) -> String {
    let normalized = normalize_server_url(server_url);
    let digest = sha2::Sha256::digest(normalized.as_bytes());
    hex_encode(&digest[..16])
}

fn normalize_server_url(server_url: &str) -> String {
    server_url.trim().trim_end_matches('/').to_ascii_lowercase()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
