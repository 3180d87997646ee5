//! Local filesystem storage implementation.
//!
//! Cache files are pretty-printed JSON objects keyed by listing URL. Writes
//! go to a sibling temp file which is then renamed over the target, so a
//! reader never sees a half-written store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CacheStore;
use crate::storage::CacheStorage;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Restore the key == url invariant on freshly loaded records.
fn normalize_keys(store: &mut CacheStore) -> usize {
    let mut fixed = 0;
    for (key, listing) in store.iter_mut() {
        if listing.url != *key {
            listing.url.clone_from(key);
            fixed += 1;
        }
    }
    fixed
}

#[async_trait]
impl CacheStorage for LocalStorage {
    async fn load_cache(&self, key: &str) -> CacheStore {
        match self.read_json::<CacheStore>(key).await {
            Ok(Some(mut store)) => {
                let fixed = normalize_keys(&mut store);
                if fixed > 0 {
                    log::warn!("Repaired url field on {} cached listings in {}", fixed, key);
                }
                log::info!("Loaded {} listings from {}", store.len(), key);
                store
            }
            Ok(None) => {
                log::info!("No cache at {}, starting empty", key);
                CacheStore::new()
            }
            Err(e) => {
                log::warn!("Failed to load cache {}: {}. Starting empty.", key, e);
                CacheStore::new()
            }
        }
    }

    async fn save_cache(&self, key: &str, store: &CacheStore) -> Result<()> {
        self.write_json(key, store).await?;
        log::info!("Saved {} listings to {}", store.len(), key);
        Ok(())
    }
}
