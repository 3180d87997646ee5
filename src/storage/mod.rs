//! Storage abstractions for listing cache persistence.
//!
//! Each feed owns one cache file holding its whole [`CacheStore`]. A run
//! loads the store once, reconciles it in memory, and replaces the file
//! in one step at the end.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── cache/                # One store per feed
//! │   ├── lego_duplo.json
//! │   └── lego_kat.json
//! └── docs/                 # Published feeds
//!     ├── lego_duplo.xml
//!     └── lego_kat.xml
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CacheStore;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for listing cache backends.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Load the store saved under `key`.
    ///
    /// Missing or unreadable state yields an empty store; this never fails.
    async fn load_cache(&self, key: &str) -> CacheStore;

    /// Replace the store saved under `key`.
    async fn save_cache(&self, key: &str, store: &CacheStore) -> Result<()>;
}
