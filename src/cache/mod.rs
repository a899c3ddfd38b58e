//! Cache layer
//!
//! Caching abstraction for the Logue service. Listing pages are cached in
//! process with moka; caching can be switched off entirely in configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logue::cache::{create_cache, CacheLayer};
//! use logue::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Prefix shared by every Logue content key
pub const LOGUE_PREFIX: &str = "logue:";

/// Key of one cached listing page within a content generation
pub fn listing_key(generation: u64, index_page_id: i64, raw_page: Option<&str>) -> String {
    format!(
        "{}g{}:index:{}:page:{}",
        LOGUE_PREFIX,
        generation,
        index_page_id,
        raw_page.map(str::trim).unwrap_or("")
    )
}

/// Cache layer trait
///
/// The trait has generic methods and cannot be a trait object. Use the
/// [`Cache`] enum for runtime selection.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete all values matching a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

/// Cache selected at startup
#[derive(Debug)]
pub enum Cache {
    /// In-memory cache using moka
    Memory(MemoryCache),
    /// Caching switched off: every read misses and writes are dropped
    Disabled,
}

impl Cache {
    /// Current content generation; always 0 when disabled
    pub fn generation(&self) -> u64 {
        match self {
            Cache::Memory(cache) => cache.generation(),
            Cache::Disabled => 0,
        }
    }

    /// Retire every key built from an earlier generation
    pub fn bump_generation(&self) -> u64 {
        match self {
            Cache::Memory(cache) => cache.bump_generation(),
            Cache::Disabled => 0,
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            Cache::Disabled => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            Cache::Disabled => Ok(()),
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
            Cache::Disabled => Ok(()),
        }
    }
}

/// Create the cache described by configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    if !config.enabled {
        tracing::info!("Cache disabled");
        return Arc::new(Cache::Disabled);
    }

    tracing::info!(
        "Memory cache enabled (ttl {}s, capacity {})",
        config.ttl_seconds,
        config.max_capacity
    );
    Arc::new(Cache::Memory(MemoryCache::with_capacity(config.max_capacity)))
}
