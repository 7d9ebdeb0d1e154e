use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use thiserror::Error;

pub mod memory;
pub mod null;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Cache trait defining the interface for all cache implementations.
///
/// Implementations must be thread-safe and cheap to clone, every request
/// handler shares the same cache.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value in the cache with the configured TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T)
        -> Result<(), CacheError>;

    /// Retrieve a value from the cache
    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;
}

/// Cache with the implementation chosen at runtime from configuration
#[derive(Clone)]
pub enum Cache {
    /// In-memory cache implementation using Moka
    InMemory(memory::InMemoryCache),
    /// No-op cache, every lookup goes to the source
    Null(null::NullCache),
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value).await,
            Self::Null(cache) => cache.set(key, value).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Null(cache) => cache.get(key).await,
        }
    }
}

impl Cache {
    /// Return the cached value for `key`, or compute it, cache it and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached. A cached
    /// value that can no longer be decoded is treated as a miss.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        match self.get::<T>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => warn!("Discarding unreadable cache entry '{}': {}", key, e),
        }

        let value = compute().await?;
        if let Err(e) = self.set(key, &value).await {
            warn!("Failed to cache value for '{}': {}", key, e);
        }
        Ok(value)
    }
}

/// Create the cache selected by the configuration
pub fn create_cache(config: &crate::config::CacheConfig) -> Result<Cache, CacheError> {
    if !config.enabled {
        return Ok(Cache::Null(null::NullCache::new()));
    }
    let cache =
        memory::InMemoryCache::new(config.ttl, config.capacity).map_err(CacheError::Config)?;
    Ok(Cache::InMemory(cache))
}
