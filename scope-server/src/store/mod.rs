use crate::models::{Scope, ScopeFields};
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Errors that can occur while reading or writing scope records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to serialize scope: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse stored scope: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Durable record of scopes, keyed by scope name.
///
/// Writes are atomic per name. Concurrent updates to the same name follow
/// last-writer-wins semantics.
#[async_trait::async_trait]
pub trait ScopeStoreBackend: Send + Sync {
    /// Create the scope if absent, otherwise overwrite its description and default flag.
    ///
    /// `application` is recorded only when the scope is created; the owner of an
    /// existing scope is never changed by an upsert.
    async fn upsert(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Scope, StoreError>;

    /// Create the scope only if no scope with the same name exists.
    ///
    /// Returns `None` when the name is already taken.
    async fn create(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Option<Scope>, StoreError>;

    /// Look up a scope by name
    async fn get(&self, name: &str) -> Result<Option<Scope>, StoreError>;

    /// List every stored scope, in no particular order
    async fn list(&self) -> Result<Vec<Scope>, StoreError>;

    /// List the scopes flagged as default
    async fn list_default(&self) -> Result<Vec<Scope>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|scope| scope.is_default)
            .collect())
    }

    /// Check connectivity to the backing store
    async fn health_check(&self) -> Result<(), String>;
}

/// Scope store with the backend selected at runtime from configuration
#[derive(Clone)]
pub enum ScopeStore {
    /// Process-local store, lost on restart
    InMemory(memory::InMemoryScopeStore),
    /// Redis hash shared by every replica
    Redis(redis::RedisScopeStore),
}

#[async_trait::async_trait]
impl ScopeStoreBackend for ScopeStore {
    async fn upsert(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Scope, StoreError> {
        match self {
            Self::InMemory(store) => store.upsert(fields, application).await,
            Self::Redis(store) => store.upsert(fields, application).await,
        }
    }

    async fn create(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Option<Scope>, StoreError> {
        match self {
            Self::InMemory(store) => store.create(fields, application).await,
            Self::Redis(store) => store.create(fields, application).await,
        }
    }

    async fn get(&self, name: &str) -> Result<Option<Scope>, StoreError> {
        match self {
            Self::InMemory(store) => store.get(name).await,
            Self::Redis(store) => store.get(name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Scope>, StoreError> {
        match self {
            Self::InMemory(store) => store.list().await,
            Self::Redis(store) => store.list().await,
        }
    }

    async fn list_default(&self) -> Result<Vec<Scope>, StoreError> {
        match self {
            Self::InMemory(store) => store.list_default().await,
            Self::Redis(store) => store.list_default().await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(store) => store.health_check().await,
            Self::Redis(store) => store.health_check().await,
        }
    }
}

/// Create the scope store selected by the configuration
pub async fn create_store(config: &crate::config::StoreConfig) -> Result<ScopeStore, StoreError> {
    match config.backend {
        crate::config::StoreBackend::InMemory => {
            log::warn!("Using the in-memory scope store, scopes will not survive a restart");
            Ok(ScopeStore::InMemory(memory::InMemoryScopeStore::new()))
        }
        crate::config::StoreBackend::Redis => {
            let url = match config.redis_url.as_deref() {
                Some(url) if !url.is_empty() => url,
                _ => {
                    return Err(StoreError::Config(
                        "Redis URL is required for the Redis scope store".to_string(),
                    ))
                }
            };
            let store = redis::RedisScopeStore::new(url, &config.redis_key)
                .await
                .map_err(StoreError::Config)?;
            Ok(ScopeStore::Redis(store))
        }
    }
}
