//! Scope backend consumed by the OAuth token machinery.
//!
//! The OAuth subsystem asks three questions about scopes: which exist, which a
//! client may request and which are granted by default. [`ScopeProvider`]
//! answers them from the scope store, the full listing through [`ScopeCache`].

pub mod cache;

use crate::store::{ScopeStore, ScopeStoreBackend, StoreError};
use async_trait::async_trait;
use http::request::Parts;
use std::collections::BTreeMap;
use thiserror::Error;

pub use cache::ScopeCache;

/// Scope name to description
pub type ScopeMap = BTreeMap<String, String>;

/// Errors that can occur while answering scope queries
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Scope store error: {0}")]
    Store(#[from] StoreError),
}

/// Scope queries made by the OAuth subsystem at token issuance and validation time
#[async_trait]
pub trait ScopesBackend: Send + Sync {
    /// Every known scope with its description
    async fn all_scopes(&self) -> Result<ScopeMap, ScopeError>;

    /// Scopes the given application may request
    async fn available_scopes(
        &self,
        application: Option<&str>,
        request: Option<&Parts>,
    ) -> Result<Vec<String>, ScopeError>;

    /// Scopes granted when the application requests none
    async fn default_scopes(
        &self,
        application: Option<&str>,
        request: Option<&Parts>,
    ) -> Result<Vec<String>, ScopeError>;

    /// Whether every requested scope is available to the application
    async fn validate_scopes(
        &self,
        requested: &[String],
        application: Option<&str>,
        request: Option<&Parts>,
    ) -> Result<bool, ScopeError> {
        let available = self.available_scopes(application, request).await?;
        Ok(requested.iter().all(|scope| available.contains(scope)))
    }
}

/// Scope backend reading the scope store
#[derive(Clone)]
pub struct ScopeProvider {
    cache: ScopeCache,
    store: ScopeStore,
}

impl ScopeProvider {
    pub fn new(cache: ScopeCache, store: ScopeStore) -> Self {
        Self { cache, store }
    }
}

#[async_trait]
impl ScopesBackend for ScopeProvider {
    async fn all_scopes(&self) -> Result<ScopeMap, ScopeError> {
        self.cache.get_all().await
    }

    // No per-application restriction yet, every application may request every scope
    async fn available_scopes(
        &self,
        _application: Option<&str>,
        _request: Option<&Parts>,
    ) -> Result<Vec<String>, ScopeError> {
        Ok(self.all_scopes().await?.into_keys().collect())
    }

    // Read from the store directly, grants must not use a stale default set
    async fn default_scopes(
        &self,
        _application: Option<&str>,
        _request: Option<&Parts>,
    ) -> Result<Vec<String>, ScopeError> {
        Ok(self
            .store
            .list_default()
            .await?
            .into_iter()
            .map(|scope| scope.name)
            .collect())
    }
}
