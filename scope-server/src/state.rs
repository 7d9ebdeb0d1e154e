use crate::cache::{create_cache, Cache};
use crate::config::ServerConfig;
use crate::scopes::{ScopeCache, ScopeProvider, ScopesBackend};
use crate::store::{ScopeStore, ScopeStoreBackend};
use crate::tokens::{create_introspector, Introspector};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<ScopeStore>,
    pub scopes: Arc<dyn ScopesBackend>,
    pub introspector: Arc<Introspector>,
}

impl AppState {
    /// Build the state from its components, wiring the scope provider over the
    /// store through the cache
    pub fn with_components(
        config: &ServerConfig,
        store: ScopeStore,
        cache: Cache,
        introspector: Introspector,
    ) -> Self {
        let provider = ScopeProvider::new(ScopeCache::new(cache, store.clone()), store.clone());
        Self {
            config: Arc::new(config.clone()),
            store: Arc::new(store),
            scopes: Arc::new(provider),
            introspector: Arc::new(introspector),
        }
    }

    /// Build the state for an already created store
    pub fn with_existing_store(
        config: &ServerConfig,
        store: ScopeStore,
    ) -> Result<Self, std::io::Error> {
        let cache = create_cache(&config.cache).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to create cache: {}", e),
            )
        })?;
        let introspector = create_introspector(&config.introspection).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Failed to create token introspector: {}", e),
            )
        })?;
        Ok(Self::with_components(config, store, cache, introspector))
    }

    /// Check if all components are healthy
    pub async fn health_check(&self) -> Result<(), String> {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScopeFields;
    use crate::store::create_store;

    async fn test_state() -> AppState {
        let config = ServerConfig::for_test();
        let store = create_store(&config.store).await.unwrap();
        AppState::with_existing_store(&config, store).unwrap()
    }

    #[tokio::test]
    async fn test_app_state_from_config() {
        let state = test_state().await;

        assert!(matches!(*state.store, ScopeStore::InMemory(_)));
        assert!(matches!(*state.introspector, Introspector::Static(_)));
        assert!(state.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_scopes_backend_reads_shared_store() {
        let state = test_state().await;

        state
            .store
            .upsert(&ScopeFields::new("read", "Reading scope", true), None)
            .await
            .unwrap();

        let all = state.scopes.all_scopes().await.unwrap();
        assert!(all.contains_key("read"));
    }

    #[tokio::test]
    async fn test_app_state_clone() {
        let state = test_state().await;
        let state2 = state.clone();

        assert_eq!(Arc::as_ptr(&state.config), Arc::as_ptr(&state2.config));
        assert_eq!(Arc::as_ptr(&state.store), Arc::as_ptr(&state2.store));
    }
}
