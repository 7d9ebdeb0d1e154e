use super::{ScopeError, ScopeMap};
use crate::cache::Cache;
use crate::store::{ScopeStore, ScopeStoreBackend};

/// Cache key of the process-wide scope listing
pub const ALL_SCOPES_CACHE_KEY: &str = "dynamic_scopes:all_scopes";

/// Read-through cache of the full scope listing.
///
/// A single entry holds every scope. Writers never invalidate it, so readers may
/// see a listing up to one TTL old.
#[derive(Clone)]
pub struct ScopeCache {
    cache: Cache,
    store: ScopeStore,
}

impl ScopeCache {
    pub fn new(cache: Cache, store: ScopeStore) -> Self {
        Self { cache, store }
    }

    /// Scope name to description for every stored scope
    pub async fn get_all(&self) -> Result<ScopeMap, ScopeError> {
        self.cache
            .get_or_compute(ALL_SCOPES_CACHE_KEY, || async {
                log::debug!("Scope listing cache miss, reading the scope store");
                let scopes = self.store.list().await?;
                Ok::<ScopeMap, ScopeError>(
                    scopes
                        .into_iter()
                        .map(|scope| (scope.name, scope.description))
                        .collect(),
                )
            })
            .await
    }
}
