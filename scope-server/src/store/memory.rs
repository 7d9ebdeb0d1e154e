use super::{ScopeStoreBackend, StoreError};
use crate::models::{Scope, ScopeFields};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Scope store kept in process memory.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryScopeStore {
    scopes: Arc<RwLock<HashMap<String, Scope>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryScopeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn new_scope(&self, fields: &ScopeFields, application: Option<&str>) -> Scope {
        Scope {
            id: self.allocate_id(),
            name: fields.name.clone(),
            description: fields.description.clone(),
            is_default: fields.is_default,
            application: application.map(str::to_string),
        }
    }
}

#[async_trait]
impl ScopeStoreBackend for InMemoryScopeStore {
    async fn upsert(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Scope, StoreError> {
        let mut scopes = self.scopes.write().await;
        let scope = match scopes.get_mut(&fields.name) {
            Some(existing) => {
                existing.description = fields.description.clone();
                existing.is_default = fields.is_default;
                existing.clone()
            }
            None => {
                let scope = self.new_scope(fields, application);
                scopes.insert(scope.name.clone(), scope.clone());
                scope
            }
        };
        Ok(scope)
    }

    async fn create(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Option<Scope>, StoreError> {
        let mut scopes = self.scopes.write().await;
        if scopes.contains_key(&fields.name) {
            return Ok(None);
        }
        let scope = self.new_scope(fields, application);
        scopes.insert(scope.name.clone(), scope.clone());
        Ok(Some(scope))
    }

    async fn get(&self, name: &str) -> Result<Option<Scope>, StoreError> {
        Ok(self.scopes.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Scope>, StoreError> {
        Ok(self.scopes.read().await.values().cloned().collect())
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
