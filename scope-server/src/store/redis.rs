use super::{ScopeStoreBackend, StoreError};
use crate::models::{Scope, ScopeFields};
use async_trait::async_trait;
use log::error;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

/// Scope store backed by a single Redis hash.
///
/// Each field of the hash is a scope name and each value is the JSON encoded
/// scope record. Ids are allocated from a counter key next to the hash.
#[derive(Clone)]
pub struct RedisScopeStore {
    _client: Client,
    conn_manager: ConnectionManager,
    hash_key: String,
    id_key: String,
}

impl RedisScopeStore {
    /// Connect to Redis and verify the connection
    pub async fn new(redis_url: &str, key: &str) -> Result<Self, String> {
        let client = match Client::open(redis_url) {
            Ok(client) => client,
            Err(err) => {
                return Err(format!("Failed to connect to Redis: {}", err));
            }
        };

        let conn_manager = match ConnectionManager::new(client.clone()).await {
            Ok(manager) => manager,
            Err(err) => {
                return Err(format!(
                    "Failed to create Redis connection manager: {}",
                    err
                ));
            }
        };

        let mut conn = conn_manager.clone();
        if let Err(err) = redis::cmd("PING").query_async::<String>(&mut conn).await {
            return Err(format!("Failed to ping Redis: {}", err));
        }

        Ok(Self {
            _client: client,
            conn_manager,
            hash_key: key.to_string(),
            id_key: format!("{}:next_id", key),
        })
    }

    fn redis_error(action: &str, name: &str, err: redis::RedisError) -> StoreError {
        error!("Redis error while {} scope {}: {}", action, name, err);
        StoreError::Redis(err.to_string())
    }

    fn decode(value: &str) -> Result<Scope, StoreError> {
        serde_json::from_str(value).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    async fn allocate_id(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.incr::<_, _, u64>(&self.id_key, 1)
            .await
            .map_err(|err| Self::redis_error("allocating an id for", &self.id_key, err))
    }

    async fn write(&self, scope: &Scope) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(scope)?;
        let mut conn = self.conn_manager.clone();
        conn.hset::<_, _, _, ()>(&self.hash_key, &scope.name, serialized)
            .await
            .map_err(|err| Self::redis_error("writing", &scope.name, err))
    }
}

#[async_trait]
impl ScopeStoreBackend for RedisScopeStore {
    async fn upsert(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Scope, StoreError> {
        if let Some(created) = self.create(fields, application).await? {
            return Ok(created);
        }

        let mut scope = match self.get(&fields.name).await? {
            Some(scope) => scope,
            // Deleted between the create attempt and the read
            None => return self.upsert(fields, application).await,
        };
        scope.description = fields.description.clone();
        scope.is_default = fields.is_default;
        self.write(&scope).await?;
        Ok(scope)
    }

    async fn create(
        &self,
        fields: &ScopeFields,
        application: Option<&str>,
    ) -> Result<Option<Scope>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let exists: bool = conn
            .hexists(&self.hash_key, &fields.name)
            .await
            .map_err(|err| Self::redis_error("checking", &fields.name, err))?;
        if exists {
            return Ok(None);
        }

        let scope = Scope {
            id: self.allocate_id().await?,
            name: fields.name.clone(),
            description: fields.description.clone(),
            is_default: fields.is_default,
            application: application.map(str::to_string),
        };
        let serialized = serde_json::to_string(&scope)?;
        let inserted: bool = conn
            .hset_nx(&self.hash_key, &scope.name, serialized)
            .await
            .map_err(|err| Self::redis_error("creating", &scope.name, err))?;

        Ok(inserted.then_some(scope))
    }

    async fn get(&self, name: &str) -> Result<Option<Scope>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn
            .hget(&self.hash_key, name)
            .await
            .map_err(|err| Self::redis_error("reading", name, err))?;
        value.as_deref().map(Self::decode).transpose()
    }

    async fn list(&self) -> Result<Vec<Scope>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let values: Vec<String> = conn
            .hvals(&self.hash_key)
            .await
            .map_err(|err| Self::redis_error("listing", &self.hash_key, err))?;
        values.iter().map(|value| Self::decode(value)).collect()
    }

    async fn health_check(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(format!("Redis health check failed: {}", err)),
        }
    }
}
