use confique::Config;
use serde::Deserialize;

/// Specifies which scope store implementation to use
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    #[default]
    InMemory,
    Redis,
}

/// Configuration of the durable scope store
#[derive(Debug, Config, Clone)]
pub struct StoreConfig {
    /// Store backend: "in-memory" (default) or "redis"
    #[config(env = "SCOPE_SERVER_STORE_BACKEND", default = "in-memory")]
    pub backend: StoreBackend,

    /// Redis connection string, required for the redis backend
    #[config(env = "SCOPE_SERVER_STORE_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Name of the Redis hash holding the scopes (default: dynamic_scopes)
    #[config(env = "SCOPE_SERVER_STORE_REDIS_KEY", default = "dynamic_scopes")]
    pub redis_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::InMemory,
            redis_url: None,
            redis_key: "dynamic_scopes".to_string(),
        }
    }
}
