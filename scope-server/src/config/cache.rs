use confique::Config;

/// Configuration of the scope listing cache
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Time-to-live of the cached scope listing in seconds (default: 30)
    #[config(env = "SCOPE_SERVER_CACHE_TTL", default = 30)]
    pub ttl: u64,

    /// Enable the cache; when disabled every listing reads the store (default: true)
    #[config(env = "SCOPE_SERVER_CACHE_ENABLED", default = true)]
    pub enabled: bool,

    /// Maximum capacity in MiB (default: 1 MiB)
    #[config(env = "SCOPE_SERVER_CACHE_CAPACITY", default = 1)]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: 30,
            enabled: true,
            capacity: 1,
        }
    }
}
