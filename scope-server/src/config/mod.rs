pub(crate) use crate::config::cache::CacheConfig;
pub(crate) use crate::config::dynamic_scopes::DynamicScopesConfig;
pub(crate) use crate::config::introspection::IntrospectionConfig;
pub(crate) use crate::config::oauth::OAuthConfig;
pub(crate) use crate::config::store::{StoreBackend, StoreConfig};
use confique::Config;

pub mod cache;
pub mod dynamic_scopes;
pub mod introspection;
pub mod oauth;
pub mod store;

/// Environment variable naming the optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "SCOPE_SERVER_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "scope-server.toml";

/// Main configuration structure for the scope server
#[derive(Debug, Config, Clone)]
pub struct ServerConfig {
    /// The port the server will listen to (default: 7766)
    #[config(env = "SCOPE_SERVER_PORT", default = 7766)]
    pub port: u16,

    /// Scope store configuration
    #[config(nested)]
    pub store: StoreConfig,

    /// Scope listing cache configuration
    #[config(nested)]
    pub cache: CacheConfig,

    /// OAuth provider settings declaring the scopes of this deployment
    #[config(nested)]
    pub oauth: OAuthConfig,

    /// Dynamic scope registry settings
    #[config(nested)]
    pub dynamic_scopes: DynamicScopesConfig,

    /// Upstream token introspection service
    #[config(nested)]
    pub introspection: IntrospectionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7766,
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            oauth: OAuthConfig::default(),
            dynamic_scopes: DynamicScopesConfig::default(),
            introspection: IntrospectionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the configuration from environment variables, falling back to the
    /// TOML file named by `SCOPE_SERVER_CONFIG_FILE` (a missing file is ignored)
    pub fn new() -> Result<Self, String> {
        let path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::builder()
            .env()
            .file(path)
            .load()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            port: 0, // Let the OS choose a port
            cache: CacheConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
