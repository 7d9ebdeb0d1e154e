//! Settings of the OAuth provider this server works alongside

use confique::Config;
use std::collections::HashMap;

/// OAuth provider settings that declare which scopes a deployment needs
#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Name of the read scope (default: "read")
    #[config(env = "OAUTH_READ_SCOPE", default = "read")]
    pub read_scope: String,

    /// Name of the write scope (default: "write")
    #[config(env = "OAUTH_WRITE_SCOPE", default = "write")]
    pub write_scope: String,

    /// Additional scopes, name to description. Only settable from the config file.
    pub scopes: Option<HashMap<String, String>>,

    /// Scopes granted when a client requests none.
    /// Comma-separated list (default: "read,write")
    #[config(env = "OAUTH_DEFAULT_SCOPES", default = "read,write")]
    pub default_scopes: String,

    /// Bearer token a resource server presents to the authorization server
    #[config(env = "RESOURCE_SERVER_AUTH_TOKEN")]
    pub resource_server_auth_token: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            read_scope: "read".to_string(),
            write_scope: "write".to_string(),
            scopes: None,
            default_scopes: "read,write".to_string(),
            resource_server_auth_token: None,
        }
    }
}

impl OAuthConfig {
    /// Get default scopes as a vector
    pub fn get_default_scopes(&self) -> Vec<String> {
        self.default_scopes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_oauth_config() {
        let config = OAuthConfig::default();
        assert_eq!(config.read_scope, "read");
        assert_eq!(config.write_scope, "write");
        assert!(config.scopes.is_none());
        assert_eq!(config.get_default_scopes(), vec!["read", "write"]);
    }

    #[test]
    fn test_get_default_scopes_with_spaces() {
        let config = OAuthConfig {
            default_scopes: " read , extra ,".to_string(),
            ..Default::default()
        };
        assert_eq!(config.get_default_scopes(), vec!["read", "extra"]);
    }

    #[test]
    fn test_get_default_scopes_empty() {
        let config = OAuthConfig {
            default_scopes: "".to_string(),
            ..Default::default()
        };
        assert!(config.get_default_scopes().is_empty());
    }
}
