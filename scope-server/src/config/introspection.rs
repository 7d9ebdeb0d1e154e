use confique::Config;

/// Configuration of the upstream token introspection service
#[derive(Debug, Config, Clone)]
pub struct IntrospectionConfig {
    /// RFC 7662 introspection endpoint of the token service.
    /// Without it no bearer token is accepted.
    #[config(env = "SCOPE_SERVER_INTROSPECTION_URL")]
    pub url: Option<String>,

    /// Bearer token presented to the introspection endpoint
    #[config(env = "SCOPE_SERVER_INTROSPECTION_TOKEN")]
    pub token: Option<String>,

    /// The timeout for introspection queries in seconds (default: 5)
    #[config(env = "SCOPE_SERVER_INTROSPECTION_TIMEOUT", default = 5)]
    pub timeout: u64,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout: 5,
        }
    }
}
