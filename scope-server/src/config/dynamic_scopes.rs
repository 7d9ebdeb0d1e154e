use confique::Config;

/// Settings of the dynamic scope registry
#[derive(Debug, Config, Clone)]
pub struct DynamicScopesConfig {
    /// Registration endpoint of an external authorization server.
    /// When set, this deployment acts as a resource server.
    #[config(env = "RESOURCE_SERVER_REGISTER_SCOPE_URL")]
    pub resource_server_register_scope_url: Option<String>,

    /// Scope required to call the introspection endpoint (default: "introspection")
    #[config(env = "INTROSPECT_SCOPE", default = "introspection")]
    pub introspect_scope: String,

    /// Scope required to call the registration endpoint (default: "register-scope")
    #[config(env = "REGISTER_SCOPE_SCOPE", default = "register-scope")]
    pub register_scope_scope: String,

    /// Timeout of a remote scope registration in seconds (default: 10)
    #[config(env = "REGISTER_SCOPE_TIMEOUT", default = 10)]
    pub registration_timeout: u64,
}

impl Default for DynamicScopesConfig {
    fn default() -> Self {
        Self {
            resource_server_register_scope_url: None,
            introspect_scope: "introspection".to_string(),
            register_scope_scope: "register-scope".to_string(),
            registration_timeout: 10,
        }
    }
}
