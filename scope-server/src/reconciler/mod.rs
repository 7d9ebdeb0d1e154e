//! Deploy-time reconciliation of the scopes a deployment declares.
//!
//! An authorization server seeds its own store. A resource server pushes every
//! declared scope to the authorization server and mirrors a scope locally only
//! once the remote registration succeeded. The first failure aborts the pass.

pub mod client;

use crate::config::{DynamicScopesConfig, OAuthConfig, ServerConfig};
use crate::models::{Scope, ScopeFields};
use crate::store::{ScopeStore, ScopeStoreBackend, StoreError};
use log::info;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use client::{RegistrationClient, RegistrationError};

const READ_SCOPE_DESCRIPTION: &str = "Reading scope";
const WRITE_SCOPE_DESCRIPTION: &str = "Writing scope";
const INTROSPECT_SCOPE_DESCRIPTION: &str = "Introspect token";
const REGISTER_SCOPE_DESCRIPTION: &str = "Register scope";

/// Errors that abort a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to register scope '{name}' with the authorization server: {source}")]
    Registration {
        name: String,
        #[source]
        source: RegistrationError,
    },
    #[error("Failed to store scope: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid reconciliation configuration: {0}")]
    Config(String),
}

/// Role this deployment plays in the scope registry
#[derive(Debug, Clone, PartialEq)]
pub enum DeploymentMode {
    /// Source of truth, scopes are written straight to the local store
    AuthorizationServer,
    /// Scopes are registered with an external authorization server first
    ResourceServer {
        register_url: Url,
        auth_token: Option<String>,
        timeout: Duration,
    },
}

impl DeploymentMode {
    /// Decide the mode from the presence of a remote registration URL
    pub fn from_config(config: &ServerConfig) -> Result<Self, ReconcileError> {
        let register_url = match config
            .dynamic_scopes
            .resource_server_register_scope_url
            .as_deref()
        {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Ok(Self::AuthorizationServer),
        };

        let register_url = Url::parse(register_url).map_err(|e| {
            ReconcileError::Config(format!(
                "Invalid resource server register scope URL '{}': {}",
                register_url, e
            ))
        })?;

        Ok(Self::ResourceServer {
            register_url,
            auth_token: config.oauth.resource_server_auth_token.clone(),
            timeout: Duration::from_secs(config.dynamic_scopes.registration_timeout),
        })
    }

    pub fn is_resource_server(&self) -> bool {
        matches!(self, Self::ResourceServer { .. })
    }
}

/// The scopes a deployment declares.
///
/// An authorization server declares the read, write, introspection and
/// register-scope scopes followed by the configured scope table. A resource
/// server declares only the configured table. Table entries override the
/// description of a built-in scope with the same name.
pub fn declared_scopes(
    mode: &DeploymentMode,
    oauth: &OAuthConfig,
    dynamic_scopes: &DynamicScopesConfig,
) -> Vec<ScopeFields> {
    let mut table: Vec<(String, String)> = Vec::new();
    if !mode.is_resource_server() {
        table.push((oauth.read_scope.clone(), READ_SCOPE_DESCRIPTION.to_string()));
        table.push((
            oauth.write_scope.clone(),
            WRITE_SCOPE_DESCRIPTION.to_string(),
        ));
        table.push((
            dynamic_scopes.introspect_scope.clone(),
            INTROSPECT_SCOPE_DESCRIPTION.to_string(),
        ));
        table.push((
            dynamic_scopes.register_scope_scope.clone(),
            REGISTER_SCOPE_DESCRIPTION.to_string(),
        ));
    }

    // Sorted so that repeated passes register in a stable order
    let mut extra: Vec<_> = oauth.scopes.iter().flatten().collect();
    extra.sort();
    for (name, description) in extra {
        match table.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = description.clone(),
            None => table.push((name.clone(), description.clone())),
        }
    }

    let defaults = oauth.get_default_scopes();
    table
        .into_iter()
        .map(|(name, description)| {
            let is_default = defaults.contains(&name);
            ScopeFields::new(name, description, is_default)
        })
        .collect()
}

/// Make the store (and, for a resource server, the authorization server) hold
/// every given scope. Returns the local records in declaration order.
pub async fn reconcile(
    mode: &DeploymentMode,
    scopes: &[ScopeFields],
    store: &ScopeStore,
) -> Result<Vec<Scope>, ReconcileError> {
    let client = match mode {
        DeploymentMode::AuthorizationServer => {
            info!("Seeding {} scopes into the local store", scopes.len());
            None
        }
        DeploymentMode::ResourceServer {
            register_url,
            auth_token,
            timeout,
        } => {
            info!(
                "Registering {} scopes with the authorization server at {}",
                scopes.len(),
                register_url
            );
            let client =
                RegistrationClient::new(register_url.clone(), auth_token.as_deref(), *timeout)
                    .map_err(|e| ReconcileError::Config(e.to_string()))?;
            Some(client)
        }
    };

    let mut reconciled = Vec::with_capacity(scopes.len());
    for fields in scopes {
        if let Some(client) = &client {
            client.register(fields).await.map_err(|source| {
                log::error!(
                    "Remote registration of scope '{}' failed: {}",
                    fields.name, source
                );
                ReconcileError::Registration {
                    name: fields.name.clone(),
                    source,
                }
            })?;
        }
        let scope = store.upsert(fields, None).await?;
        info!(
            "Scope '{}' reconciled (default: {})",
            scope.name, scope.is_default
        );
        reconciled.push(scope);
    }
    Ok(reconciled)
}

/// Decide the mode, build the scope table and reconcile it
pub async fn reconcile_from_config(
    config: &ServerConfig,
    store: &ScopeStore,
) -> Result<Vec<Scope>, ReconcileError> {
    let mode = DeploymentMode::from_config(config)?;
    let scopes = declared_scopes(&mode, &config.oauth, &config.dynamic_scopes);
    reconcile(&mode, &scopes, store).await
}
