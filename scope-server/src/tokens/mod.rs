//! Bearer token introspection.
//!
//! Token issuance and validation live in an external token service. This module
//! is the boundary to it: a [`TokenIntrospector`] turns a bearer token into the
//! RFC 7662 token status the guard and the introspection endpoint work with.

pub mod fixed;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors talking to the token introspection service
#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error("Failed to send introspection request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Introspection service responded with status {0}")]
    InvalidStatus(u16),
    #[error("Unreadable introspection payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Invalid introspection configuration: {0}")]
    Config(String),
}

/// RFC 7662 token status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenStatus {
    /// Whether the token is active
    #[serde(default)]
    pub active: bool,
    /// Space separated scopes granted to the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client identifier of the application the token was issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiration timestamp (Unix time, may be fractional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub exp: Option<Number>,
    /// Issued at timestamp (Unix time, may be fractional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub iat: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Any other claims reported by the token service
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl TokenStatus {
    /// Status of a token that is unknown, expired or revoked
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Active token issued to `client_id` with the given scopes
    pub fn active_for(client_id: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            active: true,
            scope: Some(scopes.join(" ")),
            client_id: Some(client_id.into()),
            token_type: Some("Bearer".to_string()),
            ..Default::default()
        }
    }

    /// Read the status out of a raw introspection payload
    pub fn from_payload(payload: Value) -> Result<Self, IntrospectionError> {
        Ok(serde_json::from_value(payload)?)
    }

    /// Whether `exp` lies at or before `now` (Unix time)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp
            .as_ref()
            .and_then(Number::as_f64)
            .is_some_and(|exp| exp <= now as f64)
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Whether the token is active and carries every required scope
    pub fn has_scopes<S: AsRef<str>>(&self, required: &[S]) -> bool {
        let granted = self.scopes();
        self.active
            && required
                .iter()
                .all(|scope| granted.contains(&scope.as_ref()))
    }
}

/// Resolves bearer tokens to their status
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// The token service's answer for `token`, as reported
    async fn introspect_payload(&self, token: &str) -> Result<Value, IntrospectionError>;

    async fn introspect(&self, token: &str) -> Result<TokenStatus, IntrospectionError> {
        TokenStatus::from_payload(self.introspect_payload(token).await?)
    }
}

/// Token introspector selected at runtime from configuration
#[derive(Clone)]
pub enum Introspector {
    /// RFC 7662 endpoint of an external token service
    Remote(remote::RemoteIntrospector),
    /// Fixed token table
    Static(fixed::StaticIntrospector),
}

#[async_trait]
impl TokenIntrospector for Introspector {
    async fn introspect_payload(&self, token: &str) -> Result<Value, IntrospectionError> {
        match self {
            Self::Remote(introspector) => introspector.introspect_payload(token).await,
            Self::Static(introspector) => introspector.introspect_payload(token).await,
        }
    }
}

/// Create the introspector for the configured token service
pub fn create_introspector(
    config: &crate::config::IntrospectionConfig,
) -> Result<Introspector, IntrospectionError> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => Ok(Introspector::Remote(
            remote::RemoteIntrospector::new(url, config.token.as_deref(), config.timeout)?,
        )),
        _ => {
            log::warn!("No introspection service configured, every bearer token will be rejected");
            Ok(Introspector::Static(fixed::StaticIntrospector::default()))
        }
    }
}
