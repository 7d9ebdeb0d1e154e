use crate::models::{ScopeFields, ScopeRegistration};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while registering a scope with the authorization server
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Failed to send registration request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Authorization server rejected the registration with status {status}: {body}")]
    InvalidStatus { status: u16, body: String },
    #[error("Invalid registration client configuration: {0}")]
    Config(String),
}

/// HTTP client for the registration endpoint of a remote authorization server
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    client: Client,
    register_url: Url,
}

impl RegistrationClient {
    pub fn new(
        register_url: Url,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, RegistrationError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| RegistrationError::Config(format!("Invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        } else {
            log::warn!("No resource server auth token configured, registering scopes anonymously");
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            register_url,
        })
    }

    /// Register (create or update) a single scope.
    ///
    /// Any response outside the 2xx range is an error.
    pub async fn register(&self, fields: &ScopeFields) -> Result<(), RegistrationError> {
        log::debug!(
            "Registering scope '{}' with {}",
            fields.name, self.register_url
        );
        let response = self
            .client
            .post(self.register_url.clone())
            .json(&ScopeRegistration::from(fields))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::InvalidStatus {
                status: status.as_u16(),
                body,
            });
        }
        log::debug!("Scope '{}' registered ({})", fields.name, status);
        Ok(())
    }
}
