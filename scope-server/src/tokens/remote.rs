use super::{IntrospectionError, TokenIntrospector};
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Introspector calling an RFC 7662 endpoint
#[derive(Clone)]
pub struct RemoteIntrospector {
    client: Client,
    url: Url,
}

impl RemoteIntrospector {
    pub fn new(url: &str, token: Option<&str>, timeout: u64) -> Result<Self, IntrospectionError> {
        let url = Url::parse(url).map_err(|e| {
            IntrospectionError::Config(format!("Invalid introspection URL '{}': {}", url, e))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                IntrospectionError::Config(format!("Invalid introspection token: {}", e))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(2))
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl TokenIntrospector for RemoteIntrospector {
    async fn introspect_payload(&self, token: &str) -> Result<Value, IntrospectionError> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Introspection service responded with status {}", status);
            return Err(IntrospectionError::InvalidStatus(status.as_u16()));
        }
        Ok(response.json::<Value>().await?)
    }
}
