use super::{IntrospectionError, TokenIntrospector, TokenStatus};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Introspector answering from a fixed token table.
///
/// Tokens whose `exp` lies in the past are reported inactive.
#[derive(Clone, Default)]
pub struct StaticIntrospector {
    tokens: Arc<HashMap<String, TokenStatus>>,
}

impl StaticIntrospector {
    pub fn new(tokens: HashMap<String, TokenStatus>) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }
}

#[async_trait]
impl TokenIntrospector for StaticIntrospector {
    async fn introspect_payload(&self, token: &str) -> Result<Value, IntrospectionError> {
        let status = match self.tokens.get(token) {
            Some(status) if !status.is_expired_at(chrono::Utc::now().timestamp()) => status,
            _ => return Ok(serde_json::to_value(TokenStatus::inactive())?),
        };
        Ok(serde_json::to_value(status)?)
    }
}
