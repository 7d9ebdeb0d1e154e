use crate::scopes::ScopeError;
use crate::store::StoreError;
use crate::tokens::IntrospectionError;
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Bad Gateway (502) with a detail message
    pub fn bad_gateway<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_GATEWAY)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        log::error!("Scope store failure: {}", err);
        Self::internal(format!("Scope store failure: {}", err))
    }
}

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Store(err) => err.into(),
        }
    }
}

impl From<IntrospectionError> for ApiError {
    fn from(err: IntrospectionError) -> Self {
        log::error!("Token introspection failed: {}", err);
        Self::bad_gateway(format!("Token introspection failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_api_error_renders_detail() {
        let response = ApiError::bad_gateway("upstream down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"detail": "upstream down"}));
    }

    #[test]
    fn test_store_error_is_internal() {
        let err: ApiError = StoreError::Redis("connection refused".to_string()).into();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.contains("connection refused"));
    }

    #[test]
    fn test_introspection_error_is_bad_gateway() {
        let err: ApiError = IntrospectionError::InvalidStatus(500).into();
        assert_eq!(err.status_code, StatusCode::BAD_GATEWAY);
    }
}
