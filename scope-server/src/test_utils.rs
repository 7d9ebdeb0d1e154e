use crate::cache::{null::NullCache, Cache};
use crate::config::ServerConfig;
use crate::create_app;
use crate::reconciler::reconcile_from_config;
use crate::state::AppState;
use crate::store::{memory::InMemoryScopeStore, ScopeStore};
use crate::tokens::fixed::StaticIntrospector;
use crate::tokens::remote::RemoteIntrospector;
use crate::tokens::{Introspector, TokenStatus};
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceExt;
use wiremock::MockServer;

/// Token of `app-a`, carries the register-scope and introspection scopes
pub const APP_A_TOKEN: &str = "app-a-token";
/// Token of `app-b`, carries the register-scope scope only
pub const APP_B_TOKEN: &str = "app-b-token";
/// Token of `app-c`, carries the read scope only
pub const NO_SCOPE_TOKEN: &str = "app-c-token";

/// Test fixture running the full application against an in-memory scope store.
///
/// The store is seeded the way an authorization server seeds it on startup.
/// Callers authenticate with the tokens above unless the fixture was created
/// with [`TestFixture::with_remote_introspection`], in which case every token is
/// resolved by `introspection_mock`.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture
///         .post_as(APP_A_TOKEN, "/register-scope", &json!({"name": "foo", "description": "Foo"}))
///         .await;
///
///     response.assert_status(StatusCode::CREATED);
///     assert!(fixture.store.get("foo").await.unwrap().is_some());
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration of the application
    pub config: ServerConfig,
    /// The scope store behind the application
    pub store: ScopeStore,
    /// Mock token introspection service
    pub introspection_mock: MockServer,
}

impl TestFixture {
    /// Creates a fixture that resolves tokens from the static token table
    pub async fn new() -> Self {
        let introspector = Introspector::Static(StaticIntrospector::new(HashMap::from([
            (
                APP_A_TOKEN.to_string(),
                TokenStatus::active_for("app-a", &["read", "register-scope", "introspection"]),
            ),
            (
                APP_B_TOKEN.to_string(),
                TokenStatus::active_for("app-b", &["read", "register-scope"]),
            ),
            (
                NO_SCOPE_TOKEN.to_string(),
                TokenStatus::active_for("app-c", &["read"]),
            ),
        ])));
        let introspection_mock = MockServer::start().await;
        Self::build(ServerConfig::for_test(), introspector, introspection_mock).await
    }

    /// Creates a fixture that resolves every token through `introspection_mock`
    pub async fn with_remote_introspection() -> Self {
        let introspection_mock = MockServer::start().await;
        let mut config = ServerConfig::for_test();
        config.introspection.url = Some(format!("{}/o/introspect", introspection_mock.uri()));

        let introspector = Introspector::Remote(
            RemoteIntrospector::new(
                &format!("{}/o/introspect", introspection_mock.uri()),
                None,
                config.introspection.timeout,
            )
            .expect("Failed to create introspector"),
        );
        Self::build(config, introspector, introspection_mock).await
    }

    async fn build(
        config: ServerConfig,
        introspector: Introspector,
        introspection_mock: MockServer,
    ) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let store = ScopeStore::InMemory(InMemoryScopeStore::new());
        reconcile_from_config(&config, &store)
            .await
            .expect("Failed to seed the scope store");

        let state = AppState::with_components(
            &config,
            store.clone(),
            Cache::Null(NullCache::new()),
            introspector,
        );
        let app = create_app(state).await;

        Self {
            app,
            config,
            store,
            introspection_mock,
        }
    }

    /// Initializes the test logger with the given level
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Creates a request builder authenticated with the given bearer token
    pub fn request_builder_as(
        &self,
        token: &str,
        method: Method,
        uri: impl AsRef<str>,
    ) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
    }

    /// Sends an unauthenticated GET request
    pub async fn get_anonymous(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = Request::builder()
            .uri(uri.as_ref())
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a GET request with the given bearer token
    pub async fn get_as(&self, token: &str, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder_as(token, Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with a JSON body and the given bearer token
    pub async fn post_as<T: Serialize>(
        &self,
        token: &str,
        uri: impl AsRef<str>,
        body: &T,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder_as(token, Method::POST, uri)
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and collects the response
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body).to_string();
        // Non JSON bodies show up as an empty object
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            json,
            text,
        }
    }
}

/// Response from a test request
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
    /// Raw response body
    pub text: String,
}

impl TestResponse {
    /// Asserts that the response has the expected status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.text
        );
        self
    }

    /// Asserts that the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Converts the response body to the specified type
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
