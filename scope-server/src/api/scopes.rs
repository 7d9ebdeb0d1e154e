use crate::api::authn_middleware::{require_scopes, Caller, ScopeGuard};
use crate::errors::ApiError;
use crate::headers::presets;
use crate::models::{Scope, ScopeFields, ScopeRegistration};
use crate::openapi::SCOPES_TAG;
use crate::scopes::ScopeMap;
use crate::state::AppState;
use crate::store::{ScopeStore, ScopeStoreBackend, StoreError};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Scope listing returned to token holders
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScopeListing {
    /// Scope name to description
    pub scopes: ScopeMap,
    /// Scopes granted when a client requests none
    pub default_scopes: Vec<String>,
}

/// Result of applying a registration to the store
#[derive(Debug, PartialEq)]
pub(crate) enum RegistrationOutcome {
    Created(Scope),
    Updated(Scope),
    /// The scope exists and belongs to another application, or to nobody
    Forbidden(Scope),
}

/// Create the scope for `application`, or update it when `application` owns it.
///
/// Reads the store directly, never the listing cache.
pub(crate) async fn apply_registration(
    store: &ScopeStore,
    fields: &ScopeFields,
    application: &str,
) -> Result<RegistrationOutcome, StoreError> {
    loop {
        let existing = match store.get(&fields.name).await? {
            Some(existing) => existing,
            None => match store.create(fields, Some(application)).await? {
                Some(created) => return Ok(RegistrationOutcome::Created(created)),
                // Another registration created it first, check its owner
                None => continue,
            },
        };

        if !existing.is_owned_by(application) {
            return Ok(RegistrationOutcome::Forbidden(existing));
        }
        let updated = store.upsert(fields, Some(application)).await?;
        return Ok(RegistrationOutcome::Updated(updated));
    }
}

/// Register a new scope or update a scope owned by the calling application
#[utoipa::path(
    post,
    path = "/register-scope",
    tag = SCOPES_TAG,
    request_body = ScopeRegistration,
    responses(
        (status = 201, description = "Scope created", body = Scope),
        (status = 200, description = "Scope updated", body = Scope),
        (status = 400, description = "Missing field or malformed body", body = String),
        (status = 403, description = "Caller is not authorized or does not own the scope"),
        (status = 500, description = "Scope store failure"),
    ),
    security(("bearer" = []))
)]
pub(crate) async fn register_scope(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Response {
    log::debug!(
        "Registration request from {} (scopes: {})",
        caller.application,
        caller.scopes.join(" ")
    );
    let registration: ScopeRegistration = if body.is_empty() {
        ScopeRegistration::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(registration) => registration,
            Err(e) => {
                warn!(
                    "Malformed registration body from {}: {}",
                    caller.application, e
                );
                return ApiError::bad_request(format!("Invalid request body: {}", e))
                    .into_response();
            }
        }
    };

    let fields = match registration.into_fields() {
        Ok(fields) => fields,
        Err(field) => {
            warn!(
                "Registration from {} is missing the '{}' field",
                caller.application, field
            );
            return (
                StatusCode::BAD_REQUEST,
                format!("'{}' must be given in request data", field),
            )
                .into_response();
        }
    };

    match apply_registration(&state.store, &fields, &caller.application).await {
        Ok(RegistrationOutcome::Created(scope)) => {
            info!("Scope '{}' created by {}", scope.name, caller.application);
            (StatusCode::CREATED, Json(scope)).into_response()
        }
        Ok(RegistrationOutcome::Updated(scope)) => {
            info!("Scope '{}' updated by {}", scope.name, caller.application);
            (StatusCode::OK, Json(scope)).into_response()
        }
        Ok(RegistrationOutcome::Forbidden(scope)) => {
            warn!(
                "Application {} may not update scope '{}' owned by {:?}",
                caller.application, scope.name, scope.application
            );
            StatusCode::FORBIDDEN.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// List every scope and the default scopes
#[utoipa::path(
    get,
    path = "/scopes",
    tag = SCOPES_TAG,
    responses(
        (status = 200, description = "Known scopes", body = ScopeListing),
        (status = 403, description = "Missing or invalid bearer token"),
        (status = 500, description = "Scope store failure"),
    ),
    security(("bearer" = []))
)]
pub(crate) async fn list_scopes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Response, ApiError> {
    let scopes = state.scopes.all_scopes().await?;
    let default_scopes = state
        .scopes
        .default_scopes(Some(&caller.application), None)
        .await?;

    let mut response = Json(ScopeListing {
        scopes,
        default_scopes,
    })
    .into_response();
    let max_age = u32::try_from(state.config.cache.ttl).unwrap_or(u32::MAX);
    presets::private_cache(max_age).apply(&mut response);
    Ok(response)
}

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let register_guard = ScopeGuard::new(
        state.introspector.clone(),
        vec![state.config.dynamic_scopes.register_scope_scope.clone()],
    );
    let listing_guard = ScopeGuard::new(state.introspector.clone(), vec![]);
    let register_layer = middleware::from_fn_with_state(register_guard, require_scopes);
    let listing_layer = middleware::from_fn_with_state(listing_guard, require_scopes);

    Router::new()
        .route(
            "/register-scope",
            post(register_scope).route_layer(register_layer),
        )
        .route("/scopes", get(list_scopes).route_layer(listing_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryScopeStore;
    use crate::test_utils::{TestFixture, APP_A_TOKEN, APP_B_TOKEN, NO_SCOPE_TOKEN};
    use http::header::CACHE_CONTROL;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_new_scope() {
        let fixture = TestFixture::new().await;

        let response = fixture
            .post_as(
                APP_A_TOKEN,
                "/register-scope",
                &json!({"name": "foo", "description": "Foo scope"}),
            )
            .await;

        response.assert_status(StatusCode::CREATED);
        let scope = response.json_as::<Scope>();
        assert_eq!(scope.application.as_deref(), Some("app-a"));
        assert!(!scope.is_default);

        let stored = fixture.store.get("foo").await.unwrap().unwrap();
        assert_eq!(stored.description, "Foo scope");
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let fixture = TestFixture::new().await;
        let body = json!({"name": "foo", "description": "Foo scope", "is_default": true});

        fixture
            .post_as(APP_A_TOKEN, "/register-scope", &body)
            .await
            .assert_status(StatusCode::CREATED);
        for _ in 0..3 {
            fixture
                .post_as(APP_A_TOKEN, "/register-scope", &body)
                .await
                .assert_ok();
        }

        let scopes = fixture.store.list().await.unwrap();
        let foo: Vec<_> = scopes.iter().filter(|s| s.name == "foo").collect();
        assert_eq!(foo.len(), 1);
        assert_eq!(foo[0].description, "Foo scope");
        assert!(foo[0].is_default);
    }

    #[tokio::test]
    async fn test_owner_can_update_and_others_cannot() {
        let fixture = TestFixture::new().await;
        fixture
            .post_as(
                APP_A_TOKEN,
                "/register-scope",
                &json!({"name": "foo", "description": "Foo"}),
            )
            .await
            .assert_status(StatusCode::CREATED);

        fixture
            .post_as(
                APP_A_TOKEN,
                "/register-scope",
                &json!({"name": "foo", "description": "Foo v2"}),
            )
            .await
            .assert_ok();
        assert_eq!(
            fixture.store.get("foo").await.unwrap().unwrap().description,
            "Foo v2"
        );

        fixture
            .post_as(
                APP_B_TOKEN,
                "/register-scope",
                &json!({"name": "foo", "description": "Hijacked", "is_default": true}),
            )
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let stored = fixture.store.get("foo").await.unwrap().unwrap();
        assert_eq!(stored.description, "Foo v2");
        assert!(!stored.is_default);
        assert_eq!(stored.application.as_deref(), Some("app-a"));
    }

    #[tokio::test]
    async fn test_unowned_scope_is_immutable() {
        let fixture = TestFixture::new().await;
        let before = fixture.store.get("introspection").await.unwrap().unwrap();

        for token in [APP_A_TOKEN, APP_B_TOKEN] {
            fixture
                .post_as(
                    token,
                    "/register-scope",
                    &json!({"name": "introspection", "description": "Mine", "is_default": true}),
                )
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }

        let after = fixture.store.get("introspection").await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_missing_description() {
        let fixture = TestFixture::new().await;

        let response = fixture
            .post_as(APP_A_TOKEN, "/register-scope", &json!({"name": "foo"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text, "'description' must be given in request data");
        assert!(fixture.store.get("foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_body_reports_name() {
        let fixture = TestFixture::new().await;
        let request = fixture
            .request_builder_as(APP_A_TOKEN, http::Method::POST, "/register-scope")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = fixture.send(request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text, "'name' must be given in request data");
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let fixture = TestFixture::new().await;
        let request = fixture
            .request_builder_as(APP_A_TOKEN, http::Method::POST, "/register-scope")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        fixture
            .send(request)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_requires_register_scope() {
        let fixture = TestFixture::new().await;

        fixture
            .post_as(
                NO_SCOPE_TOKEN,
                "/register-scope",
                &json!({"name": "foo", "description": "Foo"}),
            )
            .await
            .assert_status(StatusCode::FORBIDDEN);
        fixture
            .post_as(
                "unknown-token",
                "/register-scope",
                &json!({"name": "foo", "description": "Foo"}),
            )
            .await
            .assert_status(StatusCode::FORBIDDEN);

        assert!(fixture.store.get("foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_scopes() {
        let fixture = TestFixture::new().await;

        let response = fixture.get_as(NO_SCOPE_TOKEN, "/scopes").await;

        response.assert_ok();
        let listing = response.json_as::<ScopeListing>();
        assert_eq!(
            listing.scopes.get("register-scope").map(String::as_str),
            Some("Register scope")
        );
        let mut defaults = listing.default_scopes;
        defaults.sort();
        assert_eq!(defaults, vec!["read", "write"]);
        assert_eq!(
            response.headers.get(CACHE_CONTROL).unwrap(),
            &format!("private, max-age={}", fixture.config.cache.ttl)
        );
    }

    #[tokio::test]
    async fn test_list_scopes_requires_token() {
        let fixture = TestFixture::new().await;
        fixture
            .get_as("unknown-token", "/scopes")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_apply_registration_race_checks_owner() {
        let store = ScopeStore::InMemory(InMemoryScopeStore::new());
        let fields = ScopeFields::new("contested", "Contested", false);

        let (a, b) = tokio::join!(
            apply_registration(&store, &fields, "app-a"),
            apply_registration(&store, &fields, "app-b"),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let created = outcomes
            .iter()
            .filter(|o| matches!(o, RegistrationOutcome::Created(_)))
            .count();
        let forbidden = outcomes
            .iter()
            .filter(|o| matches!(o, RegistrationOutcome::Forbidden(_)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(forbidden, 1);
    }
}
