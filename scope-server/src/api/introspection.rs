use crate::api::authn_middleware::{require_scopes, ScopeGuard};
use crate::errors::ApiError;
use crate::headers::presets;
use crate::openapi::INTROSPECTION_TAG;
use crate::state::AppState;
use crate::tokens::{TokenIntrospector, TokenStatus};
use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

/// Token to introspect, from the query string or a form body
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct IntrospectionParams {
    pub token: Option<String>,
}

/// Answer with the token service's payload for `token`, unchanged
async fn token_response(state: &AppState, token: Option<String>) -> Response {
    let payload = match token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => {
            match state.introspector.introspect_payload(token).await {
                Ok(payload) => payload,
                Err(e) => return ApiError::from(e).into_response(),
            }
        }
        _ => {
            log::debug!("Introspection request without a token");
            json!({"active": false})
        }
    };

    let mut response = Json(payload).into_response();
    presets::no_store().apply(&mut response);
    response
}

/// Introspect a token given in the query string
#[utoipa::path(
    get,
    path = "/introspect",
    tag = INTROSPECTION_TAG,
    params(IntrospectionParams),
    responses(
        (status = 200, description = "Token status", body = TokenStatus),
        (status = 403, description = "Caller lacks the introspection scope"),
        (status = 502, description = "Token service unavailable"),
    ),
    security(("bearer" = []))
)]
pub(crate) async fn introspect_query(
    State(state): State<AppState>,
    Query(params): Query<IntrospectionParams>,
) -> Response {
    token_response(&state, params.token).await
}

/// Introspect a token given in a form body
#[utoipa::path(
    post,
    path = "/introspect",
    tag = INTROSPECTION_TAG,
    request_body(content = IntrospectionParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token status", body = TokenStatus),
        (status = 403, description = "Caller lacks the introspection scope"),
        (status = 502, description = "Token service unavailable"),
    ),
    security(("bearer" = []))
)]
pub(crate) async fn introspect_form(
    State(state): State<AppState>,
    form: Result<Form<IntrospectionParams>, FormRejection>,
) -> Response {
    let token = match form {
        Ok(Form(params)) => params.token,
        Err(e) => {
            log::debug!("Ignoring unreadable introspection form: {}", e);
            None
        }
    };
    token_response(&state, token).await
}

pub(super) fn router(state: &AppState) -> Router<AppState> {
    let guard = ScopeGuard::new(
        state.introspector.clone(),
        vec![state.config.dynamic_scopes.introspect_scope.clone()],
    );

    Router::new().route(
        "/introspect",
        get(introspect_query)
            .post(introspect_form)
            .route_layer(middleware::from_fn_with_state(guard, require_scopes)),
    )
}
