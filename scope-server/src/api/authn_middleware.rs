use crate::tokens::{Introspector, TokenIntrospector};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::{debug, warn};
use std::sync::Arc;

const FORBIDDEN_MESSAGE: &str = "You are not authorized to access this resource";

/// Bearer token requirement of a group of routes
#[derive(Clone)]
pub(crate) struct ScopeGuard {
    introspector: Arc<Introspector>,
    required_scopes: Arc<Vec<String>>,
}

impl ScopeGuard {
    pub(crate) fn new(introspector: Arc<Introspector>, required_scopes: Vec<String>) -> Self {
        Self {
            introspector,
            required_scopes: Arc::new(required_scopes),
        }
    }
}

/// Application that presented the bearer token of the current request
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Caller {
    /// Client id the token was issued to
    pub application: String,
    pub scopes: Vec<String>,
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response()
}

fn bearer_token(request: &Request) -> Option<&str> {
    let header = request.headers().get(http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject the request with 403 unless it carries an active bearer token with
/// every required scope. The resolved [`Caller`] is stored in the request
/// extensions for the handler.
pub(crate) async fn require_scopes(
    State(guard): State<ScopeGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        warn!(
            "Missing or malformed bearer token on {}",
            request.uri().path()
        );
        return forbidden();
    };

    let status = match guard.introspector.introspect(token).await {
        Ok(status) => status,
        Err(e) => {
            warn!("Failed to introspect caller token: {}", e);
            return forbidden();
        }
    };

    if !status.has_scopes(&guard.required_scopes) {
        warn!(
            "Token of client {:?} lacks required scopes {:?} for {}",
            status.client_id,
            guard.required_scopes,
            request.uri().path()
        );
        return forbidden();
    }

    let Some(application) = status.client_id.clone() else {
        warn!(
            "Active token without a client id on {}",
            request.uri().path()
        );
        return forbidden();
    };

    debug!(
        "Request to {} authorized for {}",
        request.uri().path(),
        application
    );
    let caller = Caller {
        application,
        scopes: status.scopes().into_iter().map(str::to_string).collect(),
    };
    request.extensions_mut().insert(caller);
    next.run(request).await
}
