use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const SCOPES_TAG: &str = "Scopes API";
pub(crate) const INTROSPECTION_TAG: &str = "Introspection API";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::health::ready_check,
        crate::api::scopes::register_scope,
        crate::api::scopes::list_scopes,
        crate::api::introspection::introspect_query,
        crate::api::introspection::introspect_form,
    ),
    components(schemas(
        crate::models::Scope,
        crate::models::ScopeRegistration,
        crate::api::scopes::ScopeListing,
        crate::tokens::TokenStatus,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = SCOPES_TAG, description = "Scope registration and listing"),
        (name = INTROSPECTION_TAG, description = "Bearer token introspection"),
    ),
    info(
        title = "Dynamic Scope Registry API",
        description = "OAuth scope registry for authorization and resource servers",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

/// Declares the bearer token scheme referenced by the protected endpoints
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}
