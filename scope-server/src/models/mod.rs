use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered OAuth scope
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Scope {
    /// Opaque identifier assigned by the store on creation
    pub id: u64,
    /// Unique scope name, used as the key for every lookup and upsert
    pub name: String,
    /// Description shown to users when they authorise access for the scope
    pub description: String,
    /// Whether the scope is granted when a client requests no explicit scopes
    #[serde(default)]
    pub is_default: bool,
    /// Client id of the application that registered the scope.
    /// Absent for scopes seeded by the authorization server itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
}

impl Scope {
    /// Whether the given application is recorded as the owner of this scope.
    /// Scopes without an owner are never owned by anyone.
    pub fn is_owned_by(&self, application: &str) -> bool {
        self.application.as_deref() == Some(application)
    }
}

/// The values written by a scope upsert or create
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ScopeFields {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

impl ScopeFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_default,
        }
    }
}

/// Body of a scope registration request.
///
/// Every field is optional at the parsing level so that a missing field can be
/// reported by name instead of as a generic deserialization failure.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq)]
pub struct ScopeRegistration {
    /// Scope name (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Scope description (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default-scope flag (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl ScopeRegistration {
    /// Validate the registration, returning the name of the first missing field on failure
    pub fn into_fields(self) -> Result<ScopeFields, &'static str> {
        let name = self.name.ok_or("name")?;
        let description = self.description.ok_or("description")?;
        Ok(ScopeFields {
            name,
            description,
            is_default: self.is_default.unwrap_or(false),
        })
    }
}

impl From<&ScopeFields> for ScopeRegistration {
    fn from(fields: &ScopeFields) -> Self {
        Self {
            name: Some(fields.name.clone()),
            description: Some(fields.description.clone()),
            is_default: Some(fields.is_default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_missing_description() {
        let registration: ScopeRegistration =
            serde_json::from_value(json!({"name": "foo"})).unwrap();
        assert_eq!(registration.into_fields(), Err("description"));
    }

    #[test]
    fn test_registration_missing_name_is_reported_first() {
        let registration: ScopeRegistration = serde_json::from_value(json!({})).unwrap();
        assert_eq!(registration.into_fields(), Err("name"));
    }

    #[test]
    fn test_registration_default_flag_defaults_to_false() {
        let registration: ScopeRegistration =
            serde_json::from_value(json!({"name": "foo", "description": "Foo"})).unwrap();
        assert_eq!(
            registration.into_fields(),
            Ok(ScopeFields::new("foo", "Foo", false))
        );
    }

    #[test]
    fn test_unowned_scope_is_not_owned_by_anyone() {
        let scope = Scope {
            id: 1,
            name: "introspection".to_string(),
            description: "Introspect token".to_string(),
            is_default: false,
            application: None,
        };
        assert!(!scope.is_owned_by("app-a"));
        assert!(!scope.is_owned_by(""));
    }
}
