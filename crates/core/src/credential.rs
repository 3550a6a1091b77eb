//! Credential carriers.
//!
//! Credentials are opaque to the core; a credential store connector decides
//! whether it can store or verify a given credential type. The context half of
//! an authentication bundle carries connector metadata such as the
//! connector-local user id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Well-known context property carrying the connector-local user id during
/// authentication.
pub const USER_ID_PROPERTY: &str = "userId";

/// Credential type for plain passwords.
pub const PASSWORD_CREDENTIAL_TYPE: &str = "password";

/// An opaque credential: a type tag plus the secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential type tag (e.g. `password`)
    pub credential_type: String,
    /// Secret material in a connector-defined encoding
    pub value: String,
}

impl Credential {
    /// Create a new credential.
    pub fn new(credential_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
            value: value.into(),
        }
    }

    /// Create a password credential.
    pub fn password(value: impl Into<String>) -> Self {
        Self::new(PASSWORD_CREDENTIAL_TYPE, value)
    }
}

/// Metadata accompanying a credential during verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialContext {
    /// Free-form properties; connector-defined keys
    pub properties: HashMap<String, String>,
}

impl CredentialContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context carrying the connector-local user id.
    pub fn for_connector_user_id(connector_user_id: impl Into<String>) -> Self {
        let mut context = Self::new();
        context
            .properties
            .insert(USER_ID_PROPERTY.to_string(), connector_user_id.into());
        context
    }

    /// Connector-local user id, when present.
    pub fn connector_user_id(&self) -> Option<&str> {
        self.properties.get(USER_ID_PROPERTY).map(String::as_str)
    }
}
