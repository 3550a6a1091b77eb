//! Claim and attribute vocabulary.
//!
//! Claims are the caller-visible, dialect-qualified facts about a subject.
//! Attributes are their connector-local counterparts; a meta-claim mapping
//! binds the two inside a domain.

use serde::{Deserialize, Serialize};

/// Default claim dialect understood by the virtual store.
pub const CLAIM_DIALECT_URI: &str = "http://wso2.org/claims";

/// Claim URI that must be present on every new user carrying claims.
pub const USERNAME_CLAIM_URI: &str = "http://wso2.org/claims/username";

/// A dialect-qualified fact about a subject (e.g. an email address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Dialect the claim URI belongs to
    pub dialect_uri: String,
    /// Identifier of the claim within the dialect
    pub claim_uri: String,
    /// Claim value
    pub value: String,
}

impl Claim {
    /// Create a new claim.
    pub fn new(
        dialect_uri: impl Into<String>,
        claim_uri: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
            claim_uri: claim_uri.into(),
            value: value.into(),
        }
    }

    /// Create a claim in the default dialect.
    pub fn in_default_dialect(claim_uri: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(CLAIM_DIALECT_URI, claim_uri, value)
    }

    /// Create a username claim in the default dialect.
    pub fn username(value: impl Into<String>) -> Self {
        Self::new(CLAIM_DIALECT_URI, USERNAME_CLAIM_URI, value)
    }
}

/// Schema element of a claim without its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClaim {
    /// Dialect the claim URI belongs to
    pub dialect_uri: String,
    /// Identifier of the claim within the dialect
    pub claim_uri: String,
}

impl MetaClaim {
    /// Create a new meta claim.
    pub fn new(dialect_uri: impl Into<String>, claim_uri: impl Into<String>) -> Self {
        Self {
            dialect_uri: dialect_uri.into(),
            claim_uri: claim_uri.into(),
        }
    }

    /// Create a meta claim in the default dialect.
    pub fn in_default_dialect(claim_uri: impl Into<String>) -> Self {
        Self::new(CLAIM_DIALECT_URI, claim_uri)
    }
}

/// Binding between one meta claim and the attribute of one identity store
/// connector. A claim URI maps to at most one connector per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClaimMapping {
    /// The mapped schema element
    pub meta_claim: MetaClaim,
    /// Identity store connector that owns the attribute
    pub identity_store_connector_id: String,
    /// Connector-local attribute name
    pub attribute_name: String,
    /// Whether the attribute value identifies at most one user in the domain
    pub unique: bool,
}

impl MetaClaimMapping {
    /// Create a new mapping.
    pub fn new(
        meta_claim: MetaClaim,
        identity_store_connector_id: impl Into<String>,
        attribute_name: impl Into<String>,
        unique: bool,
    ) -> Self {
        Self {
            meta_claim,
            identity_store_connector_id: identity_store_connector_id.into(),
            attribute_name: attribute_name.into(),
            unique,
        }
    }

    /// Claim URI this mapping resolves.
    pub fn claim_uri(&self) -> &str {
        &self.meta_claim.claim_uri
    }

    /// Whether this mapping matches the given claim.
    pub fn matches_claim(&self, claim: &Claim) -> bool {
        self.meta_claim.claim_uri == claim.claim_uri
            && self.meta_claim.dialect_uri == claim.dialect_uri
    }
}

/// Connector-local, dialect-free form of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Connector-local attribute name
    pub attribute_name: String,
    /// Attribute value
    pub attribute_value: String,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(attribute_name: impl Into<String>, attribute_value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            attribute_value: attribute_value.into(),
        }
    }
}
