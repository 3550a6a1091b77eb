//! Error types for virtual identity store operations.

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by identity store operations.
///
/// Callers match on the variant: `Client` for bad inputs, the `*NotFound`
/// variants for absent entities, the domain variants for configuration and
/// routing problems, and `Server` for connector or resolver failures that
/// were surfaced after compensation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bad caller input
    #[error("Invalid request: {0}")]
    Client(String),

    /// User absent
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Group absent
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// No domains registered at all
    #[error("No domains registered.")]
    NoDomains,

    /// Named domain is unknown
    #[error("Domain {name} was not found")]
    DomainNotFound {
        /// Requested domain name
        name: String,
    },

    /// No mapping resolves the claim URI within the domain
    #[error("No claim mapping found for claim URI {claim_uri}")]
    UnknownClaim {
        /// Unmapped claim URI
        claim_uri: String,
    },

    /// Domain bundle is inconsistent
    #[error("Domain configuration error: {0}")]
    DomainConfig(String),

    /// Connector or resolver failure surfaced after compensation
    #[error("Identity store server error: {message}")]
    Server {
        /// What failed
        message: String,
        /// Underlying failure, when one exists
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Build a client error.
    pub fn client(message: impl Into<String>) -> Self {
        StoreError::Client(message.into())
    }

    /// Build a server error without a cause.
    pub fn server(message: impl Into<String>) -> Self {
        StoreError::Server {
            message: message.into(),
            source: None,
        }
    }

    /// Build a server error wrapping a cause.
    pub fn server_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StoreError::Server {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure of the authentication path.
///
/// Every internal error along this path collapses into this type so that
/// callers cannot distinguish whether the claim matched, the user existed, or
/// the credential mismatched.
#[derive(Error, Debug)]
#[error("Authentication failed: {message}")]
pub struct AuthenticationFailure {
    message: String,
}

impl AuthenticationFailure {
    /// Create a new authentication failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
