//! Partition and linkage types.
//!
//! A logical user is assembled from partitions held in different backing
//! stores. The unique-id resolver records which partitions belong to which
//! logical id; these types are the vocabulary of that linkage.

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::credential::Credential;

/// The slice of a user that lives in one connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartition {
    /// Connector holding this partition
    pub connector_id: String,
    /// Connector-local identifier of the partition
    pub connector_user_id: String,
    /// `true` for an attribute partition in an identity store connector,
    /// `false` for a credential partition in a credential store connector
    pub identity_store: bool,
}

impl UserPartition {
    /// Create a new user partition.
    pub fn new(
        connector_id: impl Into<String>,
        connector_user_id: impl Into<String>,
        identity_store: bool,
    ) -> Self {
        Self {
            connector_id: connector_id.into(),
            connector_user_id: connector_user_id.into(),
            identity_store,
        }
    }
}

/// A logical user: a stable unique id plus the partitions it is assembled
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueUser {
    /// Stable logical identifier
    pub unique_user_id: String,
    /// Partitions holding the user's attributes and credentials
    pub user_partitions: Vec<UserPartition>,
}

impl UniqueUser {
    /// Create a new logical user.
    pub fn new(unique_user_id: impl Into<String>, user_partitions: Vec<UserPartition>) -> Self {
        Self {
            unique_user_id: unique_user_id.into(),
            user_partitions,
        }
    }

    /// Partitions held in identity store connectors.
    pub fn identity_partitions(&self) -> impl Iterator<Item = &UserPartition> {
        self.user_partitions.iter().filter(|p| p.identity_store)
    }

    /// Partitions held in credential store connectors.
    pub fn credential_partitions(&self) -> impl Iterator<Item = &UserPartition> {
        self.user_partitions.iter().filter(|p| !p.identity_store)
    }
}

/// The slice of a group that lives in one connector. Groups carry no
/// credential partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedGroup {
    /// Connector holding this partition
    pub connector_id: String,
    /// Connector-local identifier of the group
    pub connector_group_id: String,
}

impl ConnectedGroup {
    /// Create a new connected group.
    pub fn new(connector_id: impl Into<String>, connector_group_id: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            connector_group_id: connector_group_id.into(),
        }
    }
}

/// A logical group: a stable unique id plus its per-connector partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueGroup {
    /// Stable logical identifier
    pub unique_group_id: String,
    /// Partitions holding the group's attributes
    pub connected_groups: Vec<ConnectedGroup>,
}

impl UniqueGroup {
    /// Create a new logical group.
    pub fn new(unique_group_id: impl Into<String>, connected_groups: Vec<ConnectedGroup>) -> Self {
        Self {
            unique_group_id: unique_group_id.into(),
            connected_groups,
        }
    }
}

/// Caller-supplied description of a user to create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    /// Claims describing the user
    pub claims: Vec<Claim>,
    /// Credentials to persist for the user
    pub credentials: Vec<Credential>,
}

impl UserModel {
    /// Create an empty user model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim to the model.
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Add a credential to the model.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }
}

/// Caller-supplied description of a group to create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupModel {
    /// Claims describing the group
    pub claims: Vec<Claim>,
}

impl GroupModel {
    /// Create an empty group model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim to the model.
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }
}
