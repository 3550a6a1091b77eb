//! Connector contracts consumed by the virtual store.
//!
//! A connector is a driver over a single backing store. The core owns only
//! these behavioral contracts; the drivers themselves (LDAP, SQL, vault) live
//! outside the core and are handed in fully constructed at `init`.

use std::collections::BTreeMap;

use thiserror::Error;

use manifold_core::{Attribute, Credential, CredentialContext};

use crate::error::AuthenticationFailure;

/// Errors raised by connector operations.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// A write to the backing store failed
    #[error("Connector write failed: {0}")]
    Write(String),

    /// A read from the backing store failed
    #[error("Connector read failed: {0}")]
    Read(String),

    /// The connector does not support the requested operation
    #[error("Operation not supported by connector: {0}")]
    Unsupported(String),
}

/// Contract for a connector that stores attribute partitions of users and
/// groups in one backend.
///
/// Connector-local ids are opaque strings chosen by the connector; an update
/// may rekey the entity, in which case the new id is returned. Pagination
/// semantics of the list operations (stability, duplicates across pages) are
/// connector-defined.
pub trait IdentityStoreConnector: Send + Sync {
    /// Stable identifier of this connector within its domain.
    fn connector_id(&self) -> &str;

    /// Persist a new attribute partition; returns its connector-local id.
    fn add_user(&self, attributes: &[Attribute]) -> Result<String, ConnectorError>;

    /// Persist a batch of attribute partitions keyed by a caller correlation
    /// token. Partial success is permitted: keys missing from the returned
    /// map are failures for those entries.
    fn add_users(
        &self,
        users: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError>;

    /// Replace the attributes of an existing partition; returns the possibly
    /// rekeyed connector-local id.
    fn update_user_attributes(
        &self,
        connector_user_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError>;

    /// Remove an attribute partition.
    fn delete_user(&self, connector_user_id: &str) -> Result<(), ConnectorError>;

    /// Connector-local id of the user carrying the attribute value, when one
    /// exists.
    fn connector_user_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError>;

    /// Connector-local ids of users carrying the attribute value (equality
    /// filter).
    fn list_connector_user_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Connector-local ids of users whose attribute matches the pattern.
    /// Pattern syntax is connector-defined.
    fn list_connector_user_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Attribute values of a partition, optionally restricted to the given
    /// attribute names.
    fn user_attribute_values(
        &self,
        connector_user_id: &str,
        attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError>;

    /// Compensation: remove partitions written earlier in a store operation
    /// that subsequently failed. Must be idempotent and must only err when
    /// truly unable to clean up; the virtual store logs failures and
    /// continues.
    fn remove_added_users(&self, connector_user_ids: &[String]) -> Result<(), ConnectorError>;

    /// Persist a new group partition; returns its connector-local id.
    fn add_group(&self, attributes: &[Attribute]) -> Result<String, ConnectorError>;

    /// Persist a batch of group partitions keyed by a caller correlation
    /// token; same partial-success contract as [`add_users`].
    ///
    /// [`add_users`]: IdentityStoreConnector::add_users
    fn add_groups(
        &self,
        groups: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError>;

    /// Replace the attributes of an existing group partition.
    fn update_group_attributes(
        &self,
        connector_group_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError>;

    /// Remove a group partition.
    fn delete_group(&self, connector_group_id: &str) -> Result<(), ConnectorError>;

    /// Connector-local id of the group carrying the attribute value, when one
    /// exists.
    fn connector_group_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError>;

    /// Connector-local ids of groups carrying the attribute value.
    fn list_connector_group_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Connector-local ids of groups whose attribute matches the pattern.
    fn list_connector_group_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Compensation counterpart of [`remove_added_users`] for groups.
    ///
    /// [`remove_added_users`]: IdentityStoreConnector::remove_added_users
    fn remove_added_groups(&self, connector_group_ids: &[String]) -> Result<(), ConnectorError>;
}

/// Contract for a connector that persists and verifies credentials in one
/// backend.
pub trait CredentialStoreConnector: Send + Sync {
    /// Stable identifier of this connector within its domain.
    fn connector_id(&self) -> &str;

    /// Whether this connector can persist the credential. Cheap and
    /// side-effect free.
    fn can_store(&self, credential: &Credential) -> bool;

    /// Whether this connector can verify the credential bundle. Cheap and
    /// side-effect free.
    fn can_handle(&self, credential: &Credential, context: &CredentialContext) -> bool;

    /// Persist credentials; returns the connector-local id of the credential
    /// partition.
    fn add_credential(&self, credentials: &[Credential]) -> Result<String, ConnectorError>;

    /// Remove a credential partition.
    fn delete_credential(&self, connector_user_id: &str) -> Result<(), ConnectorError>;

    /// Verify the credential bundle. Success returns normally; a mismatch or
    /// any internal failure is an [`AuthenticationFailure`].
    fn authenticate(
        &self,
        credential: &Credential,
        context: &CredentialContext,
    ) -> Result<(), AuthenticationFailure>;
}
