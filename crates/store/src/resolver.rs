//! Unique-id resolver contract.
//!
//! The resolver is the authoritative record of the correspondence between a
//! logical user/group id and its per-connector partitions. Every write path
//! of the virtual store commits to the resolver last.

use std::collections::BTreeMap;

use thiserror::Error;

use manifold_core::{ConnectedGroup, UniqueGroup, UniqueUser, UserPartition};

/// Errors raised by resolver operations.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// A unique id was added twice
    #[error("Duplicate unique id: {0}")]
    Duplicate(String),

    /// The unique id is not known to the resolver
    #[error("Unknown unique id: {0}")]
    UnknownId(String),

    /// The resolver's backing store failed
    #[error("Resolver backend failure: {0}")]
    Backend(String),
}

/// Contract for the linkage store between logical ids and partitions.
///
/// Implementations must tolerate concurrent callers and reject duplicate
/// logical ids; the virtual store generates UUIDs, so collisions are not
/// expected in practice.
pub trait UniqueIdResolver: Send + Sync {
    /// Whether a logical user id is known.
    fn is_user_exists(&self, unique_user_id: &str) -> Result<bool, ResolverError>;

    /// Whether a logical group id is known.
    fn is_group_exists(&self, unique_group_id: &str) -> Result<bool, ResolverError>;

    /// The logical user for an id, when one exists.
    fn unique_user(&self, unique_user_id: &str) -> Result<Option<UniqueUser>, ResolverError>;

    /// The logical user owning a connector-local id, when one exists.
    fn unique_user_from_connector_user_id(
        &self,
        connector_user_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueUser>, ResolverError>;

    /// The logical users owning the given connector-local ids. Result order
    /// matches the input order; missing entries are skipped.
    fn unique_users(
        &self,
        connector_user_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueUser>, ResolverError>;

    /// Page through all logical users.
    fn list_users(&self, offset: usize, length: usize) -> Result<Vec<UniqueUser>, ResolverError>;

    /// Groups a user belongs to.
    fn groups_of_user(&self, unique_user_id: &str) -> Result<Vec<UniqueGroup>, ResolverError>;

    /// Users belonging to a group.
    fn users_of_group(&self, unique_group_id: &str) -> Result<Vec<UniqueUser>, ResolverError>;

    /// Whether a user belongs to a group.
    fn is_user_in_group(
        &self,
        unique_user_id: &str,
        unique_group_id: &str,
    ) -> Result<bool, ResolverError>;

    /// Record a new logical user and its partitions.
    fn add_user(&self, user: UniqueUser, domain_name: &str) -> Result<(), ResolverError>;

    /// Record a batch of logical users keyed by logical id.
    fn add_users(
        &self,
        users: BTreeMap<String, Vec<UserPartition>>,
        domain_name: &str,
    ) -> Result<(), ResolverError>;

    /// Replace the identity-partition linkage of a user with the given
    /// connector id to connector-local id map.
    fn update_user(
        &self,
        unique_user_id: &str,
        connector_user_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError>;

    /// Remove a logical user and its linkage.
    fn delete_user(&self, unique_user_id: &str) -> Result<(), ResolverError>;

    /// The logical group for an id, when one exists.
    fn unique_group(&self, unique_group_id: &str) -> Result<Option<UniqueGroup>, ResolverError>;

    /// The logical group owning a connector-local id, when one exists.
    fn unique_group_from_connector_group_id(
        &self,
        connector_group_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueGroup>, ResolverError>;

    /// The logical groups owning the given connector-local ids. Result order
    /// matches the input order; missing entries are skipped.
    fn unique_groups(
        &self,
        connector_group_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueGroup>, ResolverError>;

    /// Page through all logical groups.
    fn list_groups(&self, offset: usize, length: usize) -> Result<Vec<UniqueGroup>, ResolverError>;

    /// Record a new logical group and its partitions.
    fn add_group(&self, group: UniqueGroup, domain_name: &str) -> Result<(), ResolverError>;

    /// Record a batch of logical groups keyed by logical id.
    fn add_groups(
        &self,
        groups: BTreeMap<String, Vec<ConnectedGroup>>,
        domain_name: &str,
    ) -> Result<(), ResolverError>;

    /// Replace the partition linkage of a group.
    fn update_group(
        &self,
        unique_group_id: &str,
        connector_group_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError>;

    /// Remove a logical group and its linkage.
    fn delete_group(&self, unique_group_id: &str) -> Result<(), ResolverError>;

    /// Replace the set of groups a user belongs to.
    fn update_groups_of_user(
        &self,
        unique_user_id: &str,
        unique_group_ids: Vec<String>,
    ) -> Result<(), ResolverError>;

    /// Replace the set of users belonging to a group.
    fn update_users_of_group(
        &self,
        unique_group_id: &str,
        unique_user_ids: Vec<String>,
    ) -> Result<(), ResolverError>;
}
