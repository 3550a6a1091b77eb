//! Test doubles shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::Mutex;

use manifold_core::{
    Attribute, ConnectedGroup, Credential, CredentialContext, UniqueGroup, UniqueUser,
    UserPartition,
};

use crate::connector::{ConnectorError, CredentialStoreConnector, IdentityStoreConnector};
use crate::error::AuthenticationFailure;
use crate::resolver::{ResolverError, UniqueIdResolver};

/// Identity connector stub whose operations must never be reached. Every
/// operation errs, so a passing test proves no connector I/O happened.
pub(crate) struct StaticIdentityConnector {
    id: String,
}

impl StaticIdentityConnector {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    fn unreachable<T>(&self, operation: &str) -> Result<T, ConnectorError> {
        Err(ConnectorError::Unsupported(format!(
            "{operation} must not be reached on connector {}",
            self.id
        )))
    }
}

impl IdentityStoreConnector for StaticIdentityConnector {
    fn connector_id(&self) -> &str {
        &self.id
    }

    fn add_user(&self, _attributes: &[Attribute]) -> Result<String, ConnectorError> {
        self.unreachable("add_user")
    }

    fn add_users(
        &self,
        _users: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        self.unreachable("add_users")
    }

    fn update_user_attributes(
        &self,
        _connector_user_id: &str,
        _attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        self.unreachable("update_user_attributes")
    }

    fn delete_user(&self, _connector_user_id: &str) -> Result<(), ConnectorError> {
        self.unreachable("delete_user")
    }

    fn connector_user_id(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        self.unreachable("connector_user_id")
    }

    fn list_connector_user_ids(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.unreachable("list_connector_user_ids")
    }

    fn list_connector_user_ids_by_pattern(
        &self,
        _attribute_name: &str,
        _pattern: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.unreachable("list_connector_user_ids_by_pattern")
    }

    fn user_attribute_values(
        &self,
        _connector_user_id: &str,
        _attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.unreachable("user_attribute_values")
    }

    fn remove_added_users(&self, _connector_user_ids: &[String]) -> Result<(), ConnectorError> {
        self.unreachable("remove_added_users")
    }

    fn add_group(&self, _attributes: &[Attribute]) -> Result<String, ConnectorError> {
        self.unreachable("add_group")
    }

    fn add_groups(
        &self,
        _groups: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        self.unreachable("add_groups")
    }

    fn update_group_attributes(
        &self,
        _connector_group_id: &str,
        _attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        self.unreachable("update_group_attributes")
    }

    fn delete_group(&self, _connector_group_id: &str) -> Result<(), ConnectorError> {
        self.unreachable("delete_group")
    }

    fn connector_group_id(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        self.unreachable("connector_group_id")
    }

    fn list_connector_group_ids(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.unreachable("list_connector_group_ids")
    }

    fn list_connector_group_ids_by_pattern(
        &self,
        _attribute_name: &str,
        _pattern: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.unreachable("list_connector_group_ids_by_pattern")
    }

    fn remove_added_groups(&self, _connector_group_ids: &[String]) -> Result<(), ConnectorError> {
        self.unreachable("remove_added_groups")
    }
}

/// Identity connector that accepts writes with a fixed connector-local id and
/// records every compensation call.
pub(crate) struct RecordingIdentityConnector {
    id: String,
    next_user_id: String,
    pub(crate) removed: Mutex<Vec<Vec<String>>>,
}

impl RecordingIdentityConnector {
    pub(crate) fn new(id: impl Into<String>, next_user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            next_user_id: next_user_id.into(),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn removed_batches(&self) -> Vec<Vec<String>> {
        self.removed.lock().unwrap().clone()
    }
}

impl IdentityStoreConnector for RecordingIdentityConnector {
    fn connector_id(&self) -> &str {
        &self.id
    }

    fn add_user(&self, _attributes: &[Attribute]) -> Result<String, ConnectorError> {
        Ok(self.next_user_id.clone())
    }

    fn add_users(
        &self,
        users: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        Ok(users
            .keys()
            .map(|key| (key.clone(), format!("{}-{}", self.next_user_id, key)))
            .collect())
    }

    fn update_user_attributes(
        &self,
        connector_user_id: &str,
        _attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        Ok(connector_user_id.to_string())
    }

    fn delete_user(&self, _connector_user_id: &str) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn connector_user_id(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        Ok(Some(self.next_user_id.clone()))
    }

    fn list_connector_user_ids(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(Vec::new())
    }

    fn list_connector_user_ids_by_pattern(
        &self,
        _attribute_name: &str,
        _pattern: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(Vec::new())
    }

    fn user_attribute_values(
        &self,
        _connector_user_id: &str,
        _attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        Ok(Vec::new())
    }

    fn remove_added_users(&self, connector_user_ids: &[String]) -> Result<(), ConnectorError> {
        self.removed
            .lock()
            .unwrap()
            .push(connector_user_ids.to_vec());
        Ok(())
    }

    fn add_group(&self, _attributes: &[Attribute]) -> Result<String, ConnectorError> {
        Ok(self.next_user_id.clone())
    }

    fn add_groups(
        &self,
        groups: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        Ok(groups
            .keys()
            .map(|key| (key.clone(), format!("{}-{}", self.next_user_id, key)))
            .collect())
    }

    fn update_group_attributes(
        &self,
        connector_group_id: &str,
        _attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        Ok(connector_group_id.to_string())
    }

    fn delete_group(&self, _connector_group_id: &str) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn connector_group_id(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        Ok(None)
    }

    fn list_connector_group_ids(
        &self,
        _attribute_name: &str,
        _attribute_value: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(Vec::new())
    }

    fn list_connector_group_ids_by_pattern(
        &self,
        _attribute_name: &str,
        _pattern: &str,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(Vec::new())
    }

    fn remove_added_groups(&self, connector_group_ids: &[String]) -> Result<(), ConnectorError> {
        self.removed
            .lock()
            .unwrap()
            .push(connector_group_ids.to_vec());
        Ok(())
    }
}

/// Credential connector that claims every credential and fails every write.
pub(crate) struct RejectingCredentialConnector {
    id: String,
}

impl RejectingCredentialConnector {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CredentialStoreConnector for RejectingCredentialConnector {
    fn connector_id(&self) -> &str {
        &self.id
    }

    fn can_store(&self, _credential: &Credential) -> bool {
        true
    }

    fn can_handle(&self, _credential: &Credential, _context: &CredentialContext) -> bool {
        true
    }

    fn add_credential(&self, _credentials: &[Credential]) -> Result<String, ConnectorError> {
        Err(ConnectorError::Write("credential vault unavailable".into()))
    }

    fn delete_credential(&self, _connector_user_id: &str) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn authenticate(
        &self,
        _credential: &Credential,
        _context: &CredentialContext,
    ) -> Result<(), AuthenticationFailure> {
        Err(AuthenticationFailure::new("Invalid credentials."))
    }
}

/// Resolver whose every operation succeeds with an empty answer.
pub(crate) struct NullResolver;

impl UniqueIdResolver for NullResolver {
    fn is_user_exists(&self, _unique_user_id: &str) -> Result<bool, ResolverError> {
        Ok(false)
    }

    fn is_group_exists(&self, _unique_group_id: &str) -> Result<bool, ResolverError> {
        Ok(false)
    }

    fn unique_user(&self, _unique_user_id: &str) -> Result<Option<UniqueUser>, ResolverError> {
        Ok(None)
    }

    fn unique_user_from_connector_user_id(
        &self,
        _connector_user_id: &str,
        _connector_id: &str,
    ) -> Result<Option<UniqueUser>, ResolverError> {
        Ok(None)
    }

    fn unique_users(
        &self,
        _connector_user_ids: &[String],
        _connector_id: &str,
    ) -> Result<Vec<UniqueUser>, ResolverError> {
        Ok(Vec::new())
    }

    fn list_users(&self, _offset: usize, _length: usize) -> Result<Vec<UniqueUser>, ResolverError> {
        Ok(Vec::new())
    }

    fn groups_of_user(&self, _unique_user_id: &str) -> Result<Vec<UniqueGroup>, ResolverError> {
        Ok(Vec::new())
    }

    fn users_of_group(&self, _unique_group_id: &str) -> Result<Vec<UniqueUser>, ResolverError> {
        Ok(Vec::new())
    }

    fn is_user_in_group(
        &self,
        _unique_user_id: &str,
        _unique_group_id: &str,
    ) -> Result<bool, ResolverError> {
        Ok(false)
    }

    fn add_user(&self, _user: UniqueUser, _domain_name: &str) -> Result<(), ResolverError> {
        Ok(())
    }

    fn add_users(
        &self,
        _users: BTreeMap<String, Vec<UserPartition>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Ok(())
    }

    fn update_user(
        &self,
        _unique_user_id: &str,
        _connector_user_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Ok(())
    }

    fn delete_user(&self, _unique_user_id: &str) -> Result<(), ResolverError> {
        Ok(())
    }

    fn unique_group(&self, _unique_group_id: &str) -> Result<Option<UniqueGroup>, ResolverError> {
        Ok(None)
    }

    fn unique_group_from_connector_group_id(
        &self,
        _connector_group_id: &str,
        _connector_id: &str,
    ) -> Result<Option<UniqueGroup>, ResolverError> {
        Ok(None)
    }

    fn unique_groups(
        &self,
        _connector_group_ids: &[String],
        _connector_id: &str,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        Ok(Vec::new())
    }

    fn list_groups(
        &self,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        Ok(Vec::new())
    }

    fn add_group(&self, _group: UniqueGroup, _domain_name: &str) -> Result<(), ResolverError> {
        Ok(())
    }

    fn add_groups(
        &self,
        _groups: BTreeMap<String, Vec<ConnectedGroup>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Ok(())
    }

    fn update_group(
        &self,
        _unique_group_id: &str,
        _connector_group_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Ok(())
    }

    fn delete_group(&self, _unique_group_id: &str) -> Result<(), ResolverError> {
        Ok(())
    }

    fn update_groups_of_user(
        &self,
        _unique_user_id: &str,
        _unique_group_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        Ok(())
    }

    fn update_users_of_group(
        &self,
        _unique_group_id: &str,
        _unique_user_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        Ok(())
    }
}

/// Resolver whose every operation fails; a passing test proves the resolver
/// was never consulted.
pub(crate) struct UnreachableResolver;

impl UnreachableResolver {
    fn unreachable<T>(operation: &str) -> Result<T, ResolverError> {
        Err(ResolverError::Backend(format!(
            "{operation} must not be reached"
        )))
    }
}

impl UniqueIdResolver for UnreachableResolver {
    fn is_user_exists(&self, _unique_user_id: &str) -> Result<bool, ResolverError> {
        Self::unreachable("is_user_exists")
    }

    fn is_group_exists(&self, _unique_group_id: &str) -> Result<bool, ResolverError> {
        Self::unreachable("is_group_exists")
    }

    fn unique_user(&self, _unique_user_id: &str) -> Result<Option<UniqueUser>, ResolverError> {
        Self::unreachable("unique_user")
    }

    fn unique_user_from_connector_user_id(
        &self,
        _connector_user_id: &str,
        _connector_id: &str,
    ) -> Result<Option<UniqueUser>, ResolverError> {
        Self::unreachable("unique_user_from_connector_user_id")
    }

    fn unique_users(
        &self,
        _connector_user_ids: &[String],
        _connector_id: &str,
    ) -> Result<Vec<UniqueUser>, ResolverError> {
        Self::unreachable("unique_users")
    }

    fn list_users(&self, _offset: usize, _length: usize) -> Result<Vec<UniqueUser>, ResolverError> {
        Self::unreachable("list_users")
    }

    fn groups_of_user(&self, _unique_user_id: &str) -> Result<Vec<UniqueGroup>, ResolverError> {
        Self::unreachable("groups_of_user")
    }

    fn users_of_group(&self, _unique_group_id: &str) -> Result<Vec<UniqueUser>, ResolverError> {
        Self::unreachable("users_of_group")
    }

    fn is_user_in_group(
        &self,
        _unique_user_id: &str,
        _unique_group_id: &str,
    ) -> Result<bool, ResolverError> {
        Self::unreachable("is_user_in_group")
    }

    fn add_user(&self, _user: UniqueUser, _domain_name: &str) -> Result<(), ResolverError> {
        Self::unreachable("add_user")
    }

    fn add_users(
        &self,
        _users: BTreeMap<String, Vec<UserPartition>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Self::unreachable("add_users")
    }

    fn update_user(
        &self,
        _unique_user_id: &str,
        _connector_user_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Self::unreachable("update_user")
    }

    fn delete_user(&self, _unique_user_id: &str) -> Result<(), ResolverError> {
        Self::unreachable("delete_user")
    }

    fn unique_group(&self, _unique_group_id: &str) -> Result<Option<UniqueGroup>, ResolverError> {
        Self::unreachable("unique_group")
    }

    fn unique_group_from_connector_group_id(
        &self,
        _connector_group_id: &str,
        _connector_id: &str,
    ) -> Result<Option<UniqueGroup>, ResolverError> {
        Self::unreachable("unique_group_from_connector_group_id")
    }

    fn unique_groups(
        &self,
        _connector_group_ids: &[String],
        _connector_id: &str,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        Self::unreachable("unique_groups")
    }

    fn list_groups(
        &self,
        _offset: usize,
        _length: usize,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        Self::unreachable("list_groups")
    }

    fn add_group(&self, _group: UniqueGroup, _domain_name: &str) -> Result<(), ResolverError> {
        Self::unreachable("add_group")
    }

    fn add_groups(
        &self,
        _groups: BTreeMap<String, Vec<ConnectedGroup>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Self::unreachable("add_groups")
    }

    fn update_group(
        &self,
        _unique_group_id: &str,
        _connector_group_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Self::unreachable("update_group")
    }

    fn delete_group(&self, _unique_group_id: &str) -> Result<(), ResolverError> {
        Self::unreachable("delete_group")
    }

    fn update_groups_of_user(
        &self,
        _unique_user_id: &str,
        _unique_group_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        Self::unreachable("update_groups_of_user")
    }

    fn update_users_of_group(
        &self,
        _unique_group_id: &str,
        _unique_user_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        Self::unreachable("update_users_of_group")
    }
}

/// Resolver that accepts reads but rejects the linkage commit.
pub(crate) struct FailingCommitResolver;

impl UniqueIdResolver for FailingCommitResolver {
    fn is_user_exists(&self, unique_user_id: &str) -> Result<bool, ResolverError> {
        NullResolver.is_user_exists(unique_user_id)
    }

    fn is_group_exists(&self, unique_group_id: &str) -> Result<bool, ResolverError> {
        NullResolver.is_group_exists(unique_group_id)
    }

    fn unique_user(&self, unique_user_id: &str) -> Result<Option<UniqueUser>, ResolverError> {
        NullResolver.unique_user(unique_user_id)
    }

    fn unique_user_from_connector_user_id(
        &self,
        connector_user_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueUser>, ResolverError> {
        NullResolver.unique_user_from_connector_user_id(connector_user_id, connector_id)
    }

    fn unique_users(
        &self,
        connector_user_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueUser>, ResolverError> {
        NullResolver.unique_users(connector_user_ids, connector_id)
    }

    fn list_users(&self, offset: usize, length: usize) -> Result<Vec<UniqueUser>, ResolverError> {
        NullResolver.list_users(offset, length)
    }

    fn groups_of_user(&self, unique_user_id: &str) -> Result<Vec<UniqueGroup>, ResolverError> {
        NullResolver.groups_of_user(unique_user_id)
    }

    fn users_of_group(&self, unique_group_id: &str) -> Result<Vec<UniqueUser>, ResolverError> {
        NullResolver.users_of_group(unique_group_id)
    }

    fn is_user_in_group(
        &self,
        unique_user_id: &str,
        unique_group_id: &str,
    ) -> Result<bool, ResolverError> {
        NullResolver.is_user_in_group(unique_user_id, unique_group_id)
    }

    fn add_user(&self, _user: UniqueUser, _domain_name: &str) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn add_users(
        &self,
        _users: BTreeMap<String, Vec<UserPartition>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn update_user(
        &self,
        _unique_user_id: &str,
        _connector_user_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn delete_user(&self, unique_user_id: &str) -> Result<(), ResolverError> {
        NullResolver.delete_user(unique_user_id)
    }

    fn unique_group(&self, unique_group_id: &str) -> Result<Option<UniqueGroup>, ResolverError> {
        NullResolver.unique_group(unique_group_id)
    }

    fn unique_group_from_connector_group_id(
        &self,
        connector_group_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueGroup>, ResolverError> {
        NullResolver.unique_group_from_connector_group_id(connector_group_id, connector_id)
    }

    fn unique_groups(
        &self,
        connector_group_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        NullResolver.unique_groups(connector_group_ids, connector_id)
    }

    fn list_groups(&self, offset: usize, length: usize) -> Result<Vec<UniqueGroup>, ResolverError> {
        NullResolver.list_groups(offset, length)
    }

    fn add_group(&self, _group: UniqueGroup, _domain_name: &str) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn add_groups(
        &self,
        _groups: BTreeMap<String, Vec<ConnectedGroup>>,
        _domain_name: &str,
    ) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn update_group(
        &self,
        _unique_group_id: &str,
        _connector_group_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        Err(ResolverError::Backend("linkage store unavailable".into()))
    }

    fn delete_group(&self, unique_group_id: &str) -> Result<(), ResolverError> {
        NullResolver.delete_group(unique_group_id)
    }

    fn update_groups_of_user(
        &self,
        unique_user_id: &str,
        unique_group_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        NullResolver.update_groups_of_user(unique_user_id, unique_group_ids)
    }

    fn update_users_of_group(
        &self,
        unique_group_id: &str,
        unique_user_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        NullResolver.update_users_of_group(unique_group_id, unique_user_ids)
    }
}
