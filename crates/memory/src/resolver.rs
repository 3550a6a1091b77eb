//! In-memory unique-id resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use manifold_core::{ConnectedGroup, UniqueGroup, UniqueUser, UserPartition};
use manifold_store::resolver::{ResolverError, UniqueIdResolver};

#[derive(Default)]
struct State {
    users: BTreeMap<String, UniqueUser>,
    groups: BTreeMap<String, UniqueGroup>,
    user_domains: BTreeMap<String, String>,
    group_domains: BTreeMap<String, String>,
    memberships: BTreeMap<String, BTreeSet<String>>,
}

/// Unique-id resolver holding the linkage in process memory.
///
/// Listing order is the lexicographic order of the logical ids, which keeps
/// pagination stable across calls.
#[derive(Default)]
pub struct InMemoryUniqueIdResolver {
    state: RwLock<State>,
}

impl InMemoryUniqueIdResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain a user was recorded under, when known.
    pub fn domain_of_user(&self, unique_user_id: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .user_domains
            .get(unique_user_id)
            .cloned()
    }

    /// Number of recorded users.
    pub fn user_count(&self) -> usize {
        self.state.read().unwrap().users.len()
    }

    /// Number of recorded groups.
    pub fn group_count(&self) -> usize {
        self.state.read().unwrap().groups.len()
    }
}

impl UniqueIdResolver for InMemoryUniqueIdResolver {
    fn is_user_exists(&self, unique_user_id: &str) -> Result<bool, ResolverError> {
        Ok(self.state.read().unwrap().users.contains_key(unique_user_id))
    }

    fn is_group_exists(&self, unique_group_id: &str) -> Result<bool, ResolverError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .groups
            .contains_key(unique_group_id))
    }

    fn unique_user(&self, unique_user_id: &str) -> Result<Option<UniqueUser>, ResolverError> {
        Ok(self.state.read().unwrap().users.get(unique_user_id).cloned())
    }

    fn unique_user_from_connector_user_id(
        &self,
        connector_user_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueUser>, ResolverError> {
        let state = self.state.read().unwrap();
        Ok(state
            .users
            .values()
            .find(|user| {
                user.user_partitions.iter().any(|p| {
                    p.connector_id == connector_id && p.connector_user_id == connector_user_id
                })
            })
            .cloned())
    }

    fn unique_users(
        &self,
        connector_user_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueUser>, ResolverError> {
        // Result order follows the input order; unknown ids are skipped.
        let mut users = Vec::new();
        for connector_user_id in connector_user_ids {
            if let Some(user) =
                self.unique_user_from_connector_user_id(connector_user_id, connector_id)?
            {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn list_users(&self, offset: usize, length: usize) -> Result<Vec<UniqueUser>, ResolverError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .users
            .values()
            .skip(offset)
            .take(length)
            .cloned()
            .collect())
    }

    fn groups_of_user(&self, unique_user_id: &str) -> Result<Vec<UniqueGroup>, ResolverError> {
        let state = self.state.read().unwrap();
        let Some(group_ids) = state.memberships.get(unique_user_id) else {
            return Ok(Vec::new());
        };
        Ok(group_ids
            .iter()
            .filter_map(|id| state.groups.get(id).cloned())
            .collect())
    }

    fn users_of_group(&self, unique_group_id: &str) -> Result<Vec<UniqueUser>, ResolverError> {
        let state = self.state.read().unwrap();
        Ok(state
            .memberships
            .iter()
            .filter(|(_, group_ids)| group_ids.contains(unique_group_id))
            .filter_map(|(user_id, _)| state.users.get(user_id).cloned())
            .collect())
    }

    fn is_user_in_group(
        &self,
        unique_user_id: &str,
        unique_group_id: &str,
    ) -> Result<bool, ResolverError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .memberships
            .get(unique_user_id)
            .map(|group_ids| group_ids.contains(unique_group_id))
            .unwrap_or(false))
    }

    fn add_user(&self, user: UniqueUser, domain_name: &str) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        if state.users.contains_key(&user.unique_user_id) {
            return Err(ResolverError::Duplicate(user.unique_user_id));
        }
        state
            .user_domains
            .insert(user.unique_user_id.clone(), domain_name.to_string());
        state.users.insert(user.unique_user_id.clone(), user);
        Ok(())
    }

    fn add_users(
        &self,
        users: BTreeMap<String, Vec<UserPartition>>,
        domain_name: &str,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        for unique_user_id in users.keys() {
            if state.users.contains_key(unique_user_id) {
                return Err(ResolverError::Duplicate(unique_user_id.clone()));
            }
        }
        for (unique_user_id, user_partitions) in users {
            state
                .user_domains
                .insert(unique_user_id.clone(), domain_name.to_string());
            state.users.insert(
                unique_user_id.clone(),
                UniqueUser::new(unique_user_id, user_partitions),
            );
        }
        Ok(())
    }

    fn update_user(
        &self,
        unique_user_id: &str,
        connector_user_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        let user = state
            .users
            .get_mut(unique_user_id)
            .ok_or_else(|| ResolverError::UnknownId(unique_user_id.to_string()))?;

        // Identity partitions follow the new map; credential partitions are
        // untouched.
        let mut partitions: Vec<UserPartition> = user
            .user_partitions
            .iter()
            .filter(|p| !p.identity_store)
            .cloned()
            .collect();
        for (connector_id, connector_user_id) in connector_user_ids {
            partitions.push(UserPartition::new(connector_id, connector_user_id, true));
        }
        user.user_partitions = partitions;
        Ok(())
    }

    fn delete_user(&self, unique_user_id: &str) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        state
            .users
            .remove(unique_user_id)
            .ok_or_else(|| ResolverError::UnknownId(unique_user_id.to_string()))?;
        state.user_domains.remove(unique_user_id);
        state.memberships.remove(unique_user_id);
        Ok(())
    }

    fn unique_group(&self, unique_group_id: &str) -> Result<Option<UniqueGroup>, ResolverError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .groups
            .get(unique_group_id)
            .cloned())
    }

    fn unique_group_from_connector_group_id(
        &self,
        connector_group_id: &str,
        connector_id: &str,
    ) -> Result<Option<UniqueGroup>, ResolverError> {
        let state = self.state.read().unwrap();
        Ok(state
            .groups
            .values()
            .find(|group| {
                group.connected_groups.iter().any(|g| {
                    g.connector_id == connector_id && g.connector_group_id == connector_group_id
                })
            })
            .cloned())
    }

    fn unique_groups(
        &self,
        connector_group_ids: &[String],
        connector_id: &str,
    ) -> Result<Vec<UniqueGroup>, ResolverError> {
        let mut groups = Vec::new();
        for connector_group_id in connector_group_ids {
            if let Some(group) =
                self.unique_group_from_connector_group_id(connector_group_id, connector_id)?
            {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    fn list_groups(&self, offset: usize, length: usize) -> Result<Vec<UniqueGroup>, ResolverError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .groups
            .values()
            .skip(offset)
            .take(length)
            .cloned()
            .collect())
    }

    fn add_group(&self, group: UniqueGroup, domain_name: &str) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        if state.groups.contains_key(&group.unique_group_id) {
            return Err(ResolverError::Duplicate(group.unique_group_id));
        }
        state
            .group_domains
            .insert(group.unique_group_id.clone(), domain_name.to_string());
        state.groups.insert(group.unique_group_id.clone(), group);
        Ok(())
    }

    fn add_groups(
        &self,
        groups: BTreeMap<String, Vec<ConnectedGroup>>,
        domain_name: &str,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        for unique_group_id in groups.keys() {
            if state.groups.contains_key(unique_group_id) {
                return Err(ResolverError::Duplicate(unique_group_id.clone()));
            }
        }
        for (unique_group_id, connected_groups) in groups {
            state
                .group_domains
                .insert(unique_group_id.clone(), domain_name.to_string());
            state.groups.insert(
                unique_group_id.clone(),
                UniqueGroup::new(unique_group_id, connected_groups),
            );
        }
        Ok(())
    }

    fn update_group(
        &self,
        unique_group_id: &str,
        connector_group_ids: BTreeMap<String, String>,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        let group = state
            .groups
            .get_mut(unique_group_id)
            .ok_or_else(|| ResolverError::UnknownId(unique_group_id.to_string()))?;

        group.connected_groups = connector_group_ids
            .into_iter()
            .map(|(connector_id, connector_group_id)| {
                ConnectedGroup::new(connector_id, connector_group_id)
            })
            .collect();
        Ok(())
    }

    fn delete_group(&self, unique_group_id: &str) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        state
            .groups
            .remove(unique_group_id)
            .ok_or_else(|| ResolverError::UnknownId(unique_group_id.to_string()))?;
        state.group_domains.remove(unique_group_id);
        for group_ids in state.memberships.values_mut() {
            group_ids.remove(unique_group_id);
        }
        Ok(())
    }

    fn update_groups_of_user(
        &self,
        unique_user_id: &str,
        unique_group_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        if !state.users.contains_key(unique_user_id) {
            return Err(ResolverError::UnknownId(unique_user_id.to_string()));
        }
        for unique_group_id in &unique_group_ids {
            if !state.groups.contains_key(unique_group_id) {
                return Err(ResolverError::UnknownId(unique_group_id.clone()));
            }
        }
        state
            .memberships
            .insert(unique_user_id.to_string(), unique_group_ids.into_iter().collect());
        Ok(())
    }

    fn update_users_of_group(
        &self,
        unique_group_id: &str,
        unique_user_ids: Vec<String>,
    ) -> Result<(), ResolverError> {
        let mut state = self.state.write().unwrap();
        if !state.groups.contains_key(unique_group_id) {
            return Err(ResolverError::UnknownId(unique_group_id.to_string()));
        }
        for unique_user_id in &unique_user_ids {
            if !state.users.contains_key(unique_user_id) {
                return Err(ResolverError::UnknownId(unique_user_id.clone()));
            }
        }

        let members: BTreeSet<String> = unique_user_ids.into_iter().collect();
        for (user_id, group_ids) in state.memberships.iter_mut() {
            if members.contains(user_id) {
                group_ids.insert(unique_group_id.to_string());
            } else {
                group_ids.remove(unique_group_id);
            }
        }
        for user_id in &members {
            state
                .memberships
                .entry(user_id.clone())
                .or_default()
                .insert(unique_group_id.to_string());
        }
        Ok(())
    }
}
