//! In-memory identity store connector.

use std::collections::BTreeMap;
use std::sync::RwLock;

use manifold_core::Attribute;
use manifold_store::connector::{ConnectorError, IdentityStoreConnector};

#[derive(Default)]
struct State {
    users: BTreeMap<String, Vec<Attribute>>,
    groups: BTreeMap<String, Vec<Attribute>>,
    sequence: u64,
}

/// Identity store connector holding attribute partitions in process memory.
///
/// Connector-local ids are sequential and never rekeyed on update. Lookups
/// iterate partitions in id order, so results are deterministic.
pub struct InMemoryIdentityStoreConnector {
    connector_id: String,
    state: RwLock<State>,
}

impl InMemoryIdentityStoreConnector {
    /// Create an empty connector with the given id.
    pub fn new(connector_id: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Number of user partitions currently stored.
    pub fn user_count(&self) -> usize {
        self.state.read().unwrap().users.len()
    }

    /// Number of group partitions currently stored.
    pub fn group_count(&self) -> usize {
        self.state.read().unwrap().groups.len()
    }

    fn next_id(state: &mut State, connector_id: &str, kind: &str) -> String {
        state.sequence += 1;
        format!("{connector_id}-{kind}-{}", state.sequence)
    }
}

fn has_attribute(attributes: &[Attribute], name: &str, value: &str) -> bool {
    attributes
        .iter()
        .any(|a| a.attribute_name == name && a.attribute_value == value)
}

fn matching_ids(
    entries: &BTreeMap<String, Vec<Attribute>>,
    name: &str,
    mut matches: impl FnMut(&str) -> bool,
) -> Vec<String> {
    entries
        .iter()
        .filter(|(_, attributes)| {
            attributes
                .iter()
                .any(|a| a.attribute_name == name && matches(&a.attribute_value))
        })
        .map(|(id, _)| id.clone())
        .collect()
}

/// Glob match with `*` as the only wildcard; everything else is literal.
fn pattern_matches(value: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return value == pattern;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remainder = value;

    let first = segments[0];
    if !remainder.starts_with(first) {
        return false;
    }
    remainder = &remainder[first.len()..];

    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match remainder.find(segment) {
            Some(position) => remainder = &remainder[position + segment.len()..],
            None => return false,
        }
    }

    remainder.ends_with(segments[segments.len() - 1])
}

fn page(ids: Vec<String>, offset: usize, length: usize) -> Vec<String> {
    ids.into_iter().skip(offset).take(length).collect()
}

impl IdentityStoreConnector for InMemoryIdentityStoreConnector {
    fn connector_id(&self) -> &str {
        &self.connector_id
    }

    fn add_user(&self, attributes: &[Attribute]) -> Result<String, ConnectorError> {
        let mut state = self.state.write().unwrap();
        let id = Self::next_id(&mut state, &self.connector_id, "user");
        state.users.insert(id.clone(), attributes.to_vec());
        Ok(id)
    }

    fn add_users(
        &self,
        users: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        let mut state = self.state.write().unwrap();
        let mut ids = BTreeMap::new();
        for (key, attributes) in users {
            let id = Self::next_id(&mut state, &self.connector_id, "user");
            state.users.insert(id.clone(), attributes.clone());
            ids.insert(key.clone(), id);
        }
        Ok(ids)
    }

    fn update_user_attributes(
        &self,
        connector_user_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        let mut state = self.state.write().unwrap();
        match state.users.get_mut(connector_user_id) {
            Some(stored) => {
                *stored = attributes.to_vec();
                Ok(connector_user_id.to_string())
            }
            None => Err(ConnectorError::Read(format!(
                "Unknown connector user id {connector_user_id}"
            ))),
        }
    }

    fn delete_user(&self, connector_user_id: &str) -> Result<(), ConnectorError> {
        self.state.write().unwrap().users.remove(connector_user_id);
        Ok(())
    }

    fn connector_user_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(_, attributes)| has_attribute(attributes, attribute_name, attribute_value))
            .map(|(id, _)| id.clone()))
    }

    fn list_connector_user_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        let ids = matching_ids(&state.users, attribute_name, |v| v == attribute_value);
        Ok(page(ids, offset, length))
    }

    fn list_connector_user_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        let ids = matching_ids(&state.users, attribute_name, |v| pattern_matches(v, pattern));
        Ok(page(ids, offset, length))
    }

    fn user_attribute_values(
        &self,
        connector_user_id: &str,
        attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        let state = self.state.read().unwrap();
        let attributes = state.users.get(connector_user_id).ok_or_else(|| {
            ConnectorError::Read(format!("Unknown connector user id {connector_user_id}"))
        })?;

        Ok(match attribute_names {
            None => attributes.clone(),
            Some(names) => attributes
                .iter()
                .filter(|a| names.contains(&a.attribute_name))
                .cloned()
                .collect(),
        })
    }

    fn remove_added_users(&self, connector_user_ids: &[String]) -> Result<(), ConnectorError> {
        let mut state = self.state.write().unwrap();
        for connector_user_id in connector_user_ids {
            state.users.remove(connector_user_id);
        }
        Ok(())
    }

    fn add_group(&self, attributes: &[Attribute]) -> Result<String, ConnectorError> {
        let mut state = self.state.write().unwrap();
        let id = Self::next_id(&mut state, &self.connector_id, "group");
        state.groups.insert(id.clone(), attributes.to_vec());
        Ok(id)
    }

    fn add_groups(
        &self,
        groups: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        let mut state = self.state.write().unwrap();
        let mut ids = BTreeMap::new();
        for (key, attributes) in groups {
            let id = Self::next_id(&mut state, &self.connector_id, "group");
            state.groups.insert(id.clone(), attributes.clone());
            ids.insert(key.clone(), id);
        }
        Ok(ids)
    }

    fn update_group_attributes(
        &self,
        connector_group_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        let mut state = self.state.write().unwrap();
        match state.groups.get_mut(connector_group_id) {
            Some(stored) => {
                *stored = attributes.to_vec();
                Ok(connector_group_id.to_string())
            }
            None => Err(ConnectorError::Read(format!(
                "Unknown connector group id {connector_group_id}"
            ))),
        }
    }

    fn delete_group(&self, connector_group_id: &str) -> Result<(), ConnectorError> {
        self.state.write().unwrap().groups.remove(connector_group_id);
        Ok(())
    }

    fn connector_group_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        Ok(state
            .groups
            .iter()
            .find(|(_, attributes)| has_attribute(attributes, attribute_name, attribute_value))
            .map(|(id, _)| id.clone()))
    }

    fn list_connector_group_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        let ids = matching_ids(&state.groups, attribute_name, |v| v == attribute_value);
        Ok(page(ids, offset, length))
    }

    fn list_connector_group_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        let state = self.state.read().unwrap();
        let ids = matching_ids(&state.groups, attribute_name, |v| pattern_matches(v, pattern));
        Ok(page(ids, offset, length))
    }

    fn remove_added_groups(&self, connector_group_ids: &[String]) -> Result<(), ConnectorError> {
        let mut state = self.state.write().unwrap();
        for connector_group_id in connector_group_ids {
            state.groups.remove(connector_group_id);
        }
        Ok(())
    }
}
