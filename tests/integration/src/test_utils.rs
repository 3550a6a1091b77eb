//! Shared fixtures for the integration suite.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use manifold_core::{Attribute, Credential, CredentialContext, MetaClaim, MetaClaimMapping};
use manifold_memory::{
    InMemoryCredentialStoreConnector, InMemoryIdentityStoreConnector, InMemoryUniqueIdResolver,
};
use manifold_store::connector::{ConnectorError, CredentialStoreConnector, IdentityStoreConnector};
use manifold_store::error::AuthenticationFailure;
use manifold_store::Domain;

pub const EMAIL_CLAIM_URI: &str = "http://wso2.org/claims/email";
pub const GROUP_NAME_CLAIM_URI: &str = "http://wso2.org/claims/groupname";

/// Handles to the backends of a test domain, for white-box assertions.
pub struct DomainHandles {
    pub identity: Arc<InMemoryIdentityStoreConnector>,
    pub credentials: Arc<InMemoryCredentialStoreConnector>,
    pub resolver: Arc<InMemoryUniqueIdResolver>,
}

/// Username, email and group-name mappings onto the identity connector.
pub fn standard_mappings(connector_id: &str) -> Vec<MetaClaimMapping> {
    vec![
        MetaClaimMapping::new(
            MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
            connector_id,
            "attr_uid",
            true,
        ),
        MetaClaimMapping::new(
            MetaClaim::in_default_dialect(EMAIL_CLAIM_URI),
            connector_id,
            "attr_mail",
            true,
        ),
        MetaClaimMapping::new(
            MetaClaim::in_default_dialect(GROUP_NAME_CLAIM_URI),
            connector_id,
            "attr_cn",
            true,
        ),
    ]
}

/// Username-only mapping table, for domains that do not support email.
pub fn username_only_mappings(connector_id: &str) -> Vec<MetaClaimMapping> {
    vec![MetaClaimMapping::new(
        MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
        connector_id,
        "attr_uid",
        true,
    )]
}

/// A domain over fresh in-memory backends with the given mapping table.
pub fn domain_with_mappings(
    name: &str,
    priority: u32,
    mappings: Vec<MetaClaimMapping>,
) -> (Domain, DomainHandles) {
    let identity = Arc::new(InMemoryIdentityStoreConnector::new("ic-1"));
    let credentials = Arc::new(InMemoryCredentialStoreConnector::passwords("cc-1"));
    let resolver = Arc::new(InMemoryUniqueIdResolver::new());

    let domain = Domain::new(
        name,
        priority,
        vec![Arc::clone(&identity) as Arc<dyn IdentityStoreConnector>],
        vec![Arc::clone(&credentials) as Arc<dyn CredentialStoreConnector>],
        mappings,
        Arc::clone(&resolver) as Arc<dyn manifold_store::resolver::UniqueIdResolver>,
    )
    .unwrap();

    (
        domain,
        DomainHandles {
            identity,
            credentials,
            resolver,
        },
    )
}

/// A domain with the standard mapping table.
pub fn standard_domain(name: &str, priority: u32) -> (Domain, DomainHandles) {
    domain_with_mappings(name, priority, standard_mappings("ic-1"))
}

/// Identity connector decorator counting compensation calls.
pub struct CountingIdentityConnector {
    inner: Arc<InMemoryIdentityStoreConnector>,
    removals: Mutex<Vec<Vec<String>>>,
}

impl CountingIdentityConnector {
    pub fn new(inner: Arc<InMemoryIdentityStoreConnector>) -> Self {
        Self {
            inner,
            removals: Mutex::new(Vec::new()),
        }
    }

    /// Every batch of connector-local ids handed to `remove_added_users`.
    pub fn removal_batches(&self) -> Vec<Vec<String>> {
        self.removals.lock().unwrap().clone()
    }
}

impl IdentityStoreConnector for CountingIdentityConnector {
    fn connector_id(&self) -> &str {
        self.inner.connector_id()
    }

    fn add_user(&self, attributes: &[Attribute]) -> Result<String, ConnectorError> {
        self.inner.add_user(attributes)
    }

    fn add_users(
        &self,
        users: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        self.inner.add_users(users)
    }

    fn update_user_attributes(
        &self,
        connector_user_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        self.inner.update_user_attributes(connector_user_id, attributes)
    }

    fn delete_user(&self, connector_user_id: &str) -> Result<(), ConnectorError> {
        self.inner.delete_user(connector_user_id)
    }

    fn connector_user_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        self.inner.connector_user_id(attribute_name, attribute_value)
    }

    fn list_connector_user_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_user_ids(attribute_name, attribute_value, offset, length)
    }

    fn list_connector_user_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_user_ids_by_pattern(attribute_name, pattern, offset, length)
    }

    fn user_attribute_values(
        &self,
        connector_user_id: &str,
        attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.inner
            .user_attribute_values(connector_user_id, attribute_names)
    }

    fn remove_added_users(&self, connector_user_ids: &[String]) -> Result<(), ConnectorError> {
        self.removals
            .lock()
            .unwrap()
            .push(connector_user_ids.to_vec());
        self.inner.remove_added_users(connector_user_ids)
    }

    fn add_group(&self, attributes: &[Attribute]) -> Result<String, ConnectorError> {
        self.inner.add_group(attributes)
    }

    fn add_groups(
        &self,
        groups: &BTreeMap<String, Vec<Attribute>>,
    ) -> Result<BTreeMap<String, String>, ConnectorError> {
        self.inner.add_groups(groups)
    }

    fn update_group_attributes(
        &self,
        connector_group_id: &str,
        attributes: &[Attribute],
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_group_attributes(connector_group_id, attributes)
    }

    fn delete_group(&self, connector_group_id: &str) -> Result<(), ConnectorError> {
        self.inner.delete_group(connector_group_id)
    }

    fn connector_group_id(
        &self,
        attribute_name: &str,
        attribute_value: &str,
    ) -> Result<Option<String>, ConnectorError> {
        self.inner.connector_group_id(attribute_name, attribute_value)
    }

    fn list_connector_group_ids(
        &self,
        attribute_name: &str,
        attribute_value: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_group_ids(attribute_name, attribute_value, offset, length)
    }

    fn list_connector_group_ids_by_pattern(
        &self,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_group_ids_by_pattern(attribute_name, pattern, offset, length)
    }

    fn remove_added_groups(&self, connector_group_ids: &[String]) -> Result<(), ConnectorError> {
        self.removals
            .lock()
            .unwrap()
            .push(connector_group_ids.to_vec());
        self.inner.remove_added_groups(connector_group_ids)
    }
}

/// Credential connector that claims every password but fails every write.
pub struct FailingCredentialConnector {
    connector_id: String,
}

impl FailingCredentialConnector {
    pub fn new(connector_id: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
        }
    }
}

impl CredentialStoreConnector for FailingCredentialConnector {
    fn connector_id(&self) -> &str {
        &self.connector_id
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
