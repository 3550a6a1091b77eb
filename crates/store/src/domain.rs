//! Domains: named bundles of connectors and claim mappings.
//!
//! A domain answers "which connector owns which claim" for one logical user
//! population. Domains are constructed once at `init` and immutable
//! afterwards.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use manifold_core::MetaClaimMapping;

use crate::connector::{CredentialStoreConnector, IdentityStoreConnector};
use crate::error::{StoreError, StoreResult};
use crate::resolver::UniqueIdResolver;

/// An ordered bundle of identity and credential connectors, a claim mapping
/// table, and the unique-id resolver serving one user population.
pub struct Domain {
    name: String,
    priority: u32,
    identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
    credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
    mappings: Vec<MetaClaimMapping>,
    mapping_index: HashMap<String, usize>,
    identity_index: HashMap<String, usize>,
    credential_index: HashMap<String, usize>,
    resolver: Arc<dyn UniqueIdResolver>,
}

impl Domain {
    /// Assemble a domain, validating the bundle:
    ///
    /// - a claim URI must resolve to at most one mapping,
    /// - connector ids must be unique within the domain,
    /// - every mapping must reference a connector of the domain.
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
        credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
        mappings: Vec<MetaClaimMapping>,
        resolver: Arc<dyn UniqueIdResolver>,
    ) -> StoreResult<Self> {
        let name = name.into();

        let mut identity_index = HashMap::new();
        for (position, connector) in identity_connectors.iter().enumerate() {
            let connector_id = connector.connector_id().to_string();
            if identity_index.insert(connector_id.clone(), position).is_some() {
                return Err(StoreError::DomainConfig(format!(
                    "Duplicate identity store connector id {connector_id} in domain {name}"
                )));
            }
        }

        let mut credential_index = HashMap::new();
        for (position, connector) in credential_connectors.iter().enumerate() {
            let connector_id = connector.connector_id().to_string();
            if credential_index
                .insert(connector_id.clone(), position)
                .is_some()
            {
                return Err(StoreError::DomainConfig(format!(
                    "Duplicate credential store connector id {connector_id} in domain {name}"
                )));
            }
        }

        let mut mapping_index = HashMap::new();
        for (position, mapping) in mappings.iter().enumerate() {
            let claim_uri = mapping.claim_uri().to_string();
            if mapping_index.insert(claim_uri.clone(), position).is_some() {
                return Err(StoreError::DomainConfig(format!(
                    "Claim URI {claim_uri} is mapped more than once in domain {name}"
                )));
            }
            if !identity_index.contains_key(&mapping.identity_store_connector_id) {
                return Err(StoreError::DomainConfig(format!(
                    "Mapping for {claim_uri} references unknown connector {} in domain {name}",
                    mapping.identity_store_connector_id
                )));
            }
        }

        Ok(Self {
            name,
            priority,
            identity_connectors,
            credential_connectors,
            mappings,
            mapping_index,
            identity_index,
            credential_index,
            resolver,
        })
    }

    /// Domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain priority; lower values are tried first.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Whether a mapping resolves the claim URI.
    pub fn is_claim_supported(&self, claim_uri: &str) -> bool {
        self.mapping_index.contains_key(claim_uri)
    }

    /// The mapping for a claim URI.
    pub fn meta_claim_mapping(&self, claim_uri: &str) -> StoreResult<&MetaClaimMapping> {
        self.mapping_index
            .get(claim_uri)
            .map(|&position| &self.mappings[position])
            .ok_or_else(|| StoreError::UnknownClaim {
                claim_uri: claim_uri.to_string(),
            })
    }

    /// All mappings of the domain.
    pub fn meta_claim_mappings(&self) -> &[MetaClaimMapping] {
        &self.mappings
    }

    /// Mappings grouped per identity store connector.
    pub fn connector_id_to_meta_claim_mappings(&self) -> BTreeMap<String, Vec<MetaClaimMapping>> {
        let mut grouped: BTreeMap<String, Vec<MetaClaimMapping>> = BTreeMap::new();
        for mapping in &self.mappings {
            grouped
                .entry(mapping.identity_store_connector_id.clone())
                .or_default()
                .push(mapping.clone());
        }
        grouped
    }

    /// The identity store connector with the given id.
    pub fn identity_store_connector(
        &self,
        connector_id: &str,
    ) -> StoreResult<&Arc<dyn IdentityStoreConnector>> {
        self.identity_index
            .get(connector_id)
            .map(|&position| &self.identity_connectors[position])
            .ok_or_else(|| {
                StoreError::DomainConfig(format!(
                    "Unknown identity store connector {connector_id} in domain {}",
                    self.name
                ))
            })
    }

    /// The credential store connector with the given id.
    pub fn credential_store_connector(
        &self,
        connector_id: &str,
    ) -> StoreResult<&Arc<dyn CredentialStoreConnector>> {
        self.credential_index
            .get(connector_id)
            .map(|&position| &self.credential_connectors[position])
            .ok_or_else(|| {
                StoreError::DomainConfig(format!(
                    "Unknown credential store connector {connector_id} in domain {}",
                    self.name
                ))
            })
    }

    /// All identity store connectors, in registration order.
    pub fn identity_store_connectors(&self) -> &[Arc<dyn IdentityStoreConnector>] {
        &self.identity_connectors
    }

    /// All credential store connectors, in registration order.
    pub fn credential_store_connectors(&self) -> &[Arc<dyn CredentialStoreConnector>] {
        &self.credential_connectors
    }

    /// The unique-id resolver of the domain.
    pub fn unique_id_resolver(&self) -> &dyn UniqueIdResolver {
        self.resolver.as_ref()
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("identity_connectors", &self.identity_connectors.len())
            .field("credential_connectors", &self.credential_connectors.len())
            .field("mappings", &self.mappings.len())
            .finish()
    }
}
