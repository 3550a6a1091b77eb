//! Priority-ordered domain registry.
//!
//! Domains are kept in an ordered map keyed on `(priority, insertion_seq)`:
//! ascending priority, and insertion order as the deterministic tie-break.
//! Equal priorities never collapse. The first entry is the primary domain.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::Domain;
use crate::error::{StoreError, StoreResult};

/// Priority-ordered set of domains with a name index.
///
/// Populated once at `init`; read-only afterwards.
#[derive(Debug)]
pub struct DomainRegistry {
    ordered: BTreeMap<(u32, u64), Arc<Domain>>,
    by_name: HashMap<String, Arc<Domain>>,
}

impl DomainRegistry {
    /// Build a registry from the configured domains.
    ///
    /// Fails with [`StoreError::NoDomains`] when the list is empty and with a
    /// configuration error on duplicate domain names.
    pub fn new(domains: Vec<Domain>) -> StoreResult<Self> {
        if domains.is_empty() {
            return Err(StoreError::NoDomains);
        }

        let mut ordered = BTreeMap::new();
        let mut by_name = HashMap::new();

        for (sequence, domain) in domains.into_iter().enumerate() {
            let domain = Arc::new(domain);
            if by_name
                .insert(domain.name().to_string(), Arc::clone(&domain))
                .is_some()
            {
                return Err(StoreError::DomainConfig(format!(
                    "Duplicate domain name {}",
                    domain.name()
                )));
            }
            ordered.insert((domain.priority(), sequence as u64), domain);
        }

        Ok(Self { ordered, by_name })
    }

    /// The first domain by the priority ordering.
    pub fn primary_domain(&self) -> StoreResult<&Arc<Domain>> {
        self.ordered
            .values()
            .next()
            .ok_or(StoreError::NoDomains)
    }

    /// The domain with the given name.
    pub fn domain(&self, name: &str) -> StoreResult<&Arc<Domain>> {
        self.by_name.get(name).ok_or_else(|| StoreError::DomainNotFound {
            name: name.to_string(),
        })
    }

    /// All domains in priority order.
    pub fn domains_by_priority(&self) -> impl Iterator<Item = &Arc<Domain>> {
        self.ordered.values()
    }

    /// Number of registered domains.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
