//! The virtual identity store.
//!
//! Presents a single logical user/group directory over the registered
//! domains. Reads fan out to the owning connectors; writes partition the
//! caller's claims and credentials per connector, compensate on partial
//! failure, and commit the linkage to the unique-id resolver last.
//!
//! The store performs no internal locking: every operation works over the
//! frozen domain registry, and concurrency control is delegated to the
//! resolver and the connectors.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use manifold_core::{
    Claim, ConnectedGroup, Credential, CredentialContext, GroupModel, MetaClaim, UniqueGroup,
    UniqueUser, UserModel, UserPartition, USERNAME_CLAIM_URI,
};

use crate::domain::Domain;
use crate::error::{AuthenticationFailure, StoreError, StoreResult};
use crate::handle::{AuthenticationContext, Group, User};
use crate::mapping;
use crate::registry::DomainRegistry;

/// Virtual identity store over a set of domains.
pub struct IdentityStore {
    domains: DomainRegistry,
}

impl IdentityStore {
    /// Initialize the store with the configured domains.
    ///
    /// Fails with [`StoreError::NoDomains`] when the list is empty. The
    /// domain set is frozen for the lifetime of the store.
    pub fn new(domains: Vec<Domain>) -> StoreResult<Self> {
        let domains = DomainRegistry::new(domains)?;
        tracing::debug!(domains = domains.len(), "Identity store successfully initialized.");
        Ok(Self { domains })
    }

    /// The domain registry backing this store.
    pub fn domains(&self) -> &DomainRegistry {
        &self.domains
    }

    /// Get a user handle by logical id.
    pub fn user(&self, unique_user_id: &str, domain_name: Option<&str>) -> StoreResult<User> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_user(unique_user_id, domain)
    }

    /// Get a user handle by a claim value.
    pub fn user_by_claim(&self, claim: &Claim, domain_name: Option<&str>) -> StoreResult<User> {
        require_id(&claim.value, "Invalid claim.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_user_by_claim(claim, domain)
    }

    /// List user handles.
    ///
    /// A `length` of zero yields an empty list without touching any backend.
    pub fn list_users(
        &self,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_users(offset, length, domain)
    }

    /// List user handles whose mapped attribute equals the claim value.
    pub fn list_users_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        require_id(&claim.value, "Invalid claim.")?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_users_by_claim(claim, offset, length, domain)
    }

    /// List user handles whose mapped attribute matches the pattern. Pattern
    /// syntax is connector-defined.
    pub fn list_users_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        filter_pattern: &str,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        require_id(&meta_claim.claim_uri, "Invalid claim URI.")?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_users_by_pattern(meta_claim, filter_pattern, offset, length, domain)
    }

    /// All claims of a user.
    pub fn claims_of_user(
        &self,
        unique_user_id: &str,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Claim>> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_claims(unique_user_id, domain)
    }

    /// The claims of a user selected by the given meta claims.
    pub fn claims_of_user_filtered(
        &self,
        unique_user_id: &str,
        meta_claims: &[MetaClaim],
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Claim>> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        if meta_claims.is_empty() {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_claims_filtered(unique_user_id, meta_claims, domain)
    }

    /// Create a user from the model.
    ///
    /// The model must carry at least one claim or one credential; when claims
    /// are present, a username claim with a non-empty value must be among
    /// them.
    pub fn add_user(&self, user_model: UserModel, domain_name: Option<&str>) -> StoreResult<User> {
        if user_model.claims.is_empty() && user_model.credentials.is_empty() {
            return Err(StoreError::client("Invalid user."));
        }

        if !user_model.claims.is_empty()
            && !user_model
                .claims
                .iter()
                .any(|c| c.claim_uri == USERNAME_CLAIM_URI && !c.value.is_empty())
        {
            return Err(StoreError::client("Valid username claim must be present."));
        }

        let domain = self.resolve_domain(domain_name)?;
        self.do_add_user(&user_model, domain)
    }

    /// Create several users in per-connector batches.
    pub fn add_users(
        &self,
        user_models: Vec<UserModel>,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        if user_models.is_empty() {
            return Err(StoreError::client("Invalid user list."));
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_add_users(&user_models, domain)
    }

    /// Replace the claims of a user.
    ///
    /// An empty claim list clears the attributes of every existing identity
    /// partition.
    pub fn update_user_claims(
        &self,
        unique_user_id: &str,
        claims: &[Claim],
        domain_name: Option<&str>,
    ) -> StoreResult<()> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_update_user_claims(unique_user_id, claims, domain)
    }

    /// Delete a user: every partition in its owning connector, then the
    /// linkage.
    pub fn delete_user(&self, unique_user_id: &str, domain_name: Option<&str>) -> StoreResult<()> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_delete_user(unique_user_id, domain)
    }

    /// Get a group handle by logical id.
    pub fn group(&self, unique_group_id: &str, domain_name: Option<&str>) -> StoreResult<Group> {
        require_id(unique_group_id, "Invalid unique group id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_group(unique_group_id, domain)
    }

    /// Get a group handle by a claim value.
    pub fn group_by_claim(&self, claim: &Claim, domain_name: Option<&str>) -> StoreResult<Group> {
        require_id(&claim.value, "Invalid claim.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_group_by_claim(claim, domain)
    }

    /// List group handles.
    pub fn list_groups(
        &self,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Group>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_groups(offset, length, domain)
    }

    /// List group handles whose mapped attribute equals the claim value.
    pub fn list_groups_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Group>> {
        require_id(&claim.value, "Invalid claim.")?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_groups_by_claim(claim, offset, length, domain)
    }

    /// List group handles whose mapped attribute matches the pattern.
    pub fn list_groups_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        filter_pattern: &str,
        offset: usize,
        length: usize,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Group>> {
        require_id(&meta_claim.claim_uri, "Invalid claim URI.")?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_list_groups_by_pattern(meta_claim, filter_pattern, offset, length, domain)
    }

    /// Create a group from the model.
    pub fn add_group(
        &self,
        group_model: GroupModel,
        domain_name: Option<&str>,
    ) -> StoreResult<Group> {
        if group_model.claims.is_empty() {
            return Err(StoreError::client("Invalid group or claim list is empty."));
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_add_group(&group_model, domain)
    }

    /// Create several groups in per-connector batches.
    pub fn add_groups(
        &self,
        group_models: Vec<GroupModel>,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Group>> {
        if group_models.is_empty() {
            return Err(StoreError::client("Invalid group list."));
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_add_groups(&group_models, domain)
    }

    /// Replace the claims of a group.
    pub fn update_group_claims(
        &self,
        unique_group_id: &str,
        claims: &[Claim],
        domain_name: Option<&str>,
    ) -> StoreResult<()> {
        require_id(unique_group_id, "Invalid unique group id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_update_group_claims(unique_group_id, claims, domain)
    }

    /// Delete a group: every partition in its owning connector, then the
    /// linkage.
    pub fn delete_group(
        &self,
        unique_group_id: &str,
        domain_name: Option<&str>,
    ) -> StoreResult<()> {
        require_id(unique_group_id, "Invalid unique group id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_delete_group(unique_group_id, domain)
    }

    /// Groups a user belongs to.
    pub fn groups_of_user(
        &self,
        unique_user_id: &str,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<Group>> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_groups_of_user(unique_user_id, domain)
    }

    /// Members of a group.
    pub fn users_of_group(
        &self,
        unique_group_id: &str,
        domain_name: Option<&str>,
    ) -> StoreResult<Vec<User>> {
        require_id(unique_group_id, "Invalid unique group id.")?;
        let domain = self.resolve_domain(domain_name)?;
        self.do_get_users_of_group(unique_group_id, domain)
    }

    /// Whether a user belongs to a group.
    pub fn is_user_in_group(
        &self,
        unique_user_id: &str,
        unique_group_id: &str,
        domain_name: Option<&str>,
    ) -> StoreResult<bool> {
        if unique_user_id.is_empty() || unique_group_id.is_empty() {
            return Err(StoreError::client("Invalid inputs."));
        }
        let domain = self.resolve_domain(domain_name)?;
        self.do_is_user_in_group(unique_user_id, unique_group_id, domain)
    }

    /// Replace the set of groups a user belongs to.
    pub fn update_groups_of_user(
        &self,
        unique_user_id: &str,
        unique_group_ids: Vec<String>,
        domain_name: Option<&str>,
    ) -> StoreResult<()> {
        require_id(unique_user_id, "Invalid unique user id.")?;
        let domain = self.resolve_domain(domain_name)?;

        let exists = domain
            .unique_id_resolver()
            .is_user_exists(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique user - {unique_user_id}."),
                    e,
                )
            })?;
        if !exists {
            return Err(StoreError::UserNotFound("Invalid unique user id.".into()));
        }

        domain
            .unique_id_resolver()
            .update_groups_of_user(unique_user_id, unique_group_ids)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to update groups of user - {unique_user_id}."),
                    e,
                )
            })
    }

    /// Replace the set of users belonging to a group.
    pub fn update_users_of_group(
        &self,
        unique_group_id: &str,
        unique_user_ids: Vec<String>,
        domain_name: Option<&str>,
    ) -> StoreResult<()> {
        require_id(unique_group_id, "Invalid unique group id.")?;
        let domain = self.resolve_domain(domain_name)?;

        let exists = domain
            .unique_id_resolver()
            .is_group_exists(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique group - {unique_group_id}."),
                    e,
                )
            })?;
        if !exists {
            return Err(StoreError::GroupNotFound("Invalid unique group id.".into()));
        }

        domain
            .unique_id_resolver()
            .update_users_of_group(unique_group_id, unique_user_ids)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to update users of group - {unique_group_id}."),
                    e,
                )
            })
    }

    /// Authenticate a subject identified by a claim against a credential.
    ///
    /// With a domain name, only that domain is consulted. Without one, the
    /// domains supporting the claim are tried in priority order and the first
    /// domain producing a context wins; per-domain failures advance the
    /// iteration. Every internal error collapses into
    /// [`AuthenticationFailure`].
    pub fn authenticate(
        &self,
        claim: &Claim,
        credential: &Credential,
        domain_name: Option<&str>,
    ) -> Result<AuthenticationContext, AuthenticationFailure> {
        if claim.value.is_empty() {
            return Err(AuthenticationFailure::new("Invalid credentials."));
        }

        if let Some(name) = domain_name.filter(|n| !n.is_empty()) {
            let domain = self.domains.domain(name).map_err(|e| {
                tracing::error!(domain = name, error = %e, "Failed to resolve authentication domain");
                AuthenticationFailure::new("Domain name is invalid.")
            })?;
            return self.do_authenticate(claim, credential, domain);
        }

        for domain in self.domains.domains_by_priority() {
            if !domain.is_claim_supported(&claim.claim_uri) {
                continue;
            }
            match self.do_authenticate(claim, credential, domain) {
                Ok(context) => return Ok(context),
                Err(failure) => {
                    tracing::debug!(
                        domain = domain.name(),
                        reason = failure.message(),
                        "Authentication attempt failed; trying next domain"
                    );
                }
            }
        }

        Err(AuthenticationFailure::new("Invalid credentials."))
    }

    fn resolve_domain(&self, domain_name: Option<&str>) -> StoreResult<&Arc<Domain>> {
        match domain_name.filter(|n| !n.is_empty()) {
            None => self
                .domains
                .primary_domain()
                .map_err(|e| StoreError::server_with("Error while retrieving the primary domain.", e)),
            Some(name) => self.domains.domain(name).map_err(|e| {
                StoreError::server_with(
                    format!("Error while retrieving domain from the domain name - {name}"),
                    e,
                )
            }),
        }
    }

    fn do_get_user(&self, unique_user_id: &str, domain: &Domain) -> StoreResult<User> {
        let exists = domain
            .unique_id_resolver()
            .is_user_exists(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique user - {unique_user_id}."),
                    e,
                )
            })?;

        if !exists {
            return Err(StoreError::UserNotFound("Invalid unique user id.".into()));
        }

        Ok(User::new(unique_user_id, domain.name()))
    }

    fn do_get_user_by_claim(&self, claim: &Claim, domain: &Domain) -> StoreResult<User> {
        let mapping = domain.meta_claim_mapping(&claim.claim_uri)?;

        let connector_user_id = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .connector_user_id(&mapping.attribute_name, &claim.value)
            .map_err(|e| {
                StoreError::server_with("Failed to resolve the connector user id.", e)
            })?;

        let Some(connector_user_id) = connector_user_id else {
            return Err(StoreError::UserNotFound("Invalid claim value.".into()));
        };

        let unique_user = domain
            .unique_id_resolver()
            .unique_user_from_connector_user_id(
                &connector_user_id,
                &mapping.identity_store_connector_id,
            )
            .map_err(|e| StoreError::server_with("Failed to retrieve the unique user id.", e))?;

        match unique_user {
            Some(user) if !user.unique_user_id.is_empty() => {
                Ok(User::new(user.unique_user_id, domain.name()))
            }
            _ => Err(StoreError::server("Failed to retrieve the unique user id.")),
        }
    }

    fn do_list_users(
        &self,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<User>> {
        let unique_users = domain
            .unique_id_resolver()
            .list_users(offset, length)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to list users in the domain - {}", domain.name()),
                    e,
                )
            })?;

        Ok(unique_users
            .into_iter()
            .map(|u| User::new(u.unique_user_id, domain.name()))
            .collect())
    }

    fn do_list_users_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<User>> {
        let mapping = domain.meta_claim_mapping(&claim.claim_uri)?;

        let connector_user_ids = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .list_connector_user_ids(&mapping.attribute_name, &claim.value, offset, length)
            .map_err(|e| StoreError::server_with("Failed to list connector user ids.", e))?;

        self.users_from_connector_ids(&connector_user_ids, mapping, domain)
    }

    fn do_list_users_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        filter_pattern: &str,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<User>> {
        let mapping = domain.meta_claim_mapping(&meta_claim.claim_uri)?;

        let connector_user_ids = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .list_connector_user_ids_by_pattern(
                &mapping.attribute_name,
                filter_pattern,
                offset,
                length,
            )
            .map_err(|e| StoreError::server_with("Failed to list connector user ids.", e))?;

        self.users_from_connector_ids(&connector_user_ids, mapping, domain)
    }

    fn users_from_connector_ids(
        &self,
        connector_user_ids: &[String],
        mapping: &manifold_core::MetaClaimMapping,
        domain: &Domain,
    ) -> StoreResult<Vec<User>> {
        if connector_user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let unique_users = domain
            .unique_id_resolver()
            .unique_users(connector_user_ids, &mapping.identity_store_connector_id)
            .map_err(|e| StoreError::server_with("Failed to retrieve the unique user ids.", e))?;

        if unique_users.is_empty() {
            return Err(StoreError::server("Failed to retrieve the unique user ids."));
        }

        Ok(unique_users
            .into_iter()
            .map(|u| User::new(u.unique_user_id, domain.name()))
            .collect())
    }

    fn do_get_claims(&self, unique_user_id: &str, domain: &Domain) -> StoreResult<Vec<Claim>> {
        let unique_user = self.require_unique_user(unique_user_id, domain)?;

        let partitions: Vec<&UserPartition> = unique_user.identity_partitions().collect();
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut connector_id_to_attributes = BTreeMap::new();
        for partition in partitions {
            let attributes = domain
                .identity_store_connector(&partition.connector_id)?
                .user_attribute_values(&partition.connector_user_id, None)
                .map_err(|e| {
                    StoreError::server_with("Failed to retrieve user attribute values.", e)
                })?;
            connector_id_to_attributes.insert(partition.connector_id.clone(), attributes);
        }

        Ok(mapping::connector_attributes_to_claims(
            domain.meta_claim_mappings(),
            &connector_id_to_attributes,
        ))
    }

    fn do_get_claims_filtered(
        &self,
        unique_user_id: &str,
        meta_claims: &[MetaClaim],
        domain: &Domain,
    ) -> StoreResult<Vec<Claim>> {
        let unique_user = self.require_unique_user(unique_user_id, domain)?;

        let partitions: Vec<&UserPartition> = unique_user.identity_partitions().collect();
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let connector_id_to_attribute_names =
            mapping::connector_id_to_attribute_names(domain.meta_claim_mappings(), meta_claims);

        let mut connector_id_to_attributes = BTreeMap::new();
        for partition in partitions {
            let Some(attribute_names) = connector_id_to_attribute_names.get(&partition.connector_id)
            else {
                continue;
            };
            let attributes = domain
                .identity_store_connector(&partition.connector_id)?
                .user_attribute_values(&partition.connector_user_id, Some(attribute_names))
                .map_err(|e| {
                    StoreError::server_with("Failed to retrieve user attribute values.", e)
                })?;
            connector_id_to_attributes.insert(partition.connector_id.clone(), attributes);
        }

        Ok(mapping::connector_attributes_to_claims(
            domain.meta_claim_mappings(),
            &connector_id_to_attributes,
        ))
    }

    fn require_unique_user(
        &self,
        unique_user_id: &str,
        domain: &Domain,
    ) -> StoreResult<UniqueUser> {
        domain
            .unique_id_resolver()
            .unique_user(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to retrieve unique user - {unique_user_id}."),
                    e,
                )
            })?
            .ok_or_else(|| StoreError::UserNotFound("Invalid unique user id.".into()))
    }

    fn do_add_user(&self, user_model: &UserModel, domain: &Domain) -> StoreResult<User> {
        let mut user_partitions: Vec<UserPartition> = Vec::new();

        if !user_model.claims.is_empty() {
            let connector_id_to_attributes = mapping::claims_to_connector_attributes(
                &user_model.claims,
                domain.meta_claim_mappings(),
            );

            for (connector_id, attributes) in &connector_id_to_attributes {
                let connector_user_id = match domain
                    .identity_store_connector(connector_id)?
                    .add_user(attributes)
                {
                    Ok(id) => id,
                    Err(e) => {
                        // Recover from the inconsistent state in the connectors.
                        if !user_partitions.is_empty() {
                            self.remove_added_users(domain, &user_partitions);
                        }
                        return Err(StoreError::server_with(
                            "Identity store connector failed to add user attributes.",
                            e,
                        ));
                    }
                };

                user_partitions.push(UserPartition::new(connector_id, connector_user_id, true));
            }
        }

        if !user_model.credentials.is_empty() {
            let connector_id_to_credentials = mapping::credentials_to_connectors(
                &user_model.credentials,
                domain.credential_store_connectors(),
            );

            for (connector_id, credentials) in &connector_id_to_credentials {
                let connector_user_id = match domain
                    .credential_store_connector(connector_id)?
                    .add_credential(credentials)
                {
                    Ok(id) => id,
                    Err(e) => {
                        // Recover from the inconsistent state in the connectors.
                        if !user_partitions.is_empty() {
                            self.remove_added_users(domain, &user_partitions);
                        }
                        return Err(StoreError::server_with(
                            "Credential store connector failed to add user credentials.",
                            e,
                        ));
                    }
                };

                user_partitions.push(UserPartition::new(connector_id, connector_user_id, false));
            }
        }

        let unique_user_id = Uuid::new_v4().to_string();
        if let Err(e) = domain.unique_id_resolver().add_user(
            UniqueUser::new(unique_user_id.clone(), user_partitions.clone()),
            domain.name(),
        ) {
            // Recover from the inconsistent state in the connectors.
            self.remove_added_users(domain, &user_partitions);
            return Err(StoreError::server_with(
                "Error occurred while persisting the user unique id.",
                e,
            ));
        }

        Ok(User::new(unique_user_id, domain.name()))
    }

    fn do_add_users(&self, user_models: &[UserModel], domain: &Domain) -> StoreResult<Vec<User>> {
        // Freshly minted per-user ids double as bulk correlation tokens.
        let keyed_attribute_maps: Vec<(String, BTreeMap<String, Vec<manifold_core::Attribute>>)> =
            user_models
                .iter()
                .map(|model| {
                    (
                        Uuid::new_v4().to_string(),
                        mapping::claims_to_connector_attributes(
                            &model.claims,
                            domain.meta_claim_mappings(),
                        ),
                    )
                })
                .collect();

        let mut connector_id_to_batch: BTreeMap<String, BTreeMap<String, Vec<manifold_core::Attribute>>> =
            BTreeMap::new();
        for (key, attribute_map) in &keyed_attribute_maps {
            for (connector_id, attributes) in attribute_map {
                connector_id_to_batch
                    .entry(connector_id.clone())
                    .or_default()
                    .insert(key.clone(), attributes.clone());
            }
        }

        let mut partitions_by_key: BTreeMap<String, Vec<UserPartition>> = BTreeMap::new();

        for (connector_id, batch) in &connector_id_to_batch {
            let result = domain
                .identity_store_connector(connector_id)?
                .add_users(batch);

            match result {
                Ok(connector_user_ids) => {
                    let complete = connector_user_ids.len() == batch.len();
                    for (key, connector_user_id) in connector_user_ids {
                        partitions_by_key.entry(key).or_default().push(
                            UserPartition::new(connector_id, connector_user_id, true),
                        );
                    }
                    if !complete {
                        self.remove_added_user_batches(domain, &partitions_by_key);
                        return Err(StoreError::server(format!(
                            "Identity store connector {connector_id} reported a partial bulk failure."
                        )));
                    }
                }
                Err(e) => {
                    self.remove_added_user_batches(domain, &partitions_by_key);
                    return Err(StoreError::server_with(
                        "Identity store connector failed to add users.",
                        e,
                    ));
                }
            }
        }

        if let Err(e) = domain
            .unique_id_resolver()
            .add_users(partitions_by_key.clone(), domain.name())
        {
            self.remove_added_user_batches(domain, &partitions_by_key);
            return Err(StoreError::server_with(
                "Error occurred while persisting user unique ids.",
                e,
            ));
        }

        Ok(partitions_by_key
            .into_keys()
            .map(|key| User::new(key, domain.name()))
            .collect())
    }

    fn do_update_user_claims(
        &self,
        unique_user_id: &str,
        claims: &[Claim],
        domain: &Domain,
    ) -> StoreResult<()> {
        let unique_user = self.require_unique_user(unique_user_id, domain)?;

        let existing: BTreeMap<String, String> = unique_user
            .identity_partitions()
            .map(|p| (p.connector_id.clone(), p.connector_user_id.clone()))
            .collect();

        let mut updated: BTreeMap<String, String> = BTreeMap::new();

        if claims.is_empty() && !existing.is_empty() {
            for (connector_id, connector_user_id) in &existing {
                let new_id = domain
                    .identity_store_connector(connector_id)?
                    .update_user_attributes(connector_user_id, &[])
                    .map_err(|e| {
                        StoreError::server_with(
                            "Identity store connector failed to update user attributes.",
                            e,
                        )
                    })?;
                updated.insert(connector_id.clone(), new_id);
            }
        } else if !claims.is_empty() {
            let connector_id_to_attributes =
                mapping::claims_to_connector_attributes(claims, domain.meta_claim_mappings());

            let mut connector_ids: Vec<String> =
                connector_id_to_attributes.keys().cloned().collect();
            for connector_id in existing.keys() {
                if !connector_ids.contains(connector_id) {
                    connector_ids.push(connector_id.clone());
                }
            }

            for connector_id in connector_ids {
                let attributes = connector_id_to_attributes
                    .get(&connector_id)
                    .cloned()
                    .unwrap_or_default();

                let new_id = match existing.get(&connector_id) {
                    None => domain
                        .identity_store_connector(&connector_id)?
                        .add_user(&attributes)
                        .map_err(|e| {
                            StoreError::server_with(
                                "Identity store connector failed to add user attributes.",
                                e,
                            )
                        })?,
                    Some(connector_user_id) => domain
                        .identity_store_connector(&connector_id)?
                        .update_user_attributes(connector_user_id, &attributes)
                        .map_err(|e| {
                            StoreError::server_with(
                                "Identity store connector failed to update user attributes.",
                                e,
                            )
                        })?,
                };
                updated.insert(connector_id, new_id);
            }
        }

        if existing != updated {
            domain
                .unique_id_resolver()
                .update_user(unique_user_id, updated)
                .map_err(|e| {
                    StoreError::server_with("Failed to update user connector ids.", e)
                })?;
        }

        Ok(())
    }

    fn do_delete_user(&self, unique_user_id: &str, domain: &Domain) -> StoreResult<()> {
        let unique_user = self.require_unique_user(unique_user_id, domain)?;

        for partition in &unique_user.user_partitions {
            if partition.identity_store {
                domain
                    .identity_store_connector(&partition.connector_id)?
                    .delete_user(&partition.connector_user_id)
                    .map_err(|e| {
                        StoreError::server_with(
                            format!(
                                "Identity store connector {} failed to delete the user partition.",
                                partition.connector_id
                            ),
                            e,
                        )
                    })?;
            } else {
                domain
                    .credential_store_connector(&partition.connector_id)?
                    .delete_credential(&partition.connector_user_id)
                    .map_err(|e| {
                        StoreError::server_with(
                            format!(
                                "Credential store connector {} failed to delete the credential partition.",
                                partition.connector_id
                            ),
                            e,
                        )
                    })?;
            }
        }

        domain
            .unique_id_resolver()
            .delete_user(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(format!("Failed to delete user - {unique_user_id}."), e)
            })
    }

    fn do_get_group(&self, unique_group_id: &str, domain: &Domain) -> StoreResult<Group> {
        let exists = domain
            .unique_id_resolver()
            .is_group_exists(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique group - {unique_group_id}."),
                    e,
                )
            })?;

        if !exists {
            return Err(StoreError::GroupNotFound("Invalid unique group id.".into()));
        }

        Ok(Group::new(unique_group_id, domain.name()))
    }

    fn do_get_group_by_claim(&self, claim: &Claim, domain: &Domain) -> StoreResult<Group> {
        let mapping = domain.meta_claim_mapping(&claim.claim_uri)?;

        let connector_group_id = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .connector_group_id(&mapping.attribute_name, &claim.value)
            .map_err(|e| {
                StoreError::server_with("Failed to resolve the connector group id.", e)
            })?;

        let Some(connector_group_id) = connector_group_id else {
            return Err(StoreError::GroupNotFound("Invalid claim value.".into()));
        };

        let unique_group = domain
            .unique_id_resolver()
            .unique_group_from_connector_group_id(
                &connector_group_id,
                &mapping.identity_store_connector_id,
            )
            .map_err(|e| StoreError::server_with("Failed to retrieve the unique group id.", e))?;

        match unique_group {
            Some(group) if !group.unique_group_id.is_empty() => {
                Ok(Group::new(group.unique_group_id, domain.name()))
            }
            _ => Err(StoreError::server("Failed to retrieve the unique group id.")),
        }
    }

    fn do_list_groups(
        &self,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        let unique_groups = domain
            .unique_id_resolver()
            .list_groups(offset, length)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to list groups in the domain - {}", domain.name()),
                    e,
                )
            })?;

        Ok(unique_groups
            .into_iter()
            .map(|g| Group::new(g.unique_group_id, domain.name()))
            .collect())
    }

    fn do_list_groups_by_claim(
        &self,
        claim: &Claim,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        let mapping = domain.meta_claim_mapping(&claim.claim_uri)?;

        let connector_group_ids = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .list_connector_group_ids(&mapping.attribute_name, &claim.value, offset, length)
            .map_err(|e| StoreError::server_with("Failed to list connector group ids.", e))?;

        self.groups_from_connector_ids(&connector_group_ids, mapping, domain)
    }

    fn do_list_groups_by_pattern(
        &self,
        meta_claim: &MetaClaim,
        filter_pattern: &str,
        offset: usize,
        length: usize,
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        let mapping = domain.meta_claim_mapping(&meta_claim.claim_uri)?;

        let connector_group_ids = domain
            .identity_store_connector(&mapping.identity_store_connector_id)?
            .list_connector_group_ids_by_pattern(
                &mapping.attribute_name,
                filter_pattern,
                offset,
                length,
            )
            .map_err(|e| StoreError::server_with("Failed to list connector group ids.", e))?;

        self.groups_from_connector_ids(&connector_group_ids, mapping, domain)
    }

    fn groups_from_connector_ids(
        &self,
        connector_group_ids: &[String],
        mapping: &manifold_core::MetaClaimMapping,
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        if connector_group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let unique_groups = domain
            .unique_id_resolver()
            .unique_groups(connector_group_ids, &mapping.identity_store_connector_id)
            .map_err(|e| StoreError::server_with("Failed to retrieve the unique group ids.", e))?;

        if unique_groups.is_empty() {
            return Err(StoreError::server("Failed to retrieve the unique group ids."));
        }

        Ok(unique_groups
            .into_iter()
            .map(|g| Group::new(g.unique_group_id, domain.name()))
            .collect())
    }

    fn do_add_group(&self, group_model: &GroupModel, domain: &Domain) -> StoreResult<Group> {
        let connector_id_to_attributes = mapping::claims_to_connector_attributes(
            &group_model.claims,
            domain.meta_claim_mappings(),
        );

        let mut connected_groups: Vec<ConnectedGroup> = Vec::new();

        for (connector_id, attributes) in &connector_id_to_attributes {
            let connector_group_id = match domain
                .identity_store_connector(connector_id)?
                .add_group(attributes)
            {
                Ok(id) => id,
                Err(e) => {
                    // Recover from the inconsistent state in the connectors.
                    if !connected_groups.is_empty() {
                        self.remove_added_groups(domain, &connected_groups);
                    }
                    return Err(StoreError::server_with(
                        "Identity store connector failed to add group attributes.",
                        e,
                    ));
                }
            };

            connected_groups.push(ConnectedGroup::new(connector_id, connector_group_id));
        }

        let unique_group_id = Uuid::new_v4().to_string();
        if let Err(e) = domain.unique_id_resolver().add_group(
            UniqueGroup::new(unique_group_id.clone(), connected_groups.clone()),
            domain.name(),
        ) {
            // Recover from the inconsistent state in the connectors.
            self.remove_added_groups(domain, &connected_groups);
            return Err(StoreError::server_with(
                "Error occurred while persisting the group unique id.",
                e,
            ));
        }

        Ok(Group::new(unique_group_id, domain.name()))
    }

    fn do_add_groups(
        &self,
        group_models: &[GroupModel],
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        let keyed_attribute_maps: Vec<(String, BTreeMap<String, Vec<manifold_core::Attribute>>)> =
            group_models
                .iter()
                .map(|model| {
                    (
                        Uuid::new_v4().to_string(),
                        mapping::claims_to_connector_attributes(
                            &model.claims,
                            domain.meta_claim_mappings(),
                        ),
                    )
                })
                .collect();

        let mut connector_id_to_batch: BTreeMap<String, BTreeMap<String, Vec<manifold_core::Attribute>>> =
            BTreeMap::new();
        for (key, attribute_map) in &keyed_attribute_maps {
            for (connector_id, attributes) in attribute_map {
                connector_id_to_batch
                    .entry(connector_id.clone())
                    .or_default()
                    .insert(key.clone(), attributes.clone());
            }
        }

        let mut groups_by_key: BTreeMap<String, Vec<ConnectedGroup>> = BTreeMap::new();

        for (connector_id, batch) in &connector_id_to_batch {
            let result = domain
                .identity_store_connector(connector_id)?
                .add_groups(batch);

            match result {
                Ok(connector_group_ids) => {
                    let complete = connector_group_ids.len() == batch.len();
                    for (key, connector_group_id) in connector_group_ids {
                        groups_by_key
                            .entry(key)
                            .or_default()
                            .push(ConnectedGroup::new(connector_id, connector_group_id));
                    }
                    if !complete {
                        self.remove_added_group_batches(domain, &groups_by_key);
                        return Err(StoreError::server(format!(
                            "Identity store connector {connector_id} reported a partial bulk failure."
                        )));
                    }
                }
                Err(e) => {
                    self.remove_added_group_batches(domain, &groups_by_key);
                    return Err(StoreError::server_with(
                        "Identity store connector failed to add groups.",
                        e,
                    ));
                }
            }
        }

        if let Err(e) = domain
            .unique_id_resolver()
            .add_groups(groups_by_key.clone(), domain.name())
        {
            self.remove_added_group_batches(domain, &groups_by_key);
            return Err(StoreError::server_with(
                "Error occurred while persisting group unique ids.",
                e,
            ));
        }

        Ok(groups_by_key
            .into_keys()
            .map(|key| Group::new(key, domain.name()))
            .collect())
    }

    fn do_update_group_claims(
        &self,
        unique_group_id: &str,
        claims: &[Claim],
        domain: &Domain,
    ) -> StoreResult<()> {
        let unique_group = domain
            .unique_id_resolver()
            .unique_group(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to retrieve unique group - {unique_group_id}."),
                    e,
                )
            })?
            .ok_or_else(|| StoreError::GroupNotFound("Invalid unique group id.".into()))?;

        let existing: BTreeMap<String, String> = unique_group
            .connected_groups
            .iter()
            .map(|g| (g.connector_id.clone(), g.connector_group_id.clone()))
            .collect();

        let mut updated: BTreeMap<String, String> = BTreeMap::new();

        if claims.is_empty() && !existing.is_empty() {
            for (connector_id, connector_group_id) in &existing {
                let new_id = domain
                    .identity_store_connector(connector_id)?
                    .update_group_attributes(connector_group_id, &[])
                    .map_err(|e| {
                        StoreError::server_with(
                            "Identity store connector failed to update group attributes.",
                            e,
                        )
                    })?;
                updated.insert(connector_id.clone(), new_id);
            }
        } else if !claims.is_empty() {
            let connector_id_to_attributes =
                mapping::claims_to_connector_attributes(claims, domain.meta_claim_mappings());

            let mut connector_ids: Vec<String> =
                connector_id_to_attributes.keys().cloned().collect();
            for connector_id in existing.keys() {
                if !connector_ids.contains(connector_id) {
                    connector_ids.push(connector_id.clone());
                }
            }

            for connector_id in connector_ids {
                let attributes = connector_id_to_attributes
                    .get(&connector_id)
                    .cloned()
                    .unwrap_or_default();

                let new_id = match existing.get(&connector_id) {
                    None => domain
                        .identity_store_connector(&connector_id)?
                        .add_group(&attributes)
                        .map_err(|e| {
                            StoreError::server_with(
                                "Identity store connector failed to add group attributes.",
                                e,
                            )
                        })?,
                    Some(connector_group_id) => domain
                        .identity_store_connector(&connector_id)?
                        .update_group_attributes(connector_group_id, &attributes)
                        .map_err(|e| {
                            StoreError::server_with(
                                "Identity store connector failed to update group attributes.",
                                e,
                            )
                        })?,
                };
                updated.insert(connector_id, new_id);
            }
        }

        if existing != updated {
            domain
                .unique_id_resolver()
                .update_group(unique_group_id, updated)
                .map_err(|e| {
                    StoreError::server_with("Failed to update group connector ids.", e)
                })?;
        }

        Ok(())
    }

    fn do_delete_group(&self, unique_group_id: &str, domain: &Domain) -> StoreResult<()> {
        let unique_group = domain
            .unique_id_resolver()
            .unique_group(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to retrieve unique group - {unique_group_id}."),
                    e,
                )
            })?
            .ok_or_else(|| StoreError::GroupNotFound("Invalid unique group id.".into()))?;

        for connected_group in &unique_group.connected_groups {
            domain
                .identity_store_connector(&connected_group.connector_id)?
                .delete_group(&connected_group.connector_group_id)
                .map_err(|e| {
                    StoreError::server_with(
                        format!(
                            "Identity store connector {} failed to delete the group partition.",
                            connected_group.connector_id
                        ),
                        e,
                    )
                })?;
        }

        domain
            .unique_id_resolver()
            .delete_group(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(format!("Failed to delete group - {unique_group_id}."), e)
            })
    }

    fn do_get_groups_of_user(
        &self,
        unique_user_id: &str,
        domain: &Domain,
    ) -> StoreResult<Vec<Group>> {
        let exists = domain
            .unique_id_resolver()
            .is_user_exists(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique user - {unique_user_id}."),
                    e,
                )
            })?;
        if !exists {
            return Err(StoreError::UserNotFound("Invalid unique user id.".into()));
        }

        let unique_groups = domain
            .unique_id_resolver()
            .groups_of_user(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to retrieve the unique group ids for user id - {unique_user_id}."),
                    e,
                )
            })?;

        Ok(unique_groups
            .into_iter()
            .map(|g| Group::new(g.unique_group_id, domain.name()))
            .collect())
    }

    fn do_get_users_of_group(
        &self,
        unique_group_id: &str,
        domain: &Domain,
    ) -> StoreResult<Vec<User>> {
        let exists = domain
            .unique_id_resolver()
            .is_group_exists(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique group - {unique_group_id}."),
                    e,
                )
            })?;
        if !exists {
            return Err(StoreError::GroupNotFound("Invalid unique group id.".into()));
        }

        let unique_users = domain
            .unique_id_resolver()
            .users_of_group(unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to retrieve the unique user ids for group id - {unique_group_id}."),
                    e,
                )
            })?;

        Ok(unique_users
            .into_iter()
            .map(|u| User::new(u.unique_user_id, domain.name()))
            .collect())
    }

    fn do_is_user_in_group(
        &self,
        unique_user_id: &str,
        unique_group_id: &str,
        domain: &Domain,
    ) -> StoreResult<bool> {
        let exists = domain
            .unique_id_resolver()
            .is_user_exists(unique_user_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!("Failed to check existence of unique user - {unique_user_id}."),
                    e,
                )
            })?;
        if !exists {
            return Err(StoreError::UserNotFound("Invalid unique user id.".into()));
        }

        domain
            .unique_id_resolver()
            .is_user_in_group(unique_user_id, unique_group_id)
            .map_err(|e| {
                StoreError::server_with(
                    format!(
                        "Failed to check unique user - {unique_user_id} belongs to the group - {unique_group_id}."
                    ),
                    e,
                )
            })
    }

    fn do_authenticate(
        &self,
        claim: &Claim,
        credential: &Credential,
        domain: &Domain,
    ) -> Result<AuthenticationContext, AuthenticationFailure> {
        let mapping = domain.meta_claim_mapping(&claim.claim_uri).map_err(|_| {
            AuthenticationFailure::new("Failed to retrieve the claim mapping for the claim URI.")
        })?;

        if !mapping.unique {
            return Err(AuthenticationFailure::new("Provided claim is not unique."));
        }

        let connector_user_id = domain
            .identity_store_connector(&mapping.identity_store_connector_id)
            .map_err(|_| AuthenticationFailure::new("Invalid domain configuration."))?
            .connector_user_id(&mapping.attribute_name, &claim.value)
            .map_err(|_| {
                AuthenticationFailure::new("Invalid claim value. No user mapped to the provided claim.")
            })?
            .ok_or_else(|| {
                AuthenticationFailure::new("Invalid claim value. No user mapped to the provided claim.")
            })?;

        let unique_user = domain
            .unique_id_resolver()
            .unique_user_from_connector_user_id(
                &connector_user_id,
                &mapping.identity_store_connector_id,
            )
            .map_err(|_| AuthenticationFailure::new("Failed to retrieve unique user info."))?
            .ok_or_else(|| AuthenticationFailure::new("Failed to retrieve unique user info."))?;

        for partition in unique_user.credential_partitions() {
            let connector = domain
                .credential_store_connector(&partition.connector_id)
                .map_err(|_| AuthenticationFailure::new("Invalid domain configuration."))?;

            let context = CredentialContext::for_connector_user_id(&partition.connector_user_id);

            if connector.can_handle(credential, &context) {
                connector.authenticate(credential, &context)?;

                return Ok(AuthenticationContext::new(User::new(
                    &unique_user.unique_user_id,
                    domain.name(),
                )));
            }
        }

        Err(AuthenticationFailure::new("Failed to authenticate user."))
    }

    /// Best-effort compensation: undo partitions written before a failure.
    /// Failures here are logged and swallowed, never re-raised through the
    /// original failure path.
    fn remove_added_users(&self, domain: &Domain, user_partitions: &[UserPartition]) {
        for partition in user_partitions {
            let removal = domain
                .identity_store_connector(&partition.connector_id)
                .and_then(|connector| {
                    connector
                        .remove_added_users(std::slice::from_ref(&partition.connector_user_id))
                        .map_err(|e| {
                            StoreError::server_with("Connector compensation failed.", e)
                        })
                });

            if let Err(e) = removal {
                tracing::error!(
                    connector_id = %partition.connector_id,
                    connector_user_id = %partition.connector_user_id,
                    error = %e,
                    "Error occurred while removing invalid connector user ids."
                );
            }
        }
    }

    fn remove_added_user_batches(
        &self,
        domain: &Domain,
        partitions_by_key: &BTreeMap<String, Vec<UserPartition>>,
    ) {
        let partitions: Vec<UserPartition> = partitions_by_key
            .values()
            .flat_map(|partitions| partitions.iter().cloned())
            .collect();
        self.remove_added_users(domain, &partitions);
    }

    /// Group counterpart of [`remove_added_users`].
    ///
    /// [`remove_added_users`]: IdentityStore::remove_added_users
    fn remove_added_groups(&self, domain: &Domain, connected_groups: &[ConnectedGroup]) {
        for connected_group in connected_groups {
            let removal = domain
                .identity_store_connector(&connected_group.connector_id)
                .and_then(|connector| {
                    connector
                        .remove_added_groups(std::slice::from_ref(
                            &connected_group.connector_group_id,
                        ))
                        .map_err(|e| {
                            StoreError::server_with("Connector compensation failed.", e)
                        })
                });

            if let Err(e) = removal {
                tracing::error!(
                    connector_id = %connected_group.connector_id,
                    connector_group_id = %connected_group.connector_group_id,
                    error = %e,
                    "Error occurred while removing invalid connector group ids."
                );
            }
        }
    }

    fn remove_added_group_batches(
        &self,
        domain: &Domain,
        groups_by_key: &BTreeMap<String, Vec<ConnectedGroup>>,
    ) {
        let connected_groups: Vec<ConnectedGroup> = groups_by_key
            .values()
            .flat_map(|groups| groups.iter().cloned())
            .collect();
        self.remove_added_groups(domain, &connected_groups);
    }
}

fn require_id(value: &str, message: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::client(message));
    }
    Ok(())
}
