//! Lightweight user and group handles.
//!
//! Handles carry only the logical id and the owning domain name; they cache
//! no attributes. Attribute fetches re-enter the virtual store explicitly,
//! which keeps handles copyable and avoids cyclic ownership between handles
//! and the store.

use serde::{Deserialize, Serialize};

use manifold_core::{Claim, MetaClaim};

use crate::error::StoreResult;
use crate::store::IdentityStore;

/// Handle to a logical user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    unique_user_id: String,
    domain_name: String,
}

impl User {
    /// Create a handle.
    pub fn new(unique_user_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            unique_user_id: unique_user_id.into(),
            domain_name: domain_name.into(),
        }
    }

    /// Stable logical identifier of the user.
    pub fn unique_user_id(&self) -> &str {
        &self.unique_user_id
    }

    /// Name of the domain the user lives in.
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Fetch all claims of the user.
    pub fn claims(&self, store: &IdentityStore) -> StoreResult<Vec<Claim>> {
        store.claims_of_user(&self.unique_user_id, Some(&self.domain_name))
    }

    /// Fetch the claims selected by the given meta claims.
    pub fn claims_for(
        &self,
        store: &IdentityStore,
        meta_claims: &[MetaClaim],
    ) -> StoreResult<Vec<Claim>> {
        store.claims_of_user_filtered(&self.unique_user_id, meta_claims, Some(&self.domain_name))
    }

    /// Fetch the groups the user belongs to.
    pub fn groups(&self, store: &IdentityStore) -> StoreResult<Vec<Group>> {
        store.groups_of_user(&self.unique_user_id, Some(&self.domain_name))
    }

    /// Whether the user belongs to the given group.
    pub fn is_in_group(&self, store: &IdentityStore, unique_group_id: &str) -> StoreResult<bool> {
        store.is_user_in_group(
            &self.unique_user_id,
            unique_group_id,
            Some(&self.domain_name),
        )
    }
}

/// Handle to a logical group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    unique_group_id: String,
    domain_name: String,
}

impl Group {
    /// Create a handle.
    pub fn new(unique_group_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            unique_group_id: unique_group_id.into(),
            domain_name: domain_name.into(),
        }
    }

    /// Stable logical identifier of the group.
    pub fn unique_group_id(&self) -> &str {
        &self.unique_group_id
    }

    /// Name of the domain the group lives in.
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Fetch the members of the group.
    pub fn users(&self, store: &IdentityStore) -> StoreResult<Vec<User>> {
        store.users_of_group(&self.unique_group_id, Some(&self.domain_name))
    }
}

/// Result of a successful authentication: the authenticated user's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    user: User,
}

impl AuthenticationContext {
    /// Create a context for an authenticated user.
    pub fn new(user: User) -> Self {
        Self { user }
    }

    /// The authenticated user.
    pub fn user(&self) -> &User {
        &self.user
    }
}
