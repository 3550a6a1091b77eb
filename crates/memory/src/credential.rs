//! In-memory credential store connector.

use std::collections::BTreeMap;
use std::sync::RwLock;

use manifold_core::{Credential, CredentialContext};
use manifold_store::connector::{ConnectorError, CredentialStoreConnector};
use manifold_store::error::AuthenticationFailure;

#[derive(Default)]
struct State {
    credentials: BTreeMap<String, Vec<Credential>>,
    sequence: u64,
}

/// Credential store connector holding credential partitions in process
/// memory.
///
/// The connector handles exactly one credential type and compares secret
/// material verbatim; hashing is a concern of production drivers.
pub struct InMemoryCredentialStoreConnector {
    connector_id: String,
    credential_type: String,
    state: RwLock<State>,
}

impl InMemoryCredentialStoreConnector {
    /// Create a connector for the given credential type.
    pub fn new(connector_id: impl Into<String>, credential_type: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            credential_type: credential_type.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Create a connector handling password credentials.
    pub fn passwords(connector_id: impl Into<String>) -> Self {
        Self::new(connector_id, manifold_core::credential::PASSWORD_CREDENTIAL_TYPE)
    }

    /// Number of credential partitions currently stored.
    pub fn credential_count(&self) -> usize {
        self.state.read().unwrap().credentials.len()
    }
}

impl CredentialStoreConnector for InMemoryCredentialStoreConnector {
    fn connector_id(&self) -> &str {
        &self.connector_id
    }

    fn can_store(&self, credential: &Credential) -> bool {
        credential.credential_type == self.credential_type
    }

    fn can_handle(&self, credential: &Credential, context: &CredentialContext) -> bool {
        self.can_store(credential) && context.connector_user_id().is_some()
    }

    fn add_credential(&self, credentials: &[Credential]) -> Result<String, ConnectorError> {
        let mut state = self.state.write().unwrap();
        state.sequence += 1;
        let id = format!("{}-cred-{}", self.connector_id, state.sequence);
        state.credentials.insert(id.clone(), credentials.to_vec());
        Ok(id)
    }

    fn delete_credential(&self, connector_user_id: &str) -> Result<(), ConnectorError> {
        self.state
            .write()
            .unwrap()
            .credentials
            .remove(connector_user_id);
        Ok(())
    }

    fn authenticate(
        &self,
        credential: &Credential,
        context: &CredentialContext,
    ) -> Result<(), AuthenticationFailure> {
        let Some(connector_user_id) = context.connector_user_id() else {
            return Err(AuthenticationFailure::new("Invalid credentials."));
        };

        let state = self.state.read().unwrap();
        let Some(stored) = state.credentials.get(connector_user_id) else {
            return Err(AuthenticationFailure::new("Invalid credentials."));
        };

        let matched = stored.iter().any(|c| {
            c.credential_type == credential.credential_type && c.value == credential.value
        });

        if matched {
            Ok(())
        } else {
            Err(AuthenticationFailure::new("Invalid credentials."))
        }
    }
}
