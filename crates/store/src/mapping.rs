//! Translation between claims and connector attributes.
//!
//! These operations are pure; no connector I/O happens here. Grouping is done
//! into ordered maps so that downstream connector invocation order is
//! deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use manifold_core::{Attribute, Claim, Credential, MetaClaim, MetaClaimMapping};

use crate::connector::CredentialStoreConnector;

/// Partition claims per identity store connector.
///
/// Claims with no mapping are silently dropped: an unmapped claim has no
/// connector to go to on the write path.
pub fn claims_to_connector_attributes(
    claims: &[Claim],
    mappings: &[MetaClaimMapping],
) -> BTreeMap<String, Vec<Attribute>> {
    let mut connector_id_to_attributes: BTreeMap<String, Vec<Attribute>> = BTreeMap::new();

    for claim in claims {
        if let Some(mapping) = mappings.iter().find(|m| m.matches_claim(claim)) {
            connector_id_to_attributes
                .entry(mapping.identity_store_connector_id.clone())
                .or_default()
                .push(Attribute::new(&mapping.attribute_name, &claim.value));
        }
    }

    connector_id_to_attributes
}

/// Rebuild claims from per-connector attribute lists.
///
/// The inverse of [`claims_to_connector_attributes`]: every attribute that
/// corresponds to a known mapping of its connector yields one claim.
/// Attributes without a mapping are skipped; they were never produced by the
/// forward translation.
pub fn connector_attributes_to_claims(
    mappings: &[MetaClaimMapping],
    connector_id_to_attributes: &BTreeMap<String, Vec<Attribute>>,
) -> Vec<Claim> {
    let mut claims = Vec::new();

    for (connector_id, attributes) in connector_id_to_attributes {
        if attributes.is_empty() {
            continue;
        }

        for attribute in attributes {
            let mapping = mappings.iter().find(|m| {
                m.identity_store_connector_id == *connector_id
                    && m.attribute_name == attribute.attribute_name
            });

            if let Some(mapping) = mapping {
                claims.push(Claim::new(
                    &mapping.meta_claim.dialect_uri,
                    &mapping.meta_claim.claim_uri,
                    &attribute.attribute_value,
                ));
            }
        }
    }

    claims
}

/// Partition credentials per credential store connector.
///
/// Each credential goes to the first connector whose `can_store` accepts it.
/// Credentials unclaimed by any connector are dropped.
pub fn credentials_to_connectors(
    credentials: &[Credential],
    connectors: &[Arc<dyn CredentialStoreConnector>],
) -> BTreeMap<String, Vec<Credential>> {
    let mut connector_id_to_credentials: BTreeMap<String, Vec<Credential>> = BTreeMap::new();

    for credential in credentials {
        if let Some(connector) = connectors.iter().find(|c| c.can_store(credential)) {
            connector_id_to_credentials
                .entry(connector.connector_id().to_string())
                .or_default()
                .push(credential.clone());
        }
    }

    connector_id_to_credentials
}

/// Resolve the attribute names backing a set of meta claims, grouped per
/// connector. Meta claims with an empty claim URI or without a mapping are
/// skipped.
pub fn connector_id_to_attribute_names(
    mappings: &[MetaClaimMapping],
    meta_claims: &[MetaClaim],
) -> BTreeMap<String, Vec<String>> {
    let mut connector_id_to_names: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for meta_claim in meta_claims {
        if meta_claim.claim_uri.is_empty() {
            continue;
        }

        if let Some(mapping) = mappings
            .iter()
            .find(|m| m.meta_claim.claim_uri == meta_claim.claim_uri)
        {
            connector_id_to_names
                .entry(mapping.identity_store_connector_id.clone())
                .or_default()
                .push(mapping.attribute_name.clone());
        }
    }

    connector_id_to_names
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifold_core::{CredentialContext, CLAIM_DIALECT_URI, USERNAME_CLAIM_URI};

    use crate::connector::ConnectorError;
    use crate::error::AuthenticationFailure;

    const EMAIL_CLAIM_URI: &str = "http://wso2.org/claims/email";

    fn mappings() -> Vec<MetaClaimMapping> {
        vec![
            MetaClaimMapping::new(
                MetaClaim::in_default_dialect(USERNAME_CLAIM_URI),
                "ldap-1",
                "attr_uid",
                true,
            ),
            MetaClaimMapping::new(
                MetaClaim::in_default_dialect(EMAIL_CLAIM_URI),
                "jdbc-1",
                "attr_mail",
                true,
            ),
        ]
    }

    struct TypedCredentialConnector {
        id: &'static str,
        credential_type: &'static str,
    }

    impl CredentialStoreConnector for TypedCredentialConnector {
        fn connector_id(&self) -> &str {
            self.id
        }

        fn can_store(&self, credential: &Credential) -> bool {
            credential.credential_type == self.credential_type
        }

        fn can_handle(&self, credential: &Credential, _context: &CredentialContext) -> bool {
            self.can_store(credential)
        }

        fn add_credential(&self, _credentials: &[Credential]) -> Result<String, ConnectorError> {
            Ok("cred-1".to_string())
        }

        fn delete_credential(&self, _connector_user_id: &str) -> Result<(), ConnectorError> {
            Ok(())
        }

        fn authenticate(
            &self,
            _credential: &Credential,
            _context: &CredentialContext,
        ) -> Result<(), AuthenticationFailure> {
            Ok(())
        }
    }

    #[test]
    fn test_claims_partition_per_connector() {
        let claims = vec![
            Claim::username("alice"),
            Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"),
        ];

        let partitioned = claims_to_connector_attributes(&claims, &mappings());

        assert_eq!(partitioned.len(), 2);
        assert_eq!(
            partitioned["ldap-1"],
            vec![Attribute::new("attr_uid", "alice")]
        );
        assert_eq!(
            partitioned["jdbc-1"],
            vec![Attribute::new("attr_mail", "a@x")]
        );
    }

    #[test]
    fn test_unmapped_claims_are_dropped() {
        let claims = vec![
            Claim::username("alice"),
            Claim::in_default_dialect("http://wso2.org/claims/shoe-size", "42"),
        ];

        let partitioned = claims_to_connector_attributes(&claims, &mappings());

        assert_eq!(partitioned.len(), 1);
        assert!(partitioned.contains_key("ldap-1"));
    }

    #[test]
    fn test_round_trip_restores_claims() {
        let claims = vec![
            Claim::username("alice"),
            Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"),
        ];

        let partitioned = claims_to_connector_attributes(&claims, &mappings());
        let mut restored = connector_attributes_to_claims(&mappings(), &partitioned);
        restored.sort_by(|a, b| a.claim_uri.cmp(&b.claim_uri));

        let mut expected = claims;
        expected.sort_by(|a, b| a.claim_uri.cmp(&b.claim_uri));
        assert_eq!(restored, expected);
    }

    // Regression: the reverse translation must process non-empty attribute
    // lists, not discard them.
    #[test]
    fn test_reverse_translation_reads_populated_lists() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "ldap-1".to_string(),
            vec![Attribute::new("attr_uid", "alice")],
        );
        attributes.insert("jdbc-1".to_string(), Vec::new());

        let claims = connector_attributes_to_claims(&mappings(), &attributes);

        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_uri, USERNAME_CLAIM_URI);
        assert_eq!(claims[0].dialect_uri, CLAIM_DIALECT_URI);
        assert_eq!(claims[0].value, "alice");
    }

    #[test]
    fn test_reverse_translation_skips_unknown_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "ldap-1".to_string(),
            vec![
                Attribute::new("attr_uid", "alice"),
                Attribute::new("attr_shadow", "x"),
            ],
        );

        let claims = connector_attributes_to_claims(&mappings(), &attributes);
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_first_credential_connector_wins() {
        let connectors: Vec<Arc<dyn CredentialStoreConnector>> = vec![
            Arc::new(TypedCredentialConnector {
                id: "vault-1",
                credential_type: "password",
            }),
            Arc::new(TypedCredentialConnector {
                id: "vault-2",
                credential_type: "password",
            }),
            Arc::new(TypedCredentialConnector {
                id: "hsm-1",
                credential_type: "otp",
            }),
        ];

        let credentials = vec![Credential::password("s3cret"), Credential::new("otp", "123456")];
        let partitioned = credentials_to_connectors(&credentials, &connectors);

        assert_eq!(partitioned.len(), 2);
        assert_eq!(partitioned["vault-1"].len(), 1);
        assert!(!partitioned.contains_key("vault-2"));
        assert_eq!(partitioned["hsm-1"].len(), 1);
    }

    #[test]
    fn test_unclaimed_credentials_are_dropped() {
        let connectors: Vec<Arc<dyn CredentialStoreConnector>> =
            vec![Arc::new(TypedCredentialConnector {
                id: "vault-1",
                credential_type: "password",
            })];

        let credentials = vec![Credential::new("fido2", "assertion")];
        let partitioned = credentials_to_connectors(&credentials, &connectors);

        assert!(partitioned.is_empty());
    }

    // Regression: meta claims with a populated URI must be resolved; only
    // empty URIs are skipped.
    #[test]
    fn test_attribute_names_resolved_for_populated_uris() {
        let meta_claims = vec![
            MetaClaim::in_default_dialect(USERNAME_CLAIM_URI),
            MetaClaim::in_default_dialect(""),
        ];

        let names = connector_id_to_attribute_names(&mappings(), &meta_claims);

        assert_eq!(names.len(), 1);
        assert_eq!(names["ldap-1"], vec!["attr_uid".to_string()]);
    }
}
