//! End-to-end lifecycle tests: add, read, list, update, delete, and the
//! compensation of partial write failures.

use std::sync::Arc;

use manifold_core::{Claim, Credential, MetaClaim, UserModel};
use manifold_store::connector::{CredentialStoreConnector, IdentityStoreConnector};
use manifold_store::error::StoreError;
use manifold_store::resolver::UniqueIdResolver;
use manifold_store::{Domain, IdentityStore};

use crate::test_utils::{
    domain_with_mappings, standard_domain, standard_mappings, CountingIdentityConnector,
    FailingCredentialConnector, EMAIL_CLAIM_URI,
};

fn alice_model() -> UserModel {
    UserModel::new()
        .with_claim(Claim::username("alice"))
        .with_claim(Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"))
        .with_credential(Credential::password("s3cret"))
}

#[test]
fn init_with_no_domains_is_rejected() {
    let result = IdentityStore::new(Vec::new());
    assert!(matches!(&result, Err(StoreError::NoDomains)));
    assert_eq!(result.err().unwrap().to_string(), "No domains registered.");
}

#[test]
fn primary_domain_breaks_priority_ties_by_insertion_order() {
    let (a, _) = standard_domain("A", 10);
    let (b, _) = standard_domain("B", 10);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    assert_eq!(store.domains().primary_domain().unwrap().name(), "A");
    assert_eq!(store.domains().len(), 2);
}

#[test]
fn add_user_and_read_back() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();
    assert!(!user.unique_user_id().is_empty());
    assert_eq!(user.domain_name(), "PRIMARY");
    assert!(handles.resolver.is_user_exists(user.unique_user_id()).unwrap());
    assert_eq!(
        handles.resolver.domain_of_user(user.unique_user_id()).as_deref(),
        Some("PRIMARY")
    );

    let fetched = store.user(user.unique_user_id(), None).unwrap();
    assert_eq!(fetched.unique_user_id(), user.unique_user_id());

    let mut claims = store.claims_of_user(user.unique_user_id(), None).unwrap();
    claims.sort_by(|a, b| a.claim_uri.cmp(&b.claim_uri));
    assert_eq!(claims.len(), 2);
    let values: Vec<&str> = claims.iter().map(|c| c.value.as_str()).collect();
    assert!(values.contains(&"alice"));
    assert!(values.contains(&"a@x"));
}

#[test]
fn get_user_by_claim() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let added = store.add_user(alice_model(), None).unwrap();

    let by_email = store
        .user_by_claim(&Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"), None)
        .unwrap();
    assert_eq!(by_email.unique_user_id(), added.unique_user_id());

    let missing = store.user_by_claim(&Claim::in_default_dialect(EMAIL_CLAIM_URI, "b@x"), None);
    assert!(matches!(missing, Err(StoreError::UserNotFound(_))));
}

#[test]
fn add_user_failure_compensates_written_partitions() {
    let identity = Arc::new(CountingIdentityConnector::new(Arc::new(
        manifold_memory::InMemoryIdentityStoreConnector::new("ic-1"),
    )));
    let resolver = Arc::new(manifold_memory::InMemoryUniqueIdResolver::new());

    let domain = Domain::new(
        "PRIMARY",
        10,
        vec![Arc::clone(&identity) as Arc<dyn IdentityStoreConnector>],
        vec![Arc::new(FailingCredentialConnector::new("cc-1"))
            as Arc<dyn CredentialStoreConnector>],
        standard_mappings("ic-1"),
        Arc::clone(&resolver) as Arc<dyn manifold_store::resolver::UniqueIdResolver>,
    )
    .unwrap();
    let store = IdentityStore::new(vec![domain]).unwrap();

    let result = store.add_user(alice_model(), None);

    assert!(matches!(result, Err(StoreError::Server { .. })));
    // The attribute partition written before the credential failure was
    // compensated exactly once, and no orphan linkage was recorded.
    let batches = identity.removal_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(resolver.user_count(), 0);
}

#[test]
fn list_users_by_claim_and_pattern() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    for name in ["alice", "alan", "bob"] {
        let model = UserModel::new()
            .with_claim(Claim::username(name))
            .with_claim(Claim::in_default_dialect(EMAIL_CLAIM_URI, format!("{name}@x")));
        store.add_user(model, None).unwrap();
    }

    let by_email = store
        .list_users_by_claim(
            &Claim::in_default_dialect(EMAIL_CLAIM_URI, "alan@x"),
            0,
            10,
            None,
        )
        .unwrap();
    assert_eq!(by_email.len(), 1);

    let by_pattern = store
        .list_users_by_pattern(
            &MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
            "al*",
            0,
            10,
            None,
        )
        .unwrap();
    assert_eq!(by_pattern.len(), 2);

    let paged = store
        .list_users_by_pattern(
            &MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
            "*",
            1,
            1,
            None,
        )
        .unwrap();
    assert_eq!(paged.len(), 1);

    let nothing = store
        .list_users_by_pattern(
            &MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
            "*",
            0,
            0,
            None,
        )
        .unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn claims_can_be_filtered_by_meta_claims() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();

    let filtered = store
        .claims_of_user_filtered(
            user.unique_user_id(),
            &[MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI)],
            None,
        )
        .unwrap();

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].value, "alice");
}

#[test]
fn update_user_claims_with_current_claims_is_idempotent() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();
    let before = handles
        .resolver
        .unique_user(user.unique_user_id())
        .unwrap()
        .unwrap();

    let claims = store.claims_of_user(user.unique_user_id(), None).unwrap();
    store
        .update_user_claims(user.unique_user_id(), &claims, None)
        .unwrap();

    let after = handles
        .resolver
        .unique_user(user.unique_user_id())
        .unwrap()
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn update_user_claims_changes_attribute_values() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();

    let updated = vec![
        Claim::username("alice"),
        Claim::in_default_dialect(EMAIL_CLAIM_URI, "new@x"),
    ];
    store
        .update_user_claims(user.unique_user_id(), &updated, None)
        .unwrap();

    let claims = store.claims_of_user(user.unique_user_id(), None).unwrap();
    let email = claims
        .iter()
        .find(|c| c.claim_uri == EMAIL_CLAIM_URI)
        .unwrap();
    assert_eq!(email.value, "new@x");
}

#[test]
fn update_with_empty_claims_clears_partitions() {
    let (domain, handles) = domain_with_mappings("PRIMARY", 10, standard_mappings("ic-1"));
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();

    // An empty claim list clears the attributes of the existing partition
    // but keeps the partition and the linkage alive.
    store
        .update_user_claims(user.unique_user_id(), &[], None)
        .unwrap();

    assert_eq!(handles.identity.user_count(), 1);
    let claims = store.claims_of_user(user.unique_user_id(), None).unwrap();
    assert!(claims.is_empty());
}

#[test]
fn delete_user_removes_partitions_and_linkage() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store.add_user(alice_model(), None).unwrap();
    assert_eq!(handles.identity.user_count(), 1);
    assert_eq!(handles.credentials.credential_count(), 1);

    store.delete_user(user.unique_user_id(), None).unwrap();

    assert_eq!(handles.identity.user_count(), 0);
    assert_eq!(handles.credentials.credential_count(), 0);
    assert!(!handles.resolver.is_user_exists(user.unique_user_id()).unwrap());

    let missing = store.user(user.unique_user_id(), None);
    assert!(matches!(missing, Err(StoreError::UserNotFound(_))));
}

#[test]
fn add_users_bulk_creates_every_user() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let models = vec![
        UserModel::new().with_claim(Claim::username("alice")),
        UserModel::new().with_claim(Claim::username("bob")),
    ];

    let users = store.add_users(models, None).unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(handles.identity.user_count(), 2);
    assert_eq!(handles.resolver.user_count(), 2);

    for user in &users {
        let claims = store.claims_of_user(user.unique_user_id(), None).unwrap();
        assert_eq!(claims.len(), 1);
    }
}

#[test]
fn list_users_pages_through_resolver() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    for n in 0..4 {
        store
            .add_user(
                UserModel::new().with_claim(Claim::username(format!("user{n}"))),
                None,
            )
            .unwrap();
    }

    assert_eq!(store.list_users(0, 10, None).unwrap().len(), 4);
    assert_eq!(store.list_users(2, 10, None).unwrap().len(), 2);
    assert!(store.list_users(0, 0, None).unwrap().is_empty());
}

#[test]
fn named_domain_routes_to_that_domain() {
    let (a, _) = standard_domain("A", 10);
    let (b, handles_b) = standard_domain("B", 20);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    let user = store.add_user(alice_model(), Some("B")).unwrap();

    assert_eq!(user.domain_name(), "B");
    assert!(handles_b.resolver.is_user_exists(user.unique_user_id()).unwrap());

    // The same id is unknown in the primary domain.
    let missing = store.user(user.unique_user_id(), None);
    assert!(matches!(missing, Err(StoreError::UserNotFound(_))));
}
