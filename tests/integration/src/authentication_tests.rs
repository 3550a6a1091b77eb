//! Authentication across domains: priority ordering, unique-claim
//! enforcement, and the collapsing of internal failures.

use manifold_core::{Claim, Credential, MetaClaim, MetaClaimMapping, UserModel};
use manifold_store::IdentityStore;

use crate::test_utils::{
    domain_with_mappings, standard_domain, username_only_mappings, EMAIL_CLAIM_URI,
};

fn alice_model() -> UserModel {
    UserModel::new()
        .with_claim(Claim::username("alice"))
        .with_claim(Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"))
        .with_credential(Credential::password("s3cret"))
}

#[test]
fn authenticate_with_valid_password() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let added = store.add_user(alice_model(), None).unwrap();

    let context = store
        .authenticate(&Claim::username("alice"), &Credential::password("s3cret"), None)
        .unwrap();

    assert_eq!(context.user().unique_user_id(), added.unique_user_id());
    assert_eq!(context.user().domain_name(), "PRIMARY");
}

#[test]
fn authenticate_with_wrong_password_fails() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    store.add_user(alice_model(), None).unwrap();

    let result = store.authenticate(
        &Claim::username("alice"),
        &Credential::password("nope"),
        None,
    );
    assert!(result.is_err());
}

#[test]
fn authenticate_unknown_user_fails() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let result = store.authenticate(
        &Claim::username("ghost"),
        &Credential::password("s3cret"),
        None,
    );
    assert!(result.is_err());
}

// The claim decides which domains participate: a domain without an email
// mapping is skipped, and the first supporting domain that produces a
// context wins.
#[test]
fn authenticate_skips_domains_without_the_claim() {
    let (a, _) = domain_with_mappings("A", 10, username_only_mappings("ic-1"));
    let (b, _) = standard_domain("B", 20);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    store.add_user(alice_model(), Some("B")).unwrap();

    let context = store
        .authenticate(
            &Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"),
            &Credential::password("s3cret"),
            None,
        )
        .unwrap();

    assert_eq!(context.user().domain_name(), "B");
}

// A domain that supports the claim but fails to authenticate is swallowed;
// iteration continues in priority order.
#[test]
fn authenticate_advances_past_failing_domains() {
    let (a, _) = standard_domain("A", 10);
    let (b, _) = standard_domain("B", 20);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    // Only domain B holds the user.
    store.add_user(alice_model(), Some("B")).unwrap();

    let context = store
        .authenticate(&Claim::username("alice"), &Credential::password("s3cret"), None)
        .unwrap();

    assert_eq!(context.user().domain_name(), "B");
}

// Equal priorities keep insertion order: the first registered domain wins
// when both can authenticate the subject.
#[test]
fn authenticate_tries_equal_priority_domains_in_insertion_order() {
    let (a, _) = standard_domain("A", 10);
    let (b, _) = standard_domain("B", 10);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    store.add_user(alice_model(), Some("A")).unwrap();
    store.add_user(alice_model(), Some("B")).unwrap();

    let context = store
        .authenticate(&Claim::username("alice"), &Credential::password("s3cret"), None)
        .unwrap();

    assert_eq!(context.user().domain_name(), "A");
}

#[test]
fn authenticate_requires_a_unique_claim_mapping() {
    let mappings = vec![MetaClaimMapping::new(
        MetaClaim::in_default_dialect(EMAIL_CLAIM_URI),
        "ic-1",
        "attr_mail",
        false,
    )];
    let (domain, _) = domain_with_mappings("PRIMARY", 10, mappings);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let model = UserModel::new()
        .with_claim(Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"))
        .with_claim(Claim::username("alice"))
        .with_credential(Credential::password("s3cret"));
    // The username claim has no mapping here, so only the email lands in the
    // connector; creation still requires the username claim itself.
    store.add_user(model, None).unwrap();

    let pinned = store.authenticate(
        &Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"),
        &Credential::password("s3cret"),
        Some("PRIMARY"),
    );
    assert_eq!(
        pinned.err().unwrap().message(),
        "Provided claim is not unique."
    );

    // Without a pinned domain the per-domain failure is swallowed and the
    // caller only learns that the credentials were invalid.
    let unpinned = store.authenticate(
        &Claim::in_default_dialect(EMAIL_CLAIM_URI, "a@x"),
        &Credential::password("s3cret"),
        None,
    );
    assert_eq!(unpinned.err().unwrap().message(), "Invalid credentials.");
}

#[test]
fn authenticate_against_named_domain_only() {
    let (a, _) = standard_domain("A", 10);
    let (b, _) = standard_domain("B", 20);
    let store = IdentityStore::new(vec![a, b]).unwrap();

    store.add_user(alice_model(), Some("B")).unwrap();

    // Pinned to domain A the user does not exist; without a pin the priority
    // iteration finds the user in B.
    let pinned = store.authenticate(
        &Claim::username("alice"),
        &Credential::password("s3cret"),
        Some("A"),
    );
    assert!(pinned.is_err());

    let unpinned = store.authenticate(
        &Claim::username("alice"),
        &Credential::password("s3cret"),
        None,
    );
    assert!(unpinned.is_ok());
}
