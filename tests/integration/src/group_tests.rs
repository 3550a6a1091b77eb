//! Group management: creation, claim lookups, membership linkage, and the
//! user/group relationship operations.

use manifold_core::{Claim, GroupModel, UserModel};
use manifold_store::error::StoreError;
use manifold_store::IdentityStore;

use crate::test_utils::{standard_domain, GROUP_NAME_CLAIM_URI};

fn engineering_model() -> GroupModel {
    GroupModel::new().with_claim(Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "engineering"))
}

#[test]
fn add_group_and_read_back() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let group = store.add_group(engineering_model(), None).unwrap();
    assert!(!group.unique_group_id().is_empty());
    assert_eq!(group.domain_name(), "PRIMARY");
    assert_eq!(handles.identity.group_count(), 1);
    assert_eq!(handles.resolver.group_count(), 1);

    let fetched = store.group(group.unique_group_id(), None).unwrap();
    assert_eq!(fetched.unique_group_id(), group.unique_group_id());

    let by_claim = store
        .group_by_claim(
            &Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "engineering"),
            None,
        )
        .unwrap();
    assert_eq!(by_claim.unique_group_id(), group.unique_group_id());
}

#[test]
fn add_group_requires_claims() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let result = store.add_group(GroupModel::new(), None);
    assert!(matches!(result, Err(StoreError::Client(_))));
}

#[test]
fn add_groups_bulk_creates_every_group() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let models = vec![
        GroupModel::new().with_claim(Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "engineering")),
        GroupModel::new().with_claim(Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "sales")),
    ];

    let groups = store.add_groups(models, None).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(handles.identity.group_count(), 2);
    assert_eq!(handles.resolver.group_count(), 2);
}

#[test]
fn list_groups_by_claim_and_pattern() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    for name in ["engineering", "engineering-platform", "sales"] {
        store
            .add_group(
                GroupModel::new().with_claim(Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, name)),
                None,
            )
            .unwrap();
    }

    let exact = store
        .list_groups_by_claim(
            &Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "sales"),
            0,
            10,
            None,
        )
        .unwrap();
    assert_eq!(exact.len(), 1);

    let by_pattern = store
        .list_groups_by_pattern(
            &manifold_core::MetaClaim::in_default_dialect(GROUP_NAME_CLAIM_URI),
            "engineering*",
            0,
            10,
            None,
        )
        .unwrap();
    assert_eq!(by_pattern.len(), 2);

    assert_eq!(store.list_groups(0, 10, None).unwrap().len(), 3);
}

#[test]
fn membership_round_trip() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let user = store
        .add_user(UserModel::new().with_claim(Claim::username("alice")), None)
        .unwrap();
    let group = store.add_group(engineering_model(), None).unwrap();

    store
        .update_groups_of_user(
            user.unique_user_id(),
            vec![group.unique_group_id().to_string()],
            None,
        )
        .unwrap();

    assert!(store
        .is_user_in_group(user.unique_user_id(), group.unique_group_id(), None)
        .unwrap());
    assert!(user.is_in_group(&store, group.unique_group_id()).unwrap());

    let groups = store.groups_of_user(user.unique_user_id(), None).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].unique_group_id(), group.unique_group_id());

    let members = store.users_of_group(group.unique_group_id(), None).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].unique_user_id(), user.unique_user_id());
}

#[test]
fn update_users_of_group_replaces_membership() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let alice = store
        .add_user(UserModel::new().with_claim(Claim::username("alice")), None)
        .unwrap();
    let bob = store
        .add_user(UserModel::new().with_claim(Claim::username("bob")), None)
        .unwrap();
    let group = store.add_group(engineering_model(), None).unwrap();

    store
        .update_users_of_group(
            group.unique_group_id(),
            vec![alice.unique_user_id().to_string()],
            None,
        )
        .unwrap();
    store
        .update_users_of_group(
            group.unique_group_id(),
            vec![bob.unique_user_id().to_string()],
            None,
        )
        .unwrap();

    assert!(!store
        .is_user_in_group(alice.unique_user_id(), group.unique_group_id(), None)
        .unwrap());
    assert!(store
        .is_user_in_group(bob.unique_user_id(), group.unique_group_id(), None)
        .unwrap());
}

#[test]
fn membership_checks_require_known_entities() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let missing_user = store.groups_of_user("ghost", None);
    assert!(matches!(missing_user, Err(StoreError::UserNotFound(_))));

    let missing_group = store.users_of_group("ghost", None);
    assert!(matches!(missing_group, Err(StoreError::GroupNotFound(_))));

    let invalid = store.is_user_in_group("", "g-1", None);
    assert!(matches!(invalid, Err(StoreError::Client(_))));
}

#[test]
fn update_group_claims_changes_attribute_values() {
    let (domain, _) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let group = store.add_group(engineering_model(), None).unwrap();

    store
        .update_group_claims(
            group.unique_group_id(),
            &[Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "platform")],
            None,
        )
        .unwrap();

    let renamed = store
        .group_by_claim(
            &Claim::in_default_dialect(GROUP_NAME_CLAIM_URI, "platform"),
            None,
        )
        .unwrap();
    assert_eq!(renamed.unique_group_id(), group.unique_group_id());
}

#[test]
fn delete_group_removes_partitions_and_linkage() {
    let (domain, handles) = standard_domain("PRIMARY", 10);
    let store = IdentityStore::new(vec![domain]).unwrap();

    let group = store.add_group(engineering_model(), None).unwrap();
    assert_eq!(handles.identity.group_count(), 1);

    store.delete_group(group.unique_group_id(), None).unwrap();

    assert_eq!(handles.identity.group_count(), 0);
    assert_eq!(handles.resolver.group_count(), 0);

    let missing = store.group(group.unique_group_id(), None);
    assert!(matches!(missing, Err(StoreError::GroupNotFound(_))));
}
