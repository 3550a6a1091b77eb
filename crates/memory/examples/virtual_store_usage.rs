//! Virtual Identity Store Example
//!
//! This example wires a domain out of in-memory backends, creates a user
//! spanning an attribute partition and a credential partition, and
//! authenticates the user by a claim.
//!
//! Run with: cargo run --example virtual_store_usage -p manifold-memory

use std::sync::Arc;

use manifold_core::{Claim, Credential, MetaClaim, MetaClaimMapping, UserModel};
use manifold_memory::{
    InMemoryCredentialStoreConnector, InMemoryIdentityStoreConnector, InMemoryUniqueIdResolver,
};
use manifold_store::connector::{CredentialStoreConnector, IdentityStoreConnector};
use manifold_store::resolver::UniqueIdResolver;
use manifold_store::{Domain, IdentityStore};

const EMAIL_CLAIM_URI: &str = "http://wso2.org/claims/email";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    manifold_core::logging::init();

    println!("=== Virtual Identity Store Example ===\n");

    // 1. Assemble a domain over in-memory backends
    println!("1. Assembling the PRIMARY domain");
    let identity = Arc::new(InMemoryIdentityStoreConnector::new("ldap-1"));
    let credentials = Arc::new(InMemoryCredentialStoreConnector::passwords("vault-1"));
    let resolver = Arc::new(InMemoryUniqueIdResolver::new());

    let mappings = vec![
        MetaClaimMapping::new(
            MetaClaim::in_default_dialect(manifold_core::USERNAME_CLAIM_URI),
            "ldap-1",
            "uid",
            true,
        ),
        MetaClaimMapping::new(
            MetaClaim::in_default_dialect(EMAIL_CLAIM_URI),
            "ldap-1",
            "mail",
            true,
        ),
    ];

    let domain = Domain::new(
        "PRIMARY",
        10,
        vec![identity as Arc<dyn IdentityStoreConnector>],
        vec![credentials as Arc<dyn CredentialStoreConnector>],
        mappings,
        resolver as Arc<dyn UniqueIdResolver>,
    )?;

    let store = IdentityStore::new(vec![domain])?;
    println!("   ✓ Store initialized with one domain\n");

    // 2. Create a user spanning both backends
    println!("2. Adding user 'alice'");
    let model = UserModel::new()
        .with_claim(Claim::username("alice"))
        .with_claim(Claim::in_default_dialect(EMAIL_CLAIM_URI, "alice@example.org"))
        .with_credential(Credential::password("s3cret"));

    let user = store.add_user(model, None)?;
    println!("   ✓ Created user with logical id: {}\n", user.unique_user_id());

    // 3. Read the user back by claim
    println!("3. Looking the user up by email");
    let found = store.user_by_claim(
        &Claim::in_default_dialect(EMAIL_CLAIM_URI, "alice@example.org"),
        None,
    )?;
    println!("   ✓ Resolved logical id: {}", found.unique_user_id());

    for claim in found.claims(&store)? {
        println!("   - {} = {}", claim.claim_uri, claim.value);
    }
    println!();

    // 4. Authenticate by the username claim
    println!("4. Authenticating 'alice'");
    let context = store
        .authenticate(&Claim::username("alice"), &Credential::password("s3cret"), None)
        .map_err(|e| e.to_string())?;
    println!(
        "   ✓ Authenticated; user domain: {}\n",
        context.user().domain_name()
    );

    // 5. Wrong passwords are rejected
    println!("5. Rejecting a wrong password");
    let denied = store.authenticate(
        &Claim::username("alice"),
        &Credential::password("wrong"),
        None,
    );
    println!("   ✓ Denied: {}\n", denied.err().map(|e| e.to_string()).unwrap_or_default());

    println!("Done.");
    Ok(())
}
