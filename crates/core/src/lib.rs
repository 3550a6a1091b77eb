//! Core functionality for the Manifold virtual identity store.
//!
//! This crate provides the claim and attribute vocabulary, the partition and
//! linkage types, credential carriers, and the shared configuration and
//! logging infrastructure used across the Manifold workspace.

pub mod claim;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod user;

pub use claim::{
    Attribute, Claim, MetaClaim, MetaClaimMapping, CLAIM_DIALECT_URI, USERNAME_CLAIM_URI,
};
pub use config::{ClaimProfile, ClaimProfileEntry};
pub use credential::{Credential, CredentialContext, USER_ID_PROPERTY};
pub use error::{Error, Result};
pub use user::{ConnectedGroup, GroupModel, UniqueGroup, UniqueUser, UserModel, UserPartition};
