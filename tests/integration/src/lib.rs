//! Integration tests for the Manifold virtual identity store
//!
//! This test suite validates:
//! - store lifecycle against in-memory backends (add, read, update, delete)
//! - compensation of partial write failures
//! - cross-domain authentication and priority ordering
//! - group management and membership linkage

pub mod test_utils;

#[cfg(test)]
mod authentication_tests;

#[cfg(test)]
mod group_tests;

#[cfg(test)]
mod store_lifecycle_tests;
