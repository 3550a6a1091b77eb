//! Claim-profile configuration for Manifold.
//!
//! A profile describes the claims a deployment recognises. The virtual store
//! only routes on the claim URI; every other field is carried opaquely for
//! the claim-translation collaborator.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One recognised claim and its deployment knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimProfileEntry {
    /// Claim URI this entry configures
    pub claim_uri: String,
    /// Whether the claim must be supplied when creating a user
    #[serde(default)]
    pub required: bool,
    /// Whether the claim may be updated after creation
    #[serde(default)]
    pub readonly: bool,
    /// Validation pattern, opaque to the core
    #[serde(default)]
    pub regex: Option<String>,
    /// Value assumed when the claim is absent
    #[serde(default)]
    pub default_value: Option<String>,
    /// Declared value type, opaque to the core
    #[serde(default)]
    pub data_type: Option<String>,
    /// Additional free-form properties
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// A named set of claim profile entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimProfile {
    /// Profile name
    #[serde(default)]
    pub name: String,
    /// Recognised claims
    #[serde(default)]
    pub claims: Vec<ClaimProfileEntry>,
}

impl ClaimProfile {
    /// Load a profile from a TOML file.
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a profile if the path exists, otherwise return an empty profile.
    pub fn load_with_defaults<P: AsRef<Path>>(path: Option<P>) -> Self {
        if let Some(p) = path {
            if p.as_ref().exists() {
                #[cfg(feature = "toml")]
                if let Ok(profile) = Self::from_file(p) {
                    return profile;
                }
            }
        }

        Self::default()
    }

    /// Look up the entry for a claim URI.
    pub fn entry(&self, claim_uri: &str) -> Option<&ClaimProfileEntry> {
        self.claims.iter().find(|e| e.claim_uri == claim_uri)
    }

    /// Claim URIs marked as required.
    pub fn required_claim_uris(&self) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|e| e.required)
            .map(|e| e.claim_uri.as_str())
            .collect()
    }
}
