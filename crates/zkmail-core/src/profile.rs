//! # Circuit Profiles
//!
//! A circuit profile fixes the buffer sizes the compiled circuit was built
//! with, which header fields the parser must locate, and which commitments
//! the assembled record carries. One profile exists per sending-service
//! template.
//!
//! ## Configuration
//!
//! `ProfileRegistry::builtin()` carries the profiles shipped with the crate.
//! Deployments extend or override them from YAML:
//!
//! ```yaml
//! profiles:
//!   instagram:
//!     max_headers_length: 576
//!     max_body_length: 16384
//!     extract_from: true
//!     extract_to: true
//!     commitment_mode: to_address_and_username
//! ```
//!
//! The registry is constructed once at startup and passed by reference to
//! the assembler. It is never mutated afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Which digest commitments the circuit declares as inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentMode {
    /// No derived inputs; the parser output is the whole record.
    PassThrough,
    /// `expected_to_hash` only.
    ToAddress,
    /// `expected_to_hash` and `expected_username_hash`.
    ToAddressAndUsername,
}

impl CommitmentMode {
    /// Whether the record carries `expected_to_hash`.
    pub fn commits_to_address(self) -> bool {
        matches!(self, Self::ToAddress | Self::ToAddressAndUsername)
    }

    /// Whether the record carries `expected_username_hash`.
    pub fn commits_to_username(self) -> bool {
        matches!(self, Self::ToAddressAndUsername)
    }

    /// Configuration identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::ToAddress => "to_address",
            Self::ToAddressAndUsername => "to_address_and_username",
        }
    }
}

impl std::fmt::Display for CommitmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters the circuit was compiled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitProfile {
    /// Capacity of the signed-header buffer in bytes.
    pub max_headers_length: usize,
    /// Capacity of the canonical-body buffer in bytes.
    pub max_body_length: usize,
    /// Locate the `From:` header field and its address.
    pub extract_from: bool,
    /// Locate the `To:` header field and its address.
    pub extract_to: bool,
    /// Derived commitments appended to the parser output.
    #[serde(default = "default_commitment_mode")]
    pub commitment_mode: CommitmentMode,
}

fn default_commitment_mode() -> CommitmentMode {
    CommitmentMode::ToAddressAndUsername
}

impl CircuitProfile {
    /// Name of the built-in Instagram password-reset profile.
    pub const INSTAGRAM: &'static str = "instagram";

    /// The Instagram password-reset template.
    pub fn instagram() -> Self {
        Self {
            max_headers_length: 576,
            max_body_length: 16384,
            extract_from: true,
            extract_to: true,
            commitment_mode: CommitmentMode::ToAddressAndUsername,
        }
    }

    /// Check internal consistency.
    pub fn validate(&self, name: &str) -> Result<(), ProfileError> {
        let invalid = |reason: &str| ProfileError::InvalidProfile {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if self.max_headers_length == 0 {
            return Err(invalid("max_headers_length must be positive"));
        }
        if self.max_body_length == 0 {
            return Err(invalid("max_body_length must be positive"));
        }
        if self.commitment_mode.commits_to_address() && !self.extract_to {
            return Err(invalid(
                "commitment to the recipient address requires extract_to",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: BTreeMap<String, CircuitProfile>,
}

/// Immutable table of named circuit profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, CircuitProfile>,
}

impl ProfileRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The profiles shipped with this crate.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(CircuitProfile::INSTAGRAM.to_string(), CircuitProfile::instagram());
        Self { profiles }
    }

    /// Add or replace a profile after validating it.
    pub fn with_profile(
        mut self,
        name: impl Into<String>,
        profile: CircuitProfile,
    ) -> Result<Self, ProfileError> {
        let name = name.into();
        profile.validate(&name)?;
        self.profiles.insert(name, profile);
        Ok(self)
    }

    /// Overlay the profiles declared in a YAML document onto this registry.
    pub fn extend_from_yaml(mut self, yaml: &str) -> Result<Self, ProfileError> {
        let file: ProfileFile = serde_yaml::from_str(yaml)?;
        for (name, profile) in file.profiles {
            profile.validate(&name)?;
            tracing::debug!(profile = %name, mode = %profile.commitment_mode, "loaded circuit profile");
            self.profiles.insert(name, profile);
        }
        Ok(self)
    }

    /// Overlay the profiles declared in a YAML file onto this registry.
    pub fn extend_from_file(self, path: &Path) -> Result<Self, ProfileError> {
        let yaml = std::fs::read_to_string(path)?;
        self.extend_from_yaml(&yaml)
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Result<&CircuitProfile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    /// Registered profile names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Iterate over `(name, profile)` pairs in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CircuitProfile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no profiles are registered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
