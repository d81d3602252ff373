//! # DKIM Public Keys
//!
//! The parser needs the signer's RSA modulus to emit the `pubkey` input.
//! DNS lookup is outside this crate; keys come from a `PublicKeySource`.
//! `KeyStore` is the configuration-backed implementation:
//!
//! ```yaml
//! keys:
//!   - domain: mail.instagram.com
//!     selector: jan2023
//!     modulus: c0ffee...   # hex, big-endian
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use num_bigint::BigUint;
use num_traits::{Num, Zero};
use serde::Deserialize;

use crate::error::KeyStoreError;

/// Resolves a signer's RSA modulus.
pub trait PublicKeySource: Send + Sync {
    /// Modulus for `selector._domainkey.domain`, if known.
    fn modulus(&self, domain: &str, selector: &str) -> Option<BigUint>;
}

#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    domain: String,
    selector: String,
    modulus: String,
}

/// In-memory table of `(domain, selector) → modulus`.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: BTreeMap<(String, String), BigUint>,
}

impl KeyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modulus. Domain matching is case-insensitive.
    pub fn insert(&mut self, domain: &str, selector: &str, modulus: BigUint) {
        self.keys
            .insert((domain.to_ascii_lowercase(), selector.to_string()), modulus);
    }

    /// Load from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, KeyStoreError> {
        let file: KeyFile = serde_yaml::from_str(yaml)?;
        let mut store = Self::new();
        for entry in file.keys {
            let hex = entry.modulus.trim().trim_start_matches("0x");
            let modulus = BigUint::from_str_radix(hex, 16)
                .ok()
                .filter(|m| !m.is_zero())
                .ok_or_else(|| KeyStoreError::InvalidModulus {
                    domain: entry.domain.clone(),
                    selector: entry.selector.clone(),
                })?;
            store.insert(&entry.domain, &entry.selector, modulus);
        }
        tracing::debug!(keys = store.len(), "loaded DKIM key store");
        Ok(store)
    }

    /// Load from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, KeyStoreError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl PublicKeySource for KeyStore {
    fn modulus(&self, domain: &str, selector: &str) -> Option<BigUint> {
        self.keys
            .get(&(domain.to_ascii_lowercase(), selector.to_string()))
            .cloned()
    }
}
