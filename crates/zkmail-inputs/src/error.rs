//! # Error Types
//!
//! `ParseError` covers everything the message parser can reject.
//! `AssemblyError` is what `InputAssembler::assemble()` returns; callers
//! branch on its variant to tell a malformed message from an unmatched
//! template.

use thiserror::Error;

use zkmail_core::{ExtractionError, ProfileError, SchemaError};

/// The raw message does not conform to the expected transport format, or
/// its DKIM signature cannot be located.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Structural problem with the message itself.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// No usable DKIM-Signature header.
    #[error("no DKIM-Signature header{}", domain_suffix(.domain))]
    MissingDkimSignature {
        /// Signing domain that was requested, if any.
        domain: Option<String>,
    },

    /// The DKIM-Signature tag list is malformed or incomplete.
    #[error("malformed DKIM-Signature: {0}")]
    MalformedDkimSignature(String),

    /// Only `rsa-sha256` is supported by the circuit.
    #[error("unsupported DKIM algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    /// `bh=` does not match the canonical body.
    #[error("DKIM body hash does not match the canonical body")]
    BodyHashMismatch,

    /// Signed header block exceeds the profile's buffer.
    #[error("signed header block is {len} bytes, profile allows {max}")]
    HeaderTooLong {
        /// Actual length.
        len: usize,
        /// Profile capacity.
        max: usize,
    },

    /// Canonical body exceeds the profile's buffer.
    #[error("canonical body is {len} bytes, profile allows {max}")]
    BodyTooLong {
        /// Actual length.
        len: usize,
        /// Profile capacity.
        max: usize,
    },

    /// A header the profile requires is absent from the signed block.
    #[error("signed header block has no {0:?} field")]
    MissingHeader(String),

    /// A header field holds no recognizable address.
    #[error("no address found in {0:?} field")]
    MissingAddress(String),

    /// The key source has no modulus for this signer.
    #[error("no public key for selector {selector:?} of domain {domain:?}")]
    UnknownPublicKey {
        /// `d=` tag.
        domain: String,
        /// `s=` tag.
        selector: String,
    },

    /// The signature does not fit the key's limb encoding.
    #[error("signature of {bits} bits does not fit {limbs} limbs")]
    SignatureTooLarge {
        /// Signature bit length.
        bits: u64,
        /// Limb count derived from the key.
        limbs: usize,
    },
}

fn domain_suffix(domain: &Option<String>) -> String {
    domain
        .as_ref()
        .map(|d| format!(" for domain {d:?}"))
        .unwrap_or_default()
}

/// Error loading a DKIM key store.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// YAML could not be parsed.
    #[error("key store configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// A modulus is not valid hex or is zero.
    #[error("invalid modulus for selector {selector:?} of domain {domain:?}")]
    InvalidModulus {
        /// `d=` tag.
        domain: String,
        /// `s=` tag.
        selector: String,
    },

    /// IO error reading the key store file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to produce a canonical input record.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// The requested profile is not registered.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// The parser rejected the message.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The username had to be derived and no rule matched.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// The parser output does not fit the profile's record shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
