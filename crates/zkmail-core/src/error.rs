//! # Error Types
//!
//! Errors raised by the plaintext side of input preparation. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Extraction failures are hard failures. There is no safe default for a
//!   security-relevant field, so callers always see the typed error.
//! - Schema errors name the offending input slot so a profile/parser
//!   mismatch is diagnosable without dumping the record.

use thiserror::Error;

/// No username could be derived from the message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Neither the greeting rule nor any footer rule matched.
    #[error("no known username pattern matched the message text ({rules_tried} rules tried)")]
    NoPatternMatched {
        /// Number of rules evaluated before giving up.
        rules_tried: usize,
    },

    /// A caller-supplied greeting token produced an unusable pattern.
    #[error("invalid extraction rule {pattern:?}: {reason}")]
    InvalidRule {
        /// The pattern that failed to compile.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

/// Error loading or resolving a circuit profile.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The requested profile is not registered.
    #[error("unknown circuit profile {0:?}")]
    UnknownProfile(String),

    /// A profile failed validation.
    #[error("invalid circuit profile {name:?}: {reason}")]
    InvalidProfile {
        /// Profile name.
        name: String,
        /// Why the profile was rejected.
        reason: String,
    },

    /// The profile configuration file could not be parsed.
    #[error("profile configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// IO error reading the configuration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The assembled record does not match the shape its profile requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("input record schema violation at {field:?}: {reason}")]
pub struct SchemaError {
    /// Circuit input slot that is missing, unexpected, or mis-sized.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl SchemaError {
    pub(crate) fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Circuit inputs are field elements; floats have no representation.
    #[error("float values are not permitted in circuit inputs: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
