//! # Input Assembler
//!
//! Produces one `CanonicalInputRecord` per proof attempt:
//!
//! 1. resolve the circuit profile from the registry the assembler owns;
//! 2. run the parser to get the `BaseFieldRecord`;
//! 3. derive the commitments the profile's `CommitmentMode` declares:
//!    `expected_to_hash = digest(utf8(expected_to_address))` and
//!    `expected_username_hash = digest(utf8(username))`, where the username
//!    is either supplied by the caller or extracted from the decoded body;
//! 4. validate and seal the record.
//!
//! Assembly is synchronous and deterministic: identical inputs produce
//! byte-identical records.
//!
//! ## Logging
//!
//! Digests are logged at `debug`. The plaintext address and username are
//! never logged; they are the secrets the proof is about.

use zkmail_core::{
    weighted_digest_str, CanonicalInputRecord, CommitmentMode, Commitments, ExtractionRule,
    ProfileRegistry, UsernameExtractor,
};

use crate::error::AssemblyError;
use crate::mime::decoded_text;
use crate::parser::EmailParser;

/// Where the username committed to by `expected_username_hash` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameSource {
    /// Use this username verbatim.
    Supplied(String),
    /// Extract it from the message body.
    DeriveFromMessage,
}

/// Builds canonical input records from raw messages.
#[derive(Debug)]
pub struct InputAssembler<P> {
    registry: ProfileRegistry,
    parser: P,
    extractor: Option<UsernameExtractor>,
}

impl<P: EmailParser> InputAssembler<P> {
    /// Create an assembler over `registry` using `parser` and the standard
    /// username extraction rules.
    pub fn new(registry: ProfileRegistry, parser: P) -> Self {
        Self {
            registry,
            parser,
            extractor: None,
        }
    }

    /// Replace the username extraction rules.
    pub fn with_extractor(mut self, extractor: UsernameExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// The profiles this assembler serves.
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// The message parser.
    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Extract the username embedded in a raw message.
    pub fn derive_username(&self, raw: &[u8]) -> Result<(String, ExtractionRule), AssemblyError> {
        let text = decoded_text(raw)?;
        let extractor = match &self.extractor {
            Some(custom) => custom,
            None => UsernameExtractor::standard()?,
        };
        Ok(extractor.extract_with_rule(&text)?)
    }

    /// Assemble the canonical input record for one proof attempt.
    ///
    /// # Errors
    ///
    /// - `AssemblyError::Profile` if `profile_name` is not registered.
    /// - `AssemblyError::Parse` if the parser rejects the message.
    /// - `AssemblyError::Extraction` if the profile commits to a username,
    ///   `username` is `DeriveFromMessage`, and no rule matches.
    /// - `AssemblyError::Schema` if the parser output does not fit the profile.
    pub fn assemble(
        &self,
        raw: &[u8],
        profile_name: &str,
        expected_to_address: &str,
        username: &UsernameSource,
    ) -> Result<CanonicalInputRecord, AssemblyError> {
        let profile = self.registry.get(profile_name)?;
        let base = self.parser.parse(raw, profile)?;

        let commitments = match profile.commitment_mode {
            CommitmentMode::PassThrough => Commitments::PassThrough,
            CommitmentMode::ToAddress => Commitments::ToAddress {
                expected_to_hash: weighted_digest_str(expected_to_address),
            },
            CommitmentMode::ToAddressAndUsername => {
                let username = match username {
                    UsernameSource::Supplied(name) => name.clone(),
                    UsernameSource::DeriveFromMessage => {
                        let (name, rule) = self.derive_username(raw)?;
                        tracing::debug!(rule = %rule, "derived username from message body");
                        name
                    }
                };
                Commitments::ToAddressAndUsername {
                    expected_to_hash: weighted_digest_str(expected_to_address),
                    expected_username_hash: weighted_digest_str(&username),
                }
            }
        };

        tracing::debug!(
            profile = profile_name,
            mode = %profile.commitment_mode,
            expected_to_hash = ?commitments.expected_to_hash().map(|d| d.to_hex()),
            expected_username_hash = ?commitments.expected_username_hash().map(|d| d.to_hex()),
            "assembled circuit inputs"
        );

        Ok(CanonicalInputRecord::new(base, commitments, profile)?)
    }
}
