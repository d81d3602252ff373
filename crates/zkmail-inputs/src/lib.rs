//! # zkmail-inputs — Circuit Input Assembly
//!
//! Turns a raw DKIM-signed message into the `CanonicalInputRecord` a
//! zkmail circuit consumes.
//!
//! ## Pipeline
//!
//! ```text
//! raw .eml ──► DkimParser ──► BaseFieldRecord ──┐
//!                                               ├──► InputAssembler ──► CanonicalInputRecord
//! to address, username ──► weighted_digest ─────┘
//! ```
//!
//! - [`mime`]: header/body split, line-ending normalization, transfer
//!   decoding of the body for username extraction.
//! - [`dkim`]: DKIM-Signature tag parsing and header/body canonicalization.
//! - [`keys`]: the `PublicKeySource` seam and the YAML-backed `KeyStore`.
//! - [`parser`]: the `EmailParser` seam and `DkimParser`.
//! - [`assembler`]: appends the digest commitments the profile declares.
//!
//! ## Security Invariant
//!
//! Plaintext recipient addresses and usernames never appear in log output.
//! Only their digests are logged, at `debug`.

pub mod assembler;
pub mod dkim;
pub mod error;
pub mod keys;
pub mod mime;
pub mod parser;

pub use assembler::{InputAssembler, UsernameSource};
pub use dkim::{Canonicalization, DkimSignature};
pub use error::{AssemblyError, KeyStoreError, ParseError};
pub use keys::{KeyStore, PublicKeySource};
pub use parser::{locate_field, DkimParser, EmailParser};
