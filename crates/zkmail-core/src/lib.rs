//! # zkmail-core — Foundational Types for Email Proof Inputs
//!
//! This crate holds the pieces of input preparation that must agree
//! exactly with the circuit-side implementation of the same logic. Every
//! other crate in the workspace depends on `zkmail-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One digest path.** `weighted_digest()` is the only way to produce a
//!    `FieldDigest`. The circuit recomputes the same weighted sum over the
//!    same bytes, so there is exactly one off-circuit definition to keep in
//!    lockstep with it.
//!
//! 2. **Ordered extraction rules.** `UsernameExtractor` applies the greeting
//!    rule before the footer rule. The footer rule is strictly less specific
//!    and never shadows the greeting.
//!
//! 3. **Schema-checked records.** `CanonicalInputRecord::new()` validates the
//!    parser output and the commitment variant against the `CircuitProfile`,
//!    so a missing or extra circuit input is caught at assembly time, not at
//!    proving time.
//!
//! 4. **Explicit profile registry.** Profiles are values passed to the
//!    assembler, never looked up through ambient global state.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkmail-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod extract;
pub mod limbs;
pub mod profile;
pub mod record;

pub use canonical::CanonicalBytes;
pub use digest::{weighted_digest, weighted_digest_str, FieldDigest};
pub use error::{CanonicalizationError, ExtractionError, ProfileError, SchemaError};
pub use extract::{extract_username, ExtractionRule, UsernameExtractor};
pub use profile::{CircuitProfile, CommitmentMode, ProfileRegistry};
pub use record::{
    BaseFieldRecord, BoundedVec, CanonicalInputRecord, Commitments, InputMap, RsaPublicKeyLimbs,
    Sequence,
};
