//! # zkmail-zkp — Proof Orchestration
//!
//! Binds a compiled email circuit to a proving engine and drives setup,
//! proving and verification for the selected backends.
//!
//! ## Architecture
//!
//! - **Circuit** (`circuit.rs`): `CompiledCircuit` loads the compiler's JSON
//!   artifact. Its ABI names the inputs the record must carry and which of
//!   them are public.
//!
//! - **Engine** (`engine.rs`): the `ProvingEngine` trait is the seam to a
//!   proving system. Operations are synchronous; the prover moves them off
//!   the async executor.
//!
//! - **Reference** (`reference.rs`): `ReferenceEngine` evaluates the
//!   circuit's equalities directly and binds the public outputs with
//!   SHA-256. Transparent, no zero-knowledge.
//!
//! - **Prover** (`prover.rs`): `Prover` owns the per-backend single-setup
//!   barrier, checks the record against the ABI, and applies deadlines.
//!
//! ## Failure Classification
//!
//! `ProvingError::kind()` separates constraint violations (the inputs are
//! wrong, an expected outcome) from cancellation and infrastructure faults.
//! A proof that fails verification is `Ok(false)`, never an error.
//!
//! ## Crate Policy
//!
//! - Depends on `zkmail-core` only.
//! - No `unsafe` code.

pub mod backend;
pub mod circuit;
pub mod engine;
pub mod error;
pub mod proof;
pub mod prover;
pub mod reference;

pub use backend::{BackendId, BackendSelection, UnknownBackend};
pub use circuit::{CircuitError, CompiledCircuit};
pub use engine::{BackendArtifacts, ProvingEngine};
pub use error::{FailureKind, ProvingError, VerificationError};
pub use proof::Proof;
pub use prover::Prover;
pub use reference::ReferenceEngine;
