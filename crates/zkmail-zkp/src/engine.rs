//! # Proving Engine Trait
//!
//! The engine is the collaborator that actually runs a proving system for
//! a compiled circuit. Its three operations are synchronous and CPU-bound;
//! the async [`Prover`](crate::prover::Prover) moves them off the executor
//! and guarantees `setup` runs at most once per backend.
//!
//! ## Security Invariant
//!
//! The trait requires `Send + Sync` so a single engine can serve concurrent
//! proofs. `prove` and `verify` must not mutate shared state that affects
//! their results.

use zkmail_core::CanonicalInputRecord;

use crate::backend::BackendId;
use crate::circuit::CompiledCircuit;
use crate::error::{ProvingError, VerificationError};
use crate::proof::Proof;

/// Per-backend output of one-time setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendArtifacts {
    /// The backend these artifacts belong to.
    pub backend: BackendId,
    /// Verification key bytes.
    pub verification_key: Vec<u8>,
}

/// A proving system for compiled circuits.
pub trait ProvingEngine: Send + Sync + 'static {
    /// Derive the proving and verification material for `backend`.
    fn setup(
        &self,
        backend: BackendId,
        circuit: &CompiledCircuit,
    ) -> Result<BackendArtifacts, ProvingError>;

    /// Prove that `inputs` satisfy `circuit`.
    fn prove(
        &self,
        artifacts: &BackendArtifacts,
        circuit: &CompiledCircuit,
        inputs: &CanonicalInputRecord,
    ) -> Result<Proof, ProvingError>;

    /// Check `proof` against the verification key. `Ok(false)` means the
    /// proof does not verify.
    fn verify(
        &self,
        artifacts: &BackendArtifacts,
        circuit: &CompiledCircuit,
        proof: &Proof,
    ) -> Result<bool, VerificationError>;
}
