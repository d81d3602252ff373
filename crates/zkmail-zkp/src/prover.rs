//! # Prover — Async Proof Orchestration
//!
//! A `Prover` binds one compiled circuit to one engine and a fixed set of
//! backends chosen at construction. Nothing is computed at construction;
//! each backend moves through:
//!
//! ```text
//! Uninitialized ──setup (once)──► Prepared ──► {Proving, Verifying} ──► Prepared
//! ```
//!
//! ## Concurrency
//!
//! Setup for each backend sits behind a `tokio::sync::OnceCell`: concurrent
//! `prove` calls for a backend that is still uninitialized wait on the one
//! in-flight setup instead of starting their own. A failed or cancelled
//! setup leaves the cell empty, so the next call retries.
//!
//! Setup, proving and verification are CPU-bound and run on the blocking
//! pool via `spawn_blocking`; the async executor is never stalled.
//!
//! ## Deadlines
//!
//! `prove_with_deadline` and `verify_with_deadline` race the call against
//! `tokio::time::timeout`. On expiry the caller gets the `Cancelled` kind
//! and the result of the abandoned work is discarded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use zkmail_core::CanonicalInputRecord;

use crate::backend::{BackendId, BackendSelection};
use crate::circuit::CompiledCircuit;
use crate::engine::{BackendArtifacts, ProvingEngine};
use crate::error::{ProvingError, VerificationError};
use crate::proof::Proof;

/// Proof orchestrator for one circuit. Cloning shares the engine, the
/// circuit and the per-backend setup state.
pub struct Prover<E> {
    engine: Arc<E>,
    circuit: Arc<CompiledCircuit>,
    selection: BackendSelection,
    slots: Arc<BTreeMap<BackendId, OnceCell<BackendArtifacts>>>,
}

impl<E> Clone for Prover<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            circuit: Arc::clone(&self.circuit),
            selection: self.selection,
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<E: ProvingEngine> std::fmt::Debug for Prover<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prover")
            .field("circuit", &self.circuit.circuit_id())
            .field("selection", &self.selection)
            .field("prepared", &self.prepared_backends())
            .finish()
    }
}

impl<E: ProvingEngine> Prover<E> {
    /// A prover for a single backend.
    pub fn new(circuit: Arc<CompiledCircuit>, engine: Arc<E>, backend: BackendId) -> Self {
        Self::with_selection(circuit, engine, BackendSelection::Single(backend))
    }

    /// A prover for every supported backend.
    pub fn prepare_all(circuit: Arc<CompiledCircuit>, engine: Arc<E>) -> Self {
        Self::with_selection(circuit, engine, BackendSelection::All)
    }

    /// A prover for an explicit selection.
    pub fn with_selection(
        circuit: Arc<CompiledCircuit>,
        engine: Arc<E>,
        selection: BackendSelection,
    ) -> Self {
        let slots = selection
            .backends()
            .into_iter()
            .map(|b| (b, OnceCell::new()))
            .collect();
        Self {
            engine,
            circuit,
            selection,
            slots: Arc::new(slots),
        }
    }

    /// The backends selected at construction.
    pub fn selection(&self) -> BackendSelection {
        self.selection
    }

    /// The circuit this prover serves.
    pub fn circuit(&self) -> &CompiledCircuit {
        &self.circuit
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Backends whose setup has completed.
    pub fn prepared_backends(&self) -> Vec<BackendId> {
        self.slots
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(b, _)| *b)
            .collect()
    }

    /// Run setup for every selected backend now instead of on first use.
    pub async fn prepare(&self) -> Result<(), ProvingError> {
        for backend in self.slots.keys() {
            self.artifacts(*backend).await?;
        }
        Ok(())
    }

    async fn artifacts(&self, backend: BackendId) -> Result<&BackendArtifacts, ProvingError> {
        let cell = self
            .slots
            .get(&backend)
            .ok_or(ProvingError::BackendNotPrepared(backend))?;
        cell.get_or_try_init(|| async {
            let engine = Arc::clone(&self.engine);
            let circuit = Arc::clone(&self.circuit);
            let artifacts = tokio::task::spawn_blocking(move || engine.setup(backend, &circuit))
                .await
                .map_err(|e| ProvingError::Setup {
                    backend,
                    reason: e.to_string(),
                })??;
            tracing::info!(%backend, circuit = %self.circuit.circuit_id(), "backend prepared");
            Ok::<_, ProvingError>(artifacts)
        })
        .await
    }

    /// Prove `inputs` on `backend`.
    ///
    /// # Errors
    ///
    /// - `BackendNotPrepared` if `backend` was not selected at construction.
    /// - `MissingInput` / `UnexpectedInput` if the record's key set differs
    ///   from the circuit's declared parameters.
    /// - `ConstraintViolation` if the inputs do not satisfy the circuit.
    pub async fn prove(
        &self,
        inputs: &CanonicalInputRecord,
        backend: BackendId,
    ) -> Result<Proof, ProvingError> {
        if !self.selection.includes(backend) {
            return Err(ProvingError::BackendNotPrepared(backend));
        }
        check_input_names(&self.circuit, inputs)?;
        let artifacts = self.artifacts(backend).await?.clone();

        let engine = Arc::clone(&self.engine);
        let circuit = Arc::clone(&self.circuit);
        let record = inputs.clone();
        let result = tokio::task::spawn_blocking(move || engine.prove(&artifacts, &circuit, &record))
            .await
            .map_err(|e| ProvingError::Engine(e.to_string()))?;

        match &result {
            Ok(_) => tracing::info!(%backend, "proof generated"),
            Err(e) if e.is_constraint_violation() => {
                tracing::warn!(%backend, error = %e, "inputs rejected by circuit")
            }
            Err(e) => tracing::error!(%backend, error = %e, "proving failed"),
        }
        result
    }

    /// Verify `proof` on `backend`. `Ok(false)` is a normal negative answer.
    pub async fn verify(&self, proof: &Proof, backend: BackendId) -> Result<bool, VerificationError> {
        if !self.selection.includes(backend) {
            return Err(VerificationError::BackendNotPrepared(backend));
        }
        let artifacts = self
            .artifacts(backend)
            .await
            .map_err(|e| VerificationError::Setup(e.to_string()))?
            .clone();

        let engine = Arc::clone(&self.engine);
        let circuit = Arc::clone(&self.circuit);
        let proof = proof.clone();
        let verified = tokio::task::spawn_blocking(move || engine.verify(&artifacts, &circuit, &proof))
            .await
            .map_err(|e| VerificationError::Engine(e.to_string()))??;

        if verified {
            tracing::info!(%backend, "proof verified");
        } else {
            tracing::warn!(%backend, "proof did not verify");
        }
        Ok(verified)
    }

    /// `prove` bounded by `deadline`.
    pub async fn prove_with_deadline(
        &self,
        inputs: &CanonicalInputRecord,
        backend: BackendId,
        deadline: Duration,
    ) -> Result<Proof, ProvingError> {
        tokio::time::timeout(deadline, self.prove(inputs, backend))
            .await
            .map_err(|_| ProvingError::Cancelled(deadline))?
    }

    /// `verify` bounded by `deadline`.
    pub async fn verify_with_deadline(
        &self,
        proof: &Proof,
        backend: BackendId,
        deadline: Duration,
    ) -> Result<bool, VerificationError> {
        tokio::time::timeout(deadline, self.verify(proof, backend))
            .await
            .map_err(|_| VerificationError::Cancelled(deadline))?
    }
}

/// The record must carry exactly the parameters the circuit declares.
fn check_input_names(
    circuit: &CompiledCircuit,
    inputs: &CanonicalInputRecord,
) -> Result<(), ProvingError> {
    let declared = circuit.declared_inputs();
    let present = inputs.input_names();
    if let Some(missing) = declared.iter().find(|name| !present.contains(*name)) {
        return Err(ProvingError::MissingInput(missing.to_string()));
    }
    if let Some(extra) = present.iter().find(|name| !declared.contains(*name)) {
        return Err(ProvingError::UnexpectedInput(extra.to_string()));
    }
    Ok(())
}
