//! # Prove CLI
//!
//! Assembles inputs, proves them on each selected backend with the
//! reference engine, and verifies every proof.
//!
//! ```bash
//! zkmail prove --eml reset.eml --to me@example.com --keys keys.yaml \
//!     --circuit instagram.json --backend all --out proofs.json
//! ```
//!
//! A message that does not satisfy the circuit exits with code 2; that is a
//! verdict about the message, not a tool failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use zkmail_core::{CanonicalInputRecord, ProfileRegistry};
use zkmail_zkp::{BackendSelection, CompiledCircuit, Proof, Prover, ReferenceEngine};

use crate::inputs::{write_output, AssembleArgs};
use crate::EXIT_REJECTED;

/// Arguments for `zkmail prove`.
#[derive(Args, Debug)]
pub struct ProveArgs {
    #[command(flatten)]
    pub assemble: AssembleArgs,

    /// Compiled circuit artifact (JSON).
    #[arg(long)]
    pub circuit: PathBuf,

    /// Backend to prove with: honk, plonk, or all.
    #[arg(long, default_value = "honk")]
    pub backend: BackendSelection,

    /// Give up on each prove/verify call after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Write the proofs as JSON to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the prove subcommand.
pub fn run_prove(args: &ProveArgs, registry: &ProfileRegistry) -> Result<u8> {
    let record = args.assemble.assemble(registry)?;
    let circuit = CompiledCircuit::from_file(&args.circuit)
        .with_context(|| format!("failed to load circuit {}", args.circuit.display()))?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(prove_and_verify(args, &record, circuit))
}

async fn prove_and_verify(
    args: &ProveArgs,
    record: &CanonicalInputRecord,
    circuit: CompiledCircuit,
) -> Result<u8> {
    let prover = Prover::with_selection(
        Arc::new(circuit),
        Arc::new(ReferenceEngine::new()),
        args.backend,
    );
    let deadline = args.deadline_secs.map(Duration::from_secs);

    let mut proofs: Vec<Proof> = Vec::new();
    for backend in args.backend.backends() {
        let proved = match deadline {
            Some(d) => prover.prove_with_deadline(record, backend, d).await,
            None => prover.prove(record, backend).await,
        };
        let proof = match proved {
            Ok(proof) => proof,
            Err(e) if e.is_constraint_violation() => {
                eprintln!("REJECTED ({backend}): {e}");
                return Ok(EXIT_REJECTED);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("proving failed on {backend}")))
            }
        };

        let verified = match deadline {
            Some(d) => prover.verify_with_deadline(&proof, backend, d).await,
            None => prover.verify(&proof, backend).await,
        }
        .with_context(|| format!("verification failed to run on {backend}"))?;
        if !verified {
            eprintln!("REJECTED ({backend}): proof did not verify");
            return Ok(EXIT_REJECTED);
        }
        eprintln!("OK ({backend}): proof verified");
        proofs.push(proof);
    }

    let json = serde_json::to_string_pretty(&proofs)?;
    write_output(args.out.as_deref(), &json)?;
    Ok(0)
}
