//! # Compiled Circuit Artifact
//!
//! The compiler emits a JSON artifact:
//!
//! ```json
//! {
//!   "noir_version": "0.36.0",
//!   "hash": 1234,
//!   "abi": { "parameters": [ { "name": "header", "type": {...}, "visibility": "private" } ],
//!            "return_type": null },
//!   "bytecode": "H4sIAAAA..."
//! }
//! ```
//!
//! The artifact is loaded once per process and shared read-only. Only the
//! ABI parameter names and visibilities are interpreted here; bytecode is
//! opaque and handed to the engine as-is.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure to load a compiled circuit.
#[derive(Error, Debug)]
pub enum CircuitError {
    /// The artifact is not valid JSON of the expected shape.
    #[error("invalid circuit artifact: {0}")]
    Json(#[from] serde_json::Error),

    /// The artifact file could not be read.
    #[error("failed to read circuit artifact: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact carries no bytecode.
    #[error("circuit artifact has empty bytecode")]
    EmptyBytecode,

    /// Two ABI parameters share a name.
    #[error("circuit ABI declares parameter \"{0}\" more than once")]
    DuplicateParameter(String),
}

/// Whether a parameter is revealed to the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Part of the proof's public outputs.
    Public,
    /// Witness only.
    Private,
}

/// One declared circuit input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiParameter {
    /// Input name, matched against the input record's keys.
    pub name: String,
    /// Compiler type descriptor, kept opaque.
    #[serde(rename = "type", default)]
    pub typ: Value,
    pub visibility: Visibility,
}

/// The circuit's input/output interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abi {
    /// Declared inputs in declaration order.
    pub parameters: Vec<AbiParameter>,
    /// Compiler descriptor of the return value, if the circuit has one.
    #[serde(default)]
    pub return_type: Option<Value>,
}

/// A compiled circuit, as emitted by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledCircuit {
    /// Compiler version that produced the artifact.
    pub noir_version: String,
    /// Compiler-assigned hash of the circuit source.
    pub hash: u64,
    pub abi: Abi,
    /// Base64 ACIR bytecode. Must be non-empty for setup to succeed.
    pub bytecode: String,
}

impl CompiledCircuit {
    /// Parse and validate an artifact.
    pub fn from_json(json: &str) -> Result<Self, CircuitError> {
        let circuit: Self = serde_json::from_str(json)?;
        circuit.validate()?;
        Ok(circuit)
    }

    /// Read, parse and validate an artifact file.
    pub fn from_file(path: &Path) -> Result<Self, CircuitError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), CircuitError> {
        if self.bytecode.is_empty() {
            return Err(CircuitError::EmptyBytecode);
        }
        let mut seen = BTreeSet::new();
        for p in &self.abi.parameters {
            if !seen.insert(p.name.as_str()) {
                return Err(CircuitError::DuplicateParameter(p.name.clone()));
            }
        }
        Ok(())
    }

    /// Names of every declared input.
    pub fn declared_inputs(&self) -> BTreeSet<&str> {
        self.abi.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Names of the inputs revealed to the verifier, in declaration order.
    pub fn public_inputs(&self) -> Vec<&str> {
        self.abi
            .parameters
            .iter()
            .filter(|p| p.visibility == Visibility::Public)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Hex rendering of the compiler hash, used to bind proofs to this circuit.
    pub fn circuit_id(&self) -> String {
        format!("{:016x}", self.hash)
    }
}
