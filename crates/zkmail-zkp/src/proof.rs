//! # Proof Objects
//!
//! A proof is tagged with the backend that produced it and the circuit it
//! belongs to. Callers read only `public_outputs`; everything else is passed
//! back to `verify` untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::BackendId;

/// Backend-tagged proof artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Backend that produced the proof.
    pub backend: BackendId,
    /// `CompiledCircuit::circuit_id` of the proven circuit.
    pub circuit_id: String,
    /// Values of the circuit's public parameters.
    pub public_outputs: BTreeMap<String, Value>,
    /// Hex-encoded proof bytes.
    pub proof_hex: String,
}

impl Proof {
    /// Decode the proof bytes.
    pub fn proof_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.proof_hex)
    }

    /// A public output by parameter name.
    pub fn public_output(&self, name: &str) -> Option<&Value> {
        self.public_outputs.get(name)
    }
}
