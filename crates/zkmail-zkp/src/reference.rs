//! # Reference Proving Engine
//!
//! A deterministic, transparent engine for development and tests. It
//! evaluates the equalities the email circuit declares directly on the
//! input record and, when they all hold, emits a "proof" that is a SHA-256
//! binding of the public outputs under a per-backend verification key.
//!
//! Constraints evaluated, in order:
//!
//! | constraint         | holds when                                                  |
//! |--------------------|-------------------------------------------------------------|
//! | `header_length`    | `header.len <= capacity`                                    |
//! | `body_length`      | `body.len <= capacity`                                      |
//! | `dkim_header`      | the DKIM sequence is in bounds and names `dkim-signature:`  |
//! | `body_hash`        | base64(SHA-256(body)) appears at `body_hash_index`          |
//! | `rsa_key`          | `redc` is the Barrett parameter of `modulus`                |
//! | `rsa_signature`    | `signature^65537 mod n` is the PKCS#1 v1.5 SHA-256 encoding of `header` |
//! | `from_address`     | the address sequence lies inside the `from:` field          |
//! | `to_address`       | as above for `to:`                                          |
//! | `to_hash`          | `digest(to address) == expected_to_hash`                    |
//! | `username_hash`    | `digest(username in body) == expected_username_hash`        |
//!
//! ## Security Notice
//!
//! This engine provides NO zero-knowledge and NO soundness. The verification
//! key is derived from public data, so anyone can forge a binding. It is a
//! stand-in with the same interface and failure modes as a real backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use zkmail_core::limbs::{from_limbs, redc_param};
use zkmail_core::{
    weighted_digest, BaseFieldRecord, CanonicalBytes, CanonicalInputRecord, FieldDigest,
    Sequence, UsernameExtractor,
};

use crate::backend::BackendId;
use crate::circuit::CompiledCircuit;
use crate::engine::{BackendArtifacts, ProvingEngine};
use crate::error::{ProvingError, VerificationError};
use crate::proof::Proof;

/// DER prefix of a SHA-256 `DigestInfo`.
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

const RSA_EXPONENT: u32 = 65537;

const VK_DOMAIN: &[u8] = b"zkmail-reference-vk";
const PROOF_DOMAIN: &[u8] = b"zkmail-reference-proof";

/// Transparent engine that checks circuit constraints off-circuit.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    setups: AtomicUsize,
    latency: Duration,
    extractor: Option<UsernameExtractor>,
}

impl ReferenceEngine {
    /// An engine with no added latency that locates the username with the
    /// standard greeting and footer rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the username with `extractor` instead of the standard rules.
    /// Pair it with the extractor the inputs were assembled with.
    pub fn with_extractor(mut self, extractor: UsernameExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Sleep for `latency` inside every operation, standing in for the
    /// cost of a real backend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// How many times `setup` has run.
    pub fn setup_invocations(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    fn simulate_work(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }

    fn binding(
        artifacts: &BackendArtifacts,
        circuit_id: &str,
        outputs: &CanonicalBytes,
    ) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(PROOF_DOMAIN);
        hasher.update(&artifacts.verification_key);
        hasher.update(circuit_id.as_bytes());
        hasher.update(outputs.as_bytes());
        hasher.finalize().to_vec()
    }
}

impl ProvingEngine for ReferenceEngine {
    fn setup(
        &self,
        backend: BackendId,
        circuit: &CompiledCircuit,
    ) -> Result<BackendArtifacts, ProvingError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        self.simulate_work();
        if circuit.bytecode.is_empty() {
            return Err(ProvingError::MalformedCircuit("empty bytecode".to_string()));
        }

        let mut hasher = Sha256::new();
        hasher.update(VK_DOMAIN);
        hasher.update(backend.as_str().as_bytes());
        hasher.update(circuit.circuit_id().as_bytes());
        hasher.update(circuit.bytecode.as_bytes());
        Ok(BackendArtifacts {
            backend,
            verification_key: hasher.finalize().to_vec(),
        })
    }

    fn prove(
        &self,
        artifacts: &BackendArtifacts,
        circuit: &CompiledCircuit,
        inputs: &CanonicalInputRecord,
    ) -> Result<Proof, ProvingError> {
        self.simulate_work();
        check_constraints(inputs, self.extractor.as_ref())?;

        let map = inputs
            .to_input_map()
            .map_err(|e| ProvingError::Engine(e.to_string()))?;
        let mut public_outputs = std::collections::BTreeMap::new();
        for name in circuit.public_inputs() {
            let value = map
                .get(name)
                .ok_or_else(|| ProvingError::MissingInput(name.to_string()))?;
            public_outputs.insert(name.to_string(), value.clone());
        }
        let outputs =
            CanonicalBytes::new(&public_outputs).map_err(|e| ProvingError::Engine(e.to_string()))?;
        let circuit_id = circuit.circuit_id();
        let proof = Self::binding(artifacts, &circuit_id, &outputs);

        Ok(Proof {
            backend: artifacts.backend,
            circuit_id,
            public_outputs,
            proof_hex: hex::encode(proof),
        })
    }

    fn verify(
        &self,
        artifacts: &BackendArtifacts,
        circuit: &CompiledCircuit,
        proof: &Proof,
    ) -> Result<bool, VerificationError> {
        self.simulate_work();
        if proof.backend != artifacts.backend {
            return Err(VerificationError::BackendMismatch {
                expected: artifacts.backend,
                actual: proof.backend,
            });
        }
        let bytes = proof
            .proof_bytes()
            .map_err(|e| VerificationError::MalformedProof(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(VerificationError::MalformedProof(format!(
                "expected 32 proof bytes, got {}",
                bytes.len()
            )));
        }
        if proof.circuit_id != circuit.circuit_id() {
            return Ok(false);
        }
        let outputs = CanonicalBytes::new(&proof.public_outputs)
            .map_err(|e| VerificationError::MalformedProof(e.to_string()))?;
        Ok(Self::binding(artifacts, &proof.circuit_id, &outputs) == bytes)
    }
}

fn check_constraints(
    record: &CanonicalInputRecord,
    extractor: Option<&UsernameExtractor>,
) -> Result<(), ProvingError> {
    let base = record.base();
    let header = base.header.as_slice();
    let body = base.body.as_slice();

    if base.header.len > base.header.capacity() {
        return Err(ProvingError::constraint("header_length", "length exceeds capacity"));
    }
    if base.body.len > base.body.capacity() {
        return Err(ProvingError::constraint("body_length", "length exceeds capacity"));
    }

    let dkim = base
        .dkim_header_sequence
        .slice(header)
        .ok_or_else(|| ProvingError::constraint("dkim_header", "sequence out of bounds"))?;
    if !starts_with_field(dkim, "dkim-signature") {
        return Err(ProvingError::constraint("dkim_header", "sequence does not select dkim-signature"));
    }

    check_body_hash(base, header, body)?;
    check_rsa(base, header)?;

    check_address_within("from_address", base.from_header_sequence, base.from_address_sequence, header, "from")?;
    check_address_within("to_address", base.to_header_sequence, base.to_address_sequence, header, "to")?;

    if let Some(expected) = record.expected_to_hash() {
        let address = base
            .to_address()
            .ok_or_else(|| ProvingError::constraint("to_hash", "record has no to address"))?;
        if &weighted_digest(address) != expected {
            return Err(ProvingError::constraint(
                "to_hash",
                "digest of to address differs from expected_to_hash",
            ));
        }
    }

    if let Some(expected) = record.expected_username_hash() {
        let text = String::from_utf8_lossy(body);
        let extractor = match extractor {
            Some(custom) => custom,
            None => UsernameExtractor::standard().map_err(|e| ProvingError::Engine(e.to_string()))?,
        };
        let username = extractor
            .extract(&text)
            .map_err(|e| ProvingError::constraint("username_hash", e.to_string()))?;
        let actual: FieldDigest = weighted_digest(username.as_bytes());
        if &actual != expected {
            return Err(ProvingError::constraint(
                "username_hash",
                "digest of username in body differs from expected_username_hash",
            ));
        }
    }

    Ok(())
}

fn starts_with_field(bytes: &[u8], name: &str) -> bool {
    let prefix = format!("{name}:");
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn check_body_hash(base: &BaseFieldRecord, header: &[u8], body: &[u8]) -> Result<(), ProvingError> {
    let expected = BASE64.encode(Sha256::digest(body));
    let start = base.body_hash_index;
    let found = header.get(start..start + expected.len());
    if found != Some(expected.as_bytes()) {
        return Err(ProvingError::constraint(
            "body_hash",
            "bh= value does not match SHA-256 of body",
        ));
    }
    Ok(())
}

fn check_rsa(base: &BaseFieldRecord, header: &[u8]) -> Result<(), ProvingError> {
    let limbs = |name: &str, l: &[String]| {
        from_limbs(l).ok_or_else(|| ProvingError::constraint(name, "limb is not a 120-bit hex value"))
    };
    let modulus = limbs("rsa_key", &base.pubkey.modulus)?;
    let redc = limbs("rsa_key", &base.pubkey.redc)?;
    let signature = limbs("rsa_signature", &base.signature)?;

    if modulus.bits() < 512 {
        return Err(ProvingError::constraint("rsa_key", "modulus too small"));
    }
    if redc != redc_param(&modulus) {
        return Err(ProvingError::constraint("rsa_key", "redc is not the Barrett parameter of modulus"));
    }
    if signature >= modulus {
        return Err(ProvingError::constraint("rsa_signature", "signature not reduced"));
    }

    let k = (modulus.bits() as usize).div_ceil(8);
    let expected = pkcs1_sha256_encoding(header, k);
    let recovered = signature.modpow(&BigUint::from(RSA_EXPONENT), &modulus);
    if recovered != expected {
        return Err(ProvingError::constraint(
            "rsa_signature",
            "signature does not verify over header",
        ));
    }
    Ok(())
}

/// `0x00 0x01 FF..FF 0x00 DigestInfo H` as an integer, for a `k`-byte modulus.
fn pkcs1_sha256_encoding(message: &[u8], k: usize) -> BigUint {
    let hash = Sha256::digest(message);
    let t_len = SHA256_DIGEST_INFO.len() + hash.len();
    let mut em = Vec::with_capacity(k);
    em.extend_from_slice(&[0x00, 0x01]);
    em.resize(k.saturating_sub(t_len + 1), 0xff);
    em.push(0x00);
    em.extend_from_slice(&SHA256_DIGEST_INFO);
    em.extend_from_slice(&hash);
    BigUint::from_bytes_be(&em)
}

fn check_address_within(
    constraint: &str,
    field: Option<Sequence>,
    address: Option<Sequence>,
    header: &[u8],
    name: &str,
) -> Result<(), ProvingError> {
    let (field, address) = match (field, address) {
        (None, None) => return Ok(()),
        (Some(f), Some(a)) => (f, a),
        _ => return Err(ProvingError::constraint(constraint, "field and address sequences must come together")),
    };
    let bytes = field
        .slice(header)
        .ok_or_else(|| ProvingError::constraint(constraint, "field sequence out of bounds"))?;
    if !starts_with_field(bytes, name) {
        return Err(ProvingError::constraint(constraint, format!("sequence does not select {name}:")));
    }
    if address.index < field.index || address.end() > field.end() {
        return Err(ProvingError::constraint(constraint, "address lies outside its header field"));
    }
    Ok(())
}
