//! # Canonical Input Record
//!
//! The complete set of named inputs handed to the proving step. It is the
//! parser's `BaseFieldRecord` plus the digest commitments selected by the
//! profile's `CommitmentMode`.
//!
//! ## Security Invariant
//!
//! `CanonicalInputRecord` has private fields and a single validating
//! constructor. A record that exists has every slot its profile declares,
//! correctly sized buffers, in-bounds sequences, and commitments of the
//! profile's mode. Missing keys are a defect caught here, not a proving-time
//! surprise.
//!
//! ## Wire Shape
//!
//! The record serializes to a flat JSON object keyed by circuit parameter
//! name. Byte buffers are `{"storage": [..], "len": n}`, sequences are
//! `{"index": i, "length": n}`, limbs and digests are `0x`-hex strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::canonical::CanonicalBytes;
use crate::digest::FieldDigest;
use crate::error::{CanonicalizationError, SchemaError};
use crate::profile::{CircuitProfile, CommitmentMode};

/// Named circuit inputs, ordered by name.
pub type InputMap = BTreeMap<String, Value>;

/// A fixed-capacity byte buffer with a logical length.
///
/// Bytes past `len` are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedVec {
    /// Zero-padded backing storage, exactly `capacity` bytes.
    pub storage: Vec<u8>,
    /// Number of meaningful bytes at the front of `storage`.
    pub len: usize,
}

impl BoundedVec {
    /// Copy `content` into a zero-padded buffer of `capacity` bytes.
    ///
    /// Returns `None` if `content` does not fit.
    pub fn padded(content: &[u8], capacity: usize) -> Option<Self> {
        if content.len() > capacity {
            return None;
        }
        let mut storage = vec![0u8; capacity];
        storage[..content.len()].copy_from_slice(content);
        Some(Self {
            storage,
            len: content.len(),
        })
    }

    /// Size of the backing storage.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The meaningful prefix of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len.min(self.storage.len())]
    }
}

/// A `[index, index + length)` window into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Offset of the first byte.
    pub index: usize,
    /// Number of bytes.
    pub length: usize,
}

impl Sequence {
    /// Create a sequence.
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.index.saturating_add(self.length)
    }

    /// The bytes this sequence selects, or `None` if it runs past `data`.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.index..self.end())
    }
}

/// RSA public key in the limb encoding the circuit's bignum library uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKeyLimbs {
    /// Modulus limbs, least significant first.
    pub modulus: Vec<String>,
    /// Barrett reduction parameter limbs, least significant first.
    pub redc: Vec<String>,
}

/// The parser's output: everything the circuit needs about the message
/// itself, before any commitments are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFieldRecord {
    /// DKIM-canonicalized signed header block.
    pub header: BoundedVec,
    /// Signing key.
    pub pubkey: RsaPublicKeyLimbs,
    /// RSA signature limbs, least significant first.
    pub signature: Vec<String>,
    /// Location of the `dkim-signature:` field in `header`.
    pub dkim_header_sequence: Sequence,
    /// Offset of the `bh=` value in `header`.
    pub body_hash_index: usize,
    /// DKIM-canonicalized body.
    pub body: BoundedVec,
    /// Location of the `from:` field in `header`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_header_sequence: Option<Sequence>,
    /// Location of the sender address within the `from:` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address_sequence: Option<Sequence>,
    /// Location of the `to:` field in `header`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_header_sequence: Option<Sequence>,
    /// Location of the recipient address within the `to:` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address_sequence: Option<Sequence>,
}

impl BaseFieldRecord {
    /// The recipient address bytes, when the `to:` field was located.
    pub fn to_address(&self) -> Option<&[u8]> {
        self.to_address_sequence?.slice(self.header.as_slice())
    }

    /// The sender address bytes, when the `from:` field was located.
    pub fn from_address(&self) -> Option<&[u8]> {
        self.from_address_sequence?.slice(self.header.as_slice())
    }
}

/// The digest commitments appended to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commitments {
    /// Nothing appended.
    PassThrough,
    /// Recipient address commitment.
    ToAddress {
        /// `digest(utf8(expected_to_address))`.
        expected_to_hash: FieldDigest,
    },
    /// Recipient address and username commitments.
    ToAddressAndUsername {
        /// `digest(utf8(expected_to_address))`.
        expected_to_hash: FieldDigest,
        /// `digest(utf8(username))`.
        expected_username_hash: FieldDigest,
    },
}

impl Commitments {
    /// The mode this variant belongs to.
    pub fn mode(&self) -> CommitmentMode {
        match self {
            Self::PassThrough => CommitmentMode::PassThrough,
            Self::ToAddress { .. } => CommitmentMode::ToAddress,
            Self::ToAddressAndUsername { .. } => CommitmentMode::ToAddressAndUsername,
        }
    }

    /// The recipient commitment, if present.
    pub fn expected_to_hash(&self) -> Option<&FieldDigest> {
        match self {
            Self::PassThrough => None,
            Self::ToAddress { expected_to_hash }
            | Self::ToAddressAndUsername {
                expected_to_hash, ..
            } => Some(expected_to_hash),
        }
    }

    /// The username commitment, if present.
    pub fn expected_username_hash(&self) -> Option<&FieldDigest> {
        match self {
            Self::ToAddressAndUsername {
                expected_username_hash,
                ..
            } => Some(expected_username_hash),
            _ => None,
        }
    }
}

/// A schema-checked, immutable set of circuit inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalInputRecord {
    base: BaseFieldRecord,
    commitments: Commitments,
}

impl CanonicalInputRecord {
    /// Validate `base` and `commitments` against `profile` and seal them.
    pub fn new(
        base: BaseFieldRecord,
        commitments: Commitments,
        profile: &CircuitProfile,
    ) -> Result<Self, SchemaError> {
        check_buffer("header", &base.header, profile.max_headers_length)?;
        check_buffer("body", &base.body, profile.max_body_length)?;

        let header_len = base.header.len;
        check_sequence("dkim_header_sequence", Some(base.dkim_header_sequence), header_len)?;
        if base.body_hash_index >= header_len {
            return Err(SchemaError::new(
                "body_hash_index",
                format!("index {} outside header of length {header_len}", base.body_hash_index),
            ));
        }

        check_presence("from_header_sequence", base.from_header_sequence, profile.extract_from, header_len)?;
        check_presence("from_address_sequence", base.from_address_sequence, profile.extract_from, header_len)?;
        check_presence("to_header_sequence", base.to_header_sequence, profile.extract_to, header_len)?;
        check_presence("to_address_sequence", base.to_address_sequence, profile.extract_to, header_len)?;

        let limbs = base.pubkey.modulus.len();
        if limbs == 0 {
            return Err(SchemaError::new("pubkey", "modulus has no limbs"));
        }
        if base.pubkey.redc.len() != limbs {
            return Err(SchemaError::new(
                "pubkey",
                format!("redc has {} limbs, modulus has {limbs}", base.pubkey.redc.len()),
            ));
        }
        if base.signature.len() != limbs {
            return Err(SchemaError::new(
                "signature",
                format!("signature has {} limbs, modulus has {limbs}", base.signature.len()),
            ));
        }

        if commitments.mode() != profile.commitment_mode {
            return Err(SchemaError::new(
                "commitments",
                format!(
                    "profile declares {} but record carries {}",
                    profile.commitment_mode,
                    commitments.mode()
                ),
            ));
        }

        Ok(Self { base, commitments })
    }

    /// The parser output this record extends.
    pub fn base(&self) -> &BaseFieldRecord {
        &self.base
    }

    /// The appended commitments.
    pub fn commitments(&self) -> &Commitments {
        &self.commitments
    }

    /// Shortcut for `commitments().expected_to_hash()`.
    pub fn expected_to_hash(&self) -> Option<&FieldDigest> {
        self.commitments.expected_to_hash()
    }

    /// Shortcut for `commitments().expected_username_hash()`.
    pub fn expected_username_hash(&self) -> Option<&FieldDigest> {
        self.commitments.expected_username_hash()
    }

    /// Circuit parameter names present in this record, in circuit order.
    pub fn input_names(&self) -> Vec<&'static str> {
        let b = &self.base;
        let mut names = vec![
            "header",
            "pubkey",
            "signature",
            "dkim_header_sequence",
            "body_hash_index",
            "body",
        ];
        let optional = [
            ("from_header_sequence", b.from_header_sequence.is_some()),
            ("from_address_sequence", b.from_address_sequence.is_some()),
            ("to_header_sequence", b.to_header_sequence.is_some()),
            ("to_address_sequence", b.to_address_sequence.is_some()),
            ("expected_to_hash", self.commitments.expected_to_hash().is_some()),
            (
                "expected_username_hash",
                self.commitments.expected_username_hash().is_some(),
            ),
        ];
        names.extend(optional.iter().filter(|(_, present)| *present).map(|(n, _)| *n));
        names
    }

    /// Flatten into named JSON inputs.
    pub fn to_input_map(&self) -> Result<InputMap, CanonicalizationError> {
        let mut map = match serde_json::to_value(&self.base)? {
            Value::Object(obj) => obj.into_iter().collect::<InputMap>(),
            _ => InputMap::new(),
        };
        if let Some(h) = self.commitments.expected_to_hash() {
            map.insert("expected_to_hash".to_string(), Value::String(h.to_hex()));
        }
        if let Some(h) = self.commitments.expected_username_hash() {
            map.insert("expected_username_hash".to_string(), Value::String(h.to_hex()));
        }
        Ok(map)
    }

    /// JCS bytes of the flattened record.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&self.to_input_map()?)
    }
}

impl Serialize for CanonicalInputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_input_map()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

fn check_buffer(field: &str, buf: &BoundedVec, capacity: usize) -> Result<(), SchemaError> {
    if buf.capacity() != capacity {
        return Err(SchemaError::new(
            field,
            format!("storage is {} bytes, profile requires {capacity}", buf.capacity()),
        ));
    }
    if buf.len > capacity {
        return Err(SchemaError::new(
            field,
            format!("len {} exceeds capacity {capacity}", buf.len),
        ));
    }
    Ok(())
}

fn check_sequence(field: &str, seq: Option<Sequence>, bound: usize) -> Result<(), SchemaError> {
    if let Some(seq) = seq {
        if seq.end() > bound {
            return Err(SchemaError::new(
                field,
                format!(
                    "sequence [{}, {}) runs past header length {bound}",
                    seq.index,
                    seq.end()
                ),
            ));
        }
    }
    Ok(())
}

fn check_presence(
    field: &str,
    seq: Option<Sequence>,
    required: bool,
    bound: usize,
) -> Result<(), SchemaError> {
    match (seq.is_some(), required) {
        (false, true) => Err(SchemaError::new(field, "required by profile but missing")),
        (true, false) => Err(SchemaError::new(field, "not declared by profile")),
        _ => check_sequence(field, seq, bound),
    }
}
