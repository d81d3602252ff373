//! # Weighted Digest — Circuit-Compatible Field Commitment
//!
//! Defines `FieldDigest` and the weighted-sum function that produces it:
//!
//! ```text
//! digest(b) = Σ b[i] · (i + 1)        for i in 0..len(b)
//! ```
//!
//! The circuit computes the same sum over the same bytes and constrains it
//! equal to the `expected_*_hash` inputs. The sum is accumulated in
//! arbitrary precision; there is no overflow boundary on this side.
//!
//! ## Security Notice
//!
//! This is a checksum, not a hash. It has no preimage or collision
//! resistance: permuting bytes can collide, and the preimage of a short
//! address is easy to search. It exists because it is trivially expressible
//! as circuit arithmetic. Do not use it anywhere a cryptographic commitment
//! is required.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{Num, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative integer commitment produced by [`weighted_digest()`].
///
/// Rendered as a `0x`-prefixed lowercase hex string, which is how the
/// circuit's input encoder expects field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldDigest(BigUint);

impl FieldDigest {
    /// Access the underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Render as `0x`-prefixed lowercase hex. Zero renders as `0x0`.
    pub fn to_hex(&self) -> String {
        format!("0x{}", self.0.to_str_radix(16))
    }
}

impl From<BigUint> for FieldDigest {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for FieldDigest {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for FieldDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FieldDigest {
    type Err = String;

    /// Accepts `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => BigUint::from_str_radix(hex, 16),
            None => BigUint::from_str_radix(s, 10),
        };
        parsed
            .map(Self)
            .map_err(|e| format!("invalid field digest {s:?}: {e}"))
    }
}

impl Serialize for FieldDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the weighted digest of a byte sequence.
///
/// Pure and total: the empty sequence yields zero, every other input yields
/// the position-weighted byte sum.
pub fn weighted_digest(bytes: &[u8]) -> FieldDigest {
    let mut acc = BigUint::zero();
    for (i, &b) in bytes.iter().enumerate() {
        acc += BigUint::from(i as u64 + 1) * u32::from(b);
    }
    FieldDigest(acc)
}

/// Digest of the UTF-8 encoding of `s`.
pub fn weighted_digest_str(s: &str) -> FieldDigest {
    weighted_digest(s.as_bytes())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn deterministic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(weighted_digest(&bytes), weighted_digest(&bytes));
        }

        #[test]
        fn matches_u128_reference_sum(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
            let reference: u128 = bytes
                .iter()
                .enumerate()
                .map(|(i, &b)| (i as u128 + 1) * u128::from(b))
                .sum();
            let digest = weighted_digest(&bytes);
            prop_assert_eq!(digest.as_biguint(), &BigUint::from(reference));
        }

        #[test]
        fn appending_adds_weighted_term(
            bytes in prop::collection::vec(any::<u8>(), 0..256),
            tail in any::<u8>(),
        ) {
            let mut extended = bytes.clone();
            extended.push(tail);
            let delta = BigUint::from(extended.len() as u64) * u32::from(tail);
            let extended_digest = weighted_digest(&extended);
            prop_assert_eq!(
                extended_digest.as_biguint(),
                &(weighted_digest(&bytes).as_biguint() + delta)
            );
        }
    }
}
