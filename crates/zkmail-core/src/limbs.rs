//! # Limb Encoding for RSA Material
//!
//! The circuit's bignum library represents 2048-bit integers as 120-bit
//! limbs, least significant first, and reduces with a Barrett parameter
//! `redc = floor(2^(2k + 4) / n)` where `k` is the modulus bit length.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Bits per limb.
pub const LIMB_BITS: u64 = 120;

/// Limbs needed to hold a `bits`-bit integer.
pub fn limb_count(bits: u64) -> usize {
    bits.div_ceil(LIMB_BITS).max(1) as usize
}

/// Split `value` into exactly `count` little-endian limbs rendered as
/// `0x`-prefixed hex. Returns `None` if `value` needs more limbs.
pub fn to_limbs(value: &BigUint, count: usize) -> Option<Vec<String>> {
    let mask = (BigUint::one() << LIMB_BITS) - BigUint::one();
    let mut rest = value.clone();
    let mut limbs = Vec::with_capacity(count);
    for _ in 0..count {
        let limb = &rest & &mask;
        limbs.push(format!("0x{}", limb.to_str_radix(16)));
        rest >>= LIMB_BITS;
    }
    rest.is_zero().then_some(limbs)
}

/// Reassemble little-endian `0x`-hex limbs. Returns `None` if a limb is not
/// valid hex or exceeds `LIMB_BITS`.
pub fn from_limbs<S: AsRef<str>>(limbs: &[S]) -> Option<BigUint> {
    let mut value = BigUint::zero();
    for limb in limbs.iter().rev() {
        let digits = limb.as_ref().trim_start_matches("0x");
        let limb = BigUint::parse_bytes(digits.as_bytes(), 16)?;
        if limb.bits() > LIMB_BITS {
            return None;
        }
        value = (value << LIMB_BITS) | limb;
    }
    Some(value)
}

/// Barrett reduction parameter for `modulus`.
pub fn redc_param(modulus: &BigUint) -> BigUint {
    let shift = 2 * modulus.bits() + 4;
    (BigUint::one() << shift) / modulus
}
