//! Compact difficulty targets and chain work.
//!
//! `bits` is the bitcoin-family compact encoding: one exponent byte and a
//! 23-bit mantissa (bit 23 is the sign, unused by valid targets). Work per
//! block is `~target / (target + 1) + 1`, the expected number of hashes to
//! find a value at or below the target.

use primitive_types::U256;

use crate::types::Hash256;

/// Expand compact `bits` into a 256-bit target.
///
/// Returns the target and an overflow flag; an overflowed or negative
/// encoding yields a target no hash can satisfy.
pub fn decode_compact(bits: u32) -> (U256, bool) {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;
    let negative = bits & 0x0080_0000 != 0 && mantissa != 0;

    let target = if exponent <= 3 {
        U256::from(mantissa >> (8 * (3 - exponent)))
    } else {
        U256::from(mantissa) << (8 * (exponent - 3) as usize)
    };

    let overflow = mantissa != 0
        && (exponent > 34
            || (mantissa > 0xff && exponent > 33)
            || (mantissa > 0xffff && exponent > 32));

    (target, negative || overflow)
}

/// Compress a target into compact `bits` (canonical encoding).
pub fn encode_compact(target: U256) -> u32 {
    let mut size = (target.bits() as u32 + 7) / 8;
    let mut compact = if size <= 3 {
        (target.low_u64() as u32) << (8 * (3 - size))
    } else {
        let shifted = target >> (8 * (size - 3) as usize);
        shifted.low_u64() as u32
    };

    // The mantissa sign bit must stay clear; borrow an exponent byte.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | (size << 24)
}

/// Interpret a PoW hash as a little-endian 256-bit integer.
pub fn hash_to_u256(hash: &Hash256) -> U256 {
    U256::from_little_endian(&hash.0)
}

/// Whether a PoW hash satisfies the compact target.
pub fn meets_target(hash: &Hash256, bits: u32) -> bool {
    let (target, invalid) = decode_compact(bits);
    if invalid || target.is_zero() {
        return false;
    }
    hash_to_u256(hash) <= target
}

/// Expected work contributed by one block at the given compact target:
/// `~target / (target + 1) + 1`.
pub fn work_from_bits(bits: u32) -> U256 {
    let (target, invalid) = decode_compact(bits);
    if invalid || target.is_zero() {
        return U256::zero();
    }
    let denom = match target.checked_add(U256::one()) {
        Some(d) => d,
        None => return U256::zero(),
    };
    (!target / denom) + U256::one()
}

/// Canonical floating-point difficulty: `max_target / target`, where the
/// maximum target is difficulty-1 (`0x1d00ffff`).
pub fn difficulty_from_bits(bits: u32) -> f64 {
    let mantissa = bits & 0x00ff_ffff;
    if mantissa == 0 {
        return 0.0;
    }
    let mut shift = (bits >> 24) & 0xff;
    let mut diff = 0x0000_ffff as f64 / mantissa as f64;
    while shift < 29 {
        diff *= 256.0;
        shift += 1;
    }
    while shift > 29 {
        diff /= 256.0;
        shift -= 1;
    }
    diff
}

/// Lossy conversion of a 256-bit work value to `f64` (for rate reporting).
pub fn u256_to_f64(value: U256) -> f64 {
    let mut out = 0.0;
    for (i, limb) in value.0.iter().enumerate() {
        out += *limb as f64 * 2f64.powi(64 * i as i32);
    }
    out
}
