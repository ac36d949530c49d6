//! Proof-of-work hash functions.
//!
//! Every algorithm hashes the 80 serialized header bytes
//! `[version .. nonce]` to a 256-bit value. The chained algorithms (NIST5,
//! X11, X16R) run over a fixed table of sixteen digest primitives whose
//! outputs are normalized to 64 bytes; X16R draws its stage order from the
//! low 16 nibbles of the previous-block hash.
//!
//! Compatibility clause: headers whose version does not carry the
//! version-bits prefix predate multi-algo mining and always hash with
//! scrypt, regardless of the algorithm field.

use blake2::{Blake2b512, Blake2s256};
use digest::consts::U64;
use digest::Digest;
use groestl::Groestl512;
use jh::Jh512;
use shabal::Shabal512;
use sha2::{Sha256, Sha384, Sha512, Sha512_256};
use sha3::{Keccak512, Sha3_384, Sha3_512};
use skein::Skein512;
use streebog::Streebog512;
use whirlpool::Whirlpool;

use crate::algo::Algo;
use crate::constants::{VERSIONBITS_TOP_BITS, VERSIONBITS_TOP_MASK};
use crate::encode;
use crate::error::PowError;
use crate::types::{sha256d, BlockHeader, Hash256};

/// Number of digest primitives in the chained-algorithm table.
pub const PRIMITIVE_COUNT: usize = 16;

/// Run one digest and zero-pad its output to 64 bytes.
fn digest64<D: Digest>(data: &[u8]) -> [u8; 64] {
    let out = D::digest(data);
    let mut buf = [0u8; 64];
    buf[..out.len()].copy_from_slice(&out);
    buf
}

/// The primitive table backing NIST5, X11, and X16R.
///
/// Entry order is consensus-critical: X11 chains entries `0..=10` in
/// order, NIST5 chains the five finalist entries `0..=4`, and X16R indexes
/// the full table by seed nibble.
fn primitive_hash(index: usize, data: &[u8]) -> [u8; 64] {
    match index {
        0 => digest64::<Blake2b512>(data),
        1 => digest64::<Groestl512>(data),
        2 => digest64::<Jh512>(data),
        3 => digest64::<Keccak512>(data),
        4 => digest64::<Skein512<U64>>(data),
        5 => digest64::<Sha512>(data),
        6 => digest64::<Sha3_512>(data),
        7 => digest64::<Whirlpool>(data),
        8 => digest64::<Shabal512>(data),
        9 => digest64::<Streebog512>(data),
        10 => digest64::<Sha384>(data),
        11 => digest64::<Sha3_384>(data),
        12 => digest64::<Blake2s256>(data),
        13 => digest64::<Sha512_256>(data),
        14 => digest64::<Sha256>(data),
        15 => {
            let mut buf = [0u8; 64];
            let mut hasher = blake3::Hasher::new();
            hasher.update(data);
            hasher.finalize_xof().fill(&mut buf);
            buf
        }
        _ => unreachable!("primitive index out of range"),
    }
}

/// Chain `data` through the primitives named by `order`, truncating the
/// final 64-byte state to 256 bits.
fn chained_hash(data: &[u8], order: &[usize]) -> Hash256 {
    debug_assert!(!order.is_empty());
    let mut state = primitive_hash(order[0], data);
    for &index in &order[1..] {
        state = primitive_hash(index, &state);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&state[..32]);
    Hash256(out)
}

/// scrypt with the classic PoW parameters (N=1024, r=1, p=1), the input
/// serving as both password and salt.
pub fn scrypt_hash(data: &[u8]) -> Hash256 {
    let params =
        scrypt::Params::new(10, 1, 1, 32).expect("static scrypt parameters are valid");
    let mut out = [0u8; 32];
    scrypt::scrypt(data, data, &params, &mut out)
        .expect("32-byte scrypt output length is valid");
    Hash256(out)
}

/// Five-stage chain over the SHA-3 finalist primitives.
pub fn nist5(data: &[u8]) -> Hash256 {
    chained_hash(data, &[0, 1, 2, 3, 4])
}

/// Memory-hard hash: Blake2s pre-hash keyed into Argon2d (1 MiB, t=1, p=1).
pub fn lyra2z(data: &[u8]) -> Hash256 {
    let pre: [u8; 32] = Blake2s256::digest(data).into();
    let params = argon2::Params::new(1024, 1, 1, Some(32))
        .expect("static argon2 parameters are valid");
    let hasher = argon2::Argon2::new(argon2::Algorithm::Argon2d, argon2::Version::V0x13, params);
    let mut out = [0u8; 32];
    hasher
        .hash_password_into(&pre, &pre[..16], &mut out)
        .expect("fixed-length argon2 inputs are valid");
    Hash256(out)
}

/// Fixed eleven-stage chain over table entries `0..=10`.
pub fn x11(data: &[u8]) -> Hash256 {
    chained_hash(data, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10])
}

/// Sixteen-stage chain whose order is drawn from the low 16 nibbles of
/// `seed` (the previous-block hash), high nibble first.
pub fn x16r(data: &[u8], seed: &Hash256) -> Hash256 {
    let mut order = [0usize; PRIMITIVE_COUNT];
    for (i, slot) in order.iter_mut().enumerate() {
        let byte = seed.0[24 + i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        *slot = nibble as usize;
    }
    chained_hash(data, &order)
}

/// Uniform per-algorithm hash entry point: hash `data` under `algo`.
///
/// `seed` is consumed only by X16R (the previous-block hash driving its
/// stage order); other algorithms ignore it.
pub fn algo_hash(algo: Algo, data: &[u8], seed: &Hash256) -> Hash256 {
    match algo {
        Algo::Sha256d => sha256d(data),
        Algo::Scrypt => scrypt_hash(data),
        Algo::Nist5 => nist5(data),
        Algo::Lyra2z => lyra2z(data),
        Algo::X11 => x11(data),
        Algo::X16r => x16r(data, seed),
    }
}

/// Compute the PoW hash of a header under the algorithm its version
/// declares.
///
/// Fails with [`PowError::UnknownAlgorithm`] only when a version-bits
/// header carries an identifier outside the closed set; valid headers
/// never reach that path.
pub fn pow_hash(header: &BlockHeader) -> Result<Hash256, PowError> {
    let bytes = encode::encode_header(header);

    if (header.version as u32) & VERSIONBITS_TOP_MASK != VERSIONBITS_TOP_BITS {
        return Ok(scrypt_hash(&bytes));
    }

    let algo = Algo::from_version(header.version)
        .ok_or(PowError::UnknownAlgorithm(header.version as u32))?;
    Ok(algo_hash(algo, &bytes, &header.prev_hash))
}
