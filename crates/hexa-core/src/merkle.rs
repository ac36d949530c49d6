//! Double SHA-256 Merkle tree for transaction commitment.
//!
//! Bitcoin-family construction: leaves are transaction ids, internal nodes
//! are `SHA256D(left || right)`, odd-length layers duplicate their last
//! element. Empty trees produce [`Hash256::ZERO`].

use crate::types::{sha256d, Hash256};

/// Compute an internal node hash: `SHA256D(left || right)`.
pub fn node_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_bytes());
    buf[32..].copy_from_slice(right.as_bytes());
    sha256d(&buf)
}

/// Compute the Merkle root from a slice of transaction ids.
///
/// Returns [`Hash256::ZERO`] for an empty slice; a single-element slice
/// is its own root.
pub fn merkle_root(txids: &[Hash256]) -> Hash256 {
    if txids.is_empty() {
        return Hash256::ZERO;
    }

    let mut current: Vec<Hash256> = txids.to_vec();
    while current.len() > 1 {
        current = next_layer(&current);
    }
    current[0]
}

/// Pair adjacent hashes, duplicating the last element of odd layers.
fn next_layer(layer: &[Hash256]) -> Vec<Hash256> {
    let mut next = Vec::with_capacity(layer.len().div_ceil(2));
    let mut i = 0;
    while i < layer.len() {
        let left = &layer[i];
        let right = if i + 1 < layer.len() { &layer[i + 1] } else { left };
        next.push(node_hash(left, right));
        i += 2;
    }
    next
}
