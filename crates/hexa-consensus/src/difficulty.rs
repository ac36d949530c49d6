//! Per-algorithm difficulty reporting.
//!
//! The tip's `bits` reflects whichever algorithm produced the tip, so a
//! node reporting "the" difficulty would return a different figure every
//! time another algorithm finds a block. The operator-relevant value is
//! the difficulty of the most recent block mined by the *queried*
//! algorithm.

use hexa_core::algo::Algo;
use hexa_core::chain::{ChainEntry, ChainView};
use hexa_core::target::difficulty_from_bits;

/// The most recent block mined by `algo`, scanning back from the tip.
///
/// Mirrors the index walk semantics: when no block of that algorithm
/// exists, the walk terminates at genesis and the genesis entry is
/// returned. `None` only on an empty index.
pub fn last_algo_block(chain: &dyn ChainView, algo: Algo) -> Option<ChainEntry> {
    let tip = chain.tip()?;
    match chain.last_algo_ancestor(&tip, algo) {
        Some(entry) => Some(entry),
        None => chain.at_height(0),
    }
}

/// Floating-point difficulty of `algo`: `max_target / target` of its most
/// recent block. Zero on an empty index.
pub fn algo_difficulty(chain: &dyn ChainView, algo: Algo) -> f64 {
    match last_algo_block(chain, algo) {
        Some(entry) => difficulty_from_bits(entry.bits),
        None => 0.0,
    }
}
