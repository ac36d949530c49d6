//! Per-algorithm chain-work deltas.
//!
//! Because only a subset of blocks in any window belong to a given
//! algorithm, work over a window must be measured on the per-algorithm
//! cumulative chain work, never on the global one.

use primitive_types::U256;

use hexa_core::algo::Algo;
use hexa_core::chain::{ChainEntry, ChainView};

/// Per-algorithm work accumulated between `lower` and `upper` (both
/// resolved to their most recent ancestor mined by `algo`).
///
/// Saturates to zero when `lower` is not an ancestor-side endpoint, rather
/// than underflowing.
pub fn algo_work_delta(
    chain: &dyn ChainView,
    upper: &ChainEntry,
    lower: &ChainEntry,
    algo: Algo,
) -> U256 {
    let hi = chain.work_for_algo(upper, algo);
    let lo = chain.work_for_algo(lower, algo);
    hi.saturating_sub(lo)
}
