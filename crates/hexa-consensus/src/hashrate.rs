//! Network hash-rate estimation.
//!
//! Estimates hashes per second for one algorithm over a trailing window of
//! blocks: the per-algorithm work accumulated across the window divided by
//! the span between the earliest and latest block timestamps seen.

use hexa_core::algo::Algo;
use hexa_core::chain::ChainView;
use hexa_core::constants::DIFFICULTY_ADJUSTMENT_INTERVAL;
use hexa_core::target::u256_to_f64;

use crate::chainwork::algo_work_delta;

/// Estimate the network hash rate for `algo`.
///
/// `lookup` is the window size in blocks; non-positive means "since the
/// last difficulty change" (`height % interval + 1`). `height` picks the
/// window's upper endpoint; negative (or at/above the tip) means the tip
/// itself. Returns 0 when the window has no time span (all timestamps
/// equal) or the upper endpoint is genesis.
pub fn network_hash_ps(chain: &dyn ChainView, lookup: i64, height: i64, algo: Algo) -> f64 {
    let tip = match chain.tip() {
        Some(tip) => tip,
        None => return 0.0,
    };

    let upper = if height >= 0 && (height as u64) < tip.height {
        match chain.at_height(height as u64) {
            Some(entry) => entry,
            None => return 0.0,
        }
    } else {
        tip
    };

    if upper.height == 0 {
        return 0.0;
    }

    let mut lookup = if lookup <= 0 {
        (upper.height % DIFFICULTY_ADJUSTMENT_INTERVAL) + 1
    } else {
        lookup as u64
    };
    if lookup > upper.height {
        lookup = upper.height;
    }

    // Walk back `lookup` steps tracking the window's time extremes. The
    // upper endpoint's own timestamp participates.
    let mut lower = upper.clone();
    let mut min_time = lower.time as i64;
    let mut max_time = min_time;
    for _ in 0..lookup {
        lower = match chain.prev_entry(&lower) {
            Some(entry) => entry,
            None => return 0.0,
        };
        let time = lower.time as i64;
        min_time = min_time.min(time);
        max_time = max_time.max(time);
    }

    if min_time == max_time {
        return 0.0;
    }

    let work_diff = algo_work_delta(chain, &upper, &lower, algo);
    u256_to_f64(work_diff) / (max_time - min_time) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexa_core::chain::MemoryChainView;
    use hexa_core::constants::VERSIONBITS_TOP_BITS;
    use hexa_core::target::work_from_bits;
    use hexa_core::types::{BlockHeader, Hash256};

    const EASY_BITS: u32 = 0x207fffff;
    const SPACING: u32 = 120;

    /// Chain with fixed spacing; `algos[i]` mines height i.
    fn build_chain(algos: &[Algo]) -> MemoryChainView {
        build_chain_spaced(algos, SPACING)
    }

    fn build_chain_spaced(algos: &[Algo], spacing: u32) -> MemoryChainView {
        let chain = MemoryChainView::new();
        let mut prev = Hash256::ZERO;
        for (i, algo) in algos.iter().enumerate() {
            let header = BlockHeader {
                version: (VERSIONBITS_TOP_BITS | algo.version_bits()) as i32,
                prev_hash: prev,
                merkle_root: Hash256::ZERO,
                time: 100_000 + i as u32 * spacing,
                bits: EASY_BITS,
                nonce: i as u32,
            };
            prev = chain.connect_header(&header).unwrap().hash;
        }
        chain
    }

    // ------------------------------------------------------------------
    // Degenerate windows
    // ------------------------------------------------------------------

    #[test]
    fn empty_chain_rate_is_zero() {
        let chain = MemoryChainView::new();
        assert_eq!(network_hash_ps(&chain, 120, -1, Algo::Sha256d), 0.0);
    }

    #[test]
    fn genesis_only_rate_is_zero() {
        let chain = build_chain(&[Algo::Sha256d]);
        assert_eq!(network_hash_ps(&chain, 120, -1, Algo::Sha256d), 0.0);
    }

    #[test]
    fn zero_time_span_rate_is_zero() {
        let chain = build_chain_spaced(&[Algo::Sha256d; 5], 0);
        assert_eq!(network_hash_ps(&chain, 4, -1, Algo::Sha256d), 0.0);
    }

    // ------------------------------------------------------------------
    // Basic estimates
    // ------------------------------------------------------------------

    #[test]
    fn single_algo_full_window() {
        let chain = build_chain(&[Algo::Scrypt; 11]);
        // Window of 10 intervals: per-algo work = 10 blocks, span = 10 * 120 s.
        let per_block = u256_to_f64(work_from_bits(EASY_BITS));
        let expected = per_block * 10.0 / (10.0 * SPACING as f64);
        let got = network_hash_ps(&chain, 10, -1, Algo::Scrypt);
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    #[test]
    fn mixed_algos_use_per_algo_work_not_global() {
        // 121 blocks; only heights 40, 80, 120 are lyra2z.
        let mut algos = vec![Algo::Sha256d; 121];
        for h in [40usize, 80, 120] {
            algos[h] = Algo::Lyra2z;
        }
        let chain = build_chain(&algos);

        let per_block = u256_to_f64(work_from_bits(EASY_BITS));
        let span = 120.0 * SPACING as f64;
        // Ancestor endpoints: tip side resolves to height 120, lower side
        // (height 0) has no lyra2z ancestor, so the delta is 3 blocks.
        let expected = per_block * 3.0 / span;
        let got = network_hash_ps(&chain, 120, -1, Algo::Lyra2z);
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");

        // The global-work figure would be ~40x higher; make sure we did
        // not accidentally report it.
        let global = per_block * 120.0 / span;
        assert!(got < global / 10.0);
    }

    #[test]
    fn unmined_algo_rate_is_zero() {
        let chain = build_chain(&[Algo::Sha256d; 20]);
        assert_eq!(network_hash_ps(&chain, 10, -1, Algo::X16r), 0.0);
    }

    // ------------------------------------------------------------------
    // Window resolution
    // ------------------------------------------------------------------

    #[test]
    fn lookup_clamped_to_chain_length() {
        let chain = build_chain(&[Algo::Scrypt; 6]);
        // Asking for 1000 blocks on a 6-block chain clamps to height 5.
        let per_block = u256_to_f64(work_from_bits(EASY_BITS));
        let expected = per_block * 5.0 / (5.0 * SPACING as f64);
        let got = network_hash_ps(&chain, 1000, -1, Algo::Scrypt);
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn nonpositive_lookup_uses_retarget_window() {
        // height 5: window = 5 % 2016 + 1 = 6 > height, clamped to 5.
        let chain = build_chain(&[Algo::Scrypt; 6]);
        let explicit = network_hash_ps(&chain, 5, -1, Algo::Scrypt);
        let derived = network_hash_ps(&chain, -1, -1, Algo::Scrypt);
        assert_eq!(explicit, derived);
    }

    #[test]
    fn historical_height_estimates_at_that_point() {
        let chain = build_chain(&[Algo::Scrypt; 21]);
        let at_10 = network_hash_ps(&chain, 5, 10, Algo::Scrypt);
        let at_tip = network_hash_ps(&chain, 5, -1, Algo::Scrypt);
        // Constant difficulty and spacing: same rate at both points.
        assert!((at_10 - at_tip).abs() < 1e-9);
        assert!(at_10 > 0.0);
    }

    #[test]
    fn height_at_or_above_tip_means_tip() {
        let chain = build_chain(&[Algo::Scrypt; 10]);
        let tip_rate = network_hash_ps(&chain, 5, -1, Algo::Scrypt);
        assert_eq!(network_hash_ps(&chain, 5, 9, Algo::Scrypt), tip_rate);
        assert_eq!(network_hash_ps(&chain, 5, 500, Algo::Scrypt), tip_rate);
    }

    #[test]
    fn estimates_are_nonnegative() {
        let chain = build_chain(&[
            Algo::Sha256d,
            Algo::X11,
            Algo::Scrypt,
            Algo::X11,
            Algo::Nist5,
            Algo::X16r,
        ]);
        for algo in Algo::ALL {
            assert!(network_hash_ps(&chain, 5, -1, algo) >= 0.0, "{algo}");
        }
    }
}
