//! Per-algorithm mining statistics over trailing windows.
//!
//! Backs `getminingstats`: block counts and average rewards per algorithm
//! over the last 24 hours and 7 days of blocks (window sizes derived from
//! the target block spacing).

use hexa_core::algo::Algo;
use hexa_core::chain::{ChainEntry, ChainView};
use hexa_core::constants::BLOCK_TIME_SECS;

use crate::difficulty::last_algo_block;

/// Blocks expected per 24 hours at target spacing.
pub const BLOCKS_24H: u64 = 24 * 3600 / BLOCK_TIME_SECS;

/// Blocks expected per 7 days at target spacing.
pub const BLOCKS_7D: u64 = 7 * BLOCKS_24H;

/// Number of blocks mined by `algo` among the last `window` blocks.
///
/// Walks back from the tip; genesis is never counted.
pub fn count_algo_blocks(chain: &dyn ChainView, algo: Algo, window: u64) -> u64 {
    let mut count = 0;
    let mut remaining = window;
    let mut entry = chain.tip();
    while remaining > 0 {
        let Some(current) = entry else { break };
        let Some(prev) = chain.prev_entry(&current) else { break };
        if current.algo() == Some(algo) {
            count += 1;
        }
        entry = Some(prev);
        remaining -= 1;
    }
    count
}

/// Sum of rewards of blocks mined by `algo` among the last `window`
/// blocks, with `reward` resolving each block's payout.
pub fn sum_algo_rewards(
    chain: &dyn ChainView,
    algo: Algo,
    window: u64,
    reward: &dyn Fn(&ChainEntry) -> u64,
) -> u64 {
    let mut total = 0u64;
    let mut remaining = window;
    let mut entry = chain.tip();
    while remaining > 0 {
        let Some(current) = entry else { break };
        let Some(prev) = chain.prev_entry(&current) else { break };
        if current.algo() == Some(algo) {
            total = total.saturating_add(reward(&current));
        }
        entry = Some(prev);
        remaining -= 1;
    }
    total
}

/// Statistics for one algorithm, as reported by `getminingstats`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgoMiningStats {
    pub algo: Algo,
    /// Reward of the most recent block mined by the algorithm.
    pub last_block_reward: u64,
    /// Average per-block reward over the 24-hour window (0 if no blocks).
    pub avg_block_reward_24h: u64,
    /// Average per-block reward over the 7-day window (0 if no blocks).
    pub avg_block_reward_7d: u64,
    pub total_blocks_24h: u64,
    pub total_blocks_7d: u64,
}

/// Compute statistics for every supported algorithm.
pub fn mining_stats(
    chain: &dyn ChainView,
    reward: &dyn Fn(&ChainEntry) -> u64,
) -> Vec<AlgoMiningStats> {
    Algo::ALL
        .iter()
        .map(|&algo| {
            let last_block_reward = last_algo_block(chain, algo)
                .map(|entry| reward(&entry))
                .unwrap_or(0);
            let total_blocks_24h = count_algo_blocks(chain, algo, BLOCKS_24H);
            let total_blocks_7d = count_algo_blocks(chain, algo, BLOCKS_7D);
            let avg_block_reward_24h = if total_blocks_24h > 0 {
                sum_algo_rewards(chain, algo, BLOCKS_24H, reward) / total_blocks_24h
            } else {
                0
            };
            let avg_block_reward_7d = if total_blocks_7d > 0 {
                sum_algo_rewards(chain, algo, BLOCKS_7D, reward) / total_blocks_7d
            } else {
                0
            };
            AlgoMiningStats {
                algo,
                last_block_reward,
                avg_block_reward_24h,
                avg_block_reward_7d,
                total_blocks_24h,
                total_blocks_7d,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexa_core::chain::MemoryChainView;
    use hexa_core::constants::{COIN, VERSIONBITS_TOP_BITS};
    use hexa_core::types::{BlockHeader, Hash256};

    fn build_chain(algos: &[Algo]) -> MemoryChainView {
        let chain = MemoryChainView::new();
        let mut prev = Hash256::ZERO;
        for (i, algo) in algos.iter().enumerate() {
            let header = BlockHeader {
                version: (VERSIONBITS_TOP_BITS | algo.version_bits()) as i32,
                prev_hash: prev,
                merkle_root: Hash256::ZERO,
                time: 1_000 + i as u32,
                bits: 0x207fffff,
                nonce: i as u32,
            };
            prev = chain.connect_header(&header).unwrap().hash;
        }
        chain
    }

    /// Reward model for tests: 10 coins, except 20 for x11 blocks.
    fn reward(entry: &ChainEntry) -> u64 {
        if entry.algo() == Some(Algo::X11) {
            20 * COIN
        } else {
            10 * COIN
        }
    }

    #[test]
    fn window_counts_exclude_genesis() {
        let chain = build_chain(&[Algo::Scrypt, Algo::Scrypt, Algo::Scrypt]);
        // Genesis is scrypt too, but only heights 1 and 2 count.
        assert_eq!(count_algo_blocks(&chain, Algo::Scrypt, 100), 2);
    }

    #[test]
    fn window_limits_the_scan() {
        let chain = build_chain(&[Algo::X11; 10]);
        assert_eq!(count_algo_blocks(&chain, Algo::X11, 4), 4);
    }

    #[test]
    fn counts_are_per_algo() {
        let chain = build_chain(&[
            Algo::Sha256d,
            Algo::X11,
            Algo::Scrypt,
            Algo::X11,
            Algo::Nist5,
        ]);
        assert_eq!(count_algo_blocks(&chain, Algo::X11, 100), 2);
        assert_eq!(count_algo_blocks(&chain, Algo::Scrypt, 100), 1);
        assert_eq!(count_algo_blocks(&chain, Algo::X16r, 100), 0);
    }

    #[test]
    fn reward_sums_apply_reward_model() {
        let chain = build_chain(&[
            Algo::Sha256d,
            Algo::X11,
            Algo::X11,
            Algo::Scrypt,
        ]);
        assert_eq!(
            sum_algo_rewards(&chain, Algo::X11, 100, &reward),
            40 * COIN
        );
        assert_eq!(
            sum_algo_rewards(&chain, Algo::Scrypt, 100, &reward),
            10 * COIN
        );
    }

    #[test]
    fn stats_cover_all_algorithms() {
        let chain = build_chain(&[Algo::Sha256d, Algo::X11, Algo::Scrypt]);
        let stats = mining_stats(&chain, &reward);
        assert_eq!(stats.len(), Algo::ALL.len());
        for (stat, algo) in stats.iter().zip(Algo::ALL) {
            assert_eq!(stat.algo, algo);
        }
    }

    #[test]
    fn averages_divide_by_block_count() {
        let chain = build_chain(&[Algo::Sha256d, Algo::X11, Algo::X11, Algo::Sha256d]);
        let stats = mining_stats(&chain, &reward);
        let x11 = &stats[Algo::X11 as usize];
        assert_eq!(x11.total_blocks_24h, 2);
        assert_eq!(x11.avg_block_reward_24h, 20 * COIN);
        assert_eq!(x11.avg_block_reward_7d, 20 * COIN);
    }

    #[test]
    fn unmined_algo_reports_zero_counts_and_genesis_reward() {
        let chain = build_chain(&[Algo::Sha256d, Algo::Sha256d]);
        let stats = mining_stats(&chain, &reward);
        let lyra = &stats[Algo::Lyra2z as usize];
        assert_eq!(lyra.total_blocks_24h, 0);
        assert_eq!(lyra.avg_block_reward_24h, 0);
        // last_algo_block falls back to genesis, so the genesis reward is
        // reported, matching the index-walk semantics.
        assert_eq!(lyra.last_block_reward, 10 * COIN);
    }

    #[test]
    fn window_constants_follow_spacing() {
        assert_eq!(BLOCKS_24H, 24 * 3600 / BLOCK_TIME_SECS);
        assert_eq!(BLOCKS_7D, 7 * BLOCKS_24H);
        assert_eq!(BLOCKS_24H, 720);
    }
}
