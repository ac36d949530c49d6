//! Block subsidy policy.
//!
//! The epoch's maximum block subsidy is scaled by the mining algorithm's
//! cost factor (cheap-to-mine algorithms earn less, expensive ones more)
//! and any dynamic rewards boost of the epoch, then capped at the epoch
//! maximum. Blocks without a recognized algorithm (pre-multi-algo
//! headers) earn the unscaled maximum.

use hexa_core::algo::Algo;

/// Subsidy of a block mined by `algo` inside an epoch with the given
/// maximum subsidy and boost factor.
pub fn block_subsidy(algo: Option<Algo>, max_block_subsidy: u64, boost_factor: f64) -> u64 {
    let factor = algo.map(|a| a.cost_factor()).unwrap_or(1.0);
    let boosted = max_block_subsidy as f64 * factor * (1.0 + boost_factor.max(0.0));
    (boosted as u64).min(max_block_subsidy)
}
