//! Long polling for `getblocktemplate`.
//!
//! Blocks the caller until the best block moves away from the watched tip
//! or, failing that, until the mempool has seen updates — checked after a
//! minute, then every ten seconds. The chain-state lock is released for
//! the whole wait and re-acquired before returning: the guard is consumed
//! by value and a fresh one handed back, so the release is visible in the
//! signature rather than buried in the body.

use std::time::{Duration, Instant};

use parking_lot::MutexGuard;
use tracing::debug;

use hexa_core::types::Hash256;

use crate::context::{MiningContext, MiningState};

/// Initial condvar deadline before the first mempool recheck.
const FIRST_CHECK: Duration = Duration::from_secs(60);

/// Deadline increments for subsequent mempool rechecks.
const RECHECK_EVERY: Duration = Duration::from_secs(10);

/// Why a long poll returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LongPollReason {
    /// The best block no longer matches the watched hash.
    TipChanged,
    /// The mempool revision moved past the watched one.
    MempoolUpdated,
    /// Node shutdown was requested while waiting.
    Shutdown,
}

/// Wait until the chain tip leaves `watched_tip`, the mempool leaves
/// `watched_rev`, or shutdown is requested.
///
/// Consumes the chain-state guard (releasing the lock for the wait) and
/// returns a re-acquired guard together with the wake reason.
pub fn wait_for_update<'a>(
    ctx: &'a MiningContext,
    state: MutexGuard<'a, MiningState>,
    watched_tip: Hash256,
    watched_rev: u64,
) -> (MutexGuard<'a, MiningState>, LongPollReason) {
    wait_for_update_with(ctx, state, watched_tip, watched_rev, FIRST_CHECK, RECHECK_EVERY)
}

/// [`wait_for_update`] with injectable cadence, for tests.
pub fn wait_for_update_with<'a>(
    ctx: &'a MiningContext,
    state: MutexGuard<'a, MiningState>,
    watched_tip: Hash256,
    watched_rev: u64,
    first_check: Duration,
    recheck_every: Duration,
) -> (MutexGuard<'a, MiningState>, LongPollReason) {
    // Release the chain-state lock while waiting.
    drop(state);

    let reason = {
        let mut best = ctx.best_block.lock();
        let mut check_at = Instant::now() + first_check;
        loop {
            if ctx.shutdown_requested() {
                break LongPollReason::Shutdown;
            }
            if *best != watched_tip {
                break LongPollReason::TipChanged;
            }
            if ctx
                .best_block_cv
                .wait_until(&mut best, check_at)
                .timed_out()
            {
                // Timeout: check transactions for update.
                if ctx.services().mempool.transactions_updated() != watched_rev {
                    break LongPollReason::MempoolUpdated;
                }
                check_at += recheck_every;
            }
        }
    };

    debug!(?reason, "long poll woke");
    (ctx.lock_state(), reason)
}
