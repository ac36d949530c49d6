//! Trait interfaces to the node subsystems the mining core consumes.
//!
//! The mining coordination core does not implement the mempool, block
//! assembly, or block validation; it drives them through these seams:
//! - [`MempoolView`] — revision counter and pool statistics
//! - [`BlockAssembler`] — template construction (hexa-node caches results)
//! - [`BlockValidator`] — full-block and header validation
//! - [`NetworkStatus`] — connectivity and sync state for RPC gating
//! - [`AddressResolver`] — address to scriptPubKey construction

use crate::algo::Algo;
use crate::chain::ChainEntry;
use crate::error::AssembleError;
use crate::types::{Block, BlockHeader, BlockTemplate, Hash256};

/// Outcome reported by the validator for one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationState {
    /// Block passed validation.
    Valid,
    /// Block rejected; `reason` is the consensus rejection string.
    Invalid { reason: String },
    /// Validation aborted with a system error (not a consensus verdict).
    Error { reason: String },
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid)
    }
}

/// Result of handing a block to the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Whether the block was accepted into the index.
    pub accepted: bool,
    /// Whether the block was new to this node.
    pub new_block: bool,
}

/// Read access to the transaction mempool.
pub trait MempoolView: Send + Sync {
    /// Monotone counter bumped on every mempool mutation. Template and
    /// long-poll staleness are keyed on it.
    fn transactions_updated(&self) -> u64;

    /// Number of transactions currently pooled.
    fn size(&self) -> usize;

    /// Adjust the priority of a transaction for block inclusion by an
    /// absolute fee delta in hexels.
    fn prioritise(&self, txid: &Hash256, fee_delta: i64);
}

/// Assembles block templates on top of the current tip.
pub trait BlockAssembler: Send + Sync {
    /// Build a fresh template paying `coinbase_script`, mined with `algo`.
    ///
    /// The returned template builds on the tip at call time; the caller
    /// holds the chain-state lock across the call.
    fn assemble(&self, coinbase_script: &[u8], algo: Algo)
        -> Result<BlockTemplate, AssembleError>;

    /// Rewrite the coinbase scriptSig with a new extra-nonce (and refresh
    /// the merkle root) so repeated mining attempts search distinct spaces.
    fn increment_extra_nonce(&self, block: &mut Block, extra_nonce: u32);
}

/// Full validation entry points.
///
/// Implementations deliver per-block verdicts through the mining context's
/// validation-observer registry during `process_new_block`, mirroring how
/// the node's validation interface announces `BlockChecked`.
pub trait BlockValidator: Send + Sync {
    /// Validate and (on success) connect a complete block.
    fn process_new_block(&self, block: &Block, force: bool) -> ProcessOutcome;

    /// Validate and index a batch of headers.
    fn process_new_block_headers(&self, headers: &[BlockHeader]) -> ValidationState;

    /// Check a proposed block against the current tip without connecting
    /// it. Only supports blocks building on the tip.
    fn test_block_validity(&self, block: &Block) -> ValidationState;

    /// Refresh uncommitted structures (witness commitment) of a block whose
    /// parent is known.
    fn update_uncommitted(&self, block: &mut Block, prev: &ChainEntry);
}

/// Node-level connectivity and sync state, used to gate mining RPCs.
pub trait NetworkStatus: Send + Sync {
    /// Number of connected peers.
    fn peer_count(&self) -> usize;

    /// Whether the node is still syncing headers/blocks.
    fn is_initial_block_download(&self) -> bool;

    /// Whether P2P functionality is available at all.
    fn p2p_enabled(&self) -> bool {
        true
    }

    /// Network name (main, test, regtest).
    fn chain_name(&self) -> String;

    /// Status-bar warnings surfaced by `getmininginfo`.
    fn warnings(&self) -> String {
        String::new()
    }

    /// Whether masternode payment enforcement is active.
    fn masternode_payments_enforced(&self) -> bool {
        false
    }

    /// Whether the masternode winners list is synced far enough to build
    /// payable templates.
    fn masternode_sync_complete(&self) -> bool {
        true
    }

    /// Whether superblock payments are enabled.
    fn superblocks_enabled(&self) -> bool {
        false
    }
}

/// Address decoding, owned by the wallet/script layer.
pub trait AddressResolver: Send + Sync {
    /// The scriptPubKey paying to `address`, or `None` when the address
    /// does not parse for this network.
    fn script_for_address(&self, address: &str) -> Option<Vec<u8>>;
}
