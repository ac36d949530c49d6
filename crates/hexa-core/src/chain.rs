//! Block-index view: per-entry metadata, cumulative chain work (global and
//! per algorithm), and the read-only [`ChainView`] trait consumed by the
//! mining core.
//!
//! The external block index is the source of truth; this module defines the
//! slice of it the mining subsystem reads. [`MemoryChainView`] is an
//! in-memory implementation used by tests and the in-process generator. It
//! maintains a per-algorithm height index so "most recent ancestor mined by
//! algorithm A" resolves by binary search instead of an unbounded back-scan.

use std::collections::HashMap;

use parking_lot::RwLock;
use primitive_types::U256;

use crate::algo::Algo;
use crate::constants::ALGO_COUNT;
use crate::error::ChainError;
use crate::target::work_from_bits;
use crate::types::{BlockHeader, Hash256};

/// Validation progress of an indexed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    /// Fully validated including scripts.
    Valid,
    /// Known and marked invalid.
    Failed,
    /// Indexed but validation has not concluded.
    HeaderOnly,
}

/// One entry of the block index, as seen by the mining core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainEntry {
    /// Block identity hash.
    pub hash: Hash256,
    /// Parent block hash, `None` for genesis.
    pub prev: Option<Hash256>,
    /// Height in the active chain.
    pub height: u64,
    /// Header version (carries the algorithm bits).
    pub version: i32,
    /// Header timestamp.
    pub time: u32,
    /// Compact target the block was mined at.
    pub bits: u32,
    /// Cumulative work of the chain up to and including this block.
    pub chain_work: U256,
    /// Cumulative work contributed by this block's own algorithm up to and
    /// including this block. Non-decreasing along any chain; increases at a
    /// height only when the block there was mined by the same algorithm.
    pub chain_work_algo: U256,
    /// Validation status flags.
    pub status: EntryStatus,
}

impl ChainEntry {
    /// The algorithm encoded in this entry's version field.
    pub fn algo(&self) -> Option<Algo> {
        Algo::from_version(self.version)
    }
}

// ---------------------------------------------------------------------
// Versionbits deployments
// ---------------------------------------------------------------------

/// BIP9 threshold state of a deployment at the current tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentState {
    Defined,
    Started,
    LockedIn,
    Active,
    Failed,
}

/// A soft-fork deployment as exposed to `getblocktemplate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentInfo {
    /// Rule name clients advertise support for.
    pub name: String,
    /// Version bit the deployment signals on.
    pub bit: u8,
    /// Whether the server may apply the rule without client support.
    pub gbt_force: bool,
    /// Threshold state at the tip.
    pub state: DeploymentState,
}

/// Name of the segwit deployment; clients must advertise it.
pub const SEGWIT_RULE: &str = "segwit";

impl DeploymentInfo {
    /// The segwit deployment in a given state. Not forcible: clients must
    /// opt in.
    pub fn segwit(state: DeploymentState) -> Self {
        Self { name: SEGWIT_RULE.to_string(), bit: 1, gbt_force: false, state }
    }

    /// Rule name as reported by `getblocktemplate`: non-force rules are
    /// prefixed with `!`.
    pub fn gbt_name(&self) -> String {
        if self.gbt_force {
            self.name.clone()
        } else {
            format!("!{}", self.name)
        }
    }

    /// Bit mask for the header version.
    pub fn version_mask(&self) -> u32 {
        1 << self.bit
    }
}

// ---------------------------------------------------------------------
// ChainView
// ---------------------------------------------------------------------

/// Read-only view over the external block index.
///
/// All methods are snapshot reads; callers serialize access through the
/// node's chain-state lock. Walks toward genesis are O(depth) in the
/// default implementations and must be treated as unbounded in adversarial
/// scenarios; implementations holding an auxiliary per-algorithm index
/// override [`last_algo_ancestor`](Self::last_algo_ancestor).
pub trait ChainView: Send + Sync {
    /// The active-chain tip, `None` while the index is empty.
    fn tip(&self) -> Option<ChainEntry>;

    /// Entry at a height of the active chain.
    fn at_height(&self, height: u64) -> Option<ChainEntry>;

    /// Entry by block hash, on or off the active chain.
    fn by_hash(&self, hash: &Hash256) -> Option<ChainEntry>;

    /// Height of the tip (0 for an empty or genesis-only index).
    fn height(&self) -> u64 {
        self.tip().map(|e| e.height).unwrap_or(0)
    }

    /// Parent entry, `None` at genesis.
    fn prev_entry(&self, entry: &ChainEntry) -> Option<ChainEntry> {
        entry.prev.and_then(|hash| self.by_hash(&hash))
    }

    /// Most recent ancestor of `from` (inclusive) mined by `algo`.
    fn last_algo_ancestor(&self, from: &ChainEntry, algo: Algo) -> Option<ChainEntry> {
        let mut entry = from.clone();
        loop {
            if entry.algo() == Some(algo) {
                return Some(entry);
            }
            entry = self.prev_entry(&entry)?;
        }
    }

    /// Cumulative chain work contributed by `algo` at `from`.
    ///
    /// Zero when no ancestor was mined by that algorithm. Along any chain
    /// this is non-decreasing, with strict increases exactly at blocks of
    /// the queried algorithm.
    fn work_for_algo(&self, from: &ChainEntry, algo: Algo) -> U256 {
        self.last_algo_ancestor(from, algo)
            .map(|e| e.chain_work_algo)
            .unwrap_or_default()
    }

    /// Median timestamp of the last 11 blocks ending at `entry`.
    fn median_time_past(&self, entry: &ChainEntry) -> u32 {
        let mut times = Vec::with_capacity(11);
        let mut current = Some(entry.clone());
        while let Some(e) = current {
            times.push(e.time);
            if times.len() == 11 {
                break;
            }
            current = self.prev_entry(&e);
        }
        times.sort_unstable();
        times[times.len() / 2]
    }

    /// Soft-fork deployment states at the tip.
    fn deployments(&self) -> Vec<DeploymentInfo> {
        vec![DeploymentInfo::segwit(DeploymentState::Active)]
    }

    /// Flush pending index state so that derived enumerations (the halving
    /// schedule in particular) read deterministically.
    fn flush(&self) -> Result<(), ChainError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------
// MemoryChainView
// ---------------------------------------------------------------------

struct MemoryChainInner {
    entries: HashMap<Hash256, ChainEntry>,
    by_height: Vec<Hash256>,
    /// Heights of blocks per algorithm, ascending.
    algo_heights: [Vec<u64>; ALGO_COUNT],
    deployments: Vec<DeploymentInfo>,
}

/// In-memory single-chain index for tests and local generation.
///
/// Accepts headers in height order only; no fork handling. Cumulative
/// global and per-algorithm work are computed on insert.
pub struct MemoryChainView {
    inner: RwLock<MemoryChainInner>,
}

impl MemoryChainView {
    /// Create an empty index with segwit active.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryChainInner {
                entries: HashMap::new(),
                by_height: Vec::new(),
                algo_heights: Default::default(),
                deployments: vec![DeploymentInfo::segwit(DeploymentState::Active)],
            }),
        }
    }

    /// Replace the deployment set reported to `getblocktemplate`.
    pub fn set_deployments(&self, deployments: Vec<DeploymentInfo>) {
        self.inner.write().deployments = deployments;
    }

    /// Index a header extending the current tip (or genesis on an empty
    /// index), computing its cumulative work fields.
    pub fn connect_header(&self, header: &BlockHeader) -> Result<ChainEntry, ChainError> {
        let hash = header.hash();
        let mut inner = self.inner.write();

        if inner.entries.contains_key(&hash) {
            return Err(ChainError::DuplicateBlock(hash.to_string()));
        }

        let work = work_from_bits(header.bits);
        let (height, prev, parent_work) = if inner.by_height.is_empty() {
            if !header.prev_hash.is_zero() {
                return Err(ChainError::OrphanBlock(header.prev_hash.to_string()));
            }
            (0, None, U256::zero())
        } else {
            let tip_hash = *inner.by_height.last().expect("non-empty index has a tip");
            if header.prev_hash != tip_hash {
                return Err(ChainError::OrphanBlock(header.prev_hash.to_string()));
            }
            let parent = &inner.entries[&tip_hash];
            (parent.height + 1, Some(tip_hash), parent.chain_work)
        };

        let algo = Algo::from_version(header.version);
        let chain_work_algo = match algo {
            Some(algo) => {
                let prev_same = inner.algo_heights[algo as usize]
                    .last()
                    .map(|h| inner.entries[&inner.by_height[*h as usize]].chain_work_algo)
                    .unwrap_or_default();
                prev_same + work
            }
            None => work,
        };

        let entry = ChainEntry {
            hash,
            prev,
            height,
            version: header.version,
            time: header.time,
            bits: header.bits,
            chain_work: parent_work + work,
            chain_work_algo,
            status: EntryStatus::Valid,
        };

        inner.entries.insert(hash, entry.clone());
        inner.by_height.push(hash);
        if let Some(algo) = algo {
            inner.algo_heights[algo as usize].push(height);
        }
        Ok(entry)
    }

    /// Overwrite the validation status of an indexed block.
    pub fn set_status(&self, hash: &Hash256, status: EntryStatus) {
        if let Some(entry) = self.inner.write().entries.get_mut(hash) {
            entry.status = status;
        }
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.inner.read().by_height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_height.is_empty()
    }
}

impl Default for MemoryChainView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainView for MemoryChainView {
    fn tip(&self) -> Option<ChainEntry> {
        let inner = self.inner.read();
        inner.by_height.last().map(|h| inner.entries[h].clone())
    }

    fn at_height(&self, height: u64) -> Option<ChainEntry> {
        let inner = self.inner.read();
        inner
            .by_height
            .get(height as usize)
            .map(|h| inner.entries[h].clone())
    }

    fn by_hash(&self, hash: &Hash256) -> Option<ChainEntry> {
        self.inner.read().entries.get(hash).cloned()
    }

    /// Binary search over the per-algorithm height index instead of the
    /// default linear back-scan.
    fn last_algo_ancestor(&self, from: &ChainEntry, algo: Algo) -> Option<ChainEntry> {
        let inner = self.inner.read();
        let heights = &inner.algo_heights[algo as usize];
        let idx = heights.partition_point(|h| *h <= from.height);
        if idx == 0 {
            return None;
        }
        let hash = inner.by_height[heights[idx - 1] as usize];
        Some(inner.entries[&hash].clone())
    }

    fn deployments(&self) -> Vec<DeploymentInfo> {
        self.inner.read().deployments.clone()
    }
}
