//! Protocol constants. All monetary values in hexels (1 HEXA = 10^8 hexels).

pub const COIN: u64 = 100_000_000;

/// Target spacing between blocks, in seconds.
pub const BLOCK_TIME_SECS: u64 = 120;

/// Retarget period used when `getnetworkhashps` is asked for "blocks since
/// the last difficulty change" (`nblocks <= 0`).
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;

// ---------------------------------------------------------------------
// Header version encoding
// ---------------------------------------------------------------------

/// Mask selecting the BIP9 version-bits signalling prefix.
pub const VERSIONBITS_TOP_MASK: u32 = 0xE000_0000;

/// Expected prefix for version-bits headers. Headers whose version does not
/// carry this prefix predate multi-algo mining and hash with scrypt.
pub const VERSIONBITS_TOP_BITS: u32 = 0x2000_0000;

/// Bit range inside the header version that carries the PoW algorithm id.
pub const ALGO_VERSION_MASK: u32 = 0x0000_0700;

// ---------------------------------------------------------------------
// Block limits (weight units per BIP141)
// ---------------------------------------------------------------------

pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;
pub const MAX_BLOCK_SERIALIZED_SIZE: u64 = 4_000_000;
pub const MAX_BLOCK_SIGOPS_COST: u64 = 80_000;
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Nonce range scanned per template by the in-process generator before the
/// coinbase extra-nonce is bumped and the template rebuilt.
pub const INNER_NONCE_RANGE: u32 = 0x10000;

// ---------------------------------------------------------------------
// Halving schedule
// ---------------------------------------------------------------------

/// Minimum released/target supply ratio an epoch must reach for the next
/// epoch to halve the subsidy.
pub const HALVING_MIN_SUPPLY_TARGET: f64 = 0.5;

/// Below this released/target ratio a new epoch may carry a dynamic
/// rewards boost (when one is configured).
pub const HALVING_MIN_BOOST_SUPPLY_TARGET: f64 = 0.25;

/// Interval of the first numbered epoch. Doubles on every successful
/// halving.
pub const INITIAL_HALVING_INTERVAL: u64 = 50_000;

/// Maximum block subsidy of the first numbered epoch.
pub const INITIAL_MAX_BLOCK_SUBSIDY: u64 = 50 * COIN;

/// Named bootstrap epochs: (name, start block, end block, max subsidy).
/// These precede the halving machine proper: they never increment the
/// halving counter and their supply does not carry into halving accounting.
pub const NAMED_EPOCHS: &[(&str, u64, u64, u64)] = &[
    ("COINSWAP", 1, 10_000, 100 * COIN),
    ("BOOTSTRAP", 10_001, 25_000, 50 * COIN),
    ("ALPHA", 25_001, 50_000, 50 * COIN),
];

// ---------------------------------------------------------------------
// Reward weighting
// ---------------------------------------------------------------------

/// Sum of the raw per-algorithm cost factors. The per-algo factor is
/// divided by `COST_FACTOR_TOTAL / ALGO_COUNT` so the mean factor is 1.
pub const COST_FACTOR_TOTAL: f64 = 18.25;

/// Number of supported PoW algorithms.
pub const ALGO_COUNT: usize = 6;

// ---------------------------------------------------------------------
// Payout schedules
// ---------------------------------------------------------------------

/// First height at which masternode payments are paid.
pub const MASTERNODE_PAYMENTS_START_BLOCK: u64 = 1_000;

/// First height at which superblock payouts may occur.
pub const SUPERBLOCK_START_BLOCK: u64 = 10_000;

// ---------------------------------------------------------------------
// RPC behaviour
// ---------------------------------------------------------------------

/// Default for the `rpc_backcompatible` option: accept `getblocktemplate`
/// without a template request and auto-insert the segwit rule.
pub const DEFAULT_RPC_BACK_COMPATIBLE: bool = true;

/// Seconds a cached template stays fresh across mempool updates.
pub const TEMPLATE_STALENESS_SECS: u64 = 5;

/// Bytes placed in the coinbase scriptSig by templates we assemble.
pub const COINBASE_FLAGS: &[u8] = b"/hexa/";
