//! Core protocol types: block headers, transactions, blocks, templates.
//!
//! All monetary values are in hexels (1 HEXA = 10^8 hexels). Headers follow
//! the bitcoin-family layout; the algorithm of a block is carried in a bit
//! range of the header version (see [`crate::algo`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::algo::Algo;
use crate::constants::WITNESS_SCALE_FACTOR;
use crate::error::PowError;

/// A 32-byte hash value.
///
/// Used for block hashes, transaction ids, and merkle roots (all double
/// SHA-256) as well as PoW hash outputs.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Used for coinbase previous outpoints.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Double SHA-256 over arbitrary bytes.
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash256(second.into())
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Transaction id containing the referenced output.
    pub txid: Hash256,
    /// Index of the output within the transaction.
    pub vout: u32,
}

impl OutPoint {
    /// The null outpoint, used for coinbase transaction inputs.
    pub fn null() -> Self {
        Self {
            txid: Hash256::ZERO,
            vout: u32::MAX,
        }
    }

    /// Check if this is the null outpoint (coinbase marker).
    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == u32::MAX
    }
}

/// A transaction input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    /// The outpoint being spent. Null outpoint for coinbase.
    pub previous_output: OutPoint,
    /// Unlocking script. Carries height and extra-nonce data for coinbase.
    pub script_sig: Vec<u8>,
    /// Sequence number.
    pub sequence: u32,
}

/// A transaction output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Value in hexels.
    pub value: u64,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

/// A transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Compute the transaction id (double SHA-256 of the wire encoding).
    pub fn txid(&self) -> Hash256 {
        sha256d(&crate::encode::encode_tx(self))
    }

    /// Check if this is a coinbase transaction (single input with null
    /// outpoint).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Transaction weight: serialized size times the witness scale factor.
    pub fn weight(&self) -> u64 {
        crate::encode::encode_tx(self).len() as u64 * WITNESS_SCALE_FACTOR
    }
}

/// Block header containing the proof-of-work puzzle.
///
/// Serialized as 80 bytes: version, prev hash, merkle root, time, bits,
/// nonce — all fixed-width little-endian. The PoW hash is computed over
/// exactly those bytes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Signed version word; the high bits carry BIP9 signalling and the
    /// `ALGO_VERSION_MASK` range carries the PoW algorithm id.
    pub version: i32,
    /// Hash of the previous block header.
    pub prev_hash: Hash256,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash256,
    /// Unix timestamp in seconds.
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Block identity hash: double SHA-256 of the 80 serialized bytes.
    ///
    /// This is the hash blocks are indexed by. It is not the PoW hash
    /// except for SHA256D blocks — see [`pow_hash`](Self::pow_hash).
    pub fn hash(&self) -> Hash256 {
        sha256d(&crate::encode::encode_header(self))
    }

    /// Proof-of-work hash under the algorithm encoded in the version.
    pub fn pow_hash(&self) -> Result<Hash256, PowError> {
        crate::pow::pow_hash(self)
    }

    /// The PoW algorithm this header declares, or `None` when the masked
    /// bits fall outside the known set.
    pub fn algo(&self) -> Option<Algo> {
        Algo::from_version(self.version)
    }
}

/// A full block: header plus transactions (coinbase first).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block weight: serialized size times the witness scale factor.
    pub fn weight(&self) -> u64 {
        crate::encode::encode_block(self).len() as u64 * WITNESS_SCALE_FACTOR
    }
}

/// A required payout carried by an assembled template (masternode,
/// superblock, or founder reward), resolved by the external assembler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplatePayout {
    /// Encoded payee address.
    pub payee: String,
    /// Payee scriptPubKey.
    pub script: Vec<u8>,
    /// Required amount in hexels.
    pub amount: u64,
}

/// An assembled, un-mined block template.
///
/// Produced by the external [`BlockAssembler`](crate::traits::BlockAssembler),
/// owned by the node's template cache until superseded.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    /// The assembled block: coinbase plus selected mempool transactions.
    pub block: Block,
    /// Per-transaction fees, coinbase first (negative total of collected
    /// fees, per BIP22 convention).
    pub fees: Vec<i64>,
    /// Per-transaction sigop costs, coinbase first.
    pub sigops: Vec<i64>,
    /// Witness commitment bytes for the coinbase, empty when absent.
    pub witness_commitment: Vec<u8>,
    /// Total coinbase value (subsidy plus fees).
    pub coinbase_value: u64,
    /// Required masternode payout for the next block, if enforced.
    pub masternode: Option<TemplatePayout>,
    /// Required superblock payouts for the next block.
    pub superblock: Vec<TemplatePayout>,
    /// Founder reward requirement, if active at this height.
    pub founder_reward: Option<TemplatePayout>,
}
