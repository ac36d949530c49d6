//! Block template production and the single-slot template cache.
//!
//! `getblocktemplate` serves templates out of one cached slot keyed on
//! (tip, algorithm, mempool revision, age). The slot is cleared *before*
//! the external assembler runs, so a failed rebuild leaves the cache
//! empty and concurrent misses serialize through a single rebuild. The
//! returned template always carries a refreshed `time` (median-time-past
//! plus one, or the wall clock if later) and a zeroed nonce.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hexa_core::algo::Algo;
use hexa_core::chain::{ChainEntry, DeploymentState, EntryStatus, SEGWIT_RULE};
use hexa_core::constants::{
    COINBASE_FLAGS, MASTERNODE_PAYMENTS_START_BLOCK, MAX_BLOCK_SERIALIZED_SIZE,
    MAX_BLOCK_SIGOPS_COST, MAX_BLOCK_WEIGHT, SUPERBLOCK_START_BLOCK, TEMPLATE_STALENESS_SECS,
    WITNESS_SCALE_FACTOR,
};
use hexa_core::encode;
use hexa_core::error::AssembleError;
use hexa_core::target::decode_compact;
use hexa_core::traits::ValidationState;
use hexa_core::types::{Block, BlockTemplate, Hash256, TemplatePayout};

use crate::context::{MiningContext, MiningState};
use crate::longpoll;

/// Placeholder coinbase script templates are assembled with (OP_TRUE);
/// external miners replace the coinbase entirely.
pub const DUMMY_COINBASE_SCRIPT: &[u8] = &[0x51];

/// The cached template and its key components.
pub struct CachedTemplate {
    /// Tip the template builds on.
    pub tip: Hash256,
    /// Algorithm the template was assembled for.
    pub algo: Algo,
    /// Mempool revision at creation.
    pub txns_updated: u64,
    /// Wall-clock creation time (seconds).
    pub created: u64,
    /// The assembled template.
    pub template: BlockTemplate,
}

/// The single template slot guarded by the chain-state lock.
pub type TemplateSlot = Option<CachedTemplate>;

/// Parsed `template_request` argument (BIP22/23).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub rules: Option<Vec<String>>,
    #[serde(default)]
    pub longpollid: Option<serde_json::Value>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub maxversion: Option<i64>,
}

/// Failures of the template path. RPC maps each variant to its
/// bitcoin-family error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template_request")]
    MissingTemplateRequest,
    #[error("Invalid mode")]
    InvalidMode,
    #[error("Missing data String key for proposal")]
    MissingProposalData,
    #[error("Block decode failed")]
    BlockDecodeFailed,
    #[error("Invalid longpollid")]
    InvalidLongPollId,
    #[error("Unknown algorithm {0}")]
    UnknownAlgorithm(String),
    #[error("Error: Peer-to-peer functionality missing or disabled")]
    P2pDisabled,
    #[error("Hexa is not connected!")]
    NotConnected,
    #[error("Hexa is downloading blocks...")]
    InitialDownload,
    #[error("Hexa is syncing masternode winners...")]
    MasternodeSyncing,
    #[error("getblocktemplate must be called with the segwit rule set (call with {{\"rules\": [\"segwit\"]}})")]
    SegwitRuleMissing,
    #[error("Support for '{0}' rule requires explicit client support")]
    UnsupportedRule(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Block assembly failed: {0}")]
    AssemblyFailed(String),
    #[error("Shutting down")]
    ShuttingDown,
    #[error("{0}")]
    Verify(String),
}

/// One non-coinbase transaction of a template result.
#[derive(Debug, Clone, Serialize)]
pub struct GbtTransaction {
    pub data: String,
    pub txid: String,
    pub hash: String,
    pub depends: Vec<usize>,
    pub fee: i64,
    pub sigops: i64,
    pub weight: u64,
}

/// A required payout entry (masternode / superblock).
#[derive(Debug, Clone, Serialize)]
pub struct GbtPayout {
    pub payee: String,
    pub script: String,
    pub amount: u64,
}

/// Founder reward requirement.
#[derive(Debug, Clone, Serialize)]
pub struct GbtFounderReward {
    pub founderpayee: String,
    pub amount: u64,
}

/// The `getblocktemplate` result object (BIP22/23/9/145 plus the
/// masternode, superblock, and founder-reward extensions).
#[derive(Debug, Clone, Serialize)]
pub struct GbtResult {
    pub capabilities: Vec<String>,
    pub version: i32,
    pub rules: Vec<String>,
    pub vbavailable: BTreeMap<String, u8>,
    pub vbrequired: u32,
    pub previousblockhash: String,
    pub transactions: Vec<GbtTransaction>,
    pub coinbaseaux: BTreeMap<String, String>,
    pub coinbasevalue: u64,
    pub longpollid: String,
    pub target: String,
    pub mintime: u64,
    pub mutable: Vec<String>,
    pub noncerange: String,
    pub sigoplimit: u64,
    pub sizelimit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weightlimit: Option<u64>,
    pub curtime: u64,
    pub bits: String,
    pub height: u64,
    pub masternode: serde_json::Value,
    pub masternode_payments_started: bool,
    pub masternode_payments_enforced: bool,
    pub superblock: Vec<GbtPayout>,
    pub superblocks_started: bool,
    pub superblocks_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founderreward: Option<GbtFounderReward>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_witness_commitment: Option<String>,
}

/// Successful `getblocktemplate` outcomes.
#[derive(Debug)]
pub enum GbtResponse {
    /// A template object.
    Template(Box<GbtResult>),
    /// A BIP23 proposal verdict: `None` for accepted, otherwise the
    /// rejection reason or duplicate class.
    ProposalResult(Option<String>),
}

impl GbtResponse {
    /// The JSON value the RPC returns.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            GbtResponse::Template(result) => {
                serde_json::to_value(*result).unwrap_or(serde_json::Value::Null)
            }
            GbtResponse::ProposalResult(None) => serde_json::Value::Null,
            GbtResponse::ProposalResult(Some(reason)) => serde_json::Value::String(reason),
        }
    }
}

/// Serve `getblocktemplate`.
///
/// Holds the chain-state lock throughout, except across the long-poll
/// wait (released and re-acquired by [`longpoll::wait_for_update`]).
pub fn get_block_template(
    ctx: &MiningContext,
    request: Option<TemplateRequest>,
    algo_name: Option<&str>,
    rpc_backcompatible: bool,
    default_algo: Algo,
) -> Result<GbtResponse, TemplateError> {
    let mut state = ctx.lock_state();

    let mut mode = String::from("template");
    let mut client_rules: BTreeSet<String> = BTreeSet::new();
    let mut max_version_pre_vb: i64 = -1;
    let mut longpollid: Option<serde_json::Value> = None;

    match &request {
        None if !rpc_backcompatible => return Err(TemplateError::MissingTemplateRequest),
        None => {
            // Old clients: assume {"rules": ["segwit"]}.
            client_rules.insert(SEGWIT_RULE.to_string());
        }
        Some(req) => {
            if let Some(m) = &req.mode {
                mode = m.clone();
            }
            longpollid = req.longpollid.clone();

            if mode == "proposal" {
                let data = req.data.as_ref().ok_or(TemplateError::MissingProposalData)?;
                let block = encode::decode_hex_block(data)
                    .map_err(|_| TemplateError::BlockDecodeFailed)?;
                return propose_block(ctx, &block).map(GbtResponse::ProposalResult);
            }

            if let Some(rules) = &req.rules {
                client_rules.extend(rules.iter().cloned());
            } else if let Some(maxversion) = req.maxversion {
                // Only read when the client does not speak versionbits.
                max_version_pre_vb = maxversion;
            }
        }
    }

    if mode != "template" {
        return Err(TemplateError::InvalidMode);
    }

    let services = ctx.services();
    if !services.network.p2p_enabled() {
        return Err(TemplateError::P2pDisabled);
    }
    if services.network.peer_count() == 0 {
        return Err(TemplateError::NotConnected);
    }
    if services.network.is_initial_block_download() {
        return Err(TemplateError::InitialDownload);
    }

    let algo = match algo_name {
        Some(name) => Algo::from_name(name)
            .ok_or_else(|| TemplateError::UnknownAlgorithm(name.to_string()))?,
        None => default_algo,
    };

    // When payment enforcement is on, a template without the winners list
    // would produce blocks the network orphans.
    if services.network.masternode_payments_enforced()
        && !services.network.masternode_sync_complete()
    {
        return Err(TemplateError::MasternodeSyncing);
    }

    if let Some(lpval) = longpollid {
        let (watched_tip, watched_rev) = parse_longpollid(ctx, &state, &lpval)?;
        let (reacquired, _reason) = longpoll::wait_for_update(ctx, state, watched_tip, watched_rev);
        state = reacquired;
        if ctx.shutdown_requested() {
            return Err(TemplateError::ShuttingDown);
        }
    }

    // GBT must be called with the segwit rule set.
    if !client_rules.contains(SEGWIT_RULE) {
        if rpc_backcompatible {
            client_rules.insert(SEGWIT_RULE.to_string());
        } else {
            return Err(TemplateError::SegwitRuleMissing);
        }
    }

    let tip = services.chain.tip().ok_or(TemplateError::InitialDownload)?;
    refresh_cache(ctx, &mut state, &tip, algo)?;
    build_result(ctx, &mut state, &tip, &client_rules, max_version_pre_vb)
}

/// Validate the cache key and rebuild through the external assembler on a
/// miss.
fn refresh_cache(
    ctx: &MiningContext,
    state: &mut MiningState,
    tip: &ChainEntry,
    algo: Algo,
) -> Result<(), TemplateError> {
    let now = ctx.now();
    let mempool_rev = ctx.services().mempool.transactions_updated();

    let fresh = match &state.template {
        Some(cached) => {
            cached.tip == tip.hash
                && cached.algo == algo
                && (mempool_rev == cached.txns_updated
                    || now.saturating_sub(cached.created) < TEMPLATE_STALENESS_SECS)
        }
        None => false,
    };
    if fresh {
        return Ok(());
    }

    // Clear the slot before assembling so future calls rebuild despite any
    // failure from here on.
    state.template = None;
    debug!(%algo, height = tip.height + 1, "rebuilding block template");

    let template = ctx
        .services()
        .assembler
        .assemble(DUMMY_COINBASE_SCRIPT, algo)
        .map_err(|e| match e {
            AssembleError::OutOfMemory => TemplateError::OutOfMemory,
            AssembleError::Internal(reason) => TemplateError::AssemblyFailed(reason),
        })?;

    state.last_txns_updated = mempool_rev;
    state.last_block_weight = Some(template.block.weight());
    state.last_block_tx_count = Some(template.block.transactions.len());
    state.template = Some(CachedTemplate {
        tip: tip.hash,
        algo,
        txns_updated: mempool_rev,
        created: now,
        template,
    });
    Ok(())
}

fn payout_json(payout: &TemplatePayout) -> GbtPayout {
    GbtPayout {
        payee: payout.payee.clone(),
        script: hex::encode(&payout.script),
        amount: payout.amount,
    }
}

/// Render the cached template into the GBT result object, negotiating
/// versionbits rules with the client.
fn build_result(
    ctx: &MiningContext,
    state: &mut MiningState,
    tip: &ChainEntry,
    client_rules: &BTreeSet<String>,
    max_version_pre_vb: i64,
) -> Result<GbtResponse, TemplateError> {
    let services = ctx.services();
    let mtp = services.chain.median_time_past(tip);
    let now = ctx.now() as u32;
    let last_txns_updated = state.last_txns_updated;

    let cached = state.template.as_mut().expect("cache refreshed before rendering");
    cached.template.block.header.time = (mtp.saturating_add(1)).max(now);
    cached.template.block.header.nonce = 0;
    let template = &cached.template;
    let header = &template.block.header;

    let deployments = services.chain.deployments();
    let pre_segwit = !deployments
        .iter()
        .any(|d| d.name == SEGWIT_RULE && d.state == DeploymentState::Active);

    let mut version = header.version as u32;
    let mut rules = Vec::new();
    let mut vbavailable = BTreeMap::new();
    for dep in &deployments {
        match dep.state {
            DeploymentState::Defined | DeploymentState::Failed => {
                // Not exposed to GBT at all.
            }
            DeploymentState::LockedIn | DeploymentState::Started => {
                if dep.state == DeploymentState::LockedIn {
                    version |= dep.version_mask();
                }
                vbavailable.insert(dep.gbt_name(), dep.bit);
                if !client_rules.contains(&dep.name) && !dep.gbt_force {
                    // Client can't use the bit; don't signal it for them.
                    version &= !dep.version_mask();
                }
            }
            DeploymentState::Active => {
                rules.push(dep.gbt_name());
                if !client_rules.contains(&dep.name) && !dep.gbt_force {
                    return Err(TemplateError::UnsupportedRule(dep.name.clone()));
                }
            }
        }
    }

    let mut tx_index: HashMap<Hash256, usize> = HashMap::new();
    let mut transactions = Vec::with_capacity(template.block.transactions.len());
    for (i, tx) in template.block.transactions.iter().enumerate() {
        let txid = tx.txid();
        tx_index.insert(txid, i);
        if tx.is_coinbase() {
            continue;
        }
        let depends = tx
            .inputs
            .iter()
            .filter_map(|input| tx_index.get(&input.previous_output.txid).copied())
            .collect();
        let mut sigops = template.sigops.get(i).copied().unwrap_or(0);
        if pre_segwit {
            assert_eq!(
                sigops % WITNESS_SCALE_FACTOR as i64,
                0,
                "sigop cost must scale down cleanly pre-segwit"
            );
            sigops /= WITNESS_SCALE_FACTOR as i64;
        }
        transactions.push(GbtTransaction {
            data: hex::encode(encode::encode_tx(tx)),
            txid: txid.to_string(),
            hash: txid.to_string(),
            depends,
            fee: template.fees.get(i).copied().unwrap_or(0),
            sigops,
            weight: tx.weight(),
        });
    }

    let (target, _) = decode_compact(header.bits);
    let mut target_bytes = [0u8; 32];
    target.to_big_endian(&mut target_bytes);

    let mut mutable = vec![
        "time".to_string(),
        "transactions".to_string(),
        "prevblock".to_string(),
    ];
    if max_version_pre_vb >= 2 {
        // Pre-BIP9 clients may rewrite the version downward.
        mutable.push("version/force".to_string());
    }

    let mut sigop_limit = MAX_BLOCK_SIGOPS_COST;
    let mut size_limit = MAX_BLOCK_SERIALIZED_SIZE;
    if pre_segwit {
        assert_eq!(sigop_limit % WITNESS_SCALE_FACTOR, 0);
        sigop_limit /= WITNESS_SCALE_FACTOR;
        assert_eq!(size_limit % WITNESS_SCALE_FACTOR, 0);
        size_limit /= WITNESS_SCALE_FACTOR;
    }

    let masternode = match &template.masternode {
        Some(payout) => serde_json::json!({
            "payee": payout.payee,
            "script": hex::encode(&payout.script),
            "amount": payout.amount,
        }),
        None => serde_json::json!({}),
    };

    let result = GbtResult {
        capabilities: vec!["proposal".to_string()],
        version: version as i32,
        rules,
        vbavailable,
        vbrequired: 0,
        previousblockhash: header.prev_hash.to_string(),
        transactions,
        coinbaseaux: BTreeMap::from([("flags".to_string(), hex::encode(COINBASE_FLAGS))]),
        coinbasevalue: template.coinbase_value,
        longpollid: format!("{}{}", tip.hash, last_txns_updated),
        target: hex::encode(target_bytes),
        mintime: mtp as u64 + 1,
        mutable,
        noncerange: "00000000ffffffff".to_string(),
        sigoplimit: sigop_limit,
        sizelimit: size_limit,
        weightlimit: (!pre_segwit).then_some(MAX_BLOCK_WEIGHT),
        curtime: header.time as u64,
        bits: format!("{:08x}", header.bits),
        height: tip.height + 1,
        masternode,
        masternode_payments_started: tip.height + 1 > MASTERNODE_PAYMENTS_START_BLOCK,
        masternode_payments_enforced: services.network.masternode_payments_enforced(),
        superblock: template.superblock.iter().map(payout_json).collect(),
        superblocks_started: tip.height + 1 > SUPERBLOCK_START_BLOCK,
        superblocks_enabled: services.network.superblocks_enabled(),
        founderreward: template.founder_reward.as_ref().map(|p| GbtFounderReward {
            founderpayee: p.payee.clone(),
            amount: p.amount,
        }),
        default_witness_commitment: (!template.witness_commitment.is_empty())
            .then(|| hex::encode(&template.witness_commitment)),
    };
    Ok(GbtResponse::Template(Box::new(result)))
}

/// Handle a BIP23 block proposal: dedupe against the index, require the
/// current tip as parent, then consult the external validator.
fn propose_block(ctx: &MiningContext, block: &Block) -> Result<Option<String>, TemplateError> {
    let services = ctx.services();
    let hash = block.header.hash();

    if let Some(entry) = services.chain.by_hash(&hash) {
        let verdict = match entry.status {
            EntryStatus::Valid => "duplicate",
            EntryStatus::Failed => "duplicate-invalid",
            EntryStatus::HeaderOnly => "duplicate-inconclusive",
        };
        return Ok(Some(verdict.to_string()));
    }

    let tip = services.chain.tip().ok_or(TemplateError::InitialDownload)?;
    // Validity testing only supports blocks built on the current tip.
    if block.header.prev_hash != tip.hash {
        return Ok(Some("inconclusive-not-best-prevblk".to_string()));
    }

    match services.validator.test_block_validity(block) {
        ValidationState::Valid => Ok(None),
        ValidationState::Invalid { reason } if reason.is_empty() => Ok(Some("rejected".into())),
        ValidationState::Invalid { reason } => Ok(Some(reason)),
        ValidationState::Error { reason } => Err(TemplateError::Verify(reason)),
    }
}

fn parse_longpollid(
    ctx: &MiningContext,
    state: &MiningState,
    value: &serde_json::Value,
) -> Result<(Hash256, u64), TemplateError> {
    if let Some(s) = value.as_str() {
        // Format: <tip hash hex><mempool revision>
        if s.len() < 64 {
            return Err(TemplateError::InvalidLongPollId);
        }
        let hash = Hash256::from_hex(&s[..64]).ok_or(TemplateError::InvalidLongPollId)?;
        let rev = s[64..].parse().unwrap_or(0);
        Ok((hash, rev))
    } else {
        // Non-string longpollid: watch the current state. The BIPs leave
        // this unspecified; accepting it simplifies testing.
        let tip = ctx.services().chain.tip().map(|e| e.hash).unwrap_or_default();
        Ok((tip, state.last_txns_updated))
    }
}
