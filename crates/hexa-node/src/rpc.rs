//! Mining JSON-RPC server.
//!
//! Uses jsonrpsee 0.24 to expose the bitcoin-family mining interface:
//! template production (`getblocktemplate`), block/header submission,
//! local generation, and the multi-algo information calls. Error codes
//! mirror the codes used across the wider cryptocurrency ecosystem.

use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use hexa_consensus::difficulty::{algo_difficulty, last_algo_block};
use hexa_consensus::halving::{HalvingConfig, HalvingSchedule};
use hexa_consensus::hashrate::network_hash_ps;
use hexa_consensus::stats::mining_stats;
use hexa_consensus::subsidy::block_subsidy;
use hexa_core::algo::Algo;
use hexa_core::constants::COIN;
use hexa_core::types::Hash256;

use crate::config::NodeConfig;
use crate::context::MiningContext;
use crate::generator::{generate_blocks, GeneratorError, ScriptReservation};
use crate::submit::{submit_block, submit_header, SubmitError};
use crate::template::{get_block_template, TemplateError, TemplateRequest};

/// Standard RPC error codes.
pub mod codes {
    pub const MISC_ERROR: i32 = -1;
    pub const TYPE_ERROR: i32 = -3;
    pub const INVALID_ADDRESS_OR_KEY: i32 = -5;
    pub const OUT_OF_MEMORY: i32 = -7;
    pub const INVALID_PARAMETER: i32 = -8;
    pub const CLIENT_NOT_CONNECTED: i32 = -9;
    pub const CLIENT_IN_INITIAL_DOWNLOAD: i32 = -10;
    pub const DESERIALIZATION_ERROR: i32 = -22;
    pub const VERIFY_ERROR: i32 = -25;
    pub const CLIENT_P2P_DISABLED: i32 = -31;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Create a JSON-RPC error.
fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Amounts are reported in whole coins, mirroring `ValueFromAmount`.
fn coins(amount: u64) -> f64 {
    amount as f64 / COIN as f64
}

fn map_template_error(e: TemplateError) -> ErrorObjectOwned {
    use TemplateError::*;
    let code = match &e {
        MissingTemplateRequest | InvalidMode | InvalidLongPollId | UnknownAlgorithm(_)
        | SegwitRuleMissing | UnsupportedRule(_) => codes::INVALID_PARAMETER,
        MissingProposalData => codes::TYPE_ERROR,
        BlockDecodeFailed => codes::DESERIALIZATION_ERROR,
        P2pDisabled => codes::CLIENT_P2P_DISABLED,
        NotConnected | ShuttingDown => codes::CLIENT_NOT_CONNECTED,
        InitialDownload | MasternodeSyncing => codes::CLIENT_IN_INITIAL_DOWNLOAD,
        OutOfMemory => codes::OUT_OF_MEMORY,
        AssemblyFailed(_) => codes::INTERNAL_ERROR,
        Verify(_) => codes::VERIFY_ERROR,
    };
    rpc_error(code, &e.to_string())
}

fn map_submit_error(e: SubmitError) -> ErrorObjectOwned {
    match &e {
        SubmitError::Deserialization(msg) => rpc_error(codes::DESERIALIZATION_ERROR, msg),
        SubmitError::Verify(msg) => rpc_error(codes::VERIFY_ERROR, msg),
    }
}

/// Resolve an optional algorithm-name argument against the configured
/// default, rejecting unknown names.
fn resolve_algo(name: &Option<String>, default_algo: Algo) -> Result<Algo, ErrorObjectOwned> {
    match name.as_deref() {
        None | Some("") => Ok(default_algo),
        Some(name) => Algo::from_name(name).ok_or_else(|| {
            rpc_error(codes::INVALID_PARAMETER, &format!("Unknown algorithm {name}"))
        }),
    }
}

/// `getmininginfo` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningInfoJson {
    /// The current block height.
    pub blocks: u64,
    /// Weight of the last assembled block, when one was ever assembled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currentblockweight: Option<u64>,
    /// Transaction count of the last assembled block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currentblocktx: Option<usize>,
    /// Difficulty of the selected algorithm.
    pub difficulty: f64,
    /// The selected algorithm name.
    pub algo: String,
    /// Estimated network hashes per second for the selected algorithm.
    pub networkhashps: f64,
    /// Mempool size.
    pub pooledtx: usize,
    /// Network name.
    pub chain: String,
    /// Status-bar warnings.
    pub warnings: String,
}

/// One epoch of the `gethalvinginfo` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalvingEpochJson {
    pub epoch_name: String,
    pub started_by_halving: bool,
    pub start_block: u64,
    pub end_block: u64,
    pub max_block_reward: f64,
    /// `"+{pct}%"` when a boost is active, `false` otherwise.
    pub dynamic_rewards_boost: serde_json::Value,
    pub start_supply: f64,
    /// Coins at the epoch's last block, `false` while the epoch is active.
    pub end_supply: serde_json::Value,
    pub supply_target: f64,
    pub supply_this_epoch: f64,
    pub supply_since_halving: f64,
    /// Floored percentage string, e.g. `"60%"`.
    pub supply_target_reached: String,
}

/// `gethalvinginfo` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalvingInfoJson {
    pub halvings_occured: u32,
    pub epochs_occured: usize,
    pub halving_interval: u64,
    pub blocks_to_next_epoch: u64,
    pub epoch_supply_target_reached: String,
    pub min_epoch_supply_to_halve: String,
    pub epochs: Vec<HalvingEpochJson>,
}

/// One entry of the `getmultialgoinfo` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiAlgoInfoJson {
    pub algo: String,
    pub difficulty: f64,
    pub hashrate: f64,
    pub last_block_index: u64,
}

/// One entry of the `getminingstats` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningStatsJson {
    pub algo: String,
    pub last_block_reward: f64,
    pub avg_block_reward_24h: f64,
    pub avg_block_reward_7d: f64,
    pub total_blocks_24h: u64,
    pub total_blocks_7d: u64,
}

/// The mining JSON-RPC interface.
#[rpc(server)]
pub trait MiningRpc {
    /// Estimated network hashes per second over the last `nblocks` blocks
    /// (`-1`: since the last difficulty change), optionally at a
    /// historical height, for the given algorithm.
    #[method(name = "getnetworkhashps")]
    async fn get_network_hash_ps(
        &self,
        nblocks: Option<i64>,
        height: Option<i64>,
        algorithm: Option<String>,
    ) -> Result<f64, ErrorObjectOwned>;

    /// Mining-related information for one algorithm.
    #[method(name = "getmininginfo")]
    async fn get_mining_info(
        &self,
        algorithm: Option<String>,
    ) -> Result<MiningInfoJson, ErrorObjectOwned>;

    /// Block-reward halving epochs and supply-target accounting.
    #[method(name = "gethalvinginfo")]
    async fn get_halving_info(&self) -> Result<HalvingInfoJson, ErrorObjectOwned>;

    /// Difficulty, hash rate, and last block per algorithm.
    #[method(name = "getmultialgoinfo")]
    async fn get_multi_algo_info(&self) -> Result<Vec<MultiAlgoInfoJson>, ErrorObjectOwned>;

    /// Per-algorithm block counts and average rewards over 24h/7d.
    #[method(name = "getminingstats")]
    async fn get_mining_stats(&self) -> Result<Vec<MiningStatsJson>, ErrorObjectOwned>;

    /// Adjust a transaction's block-inclusion priority by an absolute fee
    /// delta (in hexels).
    #[method(name = "prioritisetransaction")]
    async fn prioritise_transaction(
        &self,
        txid: String,
        dummy: Option<f64>,
        fee_delta: i64,
    ) -> Result<bool, ErrorObjectOwned>;

    /// BIP22/23 block template (or proposal verdict).
    #[method(name = "getblocktemplate")]
    async fn get_block_template(
        &self,
        template_request: Option<TemplateRequest>,
        algorithm: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned>;

    /// Submit a serialized block. Returns null on acceptance, otherwise a
    /// duplicate class or rejection reason.
    #[method(name = "submitblock")]
    async fn submit_block(
        &self,
        hexdata: String,
        dummy: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned>;

    /// Submit a serialized header as a candidate chain tip. Throws when
    /// the header is invalid.
    #[method(name = "submitheader")]
    async fn submit_header(&self, hexdata: String) -> Result<(), ErrorObjectOwned>;

    /// Mine blocks immediately to an address (before returning).
    #[method(name = "generatetoaddress")]
    async fn generate_to_address(
        &self,
        nblocks: u64,
        address: String,
        maxtries: Option<u64>,
    ) -> Result<Vec<String>, ErrorObjectOwned>;
}

/// Implementation of the mining RPC server.
pub struct RpcServerImpl {
    ctx: Arc<MiningContext>,
    config: NodeConfig,
}

impl RpcServerImpl {
    pub fn new(ctx: Arc<MiningContext>, config: NodeConfig) -> Self {
        Self { ctx, config }
    }

    /// Reward of an indexed block under the derived halving schedule.
    fn entry_reward(schedule: &HalvingSchedule, entry: &hexa_core::chain::ChainEntry) -> u64 {
        schedule
            .epoch_at(entry.height)
            .map(|epoch| block_subsidy(entry.algo(), epoch.max_block_subsidy, epoch.boost_factor))
            .unwrap_or(0)
    }
}

#[async_trait]
impl MiningRpcServer for RpcServerImpl {
    async fn get_network_hash_ps(
        &self,
        nblocks: Option<i64>,
        height: Option<i64>,
        algorithm: Option<String>,
    ) -> Result<f64, ErrorObjectOwned> {
        let algo = resolve_algo(&algorithm, self.config.mining_algo)?;
        let _state = self.ctx.lock_state();
        Ok(network_hash_ps(
            &*self.ctx.services().chain,
            nblocks.unwrap_or(120),
            height.unwrap_or(-1),
            algo,
        ))
    }

    async fn get_mining_info(
        &self,
        algorithm: Option<String>,
    ) -> Result<MiningInfoJson, ErrorObjectOwned> {
        let algo = resolve_algo(&algorithm, self.config.mining_algo)?;
        let services = self.ctx.services();
        let state = self.ctx.lock_state();
        let chain = &*services.chain;
        Ok(MiningInfoJson {
            blocks: chain.height(),
            currentblockweight: state.last_block_weight,
            currentblocktx: state.last_block_tx_count,
            difficulty: algo_difficulty(chain, algo),
            algo: algo.name().to_string(),
            networkhashps: network_hash_ps(chain, 120, -1, algo),
            pooledtx: services.mempool.size(),
            chain: services.network.chain_name(),
            warnings: services.network.warnings(),
        })
    }

    async fn get_halving_info(&self) -> Result<HalvingInfoJson, ErrorObjectOwned> {
        let services = self.ctx.services();
        // The schedule is derived from the index; flush pending state so
        // the enumeration reads deterministically.
        services
            .chain
            .flush()
            .map_err(|e| rpc_error(codes::INTERNAL_ERROR, &e.to_string()))?;

        let _state = self.ctx.lock_state();
        let schedule = HalvingSchedule::derive(&*services.chain, HalvingConfig::default());
        let reports = schedule.report();
        let tip_height = services.chain.height();

        let epochs: Vec<HalvingEpochJson> = reports
            .iter()
            .map(|report| HalvingEpochJson {
                epoch_name: report.name.clone(),
                started_by_halving: report.started_by_halving,
                start_block: report.start_block,
                end_block: report.end_block,
                max_block_reward: coins(report.max_block_subsidy),
                dynamic_rewards_boost: if report.boost_factor > 0.0 {
                    serde_json::Value::String(format!(
                        "+{}%",
                        (report.boost_factor * 100.0) as i64
                    ))
                } else {
                    serde_json::Value::Bool(false)
                },
                start_supply: coins(report.start_supply),
                end_supply: match report.end_supply {
                    Some(supply) => serde_json::json!(coins(supply)),
                    None => serde_json::Value::Bool(false),
                },
                supply_target: coins(report.supply_target),
                supply_this_epoch: coins(report.supply_this_epoch),
                supply_since_halving: coins(report.supply_since_halving),
                supply_target_reached: format!("{}%", report.supply_target_reached_pct),
            })
            .collect();

        let last = reports.last();
        Ok(HalvingInfoJson {
            halvings_occured: schedule.halving_count(),
            epochs_occured: reports.len(),
            halving_interval: schedule.halving_interval(),
            blocks_to_next_epoch: last
                .map(|r| r.end_block.saturating_sub(tip_height))
                .unwrap_or(0),
            epoch_supply_target_reached: format!(
                "{}%",
                last.map(|r| r.supply_target_reached_pct).unwrap_or(0)
            ),
            min_epoch_supply_to_halve: format!(
                "{}%",
                (schedule.config().min_supply_target * 100.0) as i64
            ),
            epochs,
        })
    }

    async fn get_multi_algo_info(&self) -> Result<Vec<MultiAlgoInfoJson>, ErrorObjectOwned> {
        let _state = self.ctx.lock_state();
        let chain = &*self.ctx.services().chain;
        Ok(Algo::ALL
            .iter()
            .map(|&algo| MultiAlgoInfoJson {
                algo: algo.name().to_string(),
                difficulty: algo_difficulty(chain, algo),
                hashrate: network_hash_ps(chain, 120, -1, algo),
                last_block_index: last_algo_block(chain, algo).map(|e| e.height).unwrap_or(0),
            })
            .collect())
    }

    async fn get_mining_stats(&self) -> Result<Vec<MiningStatsJson>, ErrorObjectOwned> {
        let services = self.ctx.services();
        let _state = self.ctx.lock_state();
        let chain = &*services.chain;
        let schedule = HalvingSchedule::derive(chain, HalvingConfig::default());
        let reward = |entry: &hexa_core::chain::ChainEntry| Self::entry_reward(&schedule, entry);
        Ok(mining_stats(chain, &reward)
            .into_iter()
            .map(|stat| MiningStatsJson {
                algo: stat.algo.name().to_string(),
                last_block_reward: coins(stat.last_block_reward),
                avg_block_reward_24h: coins(stat.avg_block_reward_24h),
                avg_block_reward_7d: coins(stat.avg_block_reward_7d),
                total_blocks_24h: stat.total_blocks_24h,
                total_blocks_7d: stat.total_blocks_7d,
            })
            .collect())
    }

    async fn prioritise_transaction(
        &self,
        txid: String,
        dummy: Option<f64>,
        fee_delta: i64,
    ) -> Result<bool, ErrorObjectOwned> {
        let hash = Hash256::from_hex(&txid).ok_or_else(|| {
            rpc_error(codes::INVALID_PARAMETER, "txid must be of length 64 (hexadecimal)")
        })?;
        if dummy.is_some_and(|d| d != 0.0) {
            return Err(rpc_error(
                codes::INVALID_PARAMETER,
                "Priority is no longer supported, dummy argument to prioritisetransaction must be 0.",
            ));
        }
        let _state = self.ctx.lock_state();
        self.ctx.services().mempool.prioritise(&hash, fee_delta);
        Ok(true)
    }

    async fn get_block_template(
        &self,
        template_request: Option<TemplateRequest>,
        algorithm: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        let ctx = Arc::clone(&self.ctx);
        let backcompatible = self.config.rpc_backcompatible;
        let default_algo = self.config.mining_algo;
        // Long polls park the calling thread; keep them off the runtime.
        let response = tokio::task::spawn_blocking(move || {
            get_block_template(
                &ctx,
                template_request,
                algorithm.as_deref(),
                backcompatible,
                default_algo,
            )
        })
        .await
        .map_err(|e| rpc_error(codes::INTERNAL_ERROR, &e.to_string()))?
        .map_err(map_template_error)?;
        Ok(response.into_json())
    }

    async fn submit_block(
        &self,
        hexdata: String,
        _dummy: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        let ctx = Arc::clone(&self.ctx);
        let result = tokio::task::spawn_blocking(move || submit_block(&ctx, &hexdata))
            .await
            .map_err(|e| rpc_error(codes::INTERNAL_ERROR, &e.to_string()))?
            .map_err(map_submit_error)?;
        Ok(match result {
            None => serde_json::Value::Null,
            Some(reason) => serde_json::Value::String(reason),
        })
    }

    async fn submit_header(&self, hexdata: String) -> Result<(), ErrorObjectOwned> {
        submit_header(&self.ctx, &hexdata).map_err(map_submit_error)
    }

    async fn generate_to_address(
        &self,
        nblocks: u64,
        address: String,
        maxtries: Option<u64>,
    ) -> Result<Vec<String>, ErrorObjectOwned> {
        let script = self
            .ctx
            .services()
            .addresses
            .script_for_address(&address)
            .ok_or_else(|| rpc_error(codes::INVALID_ADDRESS_OR_KEY, "Error: Invalid address"))?;

        let ctx = Arc::clone(&self.ctx);
        let algo = self.config.mining_algo;
        let max_tries = maxtries.unwrap_or(1_000_000);
        let hashes = tokio::task::spawn_blocking(move || {
            let mut reservation = ScriptReservation::new(script);
            generate_blocks(&ctx, &mut reservation, algo, nblocks, max_tries, false)
        })
        .await
        .map_err(|e| rpc_error(codes::INTERNAL_ERROR, &e.to_string()))?
        .map_err(|e| match e {
            GeneratorError::CreateBlockFailed(_) | GeneratorError::BlockRejected => {
                rpc_error(codes::INTERNAL_ERROR, &e.to_string())
            }
        })?;

        Ok(hashes.iter().map(|h| h.to_string()).collect())
    }
}

/// Start the JSON-RPC server on the configured address.
///
/// Returns a [`ServerHandle`] that stops the server when dropped.
pub async fn start_rpc_server(
    ctx: Arc<MiningContext>,
    config: NodeConfig,
) -> Result<ServerHandle, std::io::Error> {
    let addr = config.rpc_addr();
    let server = Server::builder().build(&addr).await?;
    info!(%addr, "mining RPC server listening");
    let rpc_impl = RpcServerImpl::new(ctx, config);
    Ok(server.start(rpc_impl.into_rpc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DUMMY_COINBASE_SCRIPT;
    use crate::testutil::{solve_block, test_context, TestHarness};
    use hexa_core::chain::ChainView;
    use hexa_core::encode;
    use hexa_core::traits::BlockAssembler;

    fn server(harness: &TestHarness) -> RpcServerImpl {
        let ctx = test_context(harness);
        let config = NodeConfig {
            mining_algo: Algo::Sha256d,
            ..NodeConfig::default()
        };
        RpcServerImpl::new(ctx, config)
    }

    // ------------------------------------------------------------------
    // Informational calls
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn mining_info_reports_chain_state() {
        let harness = TestHarness::with_blocks(5);
        let rpc = server(&harness);
        let info = rpc.get_mining_info(Some("x11".to_string())).await.unwrap();
        assert_eq!(info.blocks, 4);
        assert_eq!(info.algo, "x11");
        assert_eq!(info.chain, "regtest");
        assert_eq!(info.pooledtx, 0);
        assert_eq!(info.currentblockweight, None);
    }

    #[tokio::test]
    async fn mining_info_rejects_unknown_algorithm() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let err = rpc
            .get_mining_info(Some("cuckoo".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn network_hash_ps_defaults_to_configured_algo() {
        let harness = TestHarness::with_blocks(8);
        let rpc = server(&harness);
        let rate = rpc.get_network_hash_ps(None, None, None).await.unwrap();
        assert!(rate > 0.0);
        // Empty string also selects the default.
        let rate_empty = rpc
            .get_network_hash_ps(None, None, Some(String::new()))
            .await
            .unwrap();
        assert_eq!(rate, rate_empty);
    }

    #[tokio::test]
    async fn multi_algo_info_covers_all_algorithms() {
        let harness = TestHarness::with_blocks(4);
        let rpc = server(&harness);
        let infos = rpc.get_multi_algo_info().await.unwrap();
        assert_eq!(infos.len(), Algo::ALL.len());
        let names: Vec<&str> = infos.iter().map(|i| i.algo.as_str()).collect();
        assert!(names.contains(&"sha256d"));
        assert!(names.contains(&"x16r"));
    }

    #[tokio::test]
    async fn mining_stats_cover_all_algorithms() {
        let harness = TestHarness::with_blocks(4);
        let rpc = server(&harness);
        let stats = rpc.get_mining_stats().await.unwrap();
        assert_eq!(stats.len(), Algo::ALL.len());
        // Heights 1..=3 were sha256d; genesis excluded.
        assert_eq!(stats[0].algo, "sha256d");
        assert_eq!(stats[0].total_blocks_24h, 3);
    }

    #[tokio::test]
    async fn halving_info_reports_first_epoch() {
        let harness = TestHarness::with_blocks(4);
        let rpc = server(&harness);
        let info = rpc.get_halving_info().await.unwrap();
        assert_eq!(info.halvings_occured, 0);
        assert_eq!(info.epochs_occured, 1);
        assert_eq!(info.epochs[0].epoch_name, "COINSWAP");
        assert!(!info.epochs[0].started_by_halving);
        assert_eq!(info.epochs[0].end_supply, serde_json::Value::Bool(false));
        assert!(info.min_epoch_supply_to_halve.ends_with('%'));
    }

    // ------------------------------------------------------------------
    // prioritisetransaction
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn prioritise_records_fee_delta() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let txid = "ab".repeat(32);
        assert!(rpc
            .prioritise_transaction(txid, None, 10_000)
            .await
            .unwrap());
        assert_eq!(harness.mempool.prioritised.lock().len(), 1);
    }

    #[tokio::test]
    async fn prioritise_rejects_nonzero_dummy() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let err = rpc
            .prioritise_transaction("ab".repeat(32), Some(1.0), 10_000)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn prioritise_rejects_bad_txid() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let err = rpc
            .prioritise_transaction("xyz".to_string(), None, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_PARAMETER);
    }

    // ------------------------------------------------------------------
    // Template / submission round trips
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn block_template_returns_object() {
        let harness = TestHarness::with_blocks(3);
        let rpc = server(&harness);
        let request = TemplateRequest {
            rules: Some(vec!["segwit".to_string()]),
            ..TemplateRequest::default()
        };
        let value = rpc
            .get_block_template(Some(request), Some("scrypt".to_string()))
            .await
            .unwrap();
        assert_eq!(
            value["previousblockhash"],
            serde_json::json!(harness.chain.tip().unwrap().hash.to_string())
        );
        assert_eq!(value["height"], serde_json::json!(3));
    }

    #[tokio::test]
    async fn submit_block_round_trip_returns_null_then_duplicate() {
        let harness = TestHarness::with_blocks(3);
        let rpc = server(&harness);
        let mut template = harness
            .assembler
            .assemble(DUMMY_COINBASE_SCRIPT, Algo::Scrypt)
            .unwrap();
        solve_block(&mut template.block);
        let hexdata = hex::encode(encode::encode_block(&template.block));

        let first = rpc.submit_block(hexdata.clone(), None).await.unwrap();
        assert_eq!(first, serde_json::Value::Null);
        let second = rpc.submit_block(hexdata, None).await.unwrap();
        assert_eq!(second, serde_json::json!("duplicate"));
    }

    #[tokio::test]
    async fn submit_block_bad_hex_is_deserialization_error() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let err = rpc
            .submit_block("zz".to_string(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::DESERIALIZATION_ERROR);
    }

    #[tokio::test]
    async fn submit_header_unknown_parent_is_verify_error() {
        let harness = TestHarness::with_blocks(2);
        let rpc = server(&harness);
        let header = hexa_core::types::BlockHeader {
            version: 1,
            prev_hash: Hash256([0x55; 32]),
            merkle_root: Hash256::ZERO,
            time: 0,
            bits: 0x207fffff,
            nonce: 0,
        };
        let hexdata = hex::encode(encode::encode_header(&header));
        let err = rpc.submit_header(hexdata).await.unwrap_err();
        assert_eq!(err.code(), codes::VERIFY_ERROR);
    }

    // ------------------------------------------------------------------
    // generatetoaddress
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn generate_to_address_mines_blocks() {
        let harness = TestHarness::with_blocks(1);
        let rpc = server(&harness);
        let hashes = rpc
            .generate_to_address(2, "hexa1qtest".to_string(), None)
            .await
            .unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(harness.chain.height(), 2);
    }

    #[tokio::test]
    async fn generate_to_invalid_address_fails() {
        let harness = TestHarness::with_blocks(1);
        let rpc = server(&harness);
        let err = rpc
            .generate_to_address(1, "bogus".to_string(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_ADDRESS_OR_KEY);
    }
}
