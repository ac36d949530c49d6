//! Shared mock services for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use hexa_core::algo::Algo;
use hexa_core::chain::{ChainEntry, ChainView, EntryStatus, MemoryChainView};
use hexa_core::constants::{COIN, VERSIONBITS_TOP_BITS};
use hexa_core::error::AssembleError;
use hexa_core::merkle;
use hexa_core::target::meets_target;
use hexa_core::traits::{
    AddressResolver, BlockAssembler, BlockValidator, MempoolView, NetworkStatus, ProcessOutcome,
    ValidationState,
};
use hexa_core::types::{
    Block, BlockHeader, BlockTemplate, Hash256, OutPoint, Transaction, TxIn, TxOut,
};

use crate::context::{MiningContext, NodeServices};

/// Regtest-grade target: roughly every second nonce satisfies it.
pub const EASY_BITS: u32 = 0x207fffff;

/// Fixed base time used by the test clock.
pub const BASE_TIME: u64 = 1_700_000_000;

pub struct MockMempool {
    updated: AtomicU64,
    size: AtomicUsize,
    pub prioritised: Mutex<Vec<(Hash256, i64)>>,
}

impl MockMempool {
    pub fn new() -> Self {
        Self {
            updated: AtomicU64::new(1),
            size: AtomicUsize::new(0),
            prioritised: Mutex::new(Vec::new()),
        }
    }

    /// Simulate a mempool mutation.
    pub fn bump(&self) {
        self.updated.fetch_add(1, Ordering::SeqCst);
        self.size.fetch_add(1, Ordering::SeqCst);
    }
}

impl MempoolView for MockMempool {
    fn transactions_updated(&self) -> u64 {
        self.updated.load(Ordering::SeqCst)
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    fn prioritise(&self, txid: &Hash256, fee_delta: i64) {
        self.prioritised.lock().push((*txid, fee_delta));
    }
}

pub struct MockAssembler {
    chain: Arc<MemoryChainView>,
    pub assemble_calls: AtomicU64,
    pub fail_next: AtomicBool,
    pub witness_commitment: Mutex<Vec<u8>>,
}

impl MockAssembler {
    pub fn new(chain: Arc<MemoryChainView>) -> Self {
        Self {
            chain,
            assemble_calls: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
            witness_commitment: Mutex::new(vec![0xAA, 0x21, 0xA9, 0xED]),
        }
    }

    pub fn calls(&self) -> u64 {
        self.assemble_calls.load(Ordering::SeqCst)
    }
}

impl BlockAssembler for MockAssembler {
    fn assemble(
        &self,
        coinbase_script: &[u8],
        algo: Algo,
    ) -> Result<BlockTemplate, AssembleError> {
        self.assemble_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AssembleError::OutOfMemory);
        }
        let tip = self
            .chain
            .tip()
            .ok_or_else(|| AssembleError::Internal("no tip".into()))?;

        let coinbase = Transaction {
            version: 1,
            inputs: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: (tip.height + 1).to_le_bytes().to_vec(),
                sequence: u32::MAX,
            }],
            outputs: vec![TxOut {
                value: 50 * COIN,
                script_pubkey: coinbase_script.to_vec(),
            }],
            lock_time: 0,
        };
        let merkle_root = merkle::merkle_root(&[coinbase.txid()]);
        let block = Block {
            header: BlockHeader {
                version: (VERSIONBITS_TOP_BITS | algo.version_bits()) as i32,
                prev_hash: tip.hash,
                merkle_root,
                time: tip.time + 1,
                bits: EASY_BITS,
                nonce: 0,
            },
            transactions: vec![coinbase],
        };
        Ok(BlockTemplate {
            block,
            fees: vec![0],
            sigops: vec![4],
            witness_commitment: self.witness_commitment.lock().clone(),
            coinbase_value: 50 * COIN,
            masternode: None,
            superblock: Vec::new(),
            founder_reward: None,
        })
    }

    fn increment_extra_nonce(&self, block: &mut Block, extra_nonce: u32) {
        let coinbase = &mut block.transactions[0];
        let mut script = coinbase.inputs[0].script_sig.clone();
        script.truncate(8);
        script.extend_from_slice(&extra_nonce.to_le_bytes());
        coinbase.inputs[0].script_sig = script;
        let txids: Vec<Hash256> = block.transactions.iter().map(|tx| tx.txid()).collect();
        block.header.merkle_root = merkle::merkle_root(&txids);
    }
}

pub struct MockValidator {
    chain: Arc<MemoryChainView>,
    ctx: Mutex<Option<Weak<MiningContext>>>,
    pub reject_next: AtomicBool,
    pub updated_uncommitted: AtomicU64,
}

impl MockValidator {
    pub fn new(chain: Arc<MemoryChainView>) -> Self {
        Self {
            chain,
            ctx: Mutex::new(None),
            reject_next: AtomicBool::new(false),
            updated_uncommitted: AtomicU64::new(0),
        }
    }

    pub fn attach(&self, ctx: &Arc<MiningContext>) {
        *self.ctx.lock() = Some(Arc::downgrade(ctx));
    }

    fn with_ctx(&self, f: impl FnOnce(&MiningContext)) {
        if let Some(ctx) = self.ctx.lock().as_ref().and_then(Weak::upgrade) {
            f(&ctx);
        }
    }

    fn check_block(&self, block: &Block) -> ValidationState {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return ValidationState::Invalid { reason: "test-reject".into() };
        }
        let tip = match self.chain.tip() {
            Some(tip) => tip,
            None => return ValidationState::Error { reason: "no chain".into() },
        };
        if block.header.prev_hash != tip.hash {
            return ValidationState::Invalid { reason: "prev-blk-not-found".into() };
        }
        match block.header.pow_hash() {
            Ok(hash) if meets_target(&hash, block.header.bits) => ValidationState::Valid,
            Ok(_) => ValidationState::Invalid { reason: "high-hash".into() },
            Err(_) => ValidationState::Invalid { reason: "bad-algo".into() },
        }
    }
}

impl BlockValidator for MockValidator {
    fn process_new_block(&self, block: &Block, _force: bool) -> ProcessOutcome {
        let hash = block.header.hash();
        if let Some(entry) = self.chain.by_hash(&hash) {
            return ProcessOutcome {
                accepted: entry.status == EntryStatus::Valid,
                new_block: false,
            };
        }

        let state = self.check_block(block);
        let accepted = state.is_valid();
        if accepted {
            let entry = self
                .chain
                .connect_header(&block.header)
                .expect("validated block extends the tip");
            self.with_ctx(|ctx| ctx.notify_tip_changed(entry.hash));
        }
        self.with_ctx(|ctx| ctx.notify_block_checked(&hash, state.clone()));
        ProcessOutcome { accepted, new_block: true }
    }

    fn process_new_block_headers(&self, headers: &[BlockHeader]) -> ValidationState {
        for header in headers {
            if let Err(e) = self.chain.connect_header(header) {
                return ValidationState::Invalid { reason: e.to_string() };
            }
        }
        ValidationState::Valid
    }

    fn test_block_validity(&self, block: &Block) -> ValidationState {
        self.check_block(block)
    }

    fn update_uncommitted(&self, _block: &mut Block, _prev: &ChainEntry) {
        self.updated_uncommitted.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockNetwork {
    pub peers: AtomicUsize,
    pub ibd: AtomicBool,
    pub p2p: AtomicBool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            peers: AtomicUsize::new(1),
            ibd: AtomicBool::new(false),
            p2p: AtomicBool::new(true),
        }
    }
}

impl NetworkStatus for MockNetwork {
    fn peer_count(&self) -> usize {
        self.peers.load(Ordering::SeqCst)
    }

    fn is_initial_block_download(&self) -> bool {
        self.ibd.load(Ordering::SeqCst)
    }

    fn p2p_enabled(&self) -> bool {
        self.p2p.load(Ordering::SeqCst)
    }

    fn chain_name(&self) -> String {
        "regtest".to_string()
    }
}

pub struct MockAddresses;

impl AddressResolver for MockAddresses {
    fn script_for_address(&self, address: &str) -> Option<Vec<u8>> {
        if address.starts_with("hexa1") {
            let mut script = vec![0x00, 0x14];
            script.extend_from_slice(address.as_bytes());
            Some(script)
        } else {
            None
        }
    }
}

/// Complete mock service set around one in-memory chain.
pub struct TestHarness {
    pub chain: Arc<MemoryChainView>,
    pub mempool: Arc<MockMempool>,
    pub assembler: Arc<MockAssembler>,
    pub validator: Arc<MockValidator>,
    pub network: Arc<MockNetwork>,
    pub time: Arc<AtomicU64>,
}

impl TestHarness {
    /// Harness over a chain of `blocks` sha256d blocks (genesis included).
    pub fn with_blocks(blocks: usize) -> Self {
        Self::with_algo_chain(&vec![Algo::Sha256d; blocks])
    }

    /// Harness over a chain mined by the given algorithm sequence.
    pub fn with_algo_chain(algos: &[Algo]) -> Self {
        let chain = Arc::new(MemoryChainView::new());
        let mut prev = Hash256::ZERO;
        for (i, algo) in algos.iter().enumerate() {
            let header = BlockHeader {
                version: (VERSIONBITS_TOP_BITS | algo.version_bits()) as i32,
                prev_hash: prev,
                merkle_root: Hash256::ZERO,
                time: BASE_TIME as u32 - 1_000 + i as u32,
                bits: EASY_BITS,
                nonce: i as u32,
            };
            prev = chain.connect_header(&header).unwrap().hash;
        }
        Self {
            mempool: Arc::new(MockMempool::new()),
            assembler: Arc::new(MockAssembler::new(Arc::clone(&chain))),
            validator: Arc::new(MockValidator::new(Arc::clone(&chain))),
            network: Arc::new(MockNetwork::new()),
            time: Arc::new(AtomicU64::new(BASE_TIME)),
            chain,
        }
    }

    pub fn services(&self) -> NodeServices {
        NodeServices {
            chain: Arc::clone(&self.chain) as Arc<dyn ChainView>,
            mempool: Arc::clone(&self.mempool) as Arc<dyn MempoolView>,
            assembler: Arc::clone(&self.assembler) as Arc<dyn BlockAssembler>,
            validator: Arc::clone(&self.validator) as Arc<dyn BlockValidator>,
            network: Arc::clone(&self.network) as Arc<dyn NetworkStatus>,
            addresses: Arc::new(MockAddresses) as Arc<dyn AddressResolver>,
        }
    }

    pub fn advance_time(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }
}

/// Build a context over the harness with its adjustable clock, and attach
/// the validator's notification back-reference.
pub fn test_context(harness: &TestHarness) -> Arc<MiningContext> {
    let time = Arc::clone(&harness.time);
    let ctx = MiningContext::with_clock(harness.services(), move || time.load(Ordering::SeqCst));
    harness.validator.attach(&ctx);
    ctx
}

/// Mine the template's nonce until its PoW hash meets the target.
pub fn solve_block(block: &mut Block) {
    loop {
        let hash = block.header.pow_hash().expect("test header has a valid algo");
        if meets_target(&hash, block.header.bits) {
            return;
        }
        block.header.nonce += 1;
    }
}
