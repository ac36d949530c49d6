//! In-process block generation.
//!
//! Drives the assemble → extra-nonce → nonce-scan → submit loop used by
//! `generatetoaddress`. Each template's nonce space is scanned up to
//! [`INNER_NONCE_RANGE`]; on exhaustion the coinbase extra-nonce is bumped
//! and a fresh template assembled. A global try budget bounds total work.

use thiserror::Error;
use tracing::{debug, info};

use hexa_core::algo::Algo;
use hexa_core::constants::INNER_NONCE_RANGE;
use hexa_core::error::AssembleError;
use hexa_core::target::meets_target;
use hexa_core::types::Hash256;

use crate::context::MiningContext;

/// A coinbase script reserved from the wallet for generated blocks.
///
/// The reservation is marked kept only when the caller asked for it and
/// at least one block was produced, so unused scripts return to the pool.
pub struct ScriptReservation {
    script: Vec<u8>,
    kept: bool,
}

impl ScriptReservation {
    pub fn new(script: Vec<u8>) -> Self {
        Self { script, kept: false }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// Whether the script was used for at least one coinbase.
    pub fn kept(&self) -> bool {
        self.kept
    }

    fn keep(&mut self) {
        self.kept = true;
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The external assembler could not produce a template.
    #[error("Couldn't create new block: {0}")]
    CreateBlockFailed(AssembleError),
    /// A locally mined block was rejected by the validator. This means
    /// the template or the miner is broken, and the call is aborted.
    #[error("ProcessNewBlock, block not accepted")]
    BlockRejected,
}

/// Mine `n_generate` blocks paying the reserved script, spending at most
/// `max_tries` nonce attempts in total.
///
/// Bypasses the template cache: every iteration assembles a fresh
/// template. Returns the hashes of the blocks found; a shutdown request
/// or an exhausted try budget ends the loop early with the hashes found
/// so far.
pub fn generate_blocks(
    ctx: &MiningContext,
    reservation: &mut ScriptReservation,
    algo: Algo,
    n_generate: u64,
    max_tries: u64,
    keep_script: bool,
) -> Result<Vec<Hash256>, GeneratorError> {
    let (mut height, height_end) = {
        // Don't keep the chain-state lock across the whole generation.
        let _state = ctx.lock_state();
        let height = ctx.services().chain.height();
        (height, height + n_generate)
    };

    let mut extra_nonce: u32 = 0;
    let mut tries = max_tries;
    let mut hashes = Vec::new();

    while height < height_end && !ctx.shutdown_requested() {
        let mut template = {
            let _state = ctx.lock_state();
            ctx.services()
                .assembler
                .assemble(reservation.script(), algo)
                .map_err(GeneratorError::CreateBlockFailed)?
        };
        {
            let _state = ctx.lock_state();
            extra_nonce += 1;
            ctx.services()
                .assembler
                .increment_extra_nonce(&mut template.block, extra_nonce);
        }

        let header = &mut template.block.header;
        while tries > 0 && header.nonce < INNER_NONCE_RANGE && !pow_solved(header) {
            header.nonce += 1;
            tries -= 1;
        }
        if tries == 0 {
            debug!("try budget exhausted");
            break;
        }
        if header.nonce == INNER_NONCE_RANGE {
            // Nonce space exhausted: bump the extra-nonce and re-assemble.
            continue;
        }

        let outcome = ctx.services().validator.process_new_block(&template.block, true);
        if !outcome.accepted {
            return Err(GeneratorError::BlockRejected);
        }
        height += 1;
        let hash = template.block.header.hash();
        info!(%hash, height, "generated block");
        hashes.push(hash);

        // The script was used for at least one coinbase; keep it if the
        // caller wants to reuse it.
        if keep_script {
            reservation.keep();
        }
    }

    Ok(hashes)
}

fn pow_solved(header: &hexa_core::types::BlockHeader) -> bool {
    header
        .pow_hash()
        .map(|hash| meets_target(&hash, header.bits))
        .unwrap_or(false)
}
