//! Block and header submission pipeline.
//!
//! `submit_block` decodes externally produced blocks, deduplicates them
//! against the index, refreshes uncommitted structures, and hands them to
//! the external validator, observing the per-block verdict through a
//! scoped validation observer (registered before `process_new_block`,
//! always unregistered afterward). Rejection reasons are *returned*, not
//! raised; only header submission raises verification errors.

use thiserror::Error;
use tracing::debug;

use hexa_core::chain::EntryStatus;
use hexa_core::encode;
use hexa_core::traits::ValidationState;

use crate::context::MiningContext;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Input bytes did not decode to a block/header.
    #[error("{0}")]
    Deserialization(String),
    /// Verification failed with a hard error (header path, or a validator
    /// system error).
    #[error("{0}")]
    Verify(String),
}

/// Map a validator verdict to the BIP22 submission result.
///
/// `Ok(None)` means accepted; `Ok(Some(reason))` is a rejection string;
/// system errors become [`SubmitError::Verify`].
fn bip22_result(state: ValidationState) -> Result<Option<String>, SubmitError> {
    match state {
        ValidationState::Valid => Ok(None),
        ValidationState::Invalid { reason } if reason.is_empty() => {
            Ok(Some("rejected".to_string()))
        }
        ValidationState::Invalid { reason } => Ok(Some(reason)),
        ValidationState::Error { reason } => Err(SubmitError::Verify(reason)),
    }
}

/// Submit a serialized block.
///
/// Returns `None` on acceptance, or one of `duplicate`,
/// `duplicate-invalid`, `inconclusive`, or a rejection reason.
pub fn submit_block(ctx: &MiningContext, hexdata: &str) -> Result<Option<String>, SubmitError> {
    let mut block = encode::decode_hex_block(hexdata)
        .map_err(|_| SubmitError::Deserialization("Block decode failed".to_string()))?;

    if block.transactions.is_empty() || !block.transactions[0].is_coinbase() {
        return Err(SubmitError::Deserialization(
            "Block does not start with a coinbase".to_string(),
        ));
    }

    let services = ctx.services();
    let hash = block.header.hash();
    {
        let _state = ctx.lock_state();
        if let Some(entry) = services.chain.by_hash(&hash) {
            match entry.status {
                EntryStatus::Valid => return Ok(Some("duplicate".to_string())),
                EntryStatus::Failed => return Ok(Some("duplicate-invalid".to_string())),
                EntryStatus::HeaderOnly => {}
            }
        }
    }

    {
        let _state = ctx.lock_state();
        if let Some(prev) = services.chain.by_hash(&block.header.prev_hash) {
            services.validator.update_uncommitted(&mut block, &prev);
        }
    }

    debug!(%hash, "submitting block");
    let observer = ctx.register_observer(hash);
    let outcome = services.validator.process_new_block(&block, true);
    // `observer` unregisters on drop, on every path below.

    if !outcome.new_block && outcome.accepted {
        return Ok(Some("duplicate".to_string()));
    }
    match observer.take() {
        None => Ok(Some("inconclusive".to_string())),
        Some(state) => bip22_result(state),
    }
}

/// Submit a serialized header as a candidate chain tip.
///
/// Unlike [`submit_block`], verification failures are raised as
/// [`SubmitError::Verify`].
pub fn submit_header(ctx: &MiningContext, hexdata: &str) -> Result<(), SubmitError> {
    let header = encode::decode_hex_header(hexdata)
        .map_err(|_| SubmitError::Deserialization("Block header decode failed".to_string()))?;

    let services = ctx.services();
    {
        let _state = ctx.lock_state();
        if services.chain.by_hash(&header.prev_hash).is_none() {
            return Err(SubmitError::Verify(format!(
                "Must submit previous header ({}) first",
                header.prev_hash
            )));
        }
    }

    match services.validator.process_new_block_headers(&[header]) {
        ValidationState::Valid => Ok(()),
        ValidationState::Invalid { reason } | ValidationState::Error { reason } => {
            Err(SubmitError::Verify(reason))
        }
    }
}
