//! The mining context: process state shared by every mining operation.
//!
//! Instead of scattered globals, a [`MiningContext`] owns the chain-state
//! lock (guarding the template cache and assembly statistics), the
//! best-block condition variable long pollers sleep on, the shutdown flag,
//! and the scoped validation-observer registry the submission pipeline
//! uses. Tests instantiate fresh contexts around mock services.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use hexa_core::chain::ChainView;
use hexa_core::traits::{
    AddressResolver, BlockAssembler, BlockValidator, MempoolView, NetworkStatus, ValidationState,
};
use hexa_core::types::Hash256;

use crate::template::TemplateSlot;

/// External subsystems the mining core drives.
#[derive(Clone)]
pub struct NodeServices {
    pub chain: Arc<dyn ChainView>,
    pub mempool: Arc<dyn MempoolView>,
    pub assembler: Arc<dyn BlockAssembler>,
    pub validator: Arc<dyn BlockValidator>,
    pub network: Arc<dyn NetworkStatus>,
    pub addresses: Arc<dyn AddressResolver>,
}

/// State guarded by the chain-state lock.
///
/// Holding the [`MiningContext::lock_state`] guard is the Rust rendering
/// of holding `cs_main`: template reads, assembly, and submission
/// serialize through it.
pub struct MiningState {
    /// The single-slot template cache.
    pub template: TemplateSlot,
    /// Mempool revision recorded when the cached template was built; also
    /// the revision advertised in `longpollid`s.
    pub last_txns_updated: u64,
    /// Weight of the last assembled block, if any was ever assembled.
    pub last_block_weight: Option<u64>,
    /// Transaction count of the last assembled block.
    pub last_block_tx_count: Option<usize>,
}

struct ObserverSlot {
    id: u64,
    hash: Hash256,
    result: Option<ValidationState>,
}

/// Process-wide mining coordination state.
pub struct MiningContext {
    services: NodeServices,
    state: Mutex<MiningState>,
    pub(crate) best_block: Mutex<Hash256>,
    pub(crate) best_block_cv: Condvar,
    shutdown: AtomicBool,
    observers: Mutex<Vec<ObserverSlot>>,
    observer_seq: AtomicU64,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl MiningContext {
    /// Create a context over the given services with the system clock.
    pub fn new(services: NodeServices) -> Arc<Self> {
        Self::with_clock(services, || {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        })
    }

    /// Create a context with an injected clock (tests pin time).
    pub fn with_clock(
        services: NodeServices,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Arc<Self> {
        let best = services.chain.tip().map(|e| e.hash).unwrap_or(Hash256::ZERO);
        Arc::new(Self {
            services,
            state: Mutex::new(MiningState {
                template: TemplateSlot::default(),
                last_txns_updated: 0,
                last_block_weight: None,
                last_block_tx_count: None,
            }),
            best_block: Mutex::new(best),
            best_block_cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
            observer_seq: AtomicU64::new(0),
            clock: Box::new(clock),
        })
    }

    pub fn services(&self) -> &NodeServices {
        &self.services
    }

    /// Current wall-clock seconds per the context clock.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Acquire the chain-state lock.
    pub fn lock_state(&self) -> MutexGuard<'_, MiningState> {
        self.state.lock()
    }

    // -----------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------

    /// Request shutdown: aborts generator loops between templates and
    /// wakes all long pollers.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.best_block_cv.notify_all();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------
    // Best-block signalling
    // -----------------------------------------------------------------

    /// Record a new best block and wake long pollers. Called by the node
    /// whenever the validator moves the tip.
    pub fn notify_tip_changed(&self, new_tip: Hash256) {
        let mut best = self.best_block.lock();
        *best = new_tip;
        debug!(tip = %new_tip, "best block updated");
        self.best_block_cv.notify_all();
    }

    /// The best-block hash long pollers watch.
    pub fn best_block(&self) -> Hash256 {
        *self.best_block.lock()
    }

    // -----------------------------------------------------------------
    // Validation observers
    // -----------------------------------------------------------------

    /// Register a one-shot observer for the validation outcome of `hash`.
    ///
    /// The registration is scoped: dropping the returned handle always
    /// unregisters, on every exit path.
    pub fn register_observer(&self, hash: Hash256) -> ScopedValidationObserver<'_> {
        let id = self.observer_seq.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().push(ObserverSlot { id, hash, result: None });
        ScopedValidationObserver { ctx: self, id }
    }

    /// Deliver a validation outcome to every observer of `hash`.
    /// Validator implementations call this from `process_new_block`.
    pub fn notify_block_checked(&self, hash: &Hash256, state: ValidationState) {
        let mut observers = self.observers.lock();
        for slot in observers.iter_mut().filter(|s| s.hash == *hash) {
            slot.result = Some(state.clone());
        }
    }

    fn take_observer_result(&self, id: u64) -> Option<ValidationState> {
        self.observers
            .lock()
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.result.take())
    }

    fn unregister_observer(&self, id: u64) {
        self.observers.lock().retain(|s| s.id != id);
    }
}

/// RAII handle for a registered validation observer.
pub struct ScopedValidationObserver<'a> {
    ctx: &'a MiningContext,
    id: u64,
}

impl ScopedValidationObserver<'_> {
    /// Take the delivered outcome, if the validator reported one.
    pub fn take(&self) -> Option<ValidationState> {
        self.ctx.take_observer_result(self.id)
    }
}

impl Drop for ScopedValidationObserver<'_> {
    fn drop(&mut self) {
        self.ctx.unregister_observer(self.id);
    }
}
