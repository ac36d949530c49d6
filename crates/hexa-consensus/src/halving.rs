//! Supply-gated subsidy halving schedule.
//!
//! Block heights partition into contiguous *epochs*, each with a fixed
//! maximum block subsidy. The first three epochs are the named bootstrap
//! epochs (COINSWAP, BOOTSTRAP, ALPHA); from then on the halving machine
//! runs: when an epoch ends, the subsidy of the next epoch halves only if
//! the supply actually released since the last halving reached
//! `HALVING_MIN_SUPPLY_TARGET` of the ended epoch's theoretical supply
//! target. A successful halving doubles the interval between halvings; a
//! missed target repeats the epoch at the same subsidy and interval, and
//! may carry a dynamic rewards boost when the shortfall was severe.
//!
//! The schedule is derived from the block index. Callers enumerating it
//! over live state must flush the index first so reads are deterministic.

use hexa_core::chain::ChainView;
use hexa_core::constants::{
    HALVING_MIN_BOOST_SUPPLY_TARGET, HALVING_MIN_SUPPLY_TARGET, INITIAL_HALVING_INTERVAL,
    INITIAL_MAX_BLOCK_SUBSIDY, NAMED_EPOCHS,
};

use crate::subsidy::block_subsidy;

/// Consensus parameters of the halving machine.
#[derive(Clone, Debug)]
pub struct HalvingConfig {
    /// Named bootstrap epochs: (name, start block, end block, max subsidy).
    pub named_epochs: Vec<(String, u64, u64, u64)>,
    /// Interval of the first numbered epoch; doubles on each halving.
    pub initial_interval: u64,
    /// Maximum block subsidy of the first numbered epoch.
    pub initial_max_subsidy: u64,
    /// Released/target ratio required for a halving to occur.
    pub min_supply_target: f64,
    /// Released/target ratio below which the configured boost applies.
    pub min_boost_supply_target: f64,
    /// Dynamic rewards boost factor for under-supplied epochs. Applied
    /// only when greater than zero; the mainnet consensus configuration
    /// currently leaves it disabled.
    pub boost_factor: f64,
}

impl Default for HalvingConfig {
    fn default() -> Self {
        Self {
            named_epochs: NAMED_EPOCHS
                .iter()
                .map(|(name, start, end, subsidy)| (name.to_string(), *start, *end, *subsidy))
                .collect(),
            initial_interval: INITIAL_HALVING_INTERVAL,
            initial_max_subsidy: INITIAL_MAX_BLOCK_SUBSIDY,
            min_supply_target: HALVING_MIN_SUPPLY_TARGET,
            min_boost_supply_target: HALVING_MIN_BOOST_SUPPLY_TARGET,
            boost_factor: 0.0,
        }
    }
}

/// One halving epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct HalvingEpoch {
    /// Height of the first block of the epoch.
    pub start_block: u64,
    /// Height of the last block of the epoch.
    pub end_block: u64,
    /// Maximum subsidy of any block within the epoch.
    pub max_block_subsidy: u64,
    /// Dynamic rewards boost active within the epoch (0 = none).
    pub boost_factor: f64,
    /// Whether the subsidy was halved at the start of this epoch.
    pub started_by_halving: bool,
    /// Total supply in circulation before the epoch's first block.
    pub start_supply: u64,
    /// Total supply at the epoch's last block. `Some` iff the epoch ended.
    pub end_supply: Option<u64>,
    /// Supply released by blocks accepted within this epoch so far.
    pub supply_released: u64,
}

impl HalvingEpoch {
    pub fn has_ended(&self) -> bool {
        self.end_supply.is_some()
    }

    /// Number of block heights the epoch spans.
    pub fn block_count(&self) -> u64 {
        self.end_block - self.start_block + 1
    }

    /// Theoretical maximum supply releasable during the epoch.
    pub fn supply_target(&self) -> u64 {
        self.max_block_subsidy.saturating_mul(self.block_count())
    }

    /// Supply actually released during the epoch: the recorded end-state
    /// difference for ended epochs, the running sum otherwise.
    pub fn supply_this_epoch(&self) -> u64 {
        match self.end_supply {
            Some(end) => end - self.start_supply,
            None => self.supply_released,
        }
    }
}

/// Snapshot of one epoch for reporting, with the accounting that depends
/// on enumeration order (names, supply since halving) resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochReport {
    pub name: String,
    pub started_by_halving: bool,
    pub start_block: u64,
    pub end_block: u64,
    pub max_block_subsidy: u64,
    pub boost_factor: f64,
    pub start_supply: u64,
    pub end_supply: Option<u64>,
    pub supply_target: u64,
    pub supply_this_epoch: u64,
    pub supply_since_halving: u64,
    /// `floor(supply_since_halving / supply_target * 100)`.
    pub supply_target_reached_pct: i64,
}

/// The halving state machine.
///
/// Epochs are in `Active` state until a block beyond their end height is
/// accepted, at which point they transition to `Ended` (recording the end
/// supply) and a successor epoch is created.
#[derive(Clone, Debug)]
pub struct HalvingSchedule {
    config: HalvingConfig,
    epochs: Vec<HalvingEpoch>,
    halving_interval: u64,
    halving_count: u32,
    supply_since_halving: u64,
    total_supply: u64,
}

impl HalvingSchedule {
    /// Start a fresh schedule in the first named epoch.
    pub fn new(config: HalvingConfig) -> Self {
        assert!(
            !config.named_epochs.is_empty(),
            "halving schedule requires at least one named epoch"
        );
        let (_, start, end, subsidy) = config.named_epochs[0].clone();
        let first = HalvingEpoch {
            start_block: start,
            end_block: end,
            max_block_subsidy: subsidy,
            boost_factor: 0.0,
            started_by_halving: false,
            start_supply: 0,
            end_supply: None,
            supply_released: 0,
        };
        let halving_interval = config.initial_interval;
        Self {
            config,
            epochs: vec![first],
            halving_interval,
            halving_count: 0,
            supply_since_halving: 0,
            total_supply: 0,
        }
    }

    /// Derive the schedule from the block index by replaying accepted
    /// blocks in height order.
    ///
    /// The per-block subsidy is the cost-weighted epoch subsidy of the
    /// algorithm that mined each block. Callers reading live state must
    /// call [`ChainView::flush`] first.
    pub fn derive(chain: &dyn ChainView, config: HalvingConfig) -> Self {
        let mut schedule = Self::new(config);
        let tip_height = match chain.tip() {
            Some(tip) => tip.height,
            None => return schedule,
        };
        for height in 1..=tip_height {
            let Some(entry) = chain.at_height(height) else {
                continue;
            };
            schedule.advance_to(height);
            let epoch = schedule.current_epoch();
            let subsidy =
                block_subsidy(entry.algo(), epoch.max_block_subsidy, epoch.boost_factor);
            schedule.record_subsidy(subsidy);
        }
        schedule
    }

    /// Account one accepted block.
    pub fn on_block_connected(&mut self, height: u64, subsidy: u64) {
        self.advance_to(height);
        self.record_subsidy(subsidy);
    }

    /// Roll epochs forward until `height` falls inside the active epoch.
    pub fn advance_to(&mut self, height: u64) {
        while height > self.current_epoch().end_block {
            self.roll_epoch();
        }
    }

    /// Add released supply to the active epoch's accounting.
    pub fn record_subsidy(&mut self, subsidy: u64) {
        self.total_supply = self.total_supply.saturating_add(subsidy);
        self.supply_since_halving = self.supply_since_halving.saturating_add(subsidy);
        let epoch = self.epochs.last_mut().expect("schedule always has an epoch");
        epoch.supply_released = epoch.supply_released.saturating_add(subsidy);
    }

    /// Finalize the active epoch and create its successor.
    fn roll_epoch(&mut self) {
        let ended_index = self.epochs.len() - 1;
        let named_count = self.config.named_epochs.len();

        let (next_start, ended_target) = {
            let ended = self.epochs.last_mut().expect("schedule always has an epoch");
            ended.end_supply = Some(self.total_supply);
            (ended.end_block + 1, ended.supply_target())
        };

        let next = if ended_index + 1 < named_count {
            // Still inside the named bootstrap sequence. Named epochs do
            // not participate in halving accounting.
            self.supply_since_halving = 0;
            let (_, start, end, subsidy) = self.config.named_epochs[ended_index + 1].clone();
            debug_assert_eq!(start, next_start, "named epochs must be contiguous");
            HalvingEpoch {
                start_block: start,
                end_block: end,
                max_block_subsidy: subsidy,
                boost_factor: 0.0,
                started_by_halving: false,
                start_supply: self.total_supply,
                end_supply: None,
                supply_released: 0,
            }
        } else if ended_index + 1 == named_count {
            // Transition out of the named regime: the first numbered epoch
            // never halves and starts halving accounting from zero.
            self.supply_since_halving = 0;
            HalvingEpoch {
                start_block: next_start,
                end_block: next_start + self.halving_interval - 1,
                max_block_subsidy: self.config.initial_max_subsidy,
                boost_factor: 0.0,
                started_by_halving: false,
                start_supply: self.total_supply,
                end_supply: None,
                supply_released: 0,
            }
        } else {
            let ratio = if ended_target == 0 {
                0.0
            } else {
                self.supply_since_halving as f64 / ended_target as f64
            };
            let ended_subsidy = self.epochs[ended_index].max_block_subsidy;

            if ratio >= self.config.min_supply_target {
                // Supply target reached: halve, count it, double the
                // interval, and restart halving accounting.
                self.halving_count += 1;
                self.halving_interval = self.halving_interval.saturating_mul(2);
                self.supply_since_halving = 0;
                HalvingEpoch {
                    start_block: next_start,
                    end_block: next_start + self.halving_interval - 1,
                    max_block_subsidy: ended_subsidy / 2,
                    boost_factor: 0.0,
                    started_by_halving: true,
                    start_supply: self.total_supply,
                    end_supply: None,
                    supply_released: 0,
                }
            } else {
                // Target missed: the epoch repeats at the same subsidy and
                // interval. A severe shortfall may enable the boost.
                let boost = if self.config.boost_factor > 0.0
                    && ratio < self.config.min_boost_supply_target
                {
                    self.config.boost_factor
                } else {
                    0.0
                };
                HalvingEpoch {
                    start_block: next_start,
                    end_block: next_start + self.halving_interval - 1,
                    max_block_subsidy: ended_subsidy,
                    boost_factor: boost,
                    started_by_halving: false,
                    start_supply: self.total_supply,
                    end_supply: None,
                    supply_released: 0,
                }
            }
        };

        self.epochs.push(next);
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn config(&self) -> &HalvingConfig {
        &self.config
    }

    pub fn epochs(&self) -> &[HalvingEpoch] {
        &self.epochs
    }

    pub fn current_epoch(&self) -> &HalvingEpoch {
        self.epochs.last().expect("schedule always has an epoch")
    }

    /// Number of successful halvings so far.
    pub fn halving_count(&self) -> u32 {
        self.halving_count
    }

    /// Interval between the last halving and the next potential one.
    pub fn halving_interval(&self) -> u64 {
        self.halving_interval
    }

    /// Supply released since the last halving (or since the numbered
    /// regime began).
    pub fn supply_since_halving(&self) -> u64 {
        self.supply_since_halving
    }

    /// Total supply released across all accounted blocks.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// The epoch containing `height`, if the schedule has advanced that
    /// far.
    pub fn epoch_at(&self, height: u64) -> Option<&HalvingEpoch> {
        self.epochs
            .iter()
            .find(|e| height >= e.start_block && height <= e.end_block)
    }

    /// The maximum block subsidy in force at `height`, if the schedule
    /// has advanced that far.
    pub fn max_subsidy_at(&self, height: u64) -> Option<u64> {
        self.epoch_at(height).map(|e| e.max_block_subsidy)
    }

    /// Released/target ratio of the active epoch's halving accounting.
    pub fn supply_target_reached(&self) -> f64 {
        let target = self.current_epoch().supply_target();
        if target == 0 {
            0.0
        } else {
            self.supply_since_halving as f64 / target as f64
        }
    }

    /// Epoch names in order: the named epochs, then `ALPHA_H{H}_E{E}`
    /// where `H` counts halvings and `E` counts non-halved epochs since
    /// the last halving.
    pub fn epoch_names(&self) -> Vec<String> {
        let named_count = self.config.named_epochs.len();
        let mut names = Vec::with_capacity(self.epochs.len());
        let mut halvings = 0u32;
        let mut epochs_since_halving = 0u32;
        for (i, epoch) in self.epochs.iter().enumerate() {
            if i < named_count {
                names.push(self.config.named_epochs[i].0.clone());
                epochs_since_halving = 0;
                continue;
            }
            if epoch.started_by_halving {
                halvings += 1;
                epochs_since_halving = 0;
            } else {
                epochs_since_halving += 1;
            }
            names.push(format!("ALPHA_H{halvings}_E{epochs_since_halving}"));
        }
        names
    }

    /// Full per-epoch report with running supply-since-halving accounting,
    /// as surfaced by `gethalvinginfo`.
    pub fn report(&self) -> Vec<EpochReport> {
        let named_count = self.config.named_epochs.len();
        let names = self.epoch_names();
        let mut reports = Vec::with_capacity(self.epochs.len());
        let mut since_halving = 0u64;
        for (i, epoch) in self.epochs.iter().enumerate() {
            if epoch.started_by_halving || i < named_count {
                since_halving = 0;
            }
            let released = epoch.supply_this_epoch();
            since_halving = since_halving.saturating_add(released);
            let target = epoch.supply_target();
            let pct = if target == 0 {
                0
            } else {
                ((since_halving as f64 / target as f64) * 100.0).floor() as i64
            };
            reports.push(EpochReport {
                name: names[i].clone(),
                started_by_halving: epoch.started_by_halving,
                start_block: epoch.start_block,
                end_block: epoch.end_block,
                max_block_subsidy: epoch.max_block_subsidy,
                boost_factor: epoch.boost_factor,
                start_supply: epoch.start_supply,
                end_supply: epoch.end_supply,
                supply_target: target,
                supply_this_epoch: released,
                supply_since_halving: since_halving,
                supply_target_reached_pct: pct,
            });
        }
        reports
    }
}

impl Default for HalvingSchedule {
    fn default() -> Self {
        Self::new(HalvingConfig::default())
    }
}
