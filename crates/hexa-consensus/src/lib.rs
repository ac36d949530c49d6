//! # hexa-consensus
//! Multi-algorithm chain accounting: per-algo chain work, network hash
//! rate estimation, per-algo difficulty, mining statistics, and the
//! supply-gated subsidy halving schedule.

pub mod chainwork;
pub mod difficulty;
pub mod halving;
pub mod hashrate;
pub mod stats;
pub mod subsidy;
