//! # hexa-node
//! Mining coordination runtime for the Hexa node: the mining context
//! (locks, tip signalling, validation observers), the single-slot block
//! template cache, long polling, the in-process generator, the block
//! submission pipeline, and the mining JSON-RPC surface.

pub mod config;
pub mod context;
pub mod generator;
pub mod longpoll;
pub mod rpc;
pub mod submit;
pub mod template;

#[cfg(test)]
pub(crate) mod testutil;
