//! Error types for the Hexa protocol.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of data at offset {0}")] UnexpectedEof(usize),
    #[error("trailing bytes after decode: {0}")] TrailingBytes(usize),
    #[error("varint exceeds u64 range")] VarIntOverflow,
    #[error("collection too large: {size} > {max}")] OversizedCollection { size: u64, max: u64 },
    #[error("invalid hex encoding")] InvalidHex,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    #[error("unknown algorithm in version 0x{0:08x}")] UnknownAlgorithm(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("empty chain: no blocks connected")] EmptyChain,
    #[error("unknown block: {0}")] UnknownBlock(String),
    #[error("orphan block: parent {0} not found")] OrphanBlock(String),
    #[error("height {got} does not extend tip {tip}")] NonContiguousHeight { got: u64, tip: u64 },
    #[error("duplicate block: {0}")] DuplicateBlock(String),
    #[error("flush failed: {0}")] FlushFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("out of memory assembling block template")] OutOfMemory,
    #[error("block assembly failed: {0}")] Internal(String),
}

#[derive(Error, Debug)]
pub enum HexaError {
    #[error(transparent)] Codec(#[from] CodecError),
    #[error(transparent)] Pow(#[from] PowError),
    #[error(transparent)] Chain(#[from] ChainError),
    #[error(transparent)] Assemble(#[from] AssembleError),
}
