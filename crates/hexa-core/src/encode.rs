//! Consensus wire encoding.
//!
//! Bitcoin-family serialization: fixed-width little-endian integers,
//! CompactSize-prefixed vectors, 256-bit hashes in internal byte order.
//! The 80-byte header span `[version .. nonce]` is the exact input to the
//! PoW hash functions, so this module is consensus-critical.

use crate::error::CodecError;
use crate::types::{Block, BlockHeader, Hash256, OutPoint, Transaction, TxIn, TxOut};

/// Serialized header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Upper bound on decoded collection lengths, to stop memory-exhaustion
/// on malformed input before allocation.
const MAX_VEC_LEN: u64 = 1_000_000;

/// A reading cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.bytes.len() {
            return Err(CodecError::UnexpectedEof(self.pos));
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64_le(&mut self) -> Result<u64, CodecError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    fn i32_le(&mut self) -> Result<i32, CodecError> {
        Ok(self.u32_le()? as i32)
    }

    fn hash(&mut self) -> Result<Hash256, CodecError> {
        let b = self.take(32)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(b);
        Ok(Hash256(arr))
    }

    /// Bitcoin CompactSize.
    fn varint(&mut self) -> Result<u64, CodecError> {
        match self.u8()? {
            n @ 0..=0xFC => Ok(n as u64),
            0xFD => Ok(self.u16_le()? as u64),
            0xFE => Ok(self.u32_le()? as u64),
            0xFF => Ok(self.u64_le()?),
        }
    }

    fn bounded_len(&mut self) -> Result<usize, CodecError> {
        let len = self.varint()?;
        if len > MAX_VEC_LEN {
            return Err(CodecError::OversizedCollection { size: len, max: MAX_VEC_LEN });
        }
        Ok(len as usize)
    }

    fn finish(self) -> Result<(), CodecError> {
        if self.pos != self.bytes.len() {
            return Err(CodecError::TrailingBytes(self.bytes.len() - self.pos));
        }
        Ok(())
    }
}

/// Append a CompactSize varint.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xFC => out.push(value as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

// ---------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------

/// Serialize a header into its canonical 80 bytes.
pub fn encode_header(header: &BlockHeader) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[0..4].copy_from_slice(&header.version.to_le_bytes());
    out[4..36].copy_from_slice(header.prev_hash.as_bytes());
    out[36..68].copy_from_slice(header.merkle_root.as_bytes());
    out[68..72].copy_from_slice(&header.time.to_le_bytes());
    out[72..76].copy_from_slice(&header.bits.to_le_bytes());
    out[76..80].copy_from_slice(&header.nonce.to_le_bytes());
    out
}

/// Decode a header from exactly 80 bytes.
pub fn decode_header(bytes: &[u8]) -> Result<BlockHeader, CodecError> {
    let mut r = Reader::new(bytes);
    let header = read_header(&mut r)?;
    r.finish()?;
    Ok(header)
}

fn read_header(r: &mut Reader<'_>) -> Result<BlockHeader, CodecError> {
    Ok(BlockHeader {
        version: r.i32_le()?,
        prev_hash: r.hash()?,
        merkle_root: r.hash()?,
        time: r.u32_le()?,
        bits: r.u32_le()?,
        nonce: r.u32_le()?,
    })
}

// ---------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------

/// Serialize a transaction.
pub fn encode_tx(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&tx.version.to_le_bytes());
    write_varint(&mut out, tx.inputs.len() as u64);
    for input in &tx.inputs {
        out.extend_from_slice(input.previous_output.txid.as_bytes());
        out.extend_from_slice(&input.previous_output.vout.to_le_bytes());
        write_bytes(&mut out, &input.script_sig);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }
    write_varint(&mut out, tx.outputs.len() as u64);
    for output in &tx.outputs {
        out.extend_from_slice(&output.value.to_le_bytes());
        write_bytes(&mut out, &output.script_pubkey);
    }
    out.extend_from_slice(&tx.lock_time.to_le_bytes());
    out
}

fn read_tx(r: &mut Reader<'_>) -> Result<Transaction, CodecError> {
    let version = r.i32_le()?;
    let input_count = r.bounded_len()?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let txid = r.hash()?;
        let vout = r.u32_le()?;
        let script_len = r.bounded_len()?;
        let script_sig = r.take(script_len)?.to_vec();
        let sequence = r.u32_le()?;
        inputs.push(TxIn {
            previous_output: OutPoint { txid, vout },
            script_sig,
            sequence,
        });
    }
    let output_count = r.bounded_len()?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        let value = r.u64_le()?;
        let script_len = r.bounded_len()?;
        let script_pubkey = r.take(script_len)?.to_vec();
        outputs.push(TxOut { value, script_pubkey });
    }
    let lock_time = r.u32_le()?;
    Ok(Transaction { version, inputs, outputs, lock_time })
}

/// Decode a transaction, requiring the input to be fully consumed.
pub fn decode_tx(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let mut r = Reader::new(bytes);
    let tx = read_tx(&mut r)?;
    r.finish()?;
    Ok(tx)
}

// ---------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------

/// Serialize a block: header, then CompactSize-prefixed transactions.
pub fn encode_block(block: &Block) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + 256);
    out.extend_from_slice(&encode_header(&block.header));
    write_varint(&mut out, block.transactions.len() as u64);
    for tx in &block.transactions {
        out.extend_from_slice(&encode_tx(tx));
    }
    out
}

/// Decode a block, requiring the input to be fully consumed.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CodecError> {
    let mut r = Reader::new(bytes);
    let header = read_header(&mut r)?;
    let tx_count = r.bounded_len()?;
    let mut transactions = Vec::with_capacity(tx_count);
    for _ in 0..tx_count {
        transactions.push(read_tx(&mut r)?);
    }
    r.finish()?;
    Ok(Block { header, transactions })
}

/// Decode a hex-encoded block (the `submitblock` input format).
pub fn decode_hex_block(hexdata: &str) -> Result<Block, CodecError> {
    let bytes = hex::decode(hexdata.trim()).map_err(|_| CodecError::InvalidHex)?;
    decode_block(&bytes)
}

/// Decode a hex-encoded header (the `submitheader` input format).
pub fn decode_hex_header(hexdata: &str) -> Result<BlockHeader, CodecError> {
    let bytes = hex::decode(hexdata.trim()).map_err(|_| CodecError::InvalidHex)?;
    decode_header(&bytes)
}
