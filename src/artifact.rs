//! Defines the self-describing byte format for one block-encoded stream.
//! This module is the single source of truth for serialization, deserialization,
//! and cheap metadata peeking of the artifact.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic "EGBS" | version u16 | flags u8 | symbols_per_block u32 | num_symbols u64
//! | num_bits u64 | num_blocks u32 | payload_len u64
//! | num_blocks x u32 block start bit offsets
//! | payload (packed codes + read-ahead margin)
//! ```

use std::io::{Cursor, Read};

use crate::block::{BlockEncoding, BlockStream};
use crate::error::EliasgError;
use crate::kernels::bitio::READ_AHEAD_MARGIN;
use crate::utils::{read_u32_le_slice, write_u32_le_slice};

//==================================================================================
// Format Constants
//==================================================================================
pub const ARTIFACT_MAGIC: &[u8; 4] = b"EGBS";
pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

/// Flag bit set when the residual transform was applied before encoding.
pub const FLAG_RESIDUAL: u8 = 0b0000_0001;
const KNOWN_FLAGS: u8 = FLAG_RESIDUAL;

/// Size of the fixed part of the header.
const FIXED_HEADER_SIZE: usize = 4 + 2 + 1 + 4 + 8 + 8 + 4 + 8;

//==================================================================================
// Public Structs
//==================================================================================

/// Metadata parsed from an artifact's header, without touching the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub format_version: u16,
    pub residual_transform: bool,
    pub symbols_per_block: usize,
    pub num_symbols: usize,
    pub num_bits: usize,
    pub num_blocks: usize,
    pub payload_len: usize,
    /// Bytes before the payload, offset table included.
    pub header_size: usize,
}

impl HeaderInfo {
    /// Total artifact size implied by the header.
    pub fn total_size(&self) -> usize {
        self.header_size + self.payload_len
    }
}

/// A block-encoded stream plus the flags needed to undo the pre-transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedArtifact {
    pub residual_transform: bool,
    pub encoding: BlockEncoding,
}

/// Payload length a well-formed artifact carries for `num_bits` bits.
pub fn expected_payload_len(num_bits: usize) -> usize {
    if num_bits == 0 {
        0
    } else {
        num_bits.div_ceil(8) + READ_AHEAD_MARGIN
    }
}

//==================================================================================
// Core Implementation
//==================================================================================

impl CompressedArtifact {
    /// Serializes the artifact into its canonical byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EliasgError> {
        let encoding = &self.encoding;
        encoding.as_stream().validate()?;
        if encoding.bit_buffer.len() != expected_payload_len(encoding.num_bits) {
            return Err(EliasgError::FormatError(format!(
                "payload is {} bytes, {} bits need exactly {}",
                encoding.bit_buffer.len(),
                encoding.num_bits,
                expected_payload_len(encoding.num_bits)
            )));
        }

        let symbols_per_block = u32::try_from(encoding.symbols_per_block).map_err(|_| {
            EliasgError::FormatError(format!(
                "{} symbols per block does not fit the header",
                encoding.symbols_per_block
            ))
        })?;
        let num_blocks = u32::try_from(encoding.num_blocks()).map_err(|_| {
            EliasgError::FormatError(format!(
                "{} blocks do not fit the header",
                encoding.num_blocks()
            ))
        })?;
        let flags = if self.residual_transform { FLAG_RESIDUAL } else { 0 };

        let mut out = Vec::with_capacity(
            FIXED_HEADER_SIZE + encoding.block_offsets.len() * 4 + encoding.bit_buffer.len(),
        );
        out.extend_from_slice(ARTIFACT_MAGIC);
        out.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
        out.push(flags);
        out.extend_from_slice(&symbols_per_block.to_le_bytes());
        out.extend_from_slice(&(encoding.num_symbols as u64).to_le_bytes());
        out.extend_from_slice(&(encoding.num_bits as u64).to_le_bytes());
        out.extend_from_slice(&num_blocks.to_le_bytes());
        out.extend_from_slice(&(encoding.bit_buffer.len() as u64).to_le_bytes());
        write_u32_le_slice(&encoding.block_offsets, &mut out);
        out.extend_from_slice(&encoding.bit_buffer);
        Ok(out)
    }

    /// Deserializes and validates a full artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EliasgError> {
        let (info, offsets, payload) = split_artifact(bytes)?;
        let encoding = BlockEncoding {
            bit_buffer: payload.to_vec(),
            num_bits: info.num_bits,
            num_symbols: info.num_symbols,
            symbols_per_block: info.symbols_per_block,
            block_offsets: offsets,
        };
        encoding.as_stream().validate()?;
        Ok(Self {
            residual_transform: info.residual_transform,
            encoding,
        })
    }

    /// Parses and checks the header only.
    pub fn peek_info(bytes: &[u8]) -> Result<HeaderInfo, EliasgError> {
        if bytes.len() < FIXED_HEADER_SIZE {
            return Err(EliasgError::FormatError(format!(
                "artifact is too small to be valid. Minimum size: {}, got: {}",
                FIXED_HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let map_err = |e: std::io::Error| EliasgError::FormatError(e.to_string());

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic).map_err(map_err)?;
        if magic != *ARTIFACT_MAGIC {
            return Err(EliasgError::FormatError("invalid artifact magic number".into()));
        }

        let mut u16_buf = [0u8; 2];
        cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != ARTIFACT_FORMAT_VERSION {
            return Err(EliasgError::FormatError(format!(
                "unsupported artifact version: expected {}, got {}",
                ARTIFACT_FORMAT_VERSION, version
            )));
        }

        let mut flags = [0u8; 1];
        cursor.read_exact(&mut flags).map_err(map_err)?;
        let flags = flags[0];
        if flags & !KNOWN_FLAGS != 0 {
            return Err(EliasgError::FormatError(format!(
                "unknown flag bits 0x{:02X}",
                flags & !KNOWN_FLAGS
            )));
        }

        let mut u32_buf = [0u8; 4];
        let mut u64_buf = [0u8; 8];

        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let symbols_per_block = u32::from_le_bytes(u32_buf) as usize;
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let num_symbols = to_usize(u64::from_le_bytes(u64_buf), "num_symbols")?;
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let num_bits = to_usize(u64::from_le_bytes(u64_buf), "num_bits")?;
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let num_blocks = u32::from_le_bytes(u32_buf) as usize;
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let payload_len = to_usize(u64::from_le_bytes(u64_buf), "payload_len")?;

        if symbols_per_block == 0 {
            return Err(EliasgError::FormatError("symbols_per_block is zero".into()));
        }
        let expected_blocks = num_symbols.div_ceil(symbols_per_block);
        if num_blocks != expected_blocks {
            return Err(EliasgError::FormatError(format!(
                "{} symbols in blocks of {} need {} blocks, header says {}",
                num_symbols, symbols_per_block, expected_blocks, num_blocks
            )));
        }
        if payload_len != expected_payload_len(num_bits) {
            return Err(EliasgError::FormatError(format!(
                "payload length {} does not match {} bits (expected {})",
                payload_len,
                num_bits,
                expected_payload_len(num_bits)
            )));
        }

        Ok(HeaderInfo {
            format_version: version,
            residual_transform: flags & FLAG_RESIDUAL != 0,
            symbols_per_block,
            num_symbols,
            num_bits,
            num_blocks,
            payload_len,
            header_size: FIXED_HEADER_SIZE + num_blocks * 4,
        })
    }
}

/// Splits an artifact into its header, offset table and payload slice, with
/// the payload borrowed from `bytes`.
pub fn split_artifact(bytes: &[u8]) -> Result<(HeaderInfo, Vec<u32>, &[u8]), EliasgError> {
    let info = CompressedArtifact::peek_info(bytes)?;
    if bytes.len() != info.total_size() {
        return Err(EliasgError::FormatError(format!(
            "artifact is {} bytes, header implies {}",
            bytes.len(),
            info.total_size()
        )));
    }
    let offsets = read_u32_le_slice(&bytes[FIXED_HEADER_SIZE..info.header_size])?;
    let payload = &bytes[info.header_size..];
    Ok((info, offsets, payload))
}

/// Validates a borrowed view over `payload` for the given header and table.
pub fn stream_view<'a>(
    info: &HeaderInfo,
    offsets: &'a [u32],
    payload: &'a [u8],
) -> Result<BlockStream<'a>, EliasgError> {
    let stream = BlockStream {
        bit_buffer: payload,
        num_bits: info.num_bits,
        num_symbols: info.num_symbols,
        symbols_per_block: info.symbols_per_block,
        block_offsets: offsets,
    };
    stream.validate()?;
    Ok(stream)
}

fn to_usize(value: u64, field: &str) -> Result<usize, EliasgError> {
    usize::try_from(value)
        .map_err(|_| EliasgError::FormatError(format!("{} = {} overflows usize", field, value)))
}
