//! This module contains the block-wise layer of the codec: splitting a symbol
//! stream into fixed-size blocks, computing each block's start bit offset with
//! the exclusive scan, and describing the result so any block can be decoded
//! on its own.
//!
//! The encode pass runs in three steps:
//! 1. Per-block bit lengths are summed from `bit_width` alone, without
//!    writing any bits (in parallel when configured).
//! 2. The exclusive scan over those lengths yields the offset table.
//! 3. One sequential writer emits every code into a single buffer with the
//!    read-ahead margin. With `verify_offsets`, the writer's position at each
//!    block boundary is checked against the table, and the tree scan is
//!    checked against the serial running sum.

use bitvec::prelude::Msb0;
use log::debug;
use rayon::prelude::*;

use crate::config::{CodecConfig, Execution};
use crate::error::EliasgError;
use crate::kernels::bitio::{Padding, READ_AHEAD_MARGIN};
use crate::kernels::elias_gamma::{self, EliasGammaEncoder};
use crate::scan::{self, ScanKind};

pub mod decoder;
pub mod layout;

pub use decoder::{
    decode_bits, decode_block, decode_block_symbols, decode_blocks_parallel, BlockDecoder,
};
pub use layout::{flatten_blocks, split_into_blocks, BlockGrid};

//==================================================================================
// 1. Block Stream Views
//==================================================================================

/// A borrowed, read-only view of a block-encoded stream. This is everything a
/// decode lane needs; nothing in it is ever mutated after encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStream<'a> {
    /// Packed codes followed by the read-ahead margin.
    pub bit_buffer: &'a [u8],
    /// Meaningful bits in `bit_buffer`.
    pub num_bits: usize,
    pub num_symbols: usize,
    pub symbols_per_block: usize,
    /// Exclusive scan of the per-block bit lengths.
    pub block_offsets: &'a [u32],
}

impl<'a> BlockStream<'a> {
    pub fn num_blocks(&self) -> usize {
        self.block_offsets.len()
    }

    /// Symbols held by `block`; only the last block may be short. Zero for a
    /// block past the end.
    pub fn block_symbol_count(&self, block: usize) -> usize {
        block
            .checked_mul(self.symbols_per_block)
            .map_or(0, |start| {
                self.symbols_per_block
                    .min(self.num_symbols.saturating_sub(start))
            })
    }

    /// `[start, end)` bit range of `block`.
    pub fn block_bit_range(&self, block: usize) -> Result<(usize, usize), EliasgError> {
        let start = *self.block_offsets.get(block).ok_or_else(|| {
            EliasgError::OffsetTableError(format!(
                "block {} is out of range for {} blocks",
                block,
                self.num_blocks()
            ))
        })? as usize;
        let end = self
            .block_offsets
            .get(block + 1)
            .map_or(self.num_bits, |&next| next as usize);
        Ok((start, end))
    }

    /// Checks the structural invariants every decoder relies on.
    pub fn validate(&self) -> Result<(), EliasgError> {
        if self.symbols_per_block == 0 {
            return Err(EliasgError::ConfigError(
                "symbols_per_block must be at least 1".to_string(),
            ));
        }

        let expected_blocks = self.num_symbols.div_ceil(self.symbols_per_block);
        if self.block_offsets.len() != expected_blocks {
            return Err(EliasgError::OffsetTableError(format!(
                "{} symbols in blocks of {} need {} offsets, table has {}",
                self.num_symbols,
                self.symbols_per_block,
                expected_blocks,
                self.block_offsets.len()
            )));
        }

        if let Some(&first) = self.block_offsets.first() {
            if first != 0 {
                return Err(EliasgError::OffsetTableError(format!(
                    "first block starts at bit {}, expected 0",
                    first
                )));
            }
        }
        if let Some(i) = self.block_offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(EliasgError::OffsetTableError(format!(
                "offset {} decreases after offset {}",
                i + 1,
                i
            )));
        }
        if let Some(&last) = self.block_offsets.last() {
            if last as usize >= self.num_bits {
                return Err(EliasgError::OffsetTableError(format!(
                    "last block starts at bit {} but the stream has {} bits",
                    last, self.num_bits
                )));
            }
        }

        let required = if self.num_bits == 0 {
            0
        } else {
            self.num_bits.div_ceil(8) + READ_AHEAD_MARGIN
        };
        if self.bit_buffer.len() < required {
            return Err(EliasgError::ReadAheadViolation {
                needed: required,
                len: self.bit_buffer.len(),
            });
        }
        Ok(())
    }
}

/// The owned output of [`encode_blocks`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockEncoding {
    pub bit_buffer: Vec<u8>,
    pub num_bits: usize,
    pub num_symbols: usize,
    pub symbols_per_block: usize,
    pub block_offsets: Vec<u32>,
}

impl BlockEncoding {
    pub fn as_stream(&self) -> BlockStream<'_> {
        BlockStream {
            bit_buffer: &self.bit_buffer,
            num_bits: self.num_bits,
            num_symbols: self.num_symbols,
            symbols_per_block: self.symbols_per_block,
            block_offsets: &self.block_offsets,
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.block_offsets.len()
    }

    /// Bits used by each block, recovered from the offset table.
    pub fn block_bit_lengths(&self) -> Result<Vec<u32>, EliasgError> {
        let total = u32::try_from(self.num_bits).map_err(|_| {
            EliasgError::OffsetTableError(format!(
                "{} bits overflow the u32 offset table",
                self.num_bits
            ))
        })?;
        self.block_offsets
            .iter()
            .zip(self.block_offsets.iter().skip(1).chain(std::iter::once(&total)))
            .map(|(&start, &end)| {
                end.checked_sub(start).ok_or_else(|| {
                    EliasgError::OffsetTableError(format!(
                        "block ends at bit {} before its start at bit {}",
                        end, start
                    ))
                })
            })
            .collect()
    }
}

//==================================================================================
// 2. Encoder
//==================================================================================

/// Bit length of every block, from `bit_width` alone.
pub fn block_bit_lengths(
    symbols: &[u8],
    symbols_per_block: usize,
    execution: Execution,
) -> Result<Vec<u32>, EliasgError> {
    let length_of = |block: &[u8]| {
        u32::try_from(elias_gamma::num_bits(block)).map_err(|_| {
            EliasgError::ScanError(format!(
                "a block of {} symbols does not fit a u32 bit length",
                block.len()
            ))
        })
    };
    match execution {
        Execution::Parallel => symbols.par_chunks(symbols_per_block).map(length_of).collect(),
        Execution::Serial => symbols.chunks(symbols_per_block).map(length_of).collect(),
    }
}

/// Encodes `symbols` in blocks of `symbols_per_block` and builds the offset
/// table. The final block may be short.
pub fn encode_blocks(
    symbols: &[u8],
    symbols_per_block: usize,
    config: &CodecConfig,
) -> Result<BlockEncoding, EliasgError> {
    if symbols_per_block == 0 {
        return Err(EliasgError::ConfigError(
            "symbols_per_block must be at least 1".to_string(),
        ));
    }
    if symbols.is_empty() {
        return Ok(BlockEncoding {
            symbols_per_block,
            ..BlockEncoding::default()
        });
    }

    let lengths = block_bit_lengths(symbols, symbols_per_block, config.execution)?;
    let offsets = scan::scan_with(&lengths, ScanKind::Exclusive, config.execution)?;
    let total_bits = scan::checked_total(&lengths)? as usize;

    let mut encoder = EliasGammaEncoder::<Msb0>::with_capacity(total_bits);
    for (block, chunk) in symbols.chunks(symbols_per_block).enumerate() {
        if config.verify_offsets && encoder.num_encoded_bits() != offsets[block] as usize {
            return Err(EliasgError::OffsetTableError(format!(
                "block {} starts at bit {} but the table says {}",
                block,
                encoder.num_encoded_bits(),
                offsets[block]
            )));
        }
        encoder.encode_all(chunk);
    }
    let encoded = encoder.finish(Padding::ReadAhead);

    if config.verify_offsets {
        if scan::serial_exclusive_scan(&lengths)? != offsets {
            return Err(EliasgError::ScanError(
                "tree scan disagrees with the serial running sum".to_string(),
            ));
        }
        let written = u32::try_from(encoded.num_bits).map_err(|_| {
            EliasgError::OffsetTableError(format!(
                "{} bits overflow the u32 offset table",
                encoded.num_bits
            ))
        })?;
        scan::check_exclusive(&lengths, &offsets, written)?;
    }

    debug!(
        "encode_blocks: {} symbols in {} blocks -> {} bits ({} bytes with margin)",
        symbols.len(),
        offsets.len(),
        encoded.num_bits,
        encoded.bytes.len()
    );
    log_metric!("encode.num_blocks", offsets.len());
    log_metric!("encode.num_bits", encoded.num_bits);
    log_metric!(
        "encode.bits_per_symbol",
        format!("{:.3}", encoded.num_bits as f64 / symbols.len() as f64)
    );

    Ok(BlockEncoding {
        bit_buffer: encoded.bytes,
        num_bits: encoded.num_bits,
        num_symbols: symbols.len(),
        symbols_per_block,
        block_offsets: offsets,
    })
}

//==================================================================================
// 3. Image Helpers
//==================================================================================

/// A 2-D image encoded in `block_dim x block_dim` tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEncoding {
    pub grid: BlockGrid,
    pub blocks: BlockEncoding,
}

/// Zero-pads `image` to whole tiles, reorders it into block order and encodes
/// one tile per block.
pub fn encode_image_blocks(
    image: &[u8],
    width: usize,
    height: usize,
    config: &CodecConfig,
) -> Result<ImageEncoding, EliasgError> {
    config.validate()?;
    let grid = BlockGrid::new(width, height, config.block_dim)?;
    let block_values = split_into_blocks(image, &grid)?;
    let blocks = config.install(|| encode_blocks(&block_values, grid.symbols_per_block(), config))??;
    Ok(ImageEncoding { grid, blocks })
}

/// Decodes every tile and returns the image in raster order.
pub fn decode_image_blocks(
    encoding: &ImageEncoding,
    config: &CodecConfig,
) -> Result<Vec<u8>, EliasgError> {
    if encoding.blocks.symbols_per_block != encoding.grid.symbols_per_block() {
        return Err(EliasgError::LayoutError(format!(
            "blocks hold {} symbols but the grid tiles hold {}",
            encoding.blocks.symbols_per_block,
            encoding.grid.symbols_per_block()
        )));
    }
    let decoder = BlockDecoder::from_config(config)?;
    let mut block_values = Vec::new();
    config.install(|| decoder.decode(&encoding.blocks.as_stream(), &mut block_values))??;
    flatten_blocks(&block_values, &encoding.grid)
}
