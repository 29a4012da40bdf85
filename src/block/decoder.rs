//! This module contains the block-parallel decode path.
//!
//! Decoding block `k` is a pure function of the immutable bit buffer, the
//! block's start offset and its symbol count. Blocks write disjoint output
//! chunks, so the parallel path hands each rayon task its own `&mut [u8]` and
//! needs no synchronisation at all.
//!
//! Every block is checked on the way out: the decoder must land exactly on the
//! next block's start offset (or on `num_bits` for the last block). Any other
//! outcome means the encoder's bit accounting and the offset table disagree,
//! and is reported as `BlockLengthMismatch`.

use bitvec::prelude::Msb0;
use log::{debug, trace};
use rayon::prelude::*;

use crate::block::BlockStream;
use crate::config::{CodecConfig, DecodeStrategy, Execution};
use crate::error::EliasgError;
use crate::kernels::bitio::{BitReader, READ_AHEAD_MARGIN};
use crate::kernels::elias_gamma::decode_symbol;
use crate::kernels::DecoderKit;
use crate::traits::SymbolDecoder;

//==================================================================================
// 1. Generic Sequential Decode
//==================================================================================

/// Decodes `num_symbols` symbols bit by bit starting at `start_bit`.
///
/// `bit_buffer` must end with the read-ahead margin; the margin itself is
/// never decoded. When `bit_offset_table` is given it receives the start bit
/// of every decoded symbol, which is the exclusive scan of the symbols' code
/// widths shifted by `start_bit`.
///
/// Returns the bit offset just past the last symbol.
pub fn decode_bits(
    bit_buffer: &[u8],
    start_bit: usize,
    num_symbols: usize,
    output_buf: &mut Vec<u8>,
    mut bit_offset_table: Option<&mut Vec<usize>>,
) -> Result<usize, EliasgError> {
    output_buf.clear();
    if let Some(table) = bit_offset_table.as_deref_mut() {
        table.clear();
    }
    if num_symbols == 0 {
        return Ok(start_bit);
    }

    let data_bytes = bit_buffer
        .len()
        .checked_sub(READ_AHEAD_MARGIN)
        .filter(|&n| n > 0)
        .ok_or(EliasgError::EmptyInput(num_symbols))?;
    let mut reader = BitReader::<Msb0>::with_range(bit_buffer, start_bit, data_bytes * 8)?;

    output_buf.reserve(num_symbols);
    if let Some(table) = bit_offset_table.as_deref_mut() {
        table.reserve(num_symbols);
    }
    for _ in 0..num_symbols {
        if let Some(table) = bit_offset_table.as_deref_mut() {
            table.push(reader.position());
        }
        output_buf.push(decode_symbol(&mut reader)?);
    }
    Ok(reader.position())
}

//==================================================================================
// 2. Per-Block Decode
//==================================================================================

/// Decodes block `block` of `stream` into `out`, which must be exactly the
/// block's symbol count long.
pub fn decode_block(
    stream: &BlockStream<'_>,
    decoder: &dyn SymbolDecoder,
    block: usize,
    out: &mut [u8],
) -> Result<(), EliasgError> {
    let (start, end) = stream.block_bit_range(block)?;
    let expected_symbols = stream.block_symbol_count(block);
    if out.len() != expected_symbols {
        return Err(EliasgError::InternalError(format!(
            "block {} holds {} symbols, output chunk has room for {}",
            block,
            expected_symbols,
            out.len()
        )));
    }

    let cursor = decoder.decode_run(stream.bit_buffer, start, end, out)?;
    if cursor != end {
        return Err(EliasgError::BlockLengthMismatch {
            block,
            expected: end - start,
            actual: cursor - start,
        });
    }
    trace!(
        "block {}: {} symbols from bits [{}, {}) via {}",
        block,
        expected_symbols,
        start,
        end,
        decoder.name()
    );
    Ok(())
}

/// Decodes every block one after another, each from its own table offset.
///
/// This is the single-lane simulation of the parallel dispatch: no block looks
/// at any state left behind by the previous one.
pub fn decode_block_symbols(
    stream: &BlockStream<'_>,
    decoder: &dyn SymbolDecoder,
    output_buf: &mut Vec<u8>,
) -> Result<(), EliasgError> {
    stream.validate()?;
    output_buf.clear();
    output_buf.resize(stream.num_symbols, 0);

    for (block, out) in output_buf.chunks_mut(stream.symbols_per_block).enumerate() {
        decode_block(stream, decoder, block, out)?;
    }
    Ok(())
}

/// Decodes all blocks concurrently on the current rayon pool.
pub fn decode_blocks_parallel(
    stream: &BlockStream<'_>,
    decoder: &dyn SymbolDecoder,
    output_buf: &mut Vec<u8>,
) -> Result<(), EliasgError> {
    stream.validate()?;
    output_buf.clear();
    output_buf.resize(stream.num_symbols, 0);

    output_buf
        .par_chunks_mut(stream.symbols_per_block)
        .enumerate()
        .try_for_each(|(block, out)| decode_block(stream, decoder, block, out))
}

//==================================================================================
// 3. Configured Decoder
//==================================================================================

/// A decode strategy plus an execution mode, ready to decode block streams.
#[derive(Debug)]
pub struct BlockDecoder {
    kit: DecoderKit,
    execution: Execution,
}

impl BlockDecoder {
    pub fn new(strategy: DecodeStrategy, execution: Execution) -> Result<Self, EliasgError> {
        Ok(Self {
            kit: DecoderKit::for_strategy(strategy)?,
            execution,
        })
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self, EliasgError> {
        Self::new(config.decode_strategy, config.execution)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.kit.with_decoder(|d| d.name())
    }

    /// Decodes the whole stream into `output_buf`.
    pub fn decode(&self, stream: &BlockStream<'_>, output_buf: &mut Vec<u8>) -> Result<(), EliasgError> {
        debug!(
            "decoding {} symbols in {} blocks ({}, {:?})",
            stream.num_symbols,
            stream.num_blocks(),
            self.strategy_name(),
            self.execution
        );
        self.kit.with_decoder(|decoder| match self.execution {
            Execution::Serial => decode_block_symbols(stream, decoder, output_buf),
            Execution::Parallel => decode_blocks_parallel(stream, decoder, output_buf),
        })
    }

    /// Decodes only block `block`.
    pub fn decode_one(
        &self,
        stream: &BlockStream<'_>,
        block: usize,
        output_buf: &mut Vec<u8>,
    ) -> Result<(), EliasgError> {
        stream.validate()?;
        stream.block_bit_range(block)?;
        output_buf.clear();
        output_buf.resize(stream.block_symbol_count(block), 0);
        self.kit
            .with_decoder(|decoder| decode_block(stream, decoder, block, output_buf))
    }
}
