//! This module collects the pure, stateless bit-level kernels of the codec.
//!
//! Nothing in here knows about blocks: the kernels encode a run of symbols
//! into bits and decode a run of symbols from a start bit. Block layout, the
//! offset table and parallel dispatch live in `scan` and `block`.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Bit sink/source with read-ahead padding.
pub mod bitio;

/// Elias-gamma coding and the bit-by-bit reference decoder.
pub mod elias_gamma;

/// Fixed 16-bit window decoder.
pub mod window16;

/// Table-driven decoder and its table builder.
pub mod symbol_table;

/// Delta + zigzag residual pre-transform.
pub mod residual;

//==================================================================================
// 2. Decoder Selection
//==================================================================================

use crate::config::DecodeStrategy;
use crate::error::EliasgError;
use crate::traits::SymbolDecoder;

use elias_gamma::ReferenceDecoder;
use symbol_table::{SymbolTable, TableDecoder};
use window16::Window16Decoder;

/// Owns whatever state a [`DecodeStrategy`] needs and hands out its decoder.
#[derive(Debug)]
pub enum DecoderKit {
    Reference,
    Window16,
    SymbolTable(SymbolTable),
}

impl DecoderKit {
    pub fn for_strategy(strategy: DecodeStrategy) -> Result<Self, EliasgError> {
        Ok(match strategy {
            DecodeStrategy::Reference => DecoderKit::Reference,
            DecodeStrategy::Window16 => DecoderKit::Window16,
            DecodeStrategy::SymbolTable => DecoderKit::SymbolTable(SymbolTable::elias_gamma()?),
        })
    }

    /// Runs `f` with the decoder for this kit.
    pub fn with_decoder<R>(&self, f: impl FnOnce(&dyn SymbolDecoder) -> R) -> R {
        match self {
            DecoderKit::Reference => f(&ReferenceDecoder),
            DecoderKit::Window16 => f(&Window16Decoder),
            DecoderKit::SymbolTable(table) => f(&TableDecoder::new(table)),
        }
    }
}
