//! This module contains the table-driven symbol decoder and the builder for
//! its lookup table.
//!
//! The table has one `VariableBitWidthSymbol` per possible 16-bit window. A
//! code of width `w <= 16` owns the `2^(16 - w)` consecutive entries that
//! start with its bits; decoding is then a single lookup per symbol, with no
//! Elias-gamma arithmetic at all. Codes wider than 16 bits are accepted only
//! when every bit past the 16th is zero, which covers the 17-bit Elias-gamma
//! code for 255.
//!
//! The builder takes arbitrary `(symbol, code, width)` triples, so any
//! prefix-free code (for instance a Huffman code) can be plugged in. The
//! entries are `Pod`, so a table can be handed to a device buffer as raw bytes.

use bytemuck::{Pod, Zeroable};

use crate::error::EliasgError;
use crate::kernels::elias_gamma::{bit_width, MAX_CODE_BITS};
use crate::kernels::window16::read_window16;
use crate::traits::SymbolDecoder;
use crate::utils::safe_bytes_to_typed_slice;

/// Number of window bits used to index the table.
pub const TABLE_INDEX_BITS: u32 = 16;
/// Number of entries in a table.
pub const TABLE_SIZE: usize = 1 << TABLE_INDEX_BITS;

/// A decoded symbol and the number of bits its code consumed.
/// `bit_width == 0` marks a window that starts no valid code.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct VariableBitWidthSymbol {
    pub symbol: u8,
    pub bit_width: u8,
}

impl VariableBitWidthSymbol {
    pub fn is_valid(&self) -> bool {
        self.bit_width != 0
    }
}

//==================================================================================
// 1. Table
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<VariableBitWidthSymbol>,
}

impl SymbolTable {
    /// Builds a table from `(symbol, code, width)` triples.
    ///
    /// # Errors
    /// `SymbolTableError` when a width is outside `1..=17`, a code does not fit
    /// its width, a code wider than 16 bits has a non-zero tail, or two codes
    /// claim the same window (the code is not prefix-free).
    pub fn from_codes(codes: &[(u8, u32, u8)]) -> Result<Self, EliasgError> {
        let mut entries = vec![VariableBitWidthSymbol::default(); TABLE_SIZE];

        for &(symbol, code, width) in codes {
            let width_u32 = width as u32;
            if width == 0 || width_u32 > MAX_CODE_BITS {
                return Err(EliasgError::SymbolTableError(format!(
                    "symbol {} has unsupported code width {}",
                    symbol, width
                )));
            }
            if code >> width_u32 != 0 {
                return Err(EliasgError::SymbolTableError(format!(
                    "code 0x{:X} for symbol {} does not fit in {} bits",
                    code, symbol, width
                )));
            }

            let (start, count) = if width_u32 <= TABLE_INDEX_BITS {
                let free = TABLE_INDEX_BITS - width_u32;
                ((code << free) as usize, 1usize << free)
            } else {
                let extra = width_u32 - TABLE_INDEX_BITS;
                if code & ((1 << extra) - 1) != 0 {
                    return Err(EliasgError::SymbolTableError(format!(
                        "{}-bit code for symbol {} has non-zero bits past the window",
                        width, symbol
                    )));
                }
                ((code >> extra) as usize, 1)
            };

            for entry in &mut entries[start..start + count] {
                if entry.is_valid() {
                    return Err(EliasgError::SymbolTableError(format!(
                        "code for symbol {} collides with symbol {}",
                        symbol, entry.symbol
                    )));
                }
                *entry = VariableBitWidthSymbol {
                    symbol,
                    bit_width: width,
                };
            }
        }

        Ok(Self { entries })
    }

    /// The table for the byte Elias-gamma code (`s -> s + 1`).
    pub fn elias_gamma() -> Result<Self, EliasgError> {
        let codes: Vec<(u8, u32, u8)> = (0..=255u8)
            .map(|s| (s, s as u32 + 1, bit_width(s) as u8))
            .collect();
        Self::from_codes(&codes)
    }

    /// Rebuilds a table from its raw byte form (see [`SymbolTable::as_bytes`]).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EliasgError> {
        if bytes.len() != TABLE_SIZE * std::mem::size_of::<VariableBitWidthSymbol>() {
            return Err(EliasgError::SymbolTableError(format!(
                "expected {} table bytes, got {}",
                TABLE_SIZE * std::mem::size_of::<VariableBitWidthSymbol>(),
                bytes.len()
            )));
        }
        let entries = safe_bytes_to_typed_slice::<VariableBitWidthSymbol>(bytes)?;
        Ok(Self {
            entries: entries.to_vec(),
        })
    }

    #[inline]
    pub fn lookup(&self, window: u16) -> VariableBitWidthSymbol {
        self.entries[window as usize]
    }

    pub fn as_slice(&self) -> &[VariableBitWidthSymbol] {
        &self.entries
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    pub fn num_valid_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.is_valid()).count()
    }
}

//==================================================================================
// 2. Decoder
//==================================================================================

/// Table-driven decoder over a borrowed [`SymbolTable`].
#[derive(Debug, Clone, Copy)]
pub struct TableDecoder<'t> {
    table: &'t SymbolTable,
}

impl<'t> TableDecoder<'t> {
    pub fn new(table: &'t SymbolTable) -> Self {
        Self { table }
    }
}

impl SymbolDecoder for TableDecoder<'_> {
    fn name(&self) -> &'static str {
        "symbol_table"
    }

    fn decode_run(
        &self,
        bit_buffer: &[u8],
        start_bit: usize,
        end_bit: usize,
        out: &mut [u8],
    ) -> Result<usize, EliasgError> {
        let mut cursor = start_bit;
        for slot in out.iter_mut() {
            let window = read_window16(bit_buffer, cursor)?;
            let entry = self.table.lookup(window);
            if !entry.is_valid() {
                return Err(EliasgError::EliasGammaDecodeError(format!(
                    "window 0x{:04X} at bit {} has no table entry",
                    window, cursor
                )));
            }
            *slot = entry.symbol;
            cursor += entry.bit_width as usize;
        }
        if cursor > end_bit {
            return Err(EliasgError::EliasGammaDecodeError(format!(
                "run decoded through bit {} past its end at bit {}",
                cursor, end_bit
            )));
        }
        Ok(cursor)
    }
}
