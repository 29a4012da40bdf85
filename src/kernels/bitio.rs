//! This module contains the bit-level writer and reader shared by every
//! Elias-gamma kernel.
//!
//! Both sides are generic over the `bitvec` bit order. The codec uses `Msb0`
//! throughout (first bit written lands in the most significant bit of the
//! first byte); `Lsb0` is supported for the reference path only.
//!
//! The writer's `finish` implements the stream tail contract:
//! a partial final byte is filled with `1` bits, never `0` bits, so trailing
//! pad can't be mistaken for the unary prefix of another code. In
//! `Padding::ReadAhead` mode two zero bytes follow, which lets fixed-window
//! decoders read three bytes at any in-stream position without a bounds check.

use bitvec::prelude::*;

use crate::error::EliasgError;

/// Number of zero bytes appended after the last data byte in read-ahead mode.
pub const READ_AHEAD_MARGIN: usize = 2;

/// Trailing padding policy applied by [`BitWriter::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Only round up to a byte boundary.
    None,
    /// Round up, then append [`READ_AHEAD_MARGIN`] zero bytes.
    #[default]
    ReadAhead,
}

impl Padding {
    pub fn trailing_bytes(self) -> usize {
        match self {
            Padding::None => 0,
            Padding::ReadAhead => READ_AHEAD_MARGIN,
        }
    }
}

//==================================================================================
// 1. BitWriter
//==================================================================================

/// Append-only bit sink backed by a `BitVec<u8, O>`.
#[derive(Debug, Clone, Default)]
pub struct BitWriter<O: BitOrder = Msb0> {
    bits: BitVec<u8, O>,
}

impl<O: BitOrder> BitWriter<O> {
    pub fn new() -> Self {
        Self { bits: BitVec::new() }
    }

    /// Preallocates room for `num_bits` bits.
    pub fn with_capacity(num_bits: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(num_bits),
        }
    }

    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Writes `count` zero bits.
    #[inline]
    pub fn write_zeros(&mut self, count: usize) {
        let len = self.bits.len();
        self.bits.resize(len + count, false);
    }

    /// Writes the low `count` bits of `value`, most significant of them first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        for i in (0..count).rev() {
            self.bits.push((value >> i) & 1 != 0);
        }
    }

    /// Number of meaningful bits written so far.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Flushes the stream into bytes: pads the final partial byte with `1`
    /// bits and appends the read-ahead margin when requested.
    pub fn finish(mut self, padding: Padding) -> Vec<u8> {
        let len = self.bits.len();
        let rem = len % 8;
        if rem != 0 {
            self.bits.resize(len + (8 - rem), true);
        }
        let mut bytes = self.bits.into_vec();
        bytes.resize(bytes.len() + padding.trailing_bytes(), 0);
        bytes
    }
}

//==================================================================================
// 2. BitReader
//==================================================================================

/// A bounded cursor over a bit stream.
///
/// The reader only yields bits in `[start, end)`, so the physical padding
/// after the logical end of the stream is never consumed. Each decode lane
/// owns its own reader; the underlying bytes are shared and immutable.
#[derive(Debug, Clone)]
pub struct BitReader<'a, O: BitOrder = Msb0> {
    bits: &'a BitSlice<u8, O>,
    cursor: usize,
    end: usize,
}

impl<'a, O: BitOrder> BitReader<'a, O> {
    /// A reader over the first `num_bits` bits of `bytes`.
    pub fn new(bytes: &'a [u8], num_bits: usize) -> Result<Self, EliasgError> {
        Self::with_range(bytes, 0, num_bits)
    }

    /// A reader over bits `[start_bit, end_bit)` of `bytes`.
    pub fn with_range(bytes: &'a [u8], start_bit: usize, end_bit: usize) -> Result<Self, EliasgError> {
        let available = bytes.len() * 8;
        if start_bit > end_bit || end_bit > available {
            return Err(EliasgError::ReadAheadViolation {
                needed: end_bit.div_ceil(8),
                len: bytes.len(),
            });
        }
        Ok(Self {
            bits: BitSlice::from_slice(bytes),
            cursor: start_bit,
            end: end_bit,
        })
    }

    /// Reads one bit, or `None` once the declared end is reached.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        if self.cursor >= self.end {
            return None;
        }
        let bit = self.bits[self.cursor];
        self.cursor += 1;
        Some(bit)
    }

    /// Reads `count` bits, most significant first.
    pub fn read_bits(&mut self, count: u32) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Some(value)
    }

    /// Current absolute bit offset.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Byte holding the next unread bit.
    pub fn byte_offset(&self) -> usize {
        self.cursor / 8
    }

    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.end
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_layout() {
        let mut writer = BitWriter::<Msb0>::new();
        writer.write_bits(0b101, 3);
        writer.write_zeros(2);
        writer.write_bit(true);
        writer.write_bits(0b11, 2);
        assert_eq!(writer.len(), 8);
        assert_eq!(writer.finish(Padding::None), vec![0b1010_0111]);
    }

    #[test]
    fn test_partial_byte_is_padded_with_ones() {
        let mut writer = BitWriter::<Msb0>::new();
        writer.write_bits(0b001, 3);
        assert_eq!(writer.finish(Padding::None), vec![0b0011_1111]);
    }

    #[test]
    fn test_read_ahead_margin_is_zero_bytes() {
        let mut writer = BitWriter::<Msb0>::new();
        writer.write_bits(0xFF, 8);
        writer.write_bit(false);
        let bytes = writer.finish(Padding::ReadAhead);
        assert_eq!(bytes, vec![0xFF, 0b0111_1111, 0, 0]);
    }

    #[test]
    fn test_lsb_order_reverses_within_byte() {
        let mut writer = BitWriter::<Lsb0>::new();
        writer.write_bits(0b1000_0000, 8);
        assert_eq!(writer.finish(Padding::None), vec![0b0000_0001]);
    }

    #[test]
    fn test_reader_stops_at_declared_end() {
        let bytes = [0b1100_0000u8, 0xFF, 0x00, 0x00];
        let mut reader = BitReader::<Msb0>::new(&bytes, 3).unwrap();
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bits(2), Some(0b10));
        assert!(reader.is_finished());
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_reader_range_and_bounds() {
        let bytes = [0x0Fu8, 0xF0];
        let mut reader = BitReader::<Msb0>::with_range(&bytes, 4, 12).unwrap();
        assert_eq!(reader.byte_offset(), 0);
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.remaining(), 0);

        let result = BitReader::<Msb0>::new(&bytes, 17);
        assert!(matches!(
            result,
            Err(EliasgError::ReadAheadViolation { needed: 3, len: 2 })
        ));
    }
}
