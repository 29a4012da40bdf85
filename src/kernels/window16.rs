//! This module contains the fixed-window Elias-gamma decoder.
//!
//! Each symbol is decoded from a 16-bit window assembled from the three bytes
//! starting at the byte that holds the cursor. `u16::leading_zeros` yields the
//! prefix length `h` directly and two shifts extract `n`; there is no
//! per-bit branching.
//!
//! The 17-bit code for `n = 256` does not fit the window, but its last bit is
//! always zero: a window reading `0x0080` can only be that code, so the
//! missing bit is implied.
//!
//! The three-byte read is unconditional, which is why encoded buffers carry a
//! two-byte read-ahead margin. A read that would leave the buffer is reported
//! as `ReadAheadViolation` rather than clamped.

use crate::error::EliasgError;
use crate::kernels::elias_gamma::MAX_PREFIX_ZEROS;
use crate::traits::SymbolDecoder;

//==================================================================================
// 1. Window Primitives
//==================================================================================

/// Returns the 16 bits of `bit_buffer` starting at `bit_offset`, MSB-first.
#[inline]
pub fn read_window16(bit_buffer: &[u8], bit_offset: usize) -> Result<u16, EliasgError> {
    let byte = bit_offset / 8;
    let shift = (bit_offset % 8) as u32;
    let bytes = bit_buffer
        .get(byte..byte + 3)
        .ok_or(EliasgError::ReadAheadViolation {
            needed: byte + 3,
            len: bit_buffer.len(),
        })?;
    let word = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
    // Drop the `shift` consumed bits off the top of the 24-bit word, keep 16.
    Ok(((word << shift) >> 8) as u16)
}

/// Decodes the code at the top of `window`. Returns `(symbol, bit_width)`.
#[inline]
pub fn decode_window(window: u16) -> Option<(u8, u32)> {
    let zeros = window.leading_zeros();
    if zeros > MAX_PREFIX_ZEROS {
        return None;
    }
    // Left-align the leading one, then right-align the h+1 bits of `n`.
    let aligned = (window as u32) << zeros;
    let n = aligned >> (16 - (zeros + 1));
    // With eight zeros only 0x0080 is a code; 0x0081..=0x00FF would mean n > 256.
    if n > 256 {
        return None;
    }
    Some(((n - 1) as u8, 2 * zeros + 1))
}

//==================================================================================
// 2. Decoder
//==================================================================================

/// Fixed 16-bit window decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Window16Decoder;

impl SymbolDecoder for Window16Decoder {
    fn name(&self) -> &'static str {
        "window16"
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
            let (symbol, width) = decode_window(window).ok_or_else(|| {
                EliasgError::EliasGammaDecodeError(format!(
                    "window 0x{:04X} at bit {} holds no valid code",
                    window, cursor
                ))
            })?;
            *slot = symbol;
            cursor += width as usize;
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

/// Decodes `num_symbols` symbols from the start of `bit_buffer`.
///
/// `bit_buffer` must carry the read-ahead margin after its last data byte.
pub fn decode(
    bit_buffer: &[u8],
    num_symbols: usize,
    output_buf: &mut Vec<u8>,
) -> Result<usize, EliasgError> {
    output_buf.clear();
    output_buf.resize(num_symbols, 0);
    Window16Decoder.decode_run(bit_buffer, 0, bit_buffer.len() * 8, output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::bitio::Padding;
    use crate::kernels::elias_gamma;

    #[test]
    fn test_read_window_at_every_shift() {
        let buf = [0b1010_1010u8, 0b1100_1100, 0b1111_0000, 0, 0];
        assert_eq!(read_window16(&buf, 0).unwrap(), 0b1010_1010_1100_1100);
        assert_eq!(read_window16(&buf, 1).unwrap(), 0b0101_0101_1001_1001);
        assert_eq!(read_window16(&buf, 4).unwrap(), 0b1010_1100_1100_1111);
        assert_eq!(read_window16(&buf, 8).unwrap(), 0b1100_1100_1111_0000);
    }

    #[test]
    fn test_window_read_past_margin_is_an_error() {
        let buf = [0xFFu8, 0x00, 0x00];
        assert!(read_window16(&buf, 7).is_ok());
        let result = read_window16(&buf, 8);
        assert!(matches!(
            result,
            Err(EliasgError::ReadAheadViolation { needed: 4, len: 3 })
        ));
    }

    #[test]
    fn test_decode_window_matches_reference_for_every_symbol() {
        for symbol in 0..=255u8 {
            let mut encoded = Vec::new();
            let bits = elias_gamma::encode(&[symbol], &mut encoded, Padding::ReadAhead).unwrap();
            let window = read_window16(&encoded, 0).unwrap();
            assert_eq!(
                decode_window(window),
                Some((symbol, bits as u32)),
                "symbol {}",
                symbol
            );
        }
    }

    #[test]
    fn test_widest_code_uses_implied_bit() {
        assert_eq!(decode_window(0x0080), Some((255, 17)));
        assert_eq!(decode_window(0x0081), None);
        assert_eq!(decode_window(0x00FF), None);
        assert_eq!(decode_window(0x007F), None);
        assert_eq!(decode_window(0x0000), None);
    }

    #[test]
    fn test_stream_decode_matches_reference() {
        let input: Vec<u8> = (0..2000u32).map(|i| ((i * 37) % 256) as u8).collect();
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&input, &mut encoded, Padding::ReadAhead).unwrap();

        let mut fast = Vec::new();
        let consumed = decode(&encoded, input.len(), &mut fast).unwrap();
        assert_eq!(consumed, bits);

        let mut reference = Vec::new();
        elias_gamma::decode(&encoded, bits, &mut reference).unwrap();
        assert_eq!(fast, reference);
        assert_eq!(fast, input);
    }

    #[test]
    fn test_missing_margin_is_detected() {
        let mut encoded = Vec::new();
        // Nine one-bit codes fit in two bytes; the first window already needs three.
        elias_gamma::encode(&[0u8; 9], &mut encoded, Padding::None).unwrap();
        assert_eq!(encoded.len(), 2);
        let mut out = Vec::new();
        let result = decode(&encoded, 9, &mut out);
        assert!(matches!(result, Err(EliasgError::ReadAheadViolation { .. })));
    }

    #[test]
    fn test_run_past_end_bit_is_an_error() {
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&[3, 3], &mut encoded, Padding::ReadAhead).unwrap();
        let mut out = [0u8; 2];
        let result = Window16Decoder.decode_run(&encoded, 0, bits - 1, &mut out);
        assert!(matches!(result, Err(EliasgError::EliasGammaDecodeError(_))));
    }
}
