//! This module contains the pure, stateless kernels for Elias-gamma encoding
//! and bit-by-bit (reference) decoding of byte symbols.
//!
//! A symbol `s` in `0..=255` is coded as `n = s + 1` so zero never reaches the
//! unary logic. With `h` the index of the highest set bit of `n`, the code is
//! `h` zero bits, a one bit, then the `h` low bits of `n`, for `2h + 1` bits in
//! total. The widest code is 17 bits (`s = 255`).

use bitvec::prelude::*;

use crate::error::EliasgError;
use crate::kernels::bitio::{BitReader, BitWriter, Padding};
use crate::traits::SymbolDecoder;

/// Width of the longest code (`s = 255`, `n = 256`).
pub const MAX_CODE_BITS: u32 = 17;

/// Largest number of zero bits a valid unary prefix may contain.
pub const MAX_PREFIX_ZEROS: u32 = 8;

//==================================================================================
// 1. Bit Width Queries
//==================================================================================

/// Returns the number of bits the Elias-gamma code for `symbol` occupies.
///
/// This is the leading-zero-count formulation; it must agree with the bit
/// count the encoder actually produces for every byte value.
#[inline]
pub fn bit_width(symbol: u8) -> u32 {
    let n = symbol as u32 + 1;
    let high_bit = 31 - n.leading_zeros();
    2 * high_bit + 1
}

/// Total code bits for a sequence of symbols, without encoding them.
pub fn num_bits(symbols: &[u8]) -> usize {
    symbols.iter().map(|&s| bit_width(s) as usize).sum()
}

/// Index of the highest set bit in `n` (`1..=256`), found by scanning.
fn high_bit_position(n: u32) -> u32 {
    (0..=MAX_PREFIX_ZEROS)
        .rev()
        .find(|&i| (n >> i) & 1 != 0)
        .unwrap_or(0)
}

//==================================================================================
// 2. Encoder
//==================================================================================

/// The output of an encode pass: the packed bytes and the count of meaningful bits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedBits {
    pub bytes: Vec<u8>,
    pub num_bits: usize,
}

/// Streaming Elias-gamma encoder.
#[derive(Debug, Clone, Default)]
pub struct EliasGammaEncoder<O: BitOrder = Msb0> {
    writer: BitWriter<O>,
    num_symbols: usize,
}

impl<O: BitOrder> EliasGammaEncoder<O> {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(),
            num_symbols: 0,
        }
    }

    /// Preallocates for `num_bits` output bits (see [`num_bits`]).
    pub fn with_capacity(num_bits: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(num_bits),
            num_symbols: 0,
        }
    }

    pub fn encode_symbol(&mut self, symbol: u8) {
        let n = symbol as u32 + 1;
        let high_bit = high_bit_position(n);
        self.writer.write_zeros(high_bit as usize);
        // The leading one of `n` doubles as the prefix terminator.
        self.writer.write_bits(n, high_bit + 1);
        self.num_symbols += 1;
    }

    pub fn encode_all(&mut self, symbols: &[u8]) {
        for &symbol in symbols {
            self.encode_symbol(symbol);
        }
    }

    pub fn num_encoded_bits(&self) -> usize {
        self.writer.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Flushes the stream. An encoder that saw no symbols yields no bytes at
    /// all, whatever the padding policy.
    pub fn finish(self, padding: Padding) -> EncodedBits {
        if self.writer.is_empty() {
            return EncodedBits::default();
        }
        let num_bits = self.writer.len();
        EncodedBits {
            bytes: self.writer.finish(padding),
            num_bits,
        }
    }
}

//==================================================================================
// 3. Reference Decoder
//==================================================================================

/// Decodes one symbol bit by bit.
pub fn decode_symbol<O: BitOrder>(reader: &mut BitReader<'_, O>) -> Result<u8, EliasgError> {
    let start = reader.position();
    let truncated = || {
        EliasgError::EliasGammaDecodeError(format!(
            "code starting at bit {} runs past the end of the stream",
            start
        ))
    };

    let mut zeros = 0u32;
    loop {
        match reader.read_bit() {
            Some(true) => break,
            Some(false) => {
                zeros += 1;
                if zeros > MAX_PREFIX_ZEROS {
                    return Err(EliasgError::EliasGammaDecodeError(format!(
                        "unary prefix at bit {} is longer than {} zeros",
                        start, MAX_PREFIX_ZEROS
                    )));
                }
            }
            None => return Err(truncated()),
        }
    }

    let low_bits = reader.read_bits(zeros).ok_or_else(truncated)?;
    let n = (1u32 << zeros) | low_bits;
    if n > 256 {
        return Err(EliasgError::EliasGammaDecodeError(format!(
            "code at bit {} decodes to {}, outside 1..=256",
            start, n
        )));
    }
    Ok((n - 1) as u8)
}

/// Decodes exactly `out.len()` symbols from `reader`.
pub fn decode_symbols<O: BitOrder>(
    reader: &mut BitReader<'_, O>,
    out: &mut [u8],
) -> Result<(), EliasgError> {
    for slot in out.iter_mut() {
        *slot = decode_symbol(reader)?;
    }
    Ok(())
}

/// The bit-by-bit decoder as a [`SymbolDecoder`] (MSB-first streams).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceDecoder;

impl SymbolDecoder for ReferenceDecoder {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn decode_run(
        &self,
        bit_buffer: &[u8],
        start_bit: usize,
        end_bit: usize,
        out: &mut [u8],
    ) -> Result<usize, EliasgError> {
        let mut reader = BitReader::<Msb0>::with_range(bit_buffer, start_bit, end_bit)?;
        decode_symbols(&mut reader, out)?;
        Ok(reader.position())
    }
}

//==================================================================================
// 4. Public API for Whole Streams
//==================================================================================

/// Encodes `input_slice` as MSB-first Elias-gamma codes into `output_buf`.
/// Returns the number of meaningful bits.
pub fn encode(
    input_slice: &[u8],
    output_buf: &mut Vec<u8>,
    padding: Padding,
) -> Result<usize, EliasgError> {
    encode_ordered::<Msb0>(input_slice, output_buf, padding)
}

/// [`encode`] with an explicit bit order.
pub fn encode_ordered<O: BitOrder>(
    input_slice: &[u8],
    output_buf: &mut Vec<u8>,
    padding: Padding,
) -> Result<usize, EliasgError> {
    output_buf.clear();
    let expected_bits = num_bits(input_slice);

    let mut encoder = EliasGammaEncoder::<O>::with_capacity(expected_bits);
    encoder.encode_all(input_slice);
    let encoded = encoder.finish(padding);

    if encoded.num_bits != expected_bits {
        return Err(EliasgError::InternalError(format!(
            "encoder produced {} bits but bit_width predicts {}",
            encoded.num_bits, expected_bits
        )));
    }

    output_buf.extend_from_slice(&encoded.bytes);
    Ok(encoded.num_bits)
}

/// Decodes every symbol in the first `num_bits` bits of `input_bytes`.
///
/// `num_bits` is the declared end of valid data; trailing pad bits and the
/// read-ahead margin are never decoded. Returns the number of bits consumed,
/// which always equals `num_bits` on success.
pub fn decode(
    input_bytes: &[u8],
    num_bits: usize,
    output_buf: &mut Vec<u8>,
) -> Result<usize, EliasgError> {
    decode_ordered::<Msb0>(input_bytes, num_bits, output_buf)
}

/// [`decode`] with an explicit bit order.
pub fn decode_ordered<O: BitOrder>(
    input_bytes: &[u8],
    num_bits: usize,
    output_buf: &mut Vec<u8>,
) -> Result<usize, EliasgError> {
    output_buf.clear();
    if num_bits == 0 {
        return Ok(0);
    }
    if input_bytes.is_empty() {
        return Err(EliasgError::EmptyInput(1));
    }

    let mut reader = BitReader::<O>::new(input_bytes, num_bits)?;
    // Every code is at least one bit, so this bounds the output.
    output_buf.reserve(num_bits);
    while !reader.is_finished() {
        output_buf.push(decode_symbol(&mut reader)?);
    }
    Ok(reader.position())
}

//==================================================================================
// 5. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_width_known_values() {
        let widths: Vec<u32> = [0u8, 1, 2, 3, 255].iter().map(|&s| bit_width(s)).collect();
        assert_eq!(widths, vec![1, 3, 3, 5, 17]);
        assert_eq!(bit_width(6), 5);
        assert_eq!(bit_width(7), 7);
        assert_eq!(bit_width(254), 15);
    }

    #[test]
    fn test_bit_width_agrees_with_encoder_for_every_symbol() {
        for symbol in 0..=255u8 {
            let n = symbol as u32 + 1;
            assert_eq!(bit_width(symbol), 2 * high_bit_position(n) + 1);

            let mut buf = Vec::new();
            let bits = encode(&[symbol], &mut buf, Padding::None).unwrap();
            assert_eq!(bits as u32, bit_width(symbol), "symbol {}", symbol);
            assert_eq!(buf.len(), (bits + 7) / 8);
        }
    }

    #[test]
    fn test_example_stream_layout() {
        let input = [0u8, 1, 2, 3, 255];
        let mut encoded = Vec::new();
        let bits = encode(&input, &mut encoded, Padding::ReadAhead).unwrap();
        assert_eq!(bits, 29);
        assert_eq!(bits, num_bits(&input));
        // 29 data bits, three `1` pad bits, then the two-byte margin.
        assert_eq!(encoded, vec![0xA6, 0x40, 0x08, 0x07, 0x00, 0x00]);

        let mut decoded = Vec::new();
        let consumed = decode(&encoded, bits, &mut decoded).unwrap();
        assert_eq!(consumed, 29);
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_trailing_one_padding_is_not_data() {
        let input = [0u8, 1, 2, 3, 255];
        let mut encoded = Vec::new();
        encode(&input, &mut encoded, Padding::None).unwrap();

        // Reading through the pad decodes each `1` as a zero symbol, which is
        // why the declared bit count must bound every decode.
        let mut decoded = Vec::new();
        decode(&encoded, 32, &mut decoded).unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3, 255, 0, 0, 0]);
    }

    #[test]
    fn test_empty_input() {
        let mut encoded = vec![1, 2, 3];
        let bits = encode(&[], &mut encoded, Padding::ReadAhead).unwrap();
        assert_eq!(bits, 0);
        assert!(encoded.is_empty());

        let mut decoded = vec![9];
        assert_eq!(decode(&[], 0, &mut decoded).unwrap(), 0);
        assert!(decoded.is_empty());

        let result = decode(&[], 5, &mut decoded);
        assert!(matches!(result, Err(EliasgError::EmptyInput(1))));
    }

    #[test]
    fn test_truncated_stream_error() {
        let mut encoded = Vec::new();
        let bits = encode(&[255], &mut encoded, Padding::ReadAhead).unwrap();
        let mut decoded = Vec::new();
        let result = decode(&encoded, bits - 1, &mut decoded);
        assert!(matches!(result, Err(EliasgError::EliasGammaDecodeError(_))));
    }

    #[test]
    fn test_overlong_prefix_error() {
        let mut decoded = Vec::new();
        let result = decode(&[0x00, 0x40, 0x00], 24, &mut decoded);
        match result {
            Err(EliasgError::EliasGammaDecodeError(msg)) => assert!(msg.contains("unary prefix")),
            other => panic!("expected prefix error, got {:?}", other),
        }
    }

    #[test]
    fn test_code_value_above_256_rejected() {
        // 8 zeros, then `1 00000001` -> n = 257.
        let mut decoded = Vec::new();
        let result = decode(&[0x00, 0x80, 0x80], 17, &mut decoded);
        assert!(matches!(result, Err(EliasgError::EliasGammaDecodeError(_))));
    }

    #[test]
    fn test_lsb_order_roundtrip() {
        let input: Vec<u8> = (0..=255u8).rev().collect();
        let mut encoded = Vec::new();
        let bits = encode_ordered::<Lsb0>(&input, &mut encoded, Padding::None).unwrap();

        let mut msb_encoded = Vec::new();
        encode(&input, &mut msb_encoded, Padding::None).unwrap();
        assert_ne!(encoded, msb_encoded);

        let mut decoded = Vec::new();
        decode_ordered::<Lsb0>(&encoded, bits, &mut decoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_reference_decoder_run() {
        let input = [7u8, 0, 0, 4];
        let mut encoded = Vec::new();
        let bits = encode(&input, &mut encoded, Padding::ReadAhead).unwrap();
        assert_eq!(bits, 14);

        // Skip the first symbol (7 bits) and decode the remaining three.
        let mut out = [0u8; 3];
        let end = ReferenceDecoder.decode_run(&encoded, 7, bits, &mut out).unwrap();
        assert_eq!(out, [0, 0, 4]);
        assert_eq!(end, 14);
    }
}
