//! Property-based tests for the Elias-gamma block codec.
//!
//! Covers round-trips through every layer, bit-length agreement, scan
//! correctness, block independence and decoder equivalence.

use proptest::prelude::*;

use eliasg::block::{decode_bits, decode_block_symbols, encode_blocks, BlockDecoder};
use eliasg::config::{CodecConfig, DecodeStrategy, Execution};
use eliasg::kernels::bitio::Padding;
use eliasg::kernels::elias_gamma::{self, bit_width, ReferenceDecoder};
use eliasg::kernels::residual::{decode_residual, encode_residual};
use eliasg::kernels::symbol_table::{SymbolTable, TableDecoder};
use eliasg::kernels::window16::Window16Decoder;
use eliasg::scan::{
    exclusive_scan, inclusive_scan, scan_with, serial_exclusive_scan, serial_inclusive_scan,
    ScanKind,
};
use eliasg::{compress, decompress, SymbolDecoder};

// =============================================================================
// GENERATORS
// =============================================================================

/// Byte streams biased towards small values, as residuals are.
fn residual_like_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            4 => 0u8..8,
            2 => 8u8..64,
            1 => any::<u8>(),
        ],
        1..max_len,
    )
}

fn strategy_strategy() -> impl Strategy<Value = DecodeStrategy> {
    prop_oneof![
        Just(DecodeStrategy::Reference),
        Just(DecodeStrategy::Window16),
        Just(DecodeStrategy::SymbolTable),
    ]
}

fn execution_strategy() -> impl Strategy<Value = Execution> {
    prop_oneof![Just(Execution::Serial), Just(Execution::Parallel)]
}

// =============================================================================
// ROUND-TRIP PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_stream_roundtrip(input in prop::collection::vec(any::<u8>(), 1..2000)) {
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&input, &mut encoded, Padding::ReadAhead).unwrap();

        let mut decoded = Vec::new();
        let consumed = elias_gamma::decode(&encoded, bits, &mut decoded).unwrap();
        prop_assert_eq!(consumed, bits);
        prop_assert_eq!(decoded, input);
    }

    #[test]
    fn prop_facade_roundtrip(
        input in residual_like_bytes(4000),
        block_dim in 1usize..12,
        decode_strategy in strategy_strategy(),
        execution in execution_strategy(),
        residual_transform in any::<bool>(),
    ) {
        let config = CodecConfig {
            block_dim,
            decode_strategy,
            execution,
            residual_transform,
            ..CodecConfig::default()
        };
        let compressed = compress(&input, &config).unwrap();
        prop_assert_eq!(decompress(&compressed, &config).unwrap(), input);
    }

    #[test]
    fn prop_residual_roundtrip(input in prop::collection::vec(any::<u8>(), 0..2000)) {
        let mut encoded = Vec::new();
        encode_residual(&input, &mut encoded).unwrap();
        let mut decoded = Vec::new();
        decode_residual(&encoded, &mut decoded).unwrap();
        prop_assert_eq!(decoded, input);
    }
}

// =============================================================================
// BIT-LENGTH AGREEMENT
// =============================================================================

#[test]
fn every_symbol_width_matches_its_encoding() {
    for symbol in 0..=255u8 {
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&[symbol], &mut encoded, Padding::None).unwrap();
        assert_eq!(bit_width(symbol) as usize, bits, "symbol {}", symbol);
        assert_eq!(encoded.len(), bits.div_ceil(8));
    }
}

proptest! {
    #[test]
    fn prop_width_sum_matches_encoded_bits(input in prop::collection::vec(any::<u8>(), 1..3000)) {
        let expected: usize = input.iter().map(|&s| bit_width(s) as usize).sum();
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&input, &mut encoded, Padding::ReadAhead).unwrap();
        prop_assert_eq!(bits, expected);
        prop_assert_eq!(encoded.len(), bits.div_ceil(8) + 2);
    }

    #[test]
    fn prop_symbol_offsets_are_scan_of_widths(input in residual_like_bytes(1000)) {
        let mut encoded = Vec::new();
        elias_gamma::encode(&input, &mut encoded, Padding::ReadAhead).unwrap();

        let mut decoded = Vec::new();
        let mut offsets = Vec::new();
        decode_bits(&encoded, 0, input.len(), &mut decoded, Some(&mut offsets)).unwrap();

        let widths: Vec<usize> = input.iter().map(|&s| bit_width(s) as usize).collect();
        prop_assert_eq!(offsets, serial_exclusive_scan(&widths).unwrap());
        prop_assert_eq!(decoded, input);
    }
}

// =============================================================================
// SCAN CORRECTNESS
// =============================================================================

proptest! {
    #[test]
    fn prop_scan_invariants(values in prop::collection::vec(0u32..100_000, 1..5000)) {
        let exclusive = exclusive_scan(&values).unwrap();
        let inclusive = inclusive_scan(&values).unwrap();
        let total: u32 = values.iter().sum();

        prop_assert_eq!(exclusive[0], 0);
        for i in 0..values.len() {
            let next = exclusive.get(i + 1).copied().unwrap_or(total);
            prop_assert_eq!(exclusive[i] + values[i], next);
            prop_assert_eq!(inclusive[i], exclusive[i] + values[i]);
        }
    }

    #[test]
    fn prop_tree_scan_matches_serial(
        values in prop::collection::vec(any::<u16>(), 1..3000),
        execution in execution_strategy(),
    ) {
        let widened: Vec<u64> = values.iter().map(|&v| v as u64).collect();
        prop_assert_eq!(
            scan_with(&widened, ScanKind::Exclusive, execution).unwrap(),
            serial_exclusive_scan(&widened).unwrap()
        );
        prop_assert_eq!(
            scan_with(&widened, ScanKind::Inclusive, execution).unwrap(),
            serial_inclusive_scan(&widened).unwrap()
        );
    }
}

// =============================================================================
// BLOCK INDEPENDENCE
// =============================================================================

proptest! {
    #[test]
    fn prop_each_block_decodes_alone(
        input in residual_like_bytes(3000),
        symbols_per_block in 1usize..200,
        decode_strategy in strategy_strategy(),
    ) {
        let encoding = encode_blocks(&input, symbols_per_block, &CodecConfig::default()).unwrap();
        let stream = encoding.as_stream();

        let mut whole = Vec::new();
        decode_block_symbols(&stream, &ReferenceDecoder, &mut whole).unwrap();
        prop_assert_eq!(&whole, &input);

        let decoder = BlockDecoder::new(decode_strategy, Execution::Serial).unwrap();
        let mut single = Vec::new();
        for block in 0..stream.num_blocks() {
            decoder.decode_one(&stream, block, &mut single).unwrap();
            let start = block * symbols_per_block;
            let end = (start + symbols_per_block).min(input.len());
            prop_assert_eq!(&single[..], &whole[start..end]);
        }
    }
}

// =============================================================================
// OPTIMIZED / REFERENCE EQUIVALENCE
// =============================================================================

proptest! {
    #[test]
    fn prop_decoders_agree(input in prop::collection::vec(any::<u8>(), 1..2000)) {
        let mut encoded = Vec::new();
        let bits = elias_gamma::encode(&input, &mut encoded, Padding::ReadAhead).unwrap();
        let table = SymbolTable::elias_gamma().unwrap();
        let table_decoder = TableDecoder::new(&table);

        let decoders: [&dyn SymbolDecoder; 3] = [&ReferenceDecoder, &Window16Decoder, &table_decoder];
        for decoder in decoders {
            let mut out = vec![0u8; input.len()];
            let end = decoder.decode_run(&encoded, 0, bits, &mut out).unwrap();
            prop_assert_eq!(end, bits, "{}", decoder.name());
            prop_assert_eq!(&out, &input, "{}", decoder.name());
        }
    }
}
