//! This module provides the high-level, stateless entry points for the codec.
//!
//! `compress` runs the residual pre-transform (when configured), encodes the
//! result in blocks, and packs everything into an artifact. `decompress`
//! reverses the chain, honouring the configured decode strategy and execution
//! mode. Whether the residual transform has to be undone is read from the
//! artifact's flags, not from the config, so any config can decode any
//! artifact.

use log::{debug, info};

use crate::artifact::{split_artifact, stream_view, CompressedArtifact};
use crate::block::{encode_blocks, BlockDecoder};
use crate::config::CodecConfig;
use crate::error::EliasgError;
use crate::kernels::residual::{decode_residual, encode_residual};

/// Compresses `input` into a self-describing artifact.
pub fn compress(input: &[u8], config: &CodecConfig) -> Result<Vec<u8>, EliasgError> {
    config.validate()?;

    let mut transformed = Vec::new();
    let symbols = if config.residual_transform {
        encode_residual(input, &mut transformed)?;
        transformed.as_slice()
    } else {
        input
    };

    let encoding = config.install(|| encode_blocks(symbols, config.symbols_per_block(), config))??;
    let artifact = CompressedArtifact {
        residual_transform: config.residual_transform,
        encoding,
    };
    let bytes = artifact.to_bytes()?;

    info!(
        "compressed {} bytes into {} bytes ({} blocks)",
        input.len(),
        bytes.len(),
        artifact.encoding.num_blocks()
    );
    if !input.is_empty() {
        log_metric!(
            "compress.ratio",
            format!("{:.3}", bytes.len() as f64 / input.len() as f64)
        );
    }
    Ok(bytes)
}

/// Decompresses an artifact produced by [`compress`].
pub fn decompress(bytes: &[u8], config: &CodecConfig) -> Result<Vec<u8>, EliasgError> {
    config.validate()?;

    let (info, offsets, payload) = split_artifact(bytes)?;
    let stream = stream_view(&info, &offsets, payload)?;
    let decoder = BlockDecoder::from_config(config)?;
    debug!(
        "decompressing {} symbols with {} (residual: {})",
        info.num_symbols,
        decoder.strategy_name(),
        info.residual_transform
    );

    let mut symbols = Vec::new();
    config.install(|| decoder.decode(&stream, &mut symbols))??;

    if info.residual_transform {
        let mut restored = Vec::new();
        decode_residual(&symbols, &mut restored)?;
        Ok(restored)
    } else {
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecodeStrategy, Execution};

    fn smooth_signal(len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| (128.0 + 100.0 * (i as f64 / 40.0).sin()) as u8)
            .collect()
    }

    #[test]
    fn test_roundtrip_every_config_combination() {
        let input = smooth_signal(3000);
        for strategy in [
            DecodeStrategy::Reference,
            DecodeStrategy::Window16,
            DecodeStrategy::SymbolTable,
        ] {
            for execution in [Execution::Serial, Execution::Parallel] {
                for residual_transform in [true, false] {
                    let config = CodecConfig {
                        block_dim: 5,
                        decode_strategy: strategy,
                        execution,
                        residual_transform,
                        ..CodecConfig::default()
                    };
                    let compressed = compress(&input, &config).unwrap();
                    assert_eq!(decompress(&compressed, &config).unwrap(), input);
                }
            }
        }
    }

    #[test]
    fn test_residual_shrinks_smooth_data() {
        let input = smooth_signal(4096);
        let with = compress(&input, &CodecConfig::default()).unwrap();
        let without = compress(
            &input,
            &CodecConfig {
                residual_transform: false,
                ..CodecConfig::default()
            },
        )
        .unwrap();
        assert!(with.len() < without.len());
    }

    #[test]
    fn test_decoder_config_does_not_need_to_match() {
        let input = smooth_signal(1000);
        let compressed = compress(&input, &CodecConfig::default()).unwrap();
        let other = CodecConfig {
            block_dim: 3,
            residual_transform: false,
            decode_strategy: DecodeStrategy::Reference,
            max_threads: Some(2),
            ..CodecConfig::default()
        };
        assert_eq!(decompress(&compressed, &other).unwrap(), input);
    }

    #[test]
    fn test_empty_input_roundtrip() {
        let compressed = compress(&[], &CodecConfig::default()).unwrap();
        assert!(decompress(&compressed, &CodecConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CodecConfig {
            block_dim: 0,
            ..CodecConfig::default()
        };
        assert!(matches!(compress(&[1, 2, 3], &config), Err(EliasgError::ConfigError(_))));
    }

    #[test]
    fn test_header_with_maximal_bit_count_is_rejected() {
        let mut compressed = compress(&smooth_signal(256), &CodecConfig::default()).unwrap();
        compressed[19..27].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            decompress(&compressed, &CodecConfig::default()),
            Err(EliasgError::FormatError(_))
        ));
    }

    #[test]
    fn test_corrupted_payload_is_an_error_not_a_panic() {
        let input = smooth_signal(512);
        let mut compressed = compress(&input, &CodecConfig::default()).unwrap();
        let header_size = CompressedArtifact::peek_info(&compressed).unwrap().header_size;
        for byte in &mut compressed[header_size..header_size + 8] {
            *byte = 0;
        }
        assert!(decompress(&compressed, &CodecConfig::default()).is_err());
    }
}
