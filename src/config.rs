// In: src/config.rs

//! The single source of truth for all eliasg codec configuration.
//!
//! `CodecConfig` is created once at the application boundary (from a JSON
//! document or in code) and passed by reference into the `codec` facade and the
//! block decoder. Every field has a serde default so a partial document, or an
//! empty `{}`, yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::error::EliasgError;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Selects the per-block symbol decoder.
///
/// All three strategies are required to produce identical output; they differ
/// only in how a code word is recognised.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    /// Bit-by-bit unary scan. Slowest; it never reads into the read-ahead margin,
    /// though block streams still carry one.
    Reference,

    /// **Default:** fixed 16-bit window plus a leading-zero count per symbol.
    #[default]
    Window16,

    /// Direct lookup into a 64K-entry `VariableBitWidthSymbol` table.
    SymbolTable,
}

/// Selects how independent work items (blocks, scan levels) are dispatched.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Single-threaded, blocks decoded in order.
    Serial,

    /// **Default:** work is spread over the rayon pool.
    #[default]
    Parallel,
}

//==================================================================================
// II. The Unified CodecConfig
//==================================================================================

/// The unified configuration for encoding and decoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    /// Side length of a square block. A block holds `block_dim * block_dim` symbols.
    #[serde(default = "default_block_dim")]
    pub block_dim: usize,

    #[serde(default)]
    pub decode_strategy: DecodeStrategy,

    #[serde(default)]
    pub execution: Execution,

    /// When set, parallel work runs inside a dedicated pool with this many threads
    /// instead of the global rayon pool.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Apply the signed-delta/zigzag residual transform before encoding.
    #[serde(default = "default_true")]
    pub residual_transform: bool,

    /// Cross-check the tree scan against the serial running sum and the
    /// encoder's own bit count while encoding.
    #[serde(default = "default_true")]
    pub verify_offsets: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            block_dim: default_block_dim(),
            decode_strategy: DecodeStrategy::default(),
            execution: Execution::default(),
            max_threads: None,
            residual_transform: true,
            verify_offsets: true,
        }
    }
}

impl CodecConfig {
    /// Largest supported block side; 256 * 256 symbols keeps every block's bit
    /// length comfortably inside a `u32`.
    pub const MAX_BLOCK_DIM: usize = 256;

    /// Parses a JSON document and validates the result.
    pub fn from_json(json: &str) -> Result<Self, EliasgError> {
        let config: CodecConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EliasgError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EliasgError> {
        if self.block_dim == 0 || self.block_dim > Self::MAX_BLOCK_DIM {
            return Err(EliasgError::ConfigError(format!(
                "block_dim must be in 1..={}, got {}",
                Self::MAX_BLOCK_DIM,
                self.block_dim
            )));
        }
        if self.max_threads == Some(0) {
            return Err(EliasgError::ConfigError(
                "max_threads must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of symbols stored in one block.
    pub fn symbols_per_block(&self) -> usize {
        self.block_dim * self.block_dim
    }

    /// Runs `op` on the configured pool: the global rayon pool, or a dedicated
    /// pool of `max_threads` workers.
    pub fn install<R, F>(&self, op: F) -> Result<R, EliasgError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match (self.execution, self.max_threads) {
            (Execution::Parallel, Some(threads)) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                Ok(pool.install(op))
            }
            (Execution::Serial, Some(threads)) => {
                log::warn!(
                    "max_threads = {} has no effect with serial execution",
                    threads
                );
                Ok(op())
            }
            _ => Ok(op()),
        }
    }
}

/// Helper for `serde` to default a boolean field to true.
fn default_true() -> bool {
    true
}

/// Helper for `serde` to provide a default for `block_dim`.
fn default_block_dim() -> usize {
    8
}
