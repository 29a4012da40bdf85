// In: src/error.rs

//! This module defines the single, unified error type for the entire eliasg library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EliasgError {
    // =========================================================================
    // === Caller Contract Violations
    // =========================================================================
    #[error("Empty input: expected at least {0} symbol(s)")]
    EmptyInput(usize),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Block layout error: {0}")]
    LayoutError(String),

    // =========================================================================
    // === Codec Errors
    // =========================================================================
    #[error("Elias-gamma decoding error: {0}")]
    EliasGammaDecodeError(String),

    #[error("Symbol table error: {0}")]
    SymbolTableError(String),

    #[error("Scan error: {0}")]
    ScanError(String),

    #[error("Artifact format error: {0}")]
    FormatError(String),

    // =========================================================================
    // === Integrity Failures (encoder accounting and offset table disagree)
    // =========================================================================
    #[error("Read-ahead violation: a read up to byte {needed} exceeds buffer length {len}")]
    ReadAheadViolation { needed: usize, len: usize },

    #[error("Block {block} consumed {actual} bits but the offset table declares {expected}")]
    BlockLengthMismatch {
        block: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Offset table error: {0}")]
    OffsetTableError(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically while loading a config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An ndarray shape error raised while (un)splitting image blocks.
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// An error from a safe byte-casting operation failing.
    #[error("Byte slice casting error: {0}")]
    PodCast(String), // Manual `From` impl is needed as bytemuck::PodCastError doesn't impl Error

    #[error("Thread pool construction failed: {0}")]
    ThreadPool(String),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for EliasgError {
    fn from(err: bytemuck::PodCastError) -> Self {
        EliasgError::PodCast(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for EliasgError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        EliasgError::ThreadPool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_messages_carry_context() {
        let err = EliasgError::BlockLengthMismatch {
            block: 3,
            expected: 40,
            actual: 41,
        };
        let msg = err.to_string();
        assert!(msg.contains("Block 3"));
        assert!(msg.contains("41"));

        let err = EliasgError::ReadAheadViolation { needed: 10, len: 8 };
        assert!(err.to_string().contains("buffer length 8"));
    }

    #[test]
    fn test_pod_cast_conversion() {
        let bytes = [0u8; 3];
        let err: EliasgError = bytemuck::try_cast_slice::<u8, u32>(&bytes)
            .map_err(EliasgError::from)
            .unwrap_err();
        assert!(matches!(err, EliasgError::PodCast(_)));
    }
}
