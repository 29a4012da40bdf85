//! This module provides a set of shared, low-level utility functions used
//! throughout the eliasg core.
//!
//! Its primary responsibilities include:
//! 1.  Providing safe, validated conversions between raw byte slices and typed slices.
//! 2.  Little-endian serialization of the `u32` block offset table.
//! 3.  Small integer helpers shared by the scan.

use crate::error::EliasgError;

//==================================================================================
// 1. Core Utility Functions
//==================================================================================

/// Safely reinterprets a byte slice as a slice of a plain-old-data type.
///
/// # Errors
/// Returns `EliasgError::PodCast` if the byte slice length is not a multiple of
/// `size_of::<T>()` or the slice is misaligned for `T`.
pub fn safe_bytes_to_typed_slice<T>(bytes: &[u8]) -> Result<&[T], EliasgError>
where
    T: bytemuck::Pod,
{
    bytemuck::try_cast_slice(bytes).map_err(EliasgError::from)
}

/// Appends `values` to `out` as little-endian `u32` words.
pub fn write_u32_le_slice(values: &[u32], out: &mut Vec<u8>) {
    out.reserve(values.len() * 4);
    if cfg!(target_endian = "little") {
        out.extend_from_slice(bytemuck::cast_slice(values));
    } else {
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// Reads little-endian `u32` words. Works on unaligned input.
pub fn read_u32_le_slice(bytes: &[u8]) -> Result<Vec<u32>, EliasgError> {
    if bytes.len() % 4 != 0 {
        return Err(EliasgError::FormatError(format!(
            "u32 table length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Smallest power of two that is `>= n` (1 for `n == 0`).
pub fn padded_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}
