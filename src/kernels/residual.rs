//! This module contains the residual pre-transform applied before Elias-gamma
//! coding: signed byte deltas followed by a zigzag mapping.
//!
//! Each byte is replaced by its wrapping difference from the previous byte
//! (the first byte is taken relative to zero), the difference is read as an
//! `i8`, and zigzag maps it to `0, -1, 1, -2, 2, ... -> 0, 1, 2, 3, 4, ...`
//! so small magnitudes of either sign become small codes. Both halves are
//! computed **in-place** on an owned copy, and `decode_residual` is the exact
//! inverse of `encode_residual` for every input.

use crate::error::EliasgError;

//==================================================================================
// 1. Core Logic (The "Engine")
//==================================================================================

/// Zigzag-maps a signed byte to an unsigned byte.
#[inline]
pub fn zigzag_encode(value: i8) -> u8 {
    ((value << 1) ^ (value >> 7)) as u8
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u8) -> i8 {
    ((value >> 1) as i8) ^ -((value & 1) as i8)
}

fn encode_slice_inplace(data: &mut [u8]) {
    // Iterate backwards so each delta is taken against an original value.
    for i in (1..data.len()).rev() {
        data[i] = zigzag_encode(data[i].wrapping_sub(data[i - 1]) as i8);
    }
    if let Some(first) = data.first_mut() {
        *first = zigzag_encode(*first as i8);
    }
}

fn decode_slice_inplace(data: &mut [u8]) {
    let mut previous = 0u8;
    for value in data.iter_mut() {
        previous = previous.wrapping_add(zigzag_decode(*value) as u8);
        *value = previous;
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Delta + zigzag encodes `input_slice` into `output_buf`.
pub fn encode_residual(input_slice: &[u8], output_buf: &mut Vec<u8>) -> Result<(), EliasgError> {
    output_buf.clear();
    output_buf.extend_from_slice(input_slice);
    encode_slice_inplace(output_buf);
    Ok(())
}

/// Reverses [`encode_residual`].
pub fn decode_residual(input_slice: &[u8], output_buf: &mut Vec<u8>) -> Result<(), EliasgError> {
    output_buf.clear();
    output_buf.extend_from_slice(input_slice);
    decode_slice_inplace(output_buf);
    Ok(())
}
