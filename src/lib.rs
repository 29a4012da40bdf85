//! This file is the root of the `eliasg` Rust crate.
//!
//! `eliasg` is an Elias-gamma entropy codec for byte streams whose output is
//! laid out in fixed-size blocks with a scanned table of block start bit
//! offsets, so every block can be decoded independently and in parallel.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library.
//! 2.  Re-exporting the entry points most callers need.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod artifact;
pub mod block;
pub mod codec;
pub mod config;
pub mod error;
pub mod kernels;
pub mod scan;
pub mod traits;
pub mod utils;

//==================================================================================
// 2. Re-exports
//==================================================================================
pub use artifact::{CompressedArtifact, HeaderInfo};
pub use block::{
    decode_image_blocks, encode_blocks, encode_image_blocks, BlockDecoder, BlockEncoding,
    BlockStream, ImageEncoding,
};
pub use codec::{compress, decompress};
pub use config::{CodecConfig, DecodeStrategy, Execution};
pub use error::EliasgError;
pub use kernels::elias_gamma::{bit_width, num_bits};
pub use kernels::symbol_table::{SymbolTable, VariableBitWidthSymbol};
pub use scan::{exclusive_scan, inclusive_scan, reduce};
pub use traits::SymbolDecoder;
