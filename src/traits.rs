//! This module defines shared traits used across different kernels.

use crate::error::EliasgError;

/// A stateless decoder for a run of Elias-gamma symbols.
///
/// Implementations hold no cursor; each call receives the immutable bit buffer
/// and a start offset, so one decoder instance can serve every block on every
/// thread at once.
pub trait SymbolDecoder: Send + Sync {
    /// Short name used in logs and benches.
    fn name(&self) -> &'static str;

    /// Decodes exactly `out.len()` symbols starting at `start_bit`.
    ///
    /// `end_bit` is the logical end of the run. No symbol may extend past it,
    /// and no byte beyond the read-ahead margin after it may be touched.
    /// Returns the bit offset just past the last decoded symbol.
    fn decode_run(
        &self,
        bit_buffer: &[u8],
        start_bit: usize,
        end_bit: usize,
        out: &mut [u8],
    ) -> Result<usize, EliasgError>;
}
