//! Raster <-> block order conversion for 2-D byte images.
//!
//! An image of `width x height` values is zero-padded on the right and bottom
//! to a whole number of `block_dim x block_dim` tiles. Tiles are emitted in
//! block-row-major order and each tile's values in row-major order, which is
//! the symbol order the block codec assumes.

use ndarray::{s, Array2, ArrayView2};
use num_traits::Zero;

use crate::error::EliasgError;

/// Geometry of an image tiled into square blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub width: usize,
    pub height: usize,
    pub block_dim: usize,
}

impl BlockGrid {
    pub fn new(width: usize, height: usize, block_dim: usize) -> Result<Self, EliasgError> {
        if width == 0 || height == 0 {
            return Err(EliasgError::LayoutError(format!(
                "image must be non-empty, got {}x{}",
                width, height
            )));
        }
        if block_dim == 0 {
            return Err(EliasgError::LayoutError("block_dim must be at least 1".to_string()));
        }
        Ok(Self {
            width,
            height,
            block_dim,
        })
    }

    /// Blocks per block row.
    pub fn blocks_x(&self) -> usize {
        self.width.div_ceil(self.block_dim)
    }

    /// Block rows.
    pub fn blocks_y(&self) -> usize {
        self.height.div_ceil(self.block_dim)
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks_x() * self.blocks_y()
    }

    pub fn symbols_per_block(&self) -> usize {
        self.block_dim * self.block_dim
    }

    pub fn padded_width(&self) -> usize {
        self.blocks_x() * self.block_dim
    }

    pub fn padded_height(&self) -> usize {
        self.blocks_y() * self.block_dim
    }

    /// Number of values after padding.
    pub fn padded_len(&self) -> usize {
        self.padded_width() * self.padded_height()
    }

    /// `(row, column)` of the top-left pixel of block `index`.
    pub fn block_origin(&self, index: usize) -> (usize, usize) {
        let bx = index % self.blocks_x();
        let by = index / self.blocks_x();
        (by * self.block_dim, bx * self.block_dim)
    }
}

/// Reorders a raster image into zero-padded block order.
///
/// # Errors
/// `Shape` if `values.len() != grid.width * grid.height`.
pub fn split_into_blocks<T>(values: &[T], grid: &BlockGrid) -> Result<Vec<T>, EliasgError>
where
    T: Clone + Zero,
{
    let image = ArrayView2::from_shape((grid.height, grid.width), values)?;
    let mut padded = Array2::<T>::zeros((grid.padded_height(), grid.padded_width()));
    padded
        .slice_mut(s![..grid.height, ..grid.width])
        .assign(&image);

    let d = grid.block_dim;
    let mut out = Vec::with_capacity(grid.padded_len());
    for tile in padded.exact_chunks((d, d)) {
        out.extend(tile.iter().cloned());
    }
    Ok(out)
}

/// Inverse of [`split_into_blocks`]: rebuilds the raster image and drops the
/// padding.
pub fn flatten_blocks<T>(block_values: &[T], grid: &BlockGrid) -> Result<Vec<T>, EliasgError>
where
    T: Clone + Zero,
{
    if block_values.len() != grid.padded_len() {
        return Err(EliasgError::LayoutError(format!(
            "expected {} block-ordered values for a {}x{} image, got {}",
            grid.padded_len(),
            grid.width,
            grid.height,
            block_values.len()
        )));
    }

    let d = grid.block_dim;
    let mut padded = Array2::<T>::zeros((grid.padded_height(), grid.padded_width()));
    for (mut tile, values) in padded
        .exact_chunks_mut((d, d))
        .into_iter()
        .zip(block_values.chunks_exact(d * d))
    {
        tile.assign(&ArrayView2::from_shape((d, d), values)?);
    }

    Ok(padded
        .slice(s![..grid.height, ..grid.width])
        .iter()
        .cloned()
        .collect())
}
