//! Greyscale to black/white conversion
//!
//! Two strategies, both tolerant of uneven illumination to different degrees:
//! - GlobalHistogramBinarizer: one black point for the whole image, cheap
//! - HybridBinarizer: per-block thresholds, preferred for 2D symbols
//!
//! Results are memoized per instance; an instance must not be shared across
//! threads.

/// Histogram-based global threshold binarizer
pub mod global;
/// Block-local adaptive binarizer
pub mod hybrid;

use crate::error::Error;
use crate::models::{BitArray, BitMatrix};

pub use global::GlobalHistogramBinarizer;
pub use hybrid::HybridBinarizer;

/// Converts a luminance source into a monochrome bit matrix (for 2D readers)
/// or one row at a time (for 1D readers). 1 = black.
pub trait Binarizer {
    /// Image width in pixels
    fn width(&self) -> usize;

    /// Image height in pixels
    fn height(&self) -> usize;

    /// Binarize a single row independently of the rest of the image. `row` is
    /// reused when large enough.
    fn black_row(&self, y: usize, row: &mut BitArray) -> Result<(), Error>;

    /// Binarize the whole image. The result is computed once and memoized.
    fn black_matrix(&mut self) -> Result<&BitMatrix, Error>;
}
