use crate::binarize::{Binarizer, GlobalHistogramBinarizer};
use crate::error::Error;
use crate::luminance::LuminanceSource;
use crate::models::{BitArray, BitMatrix};

const BLOCK_SIZE_POWER: usize = 3;
const BLOCK_SIZE: usize = 1 << BLOCK_SIZE_POWER;
const BLOCK_SIZE_MASK: usize = BLOCK_SIZE - 1;
const MINIMUM_DIMENSION: usize = BLOCK_SIZE * 5;
const MIN_DYNAMIC_RANGE: u32 = 24;

/// Adaptive binarizer thresholding 8x8 pixel blocks against statistics of
/// their 5x5 block neighborhood. This is the preferred strategy for 2D
/// symbols because it survives shadows and gradients that sink a single
/// global black point. Images smaller than 40x40 fall back to the global
/// histogram algorithm.
pub struct HybridBinarizer<S: LuminanceSource> {
    global: GlobalHistogramBinarizer<S>,
    matrix: Option<BitMatrix>,
}

impl<S: LuminanceSource> HybridBinarizer<S> {
    /// Wrap a luminance source
    pub fn new(source: S) -> Self {
        Self {
            global: GlobalHistogramBinarizer::new(source),
            matrix: None,
        }
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        self.global.source()
    }

    fn compute_matrix(&mut self) -> Result<BitMatrix, Error> {
        let width = self.global.source().width();
        let height = self.global.source().height();
        if width < MINIMUM_DIMENSION || height < MINIMUM_DIMENSION {
            // Too small for meaningful block statistics
            return self.global.black_matrix().map(|m| m.clone());
        }

        let luminances = self.global.source().matrix();
        let mut sub_width = width >> BLOCK_SIZE_POWER;
        if width & BLOCK_SIZE_MASK != 0 {
            sub_width += 1;
        }
        let mut sub_height = height >> BLOCK_SIZE_POWER;
        if height & BLOCK_SIZE_MASK != 0 {
            sub_height += 1;
        }

        let black_points =
            calculate_black_points(&luminances, sub_width, sub_height, width, height);
        let mut matrix = BitMatrix::new(width, height);
        calculate_threshold_for_blocks(
            &luminances,
            sub_width,
            sub_height,
            width,
            height,
            &black_points,
            &mut matrix,
        );
        Ok(matrix)
    }
}

impl<S: LuminanceSource> Binarizer for HybridBinarizer<S> {
    fn width(&self) -> usize {
        self.global.width()
    }

    fn height(&self) -> usize {
        self.global.height()
    }

    fn black_row(&self, y: usize, row: &mut BitArray) -> Result<(), Error> {
        self.global.black_row(y, row)
    }

    fn black_matrix(&mut self) -> Result<&BitMatrix, Error> {
        if self.matrix.is_none() {
            let matrix = self.compute_matrix()?;
            self.matrix = Some(matrix);
        }
        Ok(self.matrix.as_ref().unwrap())
    }
}

/// One black point per 8x8 block. Final partial blocks are aligned onto the
/// last whole 8-pixel position so every block has full statistics.
fn calculate_black_points(
    luminances: &[u8],
    sub_width: usize,
    sub_height: usize,
    width: usize,
    height: usize,
) -> Vec<Vec<u32>> {
    let max_y_offset = height - BLOCK_SIZE;
    let max_x_offset = width - BLOCK_SIZE;
    let mut black_points = vec![vec![0u32; sub_width]; sub_height];

    for y in 0..sub_height {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        for x in 0..sub_width {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let mut sum = 0u32;
            let mut min = u8::MAX as u32;
            let mut max = 0u32;
            for yy in 0..BLOCK_SIZE {
                let offset = (y_offset + yy) * width + x_offset;
                for xx in 0..BLOCK_SIZE {
                    let pixel = luminances[offset + xx] as u32;
                    sum += pixel;
                    if pixel < min {
                        min = pixel;
                    }
                    if pixel > max {
                        max = pixel;
                    }
                }
            }

            let mut average = if max - min > MIN_DYNAMIC_RANGE {
                sum >> (BLOCK_SIZE_POWER * 2)
            } else {
                // Low contrast block: assume white with black point just
                // under the darkest pixel
                min / 2
            };
            if max - min <= MIN_DYNAMIC_RANGE && x > 0 && y > 0 {
                // When the neighbors have already seen real contrast, trust
                // their consensus over this block's guess
                let neighbor_average = (black_points[y - 1][x]
                    + 2 * black_points[y][x - 1]
                    + black_points[y - 1][x - 1])
                    / 4;
                if min < neighbor_average {
                    average = neighbor_average;
                }
            }
            black_points[y][x] = average;
        }
    }
    black_points
}

/// Threshold each block against the average black point of the surrounding
/// 5x5 block grid, clamping the center at the edges.
fn calculate_threshold_for_blocks(
    luminances: &[u8],
    sub_width: usize,
    sub_height: usize,
    width: usize,
    height: usize,
    black_points: &[Vec<u32>],
    matrix: &mut BitMatrix,
) {
    let max_y_offset = height - BLOCK_SIZE;
    let max_x_offset = width - BLOCK_SIZE;
    for y in 0..sub_height {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        let top = cap(y, sub_height - 3);
        for x in 0..sub_width {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let left = cap(x, sub_width - 3);
            let mut sum = 0u32;
            for row in black_points.iter().skip(top - 2).take(5) {
                for &point in row.iter().skip(left - 2).take(5) {
                    sum += point;
                }
            }
            let average = sum / 25;
            threshold_block(luminances, x_offset, y_offset, average, width, matrix);
        }
    }
}

fn cap(value: usize, max: usize) -> usize {
    if value < 2 {
        2
    } else {
        value.min(max)
    }
}

fn threshold_block(
    luminances: &[u8],
    x_offset: usize,
    y_offset: usize,
    threshold: u32,
    width: usize,
    matrix: &mut BitMatrix,
) {
    for yy in 0..BLOCK_SIZE {
        let offset = (y_offset + yy) * width + x_offset;
        for xx in 0..BLOCK_SIZE {
            // Comparison is <= so that pure black blocks stay black
            if luminances[offset + xx] as u32 <= threshold {
                matrix.set(x_offset + xx, y_offset + yy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::luminance::Luma8Source;

    #[test]
    fn test_uniform_image_yields_light_matrix() {
        // Unlike the global binarizer, the hybrid one treats a flat image as
        // all-white rather than failing
        let source = Luma8Source::new(vec![128u8; 100 * 100], 100, 100).unwrap();
        let mut binarizer = HybridBinarizer::new(source);
        let matrix = binarizer.black_matrix().unwrap();
        for y in (0..100).step_by(7) {
            for x in (0..100).step_by(7) {
                assert!(!matrix.get(x, y), "({}, {}) should be light", x, y);
            }
        }
    }

    #[test]
    fn test_small_image_falls_back_to_global() {
        // 30x30 is under the minimum dimension; the global path reports the
        // low contrast as not-found
        let source = Luma8Source::new(vec![128u8; 30 * 30], 30, 30).unwrap();
        let mut binarizer = HybridBinarizer::new(source);
        assert_eq!(binarizer.black_matrix().err(), Some(Error::NotFound));
    }

    #[test]
    fn test_gradient_with_dark_square() {
        // A dark square on a horizontally graded background must still come
        // out as a solid black region
        let width = 120;
        let height = 120;
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                // Background ramps from 120 to 239 left to right
                data[y * width + x] = (120 + x as u32) as u8;
            }
        }
        for y in 40..80 {
            for x in 40..80 {
                data[y * width + x] = 15;
            }
        }
        let source = Luma8Source::new(data, width, height).unwrap();
        let mut binarizer = HybridBinarizer::new(source);
        let matrix = binarizer.black_matrix().unwrap();
        for y in (45..75).step_by(5) {
            for x in (45..75).step_by(5) {
                assert!(matrix.get(x, y), "({}, {}) should be dark", x, y);
            }
        }
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get(110, 110));
    }

    #[test]
    fn test_memoized_matrix_is_stable() {
        let mut data = vec![200u8; 64 * 64];
        for y in 20..40 {
            for x in 20..40 {
                data[y * 64 + x] = 10;
            }
        }
        let source = Luma8Source::new(data, 64, 64).unwrap();
        let mut binarizer = HybridBinarizer::new(source);
        let first = binarizer.black_matrix().unwrap().clone();
        let second = binarizer.black_matrix().unwrap().clone();
        assert_eq!(first, second);
        assert!(first.get(30, 30));
        assert!(!first.get(5, 5));
    }
}
