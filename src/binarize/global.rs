use crate::binarize::Binarizer;
use crate::error::Error;
use crate::luminance::LuminanceSource;
use crate::models::{BitArray, BitMatrix};

const LUMINANCE_BITS: usize = 5;
const LUMINANCE_SHIFT: usize = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

/// Binarizer estimating one global black point from a 32-bucket histogram.
///
/// The full matrix is thresholded against a black point estimated from four
/// rows sampled across the middle of the image. Single rows get their own
/// histogram plus a small sharpening kernel, which works well for 1D symbols
/// on low-end cameras.
pub struct GlobalHistogramBinarizer<S: LuminanceSource> {
    source: S,
    matrix: Option<BitMatrix>,
    row_buffer: Vec<u8>,
}

impl<S: LuminanceSource> GlobalHistogramBinarizer<S> {
    /// Wrap a luminance source
    pub fn new(source: S) -> Self {
        Self {
            source,
            matrix: None,
            row_buffer: Vec::new(),
        }
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Take the source back out
    pub fn into_source(self) -> S {
        self.source
    }

    fn compute_matrix(&mut self) -> Result<BitMatrix, Error> {
        let width = self.source.width();
        let height = self.source.height();
        let mut matrix = BitMatrix::new(width, height);

        // Estimate the black point from four rows spread over the middle 3/5
        // of the image instead of the full histogram; quicker and good enough
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        let mut row = std::mem::take(&mut self.row_buffer);
        for y in 1..5 {
            let sample_row = height * y / 5;
            self.source.row(sample_row, &mut row);
            let right = (width * 4) / 5;
            for &pixel in &row[width / 5..right] {
                buckets[(pixel >> LUMINANCE_SHIFT) as usize] += 1;
            }
        }
        self.row_buffer = row;
        let black_point = estimate_black_point(&buckets)?;

        let luminances = self.source.matrix();
        for y in 0..height {
            let offset = y * width;
            for x in 0..width {
                if (luminances[offset + x] as u32) < black_point {
                    matrix.set(x, y);
                }
            }
        }
        Ok(matrix)
    }
}

impl<S: LuminanceSource> Binarizer for GlobalHistogramBinarizer<S> {
    fn width(&self) -> usize {
        self.source.width()
    }

    fn height(&self) -> usize {
        self.source.height()
    }

    fn black_row(&self, y: usize, row: &mut BitArray) -> Result<(), Error> {
        let width = self.source.width();
        if row.size() < width {
            *row = BitArray::with_size(width);
        } else {
            row.clear();
        }

        let mut luminances = Vec::with_capacity(width);
        self.source.row(y, &mut luminances);
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        for &pixel in &luminances {
            buckets[(pixel >> LUMINANCE_SHIFT) as usize] += 1;
        }
        let black_point = estimate_black_point(&buckets)?;

        if width < 3 {
            // Special case for very small images
            for (x, &pixel) in luminances.iter().enumerate() {
                if (pixel as u32) < black_point {
                    row.set(x);
                }
            }
            return Ok(());
        }

        // -1, 4, -1 sharpening kernel normalized by 2, to fight blur
        let mut left = luminances[0] as i32;
        let mut center = luminances[1] as i32;
        for x in 1..width - 1 {
            let right = luminances[x + 1] as i32;
            let luminance = ((center * 4) - left - right) / 2;
            if luminance < black_point as i32 {
                row.set(x);
            }
            left = center;
            center = right;
        }
        Ok(())
    }

    fn black_matrix(&mut self) -> Result<&BitMatrix, Error> {
        if self.matrix.is_none() {
            let matrix = self.compute_matrix()?;
            self.matrix = Some(matrix);
        }
        Ok(self.matrix.as_ref().unwrap())
    }
}

/// Find the valley between the two tallest histogram peaks. Fails when the
/// peaks are too close together, which means the image has too little
/// contrast to carry a symbol.
pub(crate) fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> Result<u32, Error> {
    let num_buckets = buckets.len();
    let mut max_bucket_count = 0u32;
    let mut first_peak = 0usize;
    let mut first_peak_size = 0u32;
    for (x, &count) in buckets.iter().enumerate() {
        if count > first_peak_size {
            first_peak = x;
            first_peak_size = count;
        }
        if count > max_bucket_count {
            max_bucket_count = count;
        }
    }

    // The second peak favors distance from the first
    let mut second_peak = 0usize;
    let mut second_peak_score = 0u64;
    for (x, &count) in buckets.iter().enumerate() {
        let distance_to_biggest = x as i64 - first_peak as i64;
        let score = count as u64 * (distance_to_biggest * distance_to_biggest) as u64;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    let (first_peak, second_peak) = if first_peak > second_peak {
        (second_peak, first_peak)
    } else {
        (first_peak, second_peak)
    };

    if second_peak - first_peak <= num_buckets / 16 {
        return Err(Error::NotFound);
    }

    // Deepest valley between the peaks, biased towards the second peak
    let mut best_valley = second_peak - 1;
    let mut best_valley_score: i64 = -1;
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_bucket_count - buckets[x]) as i64;
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }

    Ok((best_valley as u32) << LUMINANCE_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::luminance::Luma8Source;

    #[test]
    fn test_uniform_image_is_not_found() {
        // All pixels identical: peak separation is zero
        let source = Luma8Source::new(vec![128u8; 100 * 100], 100, 100).unwrap();
        let mut binarizer = GlobalHistogramBinarizer::new(source);
        assert_eq!(binarizer.black_matrix().err(), Some(Error::NotFound));
    }

    #[test]
    fn test_two_class_image() {
        // Left half dark, right half light
        let mut data = Vec::with_capacity(100 * 100);
        for _y in 0..100 {
            data.extend(std::iter::repeat(30u8).take(50));
            data.extend(std::iter::repeat(220u8).take(50));
        }
        let source = Luma8Source::new(data, 100, 100).unwrap();
        let mut binarizer = GlobalHistogramBinarizer::new(source);
        let matrix = binarizer.black_matrix().unwrap();
        assert!(matrix.get(10, 50));
        assert!(!matrix.get(90, 50));
    }

    #[test]
    fn test_black_row_independent_of_matrix() {
        let mut data = Vec::new();
        for _y in 0..10 {
            for x in 0..64 {
                data.push(if (x / 8) % 2 == 0 { 20u8 } else { 230u8 });
            }
        }
        let source = Luma8Source::new(data, 64, 10).unwrap();
        let binarizer = GlobalHistogramBinarizer::new(source);
        let mut row = BitArray::with_size(64);
        binarizer.black_row(5, &mut row).unwrap();
        assert!(row.get(4));
        assert!(!row.get(12));
    }

    #[test]
    fn test_estimate_black_point_valley() {
        let mut buckets = [0u32; LUMINANCE_BUCKETS];
        buckets[4] = 100;
        buckets[28] = 80;
        buckets[16] = 2;
        let black_point = estimate_black_point(&buckets).unwrap();
        // Valley lies between the peaks
        assert!(black_point > 4 << LUMINANCE_SHIFT);
        assert!(black_point < 28 << LUMINANCE_SHIFT);
    }
}
