//! QR code detection
//!
//! This module locates a QR symbol in a binarized image and rectifies it to a
//! module grid:
//! - Finder pattern detection (the three corner squares)
//! - Alignment pattern detection (for versions 2+)
//! - Perspective transform between image and module space
//! - Grid sampling through the transform

/// Alignment pattern detection for QR versions 2+
pub mod alignment;
/// Finder pattern detection using 1:1:3:1:1 ratio scanning
pub mod finder;
/// Grid sampling through a perspective transform
pub mod sampler;
/// Quadrilateral-to-quadrilateral homographies
pub mod transform;

use crate::debug::debug_enabled;
use crate::decoder::version::Version;
use crate::error::Error;
use crate::models::{BitMatrix, Point};

pub use alignment::{AlignmentPattern, AlignmentPatternFinder};
pub use finder::{FinderPattern, FinderPatternFinder, FinderPatternInfo};
pub use sampler::{DefaultGridSampler, GridSampler};
pub use transform::PerspectiveTransform;

/// Rectified module grid plus the image-space points that anchored it
pub struct DetectorResult {
    /// The sampled module grid
    pub bits: BitMatrix,
    /// bottom-left, top-left, top-right and, when found, the alignment pattern
    pub points: Vec<Point>,
}

/// Locates a QR symbol in a black/white matrix and samples its module grid.
/// The grid sampler is an explicit dependency; pass [`DefaultGridSampler`]
/// unless a platform needs its own sampling.
pub struct Detector<'a> {
    image: &'a BitMatrix,
    sampler: &'a dyn GridSampler,
    result_point_callback: Option<&'a dyn Fn(Point)>,
}

impl<'a> Detector<'a> {
    /// Detector over a binarized image
    pub fn new(image: &'a BitMatrix, sampler: &'a dyn GridSampler) -> Self {
        Self {
            image,
            sampler,
            result_point_callback: None,
        }
    }

    /// Report each confirmed candidate to `callback`
    pub fn with_result_point_callback(mut self, callback: &'a dyn Fn(Point)) -> Self {
        self.result_point_callback = Some(callback);
        self
    }

    /// Detect a symbol, allowing for rotation and perspective distortion
    pub fn detect(&self, try_harder: bool, pure_barcode: bool) -> Result<DetectorResult, Error> {
        let mut finder = FinderPatternFinder::new(self.image, self.result_point_callback);
        let info = finder.find(try_harder, pure_barcode)?;
        self.process_finder_pattern_info(info)
    }

    fn process_finder_pattern_info(
        &self,
        info: FinderPatternInfo,
    ) -> Result<DetectorResult, Error> {
        let top_left = &info.top_left;
        let top_right = &info.top_right;
        let bottom_left = &info.bottom_left;

        let module_size = self.calculate_module_size(top_left, top_right, bottom_left);
        if module_size < 1.0 {
            return Err(Error::NotFound);
        }
        let dimension = compute_dimension(
            &top_left.center,
            &top_right.center,
            &bottom_left.center,
            module_size,
        )?;
        let provisional_version = Version::provisional_for_dimension(dimension)?;
        let modules_between_fp_centers = provisional_version.dimension() - 7;

        if debug_enabled() {
            eprintln!(
                "DETECT: module_size={:.2}, dimension={}, version={}",
                module_size,
                dimension,
                provisional_version.number()
            );
        }

        let mut alignment_pattern = None;
        if !provisional_version.alignment_pattern_centers().is_empty() {
            // Guess where the bottom-right alignment pattern sits
            let bottom_right_x = top_right.center.x - top_left.center.x + bottom_left.center.x;
            let bottom_right_y = top_right.center.y - top_left.center.y + bottom_left.center.y;
            let correction_to_top_left = 1.0 - 3.0 / modules_between_fp_centers as f32;
            let est_alignment_x = top_left.center.x
                + correction_to_top_left * (bottom_right_x - top_left.center.x);
            let est_alignment_y = top_left.center.y
                + correction_to_top_left * (bottom_right_y - top_left.center.y);

            // Widen the search window until something is found
            for allowance_factor in [4, 8, 16] {
                if let Some(found) = self.find_alignment_in_region(
                    module_size,
                    est_alignment_x,
                    est_alignment_y,
                    allowance_factor as f32,
                ) {
                    alignment_pattern = Some(found);
                    break;
                }
            }
            // Versions above 1 decode fine without one; the transform just
            // falls back to the projected corner
        }

        let transform = create_transform(
            &top_left.center,
            &top_right.center,
            &bottom_left.center,
            alignment_pattern.as_ref().map(|p| p.center),
            dimension,
        );
        let bits = self
            .sampler
            .sample_grid(self.image, dimension, dimension, &transform)?;

        let mut points = vec![bottom_left.center, top_left.center, top_right.center];
        if let Some(pattern) = alignment_pattern {
            points.push(pattern.center);
        }
        Ok(DetectorResult { bits, points })
    }

    /// Estimate the module size from the two finder pattern pairs
    fn calculate_module_size(
        &self,
        top_left: &FinderPattern,
        top_right: &FinderPattern,
        bottom_left: &FinderPattern,
    ) -> f32 {
        (self.calculate_module_size_one_way(&top_left.center, &top_right.center)
            + self.calculate_module_size_one_way(&top_left.center, &bottom_left.center))
            / 2.0
    }

    /// Trace black-white-black runs between two patterns in both directions
    /// and divide the total by the 14 modules they span.
    fn calculate_module_size_one_way(&self, pattern: &Point, other_pattern: &Point) -> f32 {
        let est1 = self.size_of_black_white_black_run_both_ways(
            pattern.x as i32,
            pattern.y as i32,
            other_pattern.x as i32,
            other_pattern.y as i32,
        );
        let est2 = self.size_of_black_white_black_run_both_ways(
            other_pattern.x as i32,
            other_pattern.y as i32,
            pattern.x as i32,
            pattern.y as i32,
        );
        match (est1, est2) {
            (None, None) => 0.0,
            (None, Some(e2)) => e2 / 7.0,
            (Some(e1), None) => e1 / 7.0,
            (Some(e1), Some(e2)) => (e1 + e2) / 14.0,
        }
    }

    fn size_of_black_white_black_run_both_ways(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Option<f32> {
        let mut result = self.size_of_black_white_black_run(from_x, from_y, to_x, to_y)?;

        // Now count the other way, scaled back to stay on the image
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;
        let mut scale = 1.0f32;
        let mut other_to_x = from_x - (to_x - from_x);
        if other_to_x < 0 {
            scale = from_x as f32 / (from_x - other_to_x) as f32;
            other_to_x = 0;
        } else if other_to_x >= width {
            scale = (width - 1 - from_x) as f32 / (other_to_x - from_x) as f32;
            other_to_x = width - 1;
        }
        let mut other_to_y = (from_y as f32 - (to_y - from_y) as f32 * scale) as i32;

        scale = 1.0;
        if other_to_y < 0 {
            scale = from_y as f32 / (from_y - other_to_y) as f32;
            other_to_y = 0;
        } else if other_to_y >= height {
            scale = (height - 1 - from_y) as f32 / (other_to_y - from_y) as f32;
            other_to_y = height - 1;
        }
        other_to_x = (from_x as f32 + (other_to_x - from_x) as f32 * scale) as i32;

        result += self.size_of_black_white_black_run(from_x, from_y, other_to_x, other_to_y)?;

        // The middle pixel is counted twice
        Some(result - 1.0)
    }

    /// Bresenham walk from one point towards another, measuring the distance
    /// covered by one black-white-black transition sequence.
    fn size_of_black_white_black_run(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Option<f32> {
        let (mut from_x, mut from_y, mut to_x, mut to_y) = (from_x, from_y, to_x, to_y);
        let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
        if steep {
            std::mem::swap(&mut from_x, &mut from_y);
            std::mem::swap(&mut to_x, &mut to_y);
        }

        let dx = (to_x - from_x).abs();
        let dy = (to_y - from_y).abs();
        let mut error = -dx / 2;
        let x_step = if from_x < to_x { 1 } else { -1 };
        let y_step = if from_y < to_y { 1 } else { -1 };

        // In black pixels, looking for white, first or second time
        let mut state = 0;
        // Loop up until x == to_x, but not beyond
        let x_limit = to_x + x_step;
        let mut x = from_x;
        let mut y = from_y;
        while x != x_limit {
            let real_x = if steep { y } else { x };
            let real_y = if steep { x } else { y };
            if real_x < 0
                || real_y < 0
                || real_x >= self.image.width() as i32
                || real_y >= self.image.height() as i32
            {
                return None;
            }

            // Does this pixel belong to the current state?
            if (state == 1) == self.image.get(real_x as usize, real_y as usize) {
                if state == 2 {
                    return Some(distance(x, y, from_x, from_y));
                }
                state += 1;
            }

            error += dy;
            if error > 0 {
                if y == to_y {
                    break;
                }
                y += y_step;
                error -= dx;
            }
            x += x_step;
        }
        // Found black-white-black; the next pixel is the end of the run
        if state == 2 {
            return Some(distance(to_x + x_step, to_y, from_x, from_y));
        }
        None
    }

    /// Look for an alignment pattern within `allowance_factor` module sizes
    /// of the estimated position.
    fn find_alignment_in_region(
        &self,
        overall_est_module_size: f32,
        est_alignment_x: f32,
        est_alignment_y: f32,
        allowance_factor: f32,
    ) -> Option<AlignmentPattern> {
        let allowance = (allowance_factor * overall_est_module_size) as i32;
        let est_x = est_alignment_x as i32;
        let est_y = est_alignment_y as i32;
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;

        let left_x = (est_x - allowance).max(0);
        let right_x = (est_x + allowance).min(width - 1);
        if ((right_x - left_x) as f32) < overall_est_module_size * 3.0 {
            return None;
        }
        let top_y = (est_y - allowance).max(0);
        let bottom_y = (est_y + allowance).min(height - 1);
        if ((bottom_y - top_y) as f32) < overall_est_module_size * 3.0 {
            return None;
        }

        AlignmentPatternFinder::new(
            self.image,
            left_x as usize,
            top_y as usize,
            (right_x - left_x) as usize,
            (bottom_y - top_y) as usize,
            overall_est_module_size,
            self.result_point_callback,
        )
        .find()
        .ok()
    }
}

fn distance(a_x: i32, a_y: i32, b_x: i32, b_y: i32) -> f32 {
    let dx = (a_x - b_x) as f32;
    let dy = (a_y - b_y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Dimension in modules from the center distances, snapped onto the valid
/// `4k + 1` lattice. A remainder of 3 cannot be reconciled.
fn compute_dimension(
    top_left: &Point,
    top_right: &Point,
    bottom_left: &Point,
    module_size: f32,
) -> Result<usize, Error> {
    let tltr = (top_left.distance(top_right) / module_size).round() as usize;
    let tlbl = (top_left.distance(bottom_left) / module_size).round() as usize;
    let mut dimension = (tltr + tlbl) / 2 + 7;
    match dimension & 0x03 {
        0 => dimension += 1,
        2 => dimension -= 1,
        3 => return Err(Error::NotFound),
        _ => {}
    }
    Ok(dimension)
}

/// Homography from canonical module coordinates to the detected centers
fn create_transform(
    top_left: &Point,
    top_right: &Point,
    bottom_left: &Point,
    alignment_pattern: Option<Point>,
    dimension: usize,
) -> PerspectiveTransform {
    let dim_minus_three = dimension as f32 - 3.5;
    let (bottom_right_x, bottom_right_y, source_bottom_right_x, source_bottom_right_y) =
        match alignment_pattern {
            Some(pattern) => (
                pattern.x,
                pattern.y,
                dim_minus_three - 3.0,
                dim_minus_three - 3.0,
            ),
            None => (
                // Don't have an alignment pattern, just make up the bottom-right point
                top_right.x - top_left.x + bottom_left.x,
                top_right.y - top_left.y + bottom_left.y,
                dim_minus_three,
                dim_minus_three,
            ),
        };

    PerspectiveTransform::quadrilateral_to_quadrilateral(
        3.5,
        3.5,
        dim_minus_three,
        3.5,
        source_bottom_right_x,
        source_bottom_right_y,
        3.5,
        dim_minus_three,
        top_left.x,
        top_left.y,
        top_right.x,
        top_right.y,
        bottom_right_x,
        bottom_right_y,
        bottom_left.x,
        bottom_left.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_dimension() {
        // 21-module symbol at 1px modules: centers 14 modules apart
        let tl = Point::new(3.5, 3.5);
        let tr = Point::new(17.5, 3.5);
        let bl = Point::new(3.5, 17.5);
        assert_eq!(compute_dimension(&tl, &tr, &bl, 1.0).unwrap(), 21);

        // A distance off by one module rounds back onto the lattice
        let tr = Point::new(18.5, 3.5);
        assert_eq!(compute_dimension(&tl, &tr, &bl, 1.0).unwrap(), 21);
    }

    #[test]
    fn test_dimension_mod_three_fails() {
        let tl = Point::new(0.0, 0.0);
        let tr = Point::new(17.0, 0.0);
        let bl = Point::new(0.0, 17.0);
        // (17 + 17)/2 + 7 = 24, 24 & 3 == 0 -> 25: fine
        assert_eq!(compute_dimension(&tl, &tr, &bl, 1.0).unwrap(), 25);
        let tr = Point::new(16.0, 0.0);
        let bl = Point::new(0.0, 16.0);
        // 16 + 7 = 23, 23 & 3 == 3 -> unreconcilable
        assert!(compute_dimension(&tl, &tr, &bl, 1.0).is_err());
    }
}
