//! Alignment pattern detection
//!
//! Alignment patterns are 5x5 concentric squares with a 1:1:1 black-white-
//! black cross-section, present in symbols of version 2 and above. The
//! finder scans a small rectangular region where the pattern is expected.

use crate::error::Error;
use crate::models::{BitMatrix, Point};

/// Candidate alignment pattern center
#[derive(Debug, Clone)]
pub struct AlignmentPattern {
    /// Estimated center in image coordinates
    pub center: Point,
    /// Width of one module in pixels, as seen by this candidate
    pub estimated_module_size: f32,
}

impl AlignmentPattern {
    fn new(x: f32, y: f32, estimated_module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            estimated_module_size,
        }
    }

    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let module_size_diff = (module_size - self.estimated_module_size).abs();
            return module_size_diff <= 1.0 || module_size_diff <= self.estimated_module_size;
        }
        false
    }

    fn combine_estimate(&self, i: f32, j: f32, new_module_size: f32) -> Self {
        Self {
            center: Point::new((self.center.x + j) / 2.0, (self.center.y + i) / 2.0),
            estimated_module_size: (self.estimated_module_size + new_module_size) / 2.0,
        }
    }
}

/// Scans a restricted region for the 1:1:1 pattern, confirming candidates
/// with a vertical cross-check. Unconfirmed candidates are kept as a last
/// resort.
pub struct AlignmentPatternFinder<'a> {
    image: &'a BitMatrix,
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    module_size: f32,
    possible_centers: Vec<AlignmentPattern>,
    result_point_callback: Option<&'a dyn Fn(Point)>,
}

impl<'a> AlignmentPatternFinder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        image: &'a BitMatrix,
        start_x: usize,
        start_y: usize,
        width: usize,
        height: usize,
        module_size: f32,
        result_point_callback: Option<&'a dyn Fn(Point)>,
    ) -> Self {
        Self {
            image,
            start_x,
            start_y,
            width,
            height,
            module_size,
            possible_centers: Vec::new(),
            result_point_callback,
        }
    }

    /// Scan the region for a confirmed pattern
    pub fn find(mut self) -> Result<AlignmentPattern, Error> {
        let start_x = self.start_x;
        let height = self.height;
        let max_j = start_x + self.width;
        let middle_i = self.start_y + height / 2;

        // Search from the middle outwards, in alternating rows
        for i_gen in 0..height {
            let i = if i_gen & 1 == 0 {
                middle_i + (i_gen + 1) / 2
            } else {
                middle_i.wrapping_sub((i_gen + 1) / 2)
            };
            if i >= self.image.height() {
                continue;
            }

            let mut state_count = [0usize; 3];
            let mut j = start_x;
            // Burn off leading white pixels before alignment patterns look
            // like finder patterns
            while j < max_j && !self.image.get(j, i) {
                j += 1;
            }
            let mut current_state = 0usize;
            while j < max_j {
                if self.image.get(j, i) {
                    // Black pixel
                    if current_state == 1 {
                        state_count[1] += 1;
                    } else if current_state == 2 {
                        // A winner?
                        if self.found_pattern_cross(&state_count) {
                            if let Some(confirmed) = self.handle_possible_center(&state_count, i, j)
                            {
                                return Ok(confirmed);
                            }
                        }
                        state_count[0] = state_count[2];
                        state_count[1] = 1;
                        state_count[2] = 0;
                        current_state = 1;
                    } else {
                        current_state += 1;
                        state_count[current_state] += 1;
                    }
                } else {
                    // White pixel
                    if current_state == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                }
                j += 1;
            }
            if self.found_pattern_cross(&state_count) {
                if let Some(confirmed) = self.handle_possible_center(&state_count, i, max_j) {
                    return Ok(confirmed);
                }
            }
        }

        // None confirmed, but an unconfirmed candidate beats nothing
        if let Some(candidate) = self.possible_centers.into_iter().next() {
            return Ok(candidate);
        }
        Err(Error::NotFound)
    }

    /// All three runs within half a module of the expected width
    fn found_pattern_cross(&self, state_count: &[usize; 3]) -> bool {
        let module_size = self.module_size;
        let max_variance = module_size / 2.0;
        for &count in state_count.iter() {
            if (module_size - count as f32).abs() >= max_variance {
                return false;
            }
        }
        true
    }

    fn center_from_end(state_count: &[usize; 3], end: usize) -> f32 {
        (end - state_count[2]) as f32 - state_count[1] as f32 / 2.0
    }

    /// Walk the column through the candidate and require the same 1:1:1
    /// proportions vertically.
    fn cross_check_vertical(
        &self,
        start_i: usize,
        center_j: usize,
        max_count: usize,
        original_state_count_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_i = image.height();
        let mut state_count = [0usize; 3];

        let mut i = start_i as isize;
        while i >= 0 && image.get(center_j, i as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            i -= 1;
        }
        if i < 0 || state_count[1] > max_count {
            return None;
        }
        while i >= 0 && !image.get(center_j, i as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            i -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && image.get(center_j, i) && state_count[1] <= max_count {
            state_count[1] += 1;
            i += 1;
        }
        if i == max_i || state_count[1] > max_count {
            return None;
        }
        while i < max_i && !image.get(center_j, i) && state_count[2] <= max_count {
            state_count[2] += 1;
            i += 1;
        }
        if state_count[2] > max_count {
            return None;
        }

        let state_count_total: usize = state_count.iter().sum();
        if 5 * state_count_total.abs_diff(original_state_count_total)
            >= 2 * original_state_count_total
        {
            return None;
        }

        if self.found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, i))
        } else {
            None
        }
    }

    fn handle_possible_center(
        &mut self,
        state_count: &[usize; 3],
        i: usize,
        j: usize,
    ) -> Option<AlignmentPattern> {
        let state_count_total: usize = state_count.iter().sum();
        let center_j = Self::center_from_end(state_count, j);
        let center_i =
            self.cross_check_vertical(i, center_j as usize, 2 * state_count[1], state_count_total)?;

        let estimated_module_size = state_count_total as f32 / 3.0;
        for center in &self.possible_centers {
            if center.about_equals(estimated_module_size, center_i, center_j) {
                return Some(center.combine_estimate(center_i, center_j, estimated_module_size));
            }
        }
        // Remember it, even though it was not confirmed by a second pass
        let point = AlignmentPattern::new(center_j, center_i, estimated_module_size);
        if let Some(callback) = self.result_point_callback {
            callback(point.center);
        }
        self.possible_centers.push(point);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_alignment(matrix: &mut BitMatrix, left: usize, top: usize, unit: usize) {
        // 5x5: black border, white interior, black single center
        for my in 0..5 {
            for mx in 0..5 {
                let is_border = mx == 0 || mx == 4 || my == 0 || my == 4;
                let is_center = mx == 2 && my == 2;
                if is_border || is_center {
                    for y in top + my * unit..top + (my + 1) * unit {
                        for x in left + mx * unit..left + (mx + 1) * unit {
                            matrix.set(x, y);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_finds_centered_pattern() {
        let mut matrix = BitMatrix::square(40);
        draw_alignment(&mut matrix, 12, 12, 2);
        let finder = AlignmentPatternFinder::new(&matrix, 6, 6, 28, 28, 2.0, None);
        let pattern = finder.find().unwrap();
        let expected = 12.0 + 2.5 * 2.0;
        assert!((pattern.center.x - expected).abs() < 2.0);
        assert!((pattern.center.y - expected).abs() < 2.0);
    }

    #[test]
    fn test_empty_region_is_not_found() {
        let matrix = BitMatrix::square(40);
        let finder = AlignmentPatternFinder::new(&matrix, 5, 5, 30, 30, 2.0, None);
        assert!(finder.find().is_err());
    }
}
