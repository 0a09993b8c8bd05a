//! Finder pattern detection using 1:1:3:1:1 ratio scanning

use crate::error::Error;
use crate::models::{order_best_patterns, BitMatrix, Point};

/// Number of times a candidate center must be seen before it is trusted
const CENTER_QUORUM: usize = 2;
/// Minimum rows to skip between scans
const MIN_SKIP: usize = 3;
/// Widest QR we expect to see, in modules (version 10 at full width)
const MAX_MODULES: usize = 57;

/// Candidate center of a 7x7 finder square, with a running average of the
/// observations that were merged into it.
#[derive(Debug, Clone)]
pub struct FinderPattern {
    /// Estimated center in image coordinates
    pub center: Point,
    /// Width of one module in pixels, as seen by this candidate
    pub estimated_module_size: f32,
    /// How many scan crossings were merged into this estimate
    pub count: usize,
}

impl FinderPattern {
    fn new(x: f32, y: f32, estimated_module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            estimated_module_size,
            count: 1,
        }
    }

    /// Close enough in position and module size to be the same center
    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let module_size_diff = (module_size - self.estimated_module_size).abs();
            return module_size_diff <= 1.0 || module_size_diff <= self.estimated_module_size;
        }
        false
    }

    /// Average this center with a new observation
    fn combine_estimate(&self, i: f32, j: f32, new_module_size: f32) -> Self {
        let combined_count = self.count + 1;
        let count = self.count as f32;
        Self {
            center: Point::new(
                (count * self.center.x + j) / combined_count as f32,
                (count * self.center.y + i) / combined_count as f32,
            ),
            estimated_module_size: (count * self.estimated_module_size + new_module_size)
                / combined_count as f32,
            count: combined_count,
        }
    }
}

/// The ordered triple of finder centers for one symbol
pub struct FinderPatternInfo {
    /// The pattern below the top-left one
    pub bottom_left: FinderPattern,
    /// The pattern at the right-angle corner
    pub top_left: FinderPattern,
    /// The pattern to the right of the top-left one
    pub top_right: FinderPattern,
}

/// Scans rows for the black/white/black/white/black cross-section of a QR
/// finder square, cross-checking candidates in the other axes.
pub struct FinderPatternFinder<'a> {
    image: &'a BitMatrix,
    possible_centers: Vec<FinderPattern>,
    has_skipped: bool,
    result_point_callback: Option<&'a dyn Fn(Point)>,
}

impl<'a> FinderPatternFinder<'a> {
    /// Scan the given binarized image
    pub fn new(image: &'a BitMatrix, result_point_callback: Option<&'a dyn Fn(Point)>) -> Self {
        Self {
            image,
            possible_centers: Vec::new(),
            has_skipped: false,
            result_point_callback,
        }
    }

    /// Run the scan and select the best ordered triple of centers
    pub fn find(&mut self, try_harder: bool, pure_barcode: bool) -> Result<FinderPatternInfo, Error> {
        let max_i = self.image.height();
        let max_j = self.image.width();

        // Scanning every 3 lines still catches a finder even in the smallest
        // legal symbol; outside try-harder we stride proportionally to the
        // image instead.
        let mut i_skip = (3 * max_i) / (4 * MAX_MODULES);
        if i_skip < MIN_SKIP || try_harder {
            i_skip = MIN_SKIP;
        }

        let mut done = false;
        let mut i = i_skip - 1;
        while i < max_i && !done {
            let mut state_count = [0usize; 5];
            let mut current_state = 0usize;
            let mut j = 0usize;
            while j < max_j {
                if self.image.get(j, i) {
                    // Black pixel
                    if current_state & 1 == 1 {
                        // Counting white pixels
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                } else {
                    // White pixel
                    if current_state & 1 == 0 {
                        // Counting black pixels
                        if current_state == 4 {
                            // Found whitespace after a full pattern
                            if found_pattern_cross(&state_count) {
                                let confirmed =
                                    self.handle_possible_center(&state_count, i, j, pure_barcode);
                                if confirmed {
                                    // Start examining every other line
                                    i_skip = 2;
                                    if self.has_skipped {
                                        done = self.have_multiply_confirmed_centers();
                                    } else {
                                        let row_skip = self.find_row_skip();
                                        if row_skip > state_count[2] {
                                            // Skip ahead towards the third pattern, above it
                                            i += (row_skip - state_count[2])
                                                .saturating_sub(i_skip);
                                            j = max_j - 1;
                                        }
                                    }
                                    current_state = 0;
                                    state_count = [0; 5];
                                } else {
                                    shift_counts_two(&mut state_count);
                                    current_state = 3;
                                    j += 1;
                                    continue;
                                }
                            } else {
                                shift_counts_two(&mut state_count);
                                current_state = 3;
                            }
                        } else {
                            current_state += 1;
                            state_count[current_state] += 1;
                        }
                    } else {
                        // Counting white pixels
                        state_count[current_state] += 1;
                    }
                }
                j += 1;
            }
            if found_pattern_cross(&state_count) {
                let confirmed = self.handle_possible_center(&state_count, i, max_j, pure_barcode);
                if confirmed {
                    i_skip = state_count[0];
                    if self.has_skipped {
                        done = self.have_multiply_confirmed_centers();
                    }
                }
            }
            i += i_skip;
        }

        let mut best = self.select_best_patterns()?;
        let mut points = [best[0].center, best[1].center, best[2].center];
        order_best_patterns(&mut points);
        // Re-associate the reordered points with their patterns
        best.sort_by_key(|p| {
            points
                .iter()
                .position(|q| q.x == p.center.x && q.y == p.center.y)
                .unwrap_or(3)
        });
        let [bottom_left, top_left, top_right] = best;

        Ok(FinderPatternInfo {
            bottom_left,
            top_left,
            top_right,
        })
    }

    /// Center column of the last run, counting back from `end`
    fn center_from_end(state_count: &[usize; 5], end: usize) -> f32 {
        (end - state_count[4] - state_count[3]) as f32 - state_count[2] as f32 / 2.0
    }

    /// Walk the column through the candidate center and test the 1:1:3:1:1
    /// proportions vertically. Returns the refined row coordinate.
    fn cross_check_vertical(
        &self,
        start_i: usize,
        center_j: usize,
        max_count: usize,
        original_state_count_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_i = image.height();
        let mut state_count = [0usize; 5];

        // Start counting up from center
        let mut i = start_i as isize;
        while i >= 0 && image.get(center_j, i as usize) {
            state_count[2] += 1;
            i -= 1;
        }
        if i < 0 {
            return None;
        }
        while i >= 0 && !image.get(center_j, i as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            i -= 1;
        }
        if i < 0 || state_count[1] > max_count {
            return None;
        }
        while i >= 0 && image.get(center_j, i as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            i -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        // Now also count down from center
        let mut i = start_i + 1;
        while i < max_i && image.get(center_j, i) {
            state_count[2] += 1;
            i += 1;
        }
        if i == max_i {
            return None;
        }
        while i < max_i && !image.get(center_j, i) && state_count[3] < max_count {
            state_count[3] += 1;
            i += 1;
        }
        if i == max_i || state_count[3] >= max_count {
            return None;
        }
        while i < max_i && image.get(center_j, i) && state_count[4] < max_count {
            state_count[4] += 1;
            i += 1;
        }
        if state_count[4] >= max_count {
            return None;
        }

        // If the vertical total deviates more than 40% from the horizontal
        // one this is not an intersection of the same pattern
        let state_count_total: usize = state_count.iter().sum();
        if 5 * state_count_total.abs_diff(original_state_count_total)
            >= 2 * original_state_count_total
        {
            return None;
        }

        if found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, i))
        } else {
            None
        }
    }

    /// Mirror of the vertical cross-check, re-scanning the row through the
    /// refined vertical center.
    fn cross_check_horizontal(
        &self,
        start_j: usize,
        center_i: usize,
        max_count: usize,
        original_state_count_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_j = image.width();
        let mut state_count = [0usize; 5];

        let mut j = start_j as isize;
        while j >= 0 && image.get(j as usize, center_i) {
            state_count[2] += 1;
            j -= 1;
        }
        if j < 0 {
            return None;
        }
        while j >= 0 && !image.get(j as usize, center_i) && state_count[1] <= max_count {
            state_count[1] += 1;
            j -= 1;
        }
        if j < 0 || state_count[1] > max_count {
            return None;
        }
        while j >= 0 && image.get(j as usize, center_i) && state_count[0] <= max_count {
            state_count[0] += 1;
            j -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut j = start_j + 1;
        while j < max_j && image.get(j, center_i) {
            state_count[2] += 1;
            j += 1;
        }
        if j == max_j {
            return None;
        }
        while j < max_j && !image.get(j, center_i) && state_count[3] < max_count {
            state_count[3] += 1;
            j += 1;
        }
        if j == max_j || state_count[3] >= max_count {
            return None;
        }
        while j < max_j && image.get(j, center_i) && state_count[4] < max_count {
            state_count[4] += 1;
            j += 1;
        }
        if state_count[4] >= max_count {
            return None;
        }

        let state_count_total: usize = state_count.iter().sum();
        if 5 * state_count_total.abs_diff(original_state_count_total)
            >= original_state_count_total
        {
            return None;
        }

        if found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, j))
        } else {
            None
        }
    }

    /// Diagonal proportion test through the refined center, used in
    /// pure-barcode mode to reject chance crossings.
    fn cross_check_diagonal(&self, center_i: usize, center_j: usize) -> bool {
        let image = self.image;
        let mut state_count = [0usize; 5];

        // Start counting up, left from center
        let mut i = 0usize;
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[2] += 1;
            i += 1;
        }
        if state_count[2] == 0 {
            return false;
        }
        while center_i >= i && center_j >= i && !image.get(center_j - i, center_i - i) {
            state_count[1] += 1;
            i += 1;
        }
        if state_count[1] == 0 {
            return false;
        }
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[0] += 1;
            i += 1;
        }
        if state_count[0] == 0 {
            return false;
        }

        let max_i = image.height();
        let max_j = image.width();

        // Now also count down, right from center
        let mut i = 1usize;
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i)
        {
            state_count[2] += 1;
            i += 1;
        }
        while center_i + i < max_i
            && center_j + i < max_j
            && !image.get(center_j + i, center_i + i)
        {
            state_count[3] += 1;
            i += 1;
        }
        if state_count[3] == 0 {
            return false;
        }
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i)
        {
            state_count[4] += 1;
            i += 1;
        }
        if state_count[4] == 0 {
            return false;
        }

        found_pattern_diagonal(&state_count)
    }

    /// Cross-check a row candidate and either merge it into an existing
    /// center or record a new one. Returns true when a center was confirmed.
    fn handle_possible_center(
        &mut self,
        state_count: &[usize; 5],
        i: usize,
        j: usize,
        pure_barcode: bool,
    ) -> bool {
        let state_count_total: usize = state_count.iter().sum();
        let center_j = Self::center_from_end(state_count, j);
        let Some(center_i) = self.cross_check_vertical(
            i,
            center_j as usize,
            state_count[2],
            state_count_total,
        ) else {
            return false;
        };
        let Some(center_j) = self.cross_check_horizontal(
            center_j as usize,
            center_i as usize,
            state_count[2],
            state_count_total,
        ) else {
            return false;
        };
        if pure_barcode && !self.cross_check_diagonal(center_i as usize, center_j as usize) {
            return false;
        }

        let estimated_module_size = state_count_total as f32 / 7.0;
        let mut found = false;
        for center in self.possible_centers.iter_mut() {
            if center.about_equals(estimated_module_size, center_i, center_j) {
                *center = center.combine_estimate(center_i, center_j, estimated_module_size);
                found = true;
                break;
            }
        }
        if !found {
            let point = FinderPattern::new(center_j, center_i, estimated_module_size);
            if let Some(callback) = self.result_point_callback {
                callback(point.center);
            }
            self.possible_centers.push(point);
        }
        true
    }

    /// Once two confirmed centers exist, guess how many rows can be skipped
    /// before the third shows up.
    fn find_row_skip(&mut self) -> usize {
        if self.possible_centers.len() <= 1 {
            return 0;
        }
        let mut first_confirmed: Option<&FinderPattern> = None;
        for center in &self.possible_centers {
            if center.count >= CENTER_QUORUM {
                match first_confirmed {
                    None => first_confirmed = Some(center),
                    Some(first) => {
                        self.has_skipped = true;
                        let dx = (first.center.x - center.center.x).abs();
                        let dy = (first.center.y - center.center.y).abs();
                        return ((dx - dy) / 2.0) as usize;
                    }
                }
            }
        }
        0
    }

    /// True when at least three confirmed centers exist whose module sizes
    /// agree within 5% in total.
    fn have_multiply_confirmed_centers(&self) -> bool {
        let mut confirmed_count = 0;
        let mut total_module_size = 0.0f32;
        for center in &self.possible_centers {
            if center.count >= CENTER_QUORUM {
                confirmed_count += 1;
                total_module_size += center.estimated_module_size;
            }
        }
        if confirmed_count < 3 {
            return false;
        }
        let average = total_module_size / self.possible_centers.len() as f32;
        let total_deviation: f32 = self
            .possible_centers
            .iter()
            .map(|c| (c.estimated_module_size - average).abs())
            .sum();
        total_deviation <= 0.05 * total_module_size
    }

    /// Pick the three best centers: drop module-size outliers, then order by
    /// observation count with closeness to the mean size as tie-break.
    fn select_best_patterns(&mut self) -> Result<[FinderPattern; 3], Error> {
        let start_size = self.possible_centers.len();
        if start_size < 3 {
            return Err(Error::NotFound);
        }

        if start_size > 3 {
            // Filter outlier possibilities whose module size is too different
            let mut total_module_size = 0.0f32;
            let mut square = 0.0f32;
            for center in &self.possible_centers {
                total_module_size += center.estimated_module_size;
                square += center.estimated_module_size * center.estimated_module_size;
            }
            let average = total_module_size / start_size as f32;
            let std_dev = (square / start_size as f32 - average * average).sqrt();

            self.possible_centers.sort_by(|a, b| {
                let da = (a.estimated_module_size - average).abs();
                let db = (b.estimated_module_size - average).abs();
                db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
            });

            let limit = (0.2 * average).max(std_dev);
            let mut i = 0;
            while i < self.possible_centers.len() && self.possible_centers.len() > 3 {
                if (self.possible_centers[i].estimated_module_size - average).abs() > limit {
                    self.possible_centers.remove(i);
                } else {
                    i += 1;
                }
            }
        }

        if self.possible_centers.len() > 3 {
            let total_module_size: f32 = self
                .possible_centers
                .iter()
                .map(|c| c.estimated_module_size)
                .sum();
            let average = total_module_size / self.possible_centers.len() as f32;
            self.possible_centers.sort_by(|a, b| {
                b.count.cmp(&a.count).then_with(|| {
                    let da = (a.estimated_module_size - average).abs();
                    let db = (b.estimated_module_size - average).abs();
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
            });
            self.possible_centers.truncate(3);
        }

        Ok([
            self.possible_centers[0].clone(),
            self.possible_centers[1].clone(),
            self.possible_centers[2].clone(),
        ])
    }
}

/// After a white run interrupts a partial pattern, slide the state window so
/// the tail can still complete.
fn shift_counts_two(state_count: &mut [usize; 5]) {
    state_count[0] = state_count[2];
    state_count[1] = state_count[3];
    state_count[2] = state_count[4];
    state_count[3] = 1;
    state_count[4] = 0;
}

/// Do the run lengths look like 1:1:3:1:1, each within half a module of the
/// expected width?
pub(crate) fn found_pattern_cross(state_count: &[usize; 5]) -> bool {
    let total_module_size: usize = state_count.iter().sum();
    if total_module_size < 7 {
        return false;
    }
    let module_size = total_module_size as f32 / 7.0;
    let max_variance = module_size / 2.0;
    (module_size - state_count[0] as f32).abs() < max_variance
        && (module_size - state_count[1] as f32).abs() < max_variance
        && (3.0 * module_size - state_count[2] as f32).abs() < 3.0 * max_variance
        && (module_size - state_count[3] as f32).abs() < max_variance
        && (module_size - state_count[4] as f32).abs() < max_variance
}

/// Looser variant used by the diagonal test
fn found_pattern_diagonal(state_count: &[usize; 5]) -> bool {
    let total_module_size: usize = state_count.iter().sum();
    if total_module_size < 7 {
        return false;
    }
    let module_size = total_module_size as f32 / 7.0;
    let max_variance = module_size / 1.333;
    (module_size - state_count[0] as f32).abs() < max_variance
        && (module_size - state_count[1] as f32).abs() < max_variance
        && (3.0 * module_size - state_count[2] as f32).abs() < 3.0 * max_variance
        && (module_size - state_count[3] as f32).abs() < max_variance
        && (module_size - state_count[4] as f32).abs() < max_variance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_finder(matrix: &mut BitMatrix, left: usize, top: usize, unit: usize) {
        for my in 0..7 {
            for mx in 0..7 {
                let is_border = mx == 0 || mx == 6 || my == 0 || my == 6;
                let is_center = (2..=4).contains(&mx) && (2..=4).contains(&my);
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
    fn test_found_pattern_cross() {
        assert!(found_pattern_cross(&[2, 2, 6, 2, 2]));
        assert!(found_pattern_cross(&[3, 3, 9, 3, 3]));
        assert!(!found_pattern_cross(&[2, 2, 2, 2, 2]));
        assert!(!found_pattern_cross(&[1, 1, 1, 1, 1]));
        assert!(!found_pattern_cross(&[4, 1, 12, 8, 4]));
    }

    #[test]
    fn test_finds_three_synthetic_patterns() {
        let mut matrix = BitMatrix::square(120);
        let unit = 3;
        draw_finder(&mut matrix, 10, 10, unit);
        draw_finder(&mut matrix, 80, 10, unit);
        draw_finder(&mut matrix, 10, 80, unit);

        let mut finder = FinderPatternFinder::new(&matrix, None);
        let info = finder.find(true, false).unwrap();

        let expect = |p: &FinderPattern, ex: f32, ey: f32| {
            assert!(
                (p.center.x - ex).abs() < 2.0 && (p.center.y - ey).abs() < 2.0,
                "center {:?} expected near ({}, {})",
                p.center,
                ex,
                ey
            );
        };
        let c = 3.5 * unit as f32;
        expect(&info.top_left, 10.0 + c, 10.0 + c);
        expect(&info.top_right, 80.0 + c, 10.0 + c);
        expect(&info.bottom_left, 10.0 + c, 80.0 + c);
    }

    #[test]
    fn test_empty_image_is_not_found() {
        let matrix = BitMatrix::square(50);
        let mut finder = FinderPatternFinder::new(&matrix, None);
        assert!(finder.find(true, false).is_err());
    }

    #[test]
    fn test_callback_sees_candidates() {
        let mut matrix = BitMatrix::square(60);
        draw_finder(&mut matrix, 5, 5, 3);
        let seen = std::cell::RefCell::new(0usize);
        let callback = |_p: Point| {
            *seen.borrow_mut() += 1;
        };
        let mut finder = FinderPatternFinder::new(&matrix, Some(&callback));
        // Only one pattern exists, so find fails, but the candidate must
        // still have been reported
        let _ = finder.find(true, false);
        assert!(*seen.borrow() > 0);
    }
}
