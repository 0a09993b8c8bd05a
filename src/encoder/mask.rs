use crate::encoder::byte_matrix::ByteMatrix;
use crate::models::MaskPattern;

// Penalty weights from JISX0510:2004 section 21
const N1: u32 = 3;
const N2: u32 = 3;
const N3: u32 = 40;
const N4: u32 = 10;

/// Total penalty of a fully built matrix; the encoder keeps the mask that
/// minimizes this.
pub fn calculate_mask_penalty(matrix: &ByteMatrix) -> u32 {
    apply_mask_penalty_rule1(matrix)
        + apply_mask_penalty_rule2(matrix)
        + apply_mask_penalty_rule3(matrix)
        + apply_mask_penalty_rule4(matrix)
}

/// Rule 1: runs of five or more same-colored modules in a row or column
fn apply_mask_penalty_rule1(matrix: &ByteMatrix) -> u32 {
    apply_mask_penalty_rule1_internal(matrix, true)
        + apply_mask_penalty_rule1_internal(matrix, false)
}

fn apply_mask_penalty_rule1_internal(matrix: &ByteMatrix, is_horizontal: bool) -> u32 {
    let mut penalty = 0u32;
    let i_limit = if is_horizontal {
        matrix.height()
    } else {
        matrix.width()
    };
    let j_limit = if is_horizontal {
        matrix.width()
    } else {
        matrix.height()
    };
    for i in 0..i_limit {
        let mut num_same_bit_cells = 0u32;
        let mut prev_bit = -1i8;
        for j in 0..j_limit {
            let bit = if is_horizontal {
                matrix.get(j, i)
            } else {
                matrix.get(i, j)
            };
            if bit == prev_bit {
                num_same_bit_cells += 1;
            } else {
                if num_same_bit_cells >= 5 {
                    penalty += N1 + (num_same_bit_cells - 5);
                }
                num_same_bit_cells = 1;
                prev_bit = bit;
            }
        }
        if num_same_bit_cells >= 5 {
            penalty += N1 + (num_same_bit_cells - 5);
        }
    }
    penalty
}

/// Rule 2: 2x2 blocks of a single color
fn apply_mask_penalty_rule2(matrix: &ByteMatrix) -> u32 {
    let mut penalty = 0u32;
    for y in 0..matrix.height() - 1 {
        for x in 0..matrix.width() - 1 {
            let value = matrix.get(x, y);
            if value == matrix.get(x + 1, y)
                && value == matrix.get(x, y + 1)
                && value == matrix.get(x + 1, y + 1)
            {
                penalty += 1;
            }
        }
    }
    N2 * penalty
}

/// Rule 3: finder-pattern look-alikes, a 1:1:3:1:1 run flanked by four light
/// modules on at least one side
fn apply_mask_penalty_rule3(matrix: &ByteMatrix) -> u32 {
    let mut num_penalties = 0u32;
    let width = matrix.width();
    let height = matrix.height();
    for y in 0..height {
        for x in 0..width {
            if x + 6 < width
                && matrix.get(x, y) == 1
                && matrix.get(x + 1, y) == 0
                && matrix.get(x + 2, y) == 1
                && matrix.get(x + 3, y) == 1
                && matrix.get(x + 4, y) == 1
                && matrix.get(x + 5, y) == 0
                && matrix.get(x + 6, y) == 1
                && (is_white_horizontal(matrix, y, x as isize - 4, x as isize)
                    || is_white_horizontal(
                        matrix,
                        y,
                        x as isize + 7,
                        x as isize + 11,
                    ))
            {
                num_penalties += 1;
            }
            if y + 6 < height
                && matrix.get(x, y) == 1
                && matrix.get(x, y + 1) == 0
                && matrix.get(x, y + 2) == 1
                && matrix.get(x, y + 3) == 1
                && matrix.get(x, y + 4) == 1
                && matrix.get(x, y + 5) == 0
                && matrix.get(x, y + 6) == 1
                && (is_white_vertical(matrix, x, y as isize - 4, y as isize)
                    || is_white_vertical(matrix, x, y as isize + 7, y as isize + 11))
            {
                num_penalties += 1;
            }
        }
    }
    num_penalties * N3
}

fn is_white_horizontal(matrix: &ByteMatrix, y: usize, from: isize, to: isize) -> bool {
    let from = from.max(0) as usize;
    let to = (to as usize).min(matrix.width());
    for x in from..to {
        if matrix.get(x, y) == 1 {
            return false;
        }
    }
    true
}

fn is_white_vertical(matrix: &ByteMatrix, x: usize, from: isize, to: isize) -> bool {
    let from = from.max(0) as usize;
    let to = (to as usize).min(matrix.height());
    for y in from..to {
        if matrix.get(x, y) == 1 {
            return false;
        }
    }
    true
}

/// Rule 4: deviation of the dark-module ratio from 50%, in 5% steps
fn apply_mask_penalty_rule4(matrix: &ByteMatrix) -> u32 {
    let mut num_dark_cells = 0u32;
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.get(x, y) == 1 {
                num_dark_cells += 1;
            }
        }
    }
    let num_total_cells = (matrix.height() * matrix.width()) as u32;
    let five_percent_variances =
        (num_dark_cells * 2).abs_diff(num_total_cells) * 10 / num_total_cells;
    five_percent_variances * N4
}

/// The mask bit for (x, y); note [`MaskPattern`] speaks (row, column)
pub fn get_data_mask_bit(mask_pattern: MaskPattern, x: usize, y: usize) -> bool {
    mask_pattern.is_masked(y, x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from_rows(rows: &[&[i8]]) -> ByteMatrix {
        let mut matrix = ByteMatrix::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                matrix.set(x, y, value);
            }
        }
        matrix
    }

    #[test]
    fn test_rule1_runs() {
        // A run of exactly 5: penalty 3. A run of 6: penalty 4.
        let matrix = matrix_from_rows(&[&[1, 1, 1, 1, 1, 0]]);
        assert_eq!(apply_mask_penalty_rule1(&matrix), N1);
        let matrix = matrix_from_rows(&[&[1, 1, 1, 1, 1, 1]]);
        assert_eq!(apply_mask_penalty_rule1(&matrix), N1 + 1);
        let matrix = matrix_from_rows(&[&[1, 0, 1, 0, 1, 0]]);
        assert_eq!(apply_mask_penalty_rule1(&matrix), 0);
    }

    #[test]
    fn test_rule2_blocks() {
        let matrix = matrix_from_rows(&[&[1, 1], &[1, 1]]);
        assert_eq!(apply_mask_penalty_rule2(&matrix), N2);
        // 3x3 of one color contains four 2x2 blocks
        let matrix = matrix_from_rows(&[&[0, 0, 0], &[0, 0, 0], &[0, 0, 0]]);
        assert_eq!(apply_mask_penalty_rule2(&matrix), 4 * N2);
        let matrix = matrix_from_rows(&[&[1, 0], &[0, 1]]);
        assert_eq!(apply_mask_penalty_rule2(&matrix), 0);
    }

    #[test]
    fn test_rule3_finder_lookalike() {
        // 1:1:3:1:1 with four light modules in front
        let matrix = matrix_from_rows(&[&[0, 0, 0, 0, 1, 0, 1, 1, 1, 0, 1]]);
        assert_eq!(apply_mask_penalty_rule3(&matrix), N3);
        // And behind
        let matrix = matrix_from_rows(&[&[1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0]]);
        assert_eq!(apply_mask_penalty_rule3(&matrix), N3);
        // Dark flanks on both sides: no penalty
        let matrix = matrix_from_rows(&[&[1, 1, 0, 1, 1, 1, 0, 1, 1]]);
        assert_eq!(apply_mask_penalty_rule3(&matrix), 0);
    }

    #[test]
    fn test_rule4_dark_ratio() {
        // All light: |0 - 64| * 10 / 64 = 10 -> 100
        let matrix = ByteMatrix::new(8, 8);
        let mut all_light = matrix.clone();
        all_light.clear(0);
        assert_eq!(apply_mask_penalty_rule4(&all_light), 100);
        // Exactly half dark: no penalty
        let mut half = matrix.clone();
        half.clear(0);
        for y in 0..4 {
            for x in 0..8 {
                half.set(x, y, 1);
            }
        }
        assert_eq!(apply_mask_penalty_rule4(&half), 0);
    }

    #[test]
    fn test_data_mask_bit_matches_pattern_table() {
        // Pattern 2 inverts every third column
        assert!(get_data_mask_bit(MaskPattern::Pattern2, 0, 5));
        assert!(get_data_mask_bit(MaskPattern::Pattern2, 3, 5));
        assert!(!get_data_mask_bit(MaskPattern::Pattern2, 4, 5));
        // Pattern 1 inverts every second row
        assert!(get_data_mask_bit(MaskPattern::Pattern1, 7, 0));
        assert!(!get_data_mask_bit(MaskPattern::Pattern1, 7, 1));
    }
}
