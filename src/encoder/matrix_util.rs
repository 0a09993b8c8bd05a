use crate::decoder::bch::calculate_bch_code;
use crate::decoder::format::{FORMAT_INFO_MASK, FORMAT_INFO_POLY};
use crate::decoder::version::{Version, VERSION_INFO_POLY};
use crate::encoder::byte_matrix::ByteMatrix;
use crate::encoder::mask::get_data_mask_bit;
use crate::error::Error;
use crate::models::{BitArray, ECLevel, MaskPattern};

const POSITION_DETECTION_PATTERN: [[i8; 7]; 7] = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

const POSITION_ADJUSTMENT_PATTERN: [[i8; 5]; 5] = [
    [1, 1, 1, 1, 1],
    [1, 0, 0, 0, 1],
    [1, 0, 1, 0, 1],
    [1, 0, 0, 0, 1],
    [1, 1, 1, 1, 1],
];

/// Where the 15 type info bits go around the top-left finder, in write order
const TYPE_INFO_COORDINATES: [(usize, usize); 15] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

/// Build the complete module matrix: function patterns, type and version
/// info, then the masked data bits.
pub fn build_matrix(
    data_bits: &BitArray,
    ec_level: ECLevel,
    version: Version,
    mask_pattern: MaskPattern,
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    matrix.clear(-1);
    embed_basic_patterns(version, matrix)?;
    embed_type_info(ec_level, mask_pattern, matrix)?;
    maybe_embed_version_info(version, matrix)?;
    embed_data_bits(data_bits, mask_pattern, matrix)?;
    Ok(())
}

/// Position detection patterns with separators, timing patterns, alignment
/// patterns and the dark module.
pub fn embed_basic_patterns(version: Version, matrix: &mut ByteMatrix) -> Result<(), Error> {
    embed_position_detection_patterns_and_separators(matrix)?;
    embed_dark_dot_at_left_bottom_corner(matrix)?;
    maybe_embed_position_adjustment_patterns(version, matrix);
    embed_timing_patterns(matrix);
    Ok(())
}

fn embed_position_detection_pattern(x_start: usize, y_start: usize, matrix: &mut ByteMatrix) {
    for (y, row) in POSITION_DETECTION_PATTERN.iter().enumerate() {
        for (x, &cell) in row.iter().enumerate() {
            matrix.set(x_start + x, y_start + y, cell);
        }
    }
}

fn embed_position_detection_patterns_and_separators(
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    let pdp_width = POSITION_DETECTION_PATTERN[0].len();
    embed_position_detection_pattern(0, 0, matrix);
    embed_position_detection_pattern(matrix.width() - pdp_width, 0, matrix);
    embed_position_detection_pattern(0, matrix.width() - pdp_width, matrix);

    // Horizontal separators, 8 modules wide
    let hsp_width = 8;
    embed_horizontal_separation_pattern(0, hsp_width - 1, matrix)?;
    embed_horizontal_separation_pattern(matrix.width() - hsp_width, hsp_width - 1, matrix)?;
    embed_horizontal_separation_pattern(0, matrix.width() - hsp_width, matrix)?;

    // Vertical separators, 7 modules tall
    let vsp_size = 7;
    embed_vertical_separation_pattern(vsp_size, 0, matrix)?;
    embed_vertical_separation_pattern(matrix.height() - vsp_size - 1, 0, matrix)?;
    embed_vertical_separation_pattern(vsp_size, matrix.height() - vsp_size, matrix)?;
    Ok(())
}

fn embed_horizontal_separation_pattern(
    x_start: usize,
    y_start: usize,
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    for x in 0..8 {
        if !matrix.is_empty(x_start + x, y_start) {
            return Err(Error::writer("separator collides with another pattern"));
        }
        matrix.set(x_start + x, y_start, 0);
    }
    Ok(())
}

fn embed_vertical_separation_pattern(
    x_start: usize,
    y_start: usize,
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    for y in 0..7 {
        if !matrix.is_empty(x_start, y_start + y) {
            return Err(Error::writer("separator collides with another pattern"));
        }
        matrix.set(x_start, y_start + y, 0);
    }
    Ok(())
}

fn embed_dark_dot_at_left_bottom_corner(matrix: &mut ByteMatrix) -> Result<(), Error> {
    if matrix.get(8, matrix.height() - 8) == 0 {
        return Err(Error::writer("dark module position already light"));
    }
    matrix.set(8, matrix.height() - 8, 1);
    Ok(())
}

fn maybe_embed_position_adjustment_patterns(version: Version, matrix: &mut ByteMatrix) {
    if version.number() < 2 {
        return;
    }
    let centers = version.alignment_pattern_centers();
    for &y in centers {
        for &x in centers {
            // Skip anything overlapping an already drawn finder corner
            if !matrix.is_empty(x, y) {
                continue;
            }
            for (dy, row) in POSITION_ADJUSTMENT_PATTERN.iter().enumerate() {
                for (dx, &cell) in row.iter().enumerate() {
                    matrix.set(x - 2 + dx, y - 2 + dy, cell);
                }
            }
        }
    }
}

fn embed_timing_patterns(matrix: &mut ByteMatrix) {
    // Separators overlap the ends, so start at 8
    for i in 8..matrix.width() - 8 {
        let bit = ((i + 1) % 2) as i8;
        if matrix.is_empty(i, 6) {
            matrix.set(i, 6, bit);
        }
        if matrix.is_empty(6, i) {
            matrix.set(6, i, bit);
        }
    }
}

/// 5 data bits (EC level and mask), 10 BCH bits, masked with 0x5412
pub fn make_type_info_bits(
    ec_level: ECLevel,
    mask_pattern: MaskPattern,
    bits: &mut BitArray,
) -> Result<(), Error> {
    let type_info = ((ec_level.bits() as u32) << 3) | mask_pattern as u32;
    bits.append_bits(type_info, 5)?;
    let bch_code = calculate_bch_code(type_info, FORMAT_INFO_POLY);
    bits.append_bits(bch_code, 10)?;

    let mut mask_bits = BitArray::new();
    mask_bits.append_bits(FORMAT_INFO_MASK, 15)?;
    bits.xor(&mask_bits)?;

    if bits.size() != 15 {
        return Err(Error::writer("type info bit accounting is off"));
    }
    Ok(())
}

fn embed_type_info(
    ec_level: ECLevel,
    mask_pattern: MaskPattern,
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    let mut type_info_bits = BitArray::new();
    make_type_info_bits(ec_level, mask_pattern, &mut type_info_bits)?;

    for (i, &(x1, y1)) in TYPE_INFO_COORDINATES.iter().enumerate() {
        // Type info bits come out MSB first
        let bit = type_info_bits.get(type_info_bits.size() - 1 - i);

        // First copy around the top-left finder
        matrix.set_bool(x1, y1, bit);

        // Second copy split between the other two finders
        if i < 8 {
            let x2 = matrix.width() - i - 1;
            matrix.set_bool(x2, 8, bit);
        } else {
            let y2 = matrix.height() - 7 + (i - 8);
            matrix.set_bool(8, y2, bit);
        }
    }
    Ok(())
}

/// 6 version bits and 12 BCH bits
pub fn make_version_info_bits(version: Version, bits: &mut BitArray) -> Result<(), Error> {
    bits.append_bits(version.number() as u32, 6)?;
    let bch_code = calculate_bch_code(version.number() as u32, VERSION_INFO_POLY);
    bits.append_bits(bch_code, 12)?;

    if bits.size() != 18 {
        return Err(Error::writer("version info bit accounting is off"));
    }
    Ok(())
}

fn maybe_embed_version_info(version: Version, matrix: &mut ByteMatrix) -> Result<(), Error> {
    if version.number() < 7 {
        return Ok(());
    }
    let mut version_info_bits = BitArray::new();
    make_version_info_bits(version, &mut version_info_bits)?;

    let mut bit_index = 6 * 3;
    for i in 0..6 {
        for j in 0..3 {
            bit_index -= 1;
            let bit = version_info_bits.get(bit_index);
            // Bottom left
            matrix.set_bool(i, matrix.height() - 11 + j, bit);
            // Top right
            matrix.set_bool(matrix.height() - 11 + j, i, bit);
        }
    }
    Ok(())
}

/// Write the data bits in the standard zig-zag order, two columns at a time
/// from the right edge, applying the mask to every placed bit.
pub fn embed_data_bits(
    data_bits: &BitArray,
    mask_pattern: MaskPattern,
    matrix: &mut ByteMatrix,
) -> Result<(), Error> {
    let mut bit_index = 0usize;
    let mut direction: i32 = -1;
    let mut x = matrix.width() as i32 - 1;
    let mut y = matrix.height() as i32 - 1;
    while x > 0 {
        if x == 6 {
            // Skip the vertical timing pattern
            x -= 1;
        }
        while y >= 0 && y < matrix.height() as i32 {
            for i in 0..2 {
                let xx = (x - i) as usize;
                if !matrix.is_empty(xx, y as usize) {
                    continue;
                }
                // Pad with zero bits once the stream runs out
                let mut bit = if bit_index < data_bits.size() {
                    let b = data_bits.get(bit_index);
                    bit_index += 1;
                    b
                } else {
                    false
                };
                if get_data_mask_bit(mask_pattern, xx, y as usize) {
                    bit = !bit;
                }
                matrix.set_bool(xx, y as usize, bit);
            }
            y += direction;
        }
        direction = -direction;
        y += direction;
        x -= 2;
    }
    if bit_index != data_bits.size() {
        return Err(Error::writer(format!(
            "not all bits consumed: {}/{}",
            bit_index,
            data_bits.size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_patterns_fill_function_areas() {
        let version = Version::get(1).unwrap();
        let mut matrix = ByteMatrix::new(21, 21);
        matrix.clear(-1);
        embed_basic_patterns(version, &mut matrix).unwrap();
        // Finder corners are dark
        assert_eq!(matrix.get(0, 0), 1);
        assert_eq!(matrix.get(20, 0), 1);
        assert_eq!(matrix.get(0, 20), 1);
        // Separator is light
        assert_eq!(matrix.get(7, 0), 0);
        // Dark module
        assert_eq!(matrix.get(8, 21 - 8), 1);
        // Timing alternates starting dark at (8, 6)
        assert_eq!(matrix.get(8, 6), 1);
        assert_eq!(matrix.get(9, 6), 0);
    }

    #[test]
    fn test_alignment_pattern_embedded_for_v2() {
        let version = Version::get(2).unwrap();
        let mut matrix = ByteMatrix::new(25, 25);
        matrix.clear(-1);
        embed_basic_patterns(version, &mut matrix).unwrap();
        // Center of the alignment pattern at (18, 18)
        assert_eq!(matrix.get(18, 18), 1);
        assert_eq!(matrix.get(17, 18), 0);
        assert_eq!(matrix.get(16, 18), 1);
    }

    #[test]
    fn test_type_info_bits_reference() {
        // EC M, mask 5 -> masked 0x40CE per the standard's example
        let mut bits = BitArray::new();
        make_type_info_bits(ECLevel::M, MaskPattern::Pattern5, &mut bits).unwrap();
        let mut value = 0u32;
        for i in 0..15 {
            value = (value << 1) | (bits.get(i) as u32);
        }
        assert_eq!(value, 0x40CE);
    }

    #[test]
    fn test_version_info_bits_reference() {
        let mut bits = BitArray::new();
        make_version_info_bits(Version::get(7).unwrap(), &mut bits).unwrap();
        let mut value = 0u32;
        for i in 0..18 {
            value = (value << 1) | (bits.get(i) as u32);
        }
        assert_eq!(value, 0x07C94);
    }

    #[test]
    fn test_build_matrix_fills_every_cell() {
        let version = Version::get(1).unwrap();
        // Version 1-M holds 16 data + 10 EC codewords = 208 bits
        let mut data_bits = BitArray::new();
        for i in 0..208 {
            data_bits.append_bit(i % 3 == 0);
        }
        let mut matrix = ByteMatrix::new(21, 21);
        build_matrix(
            &data_bits,
            ECLevel::M,
            version,
            MaskPattern::Pattern3,
            &mut matrix,
        )
        .unwrap();
        for y in 0..21 {
            for x in 0..21 {
                assert!(!matrix.is_empty(x, y), "({}, {}) left unset", x, y);
            }
        }
    }
}
