use crate::decoder::bch::calculate_bch_code;
use crate::error::Error;
use crate::models::{BitMatrix, ECLevel};

/// BCH(18,6) generator for the version information field
pub(crate) const VERSION_INFO_POLY: u32 = 0x1F25;

/// Total codewords (data + error correction) per version, from the QR Code
/// specification (Model 2).
const TOTAL_CODEWORDS: [usize; 41] = [
    0, 26, 44, 70, 100, 134, 172, 196, 242, 292, 346, 404, 466, 532, 581, 655, 733, 815, 901, 991,
    1085, 1156, 1258, 1364, 1474, 1588, 1706, 1828, 1921, 2051, 2185, 2323, 2465, 2611, 2761,
    2876, 3034, 3196, 3362, 3532, 3706,
];

// Error correction tables from the QR Code specification (Model 2).
// Index: [ec_level ordinal][version]
const EC_CODEWORDS_PER_BLOCK: [[i16; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_EC_BLOCKS: [[i16; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Alignment pattern center coordinates per version (none for version 1)
const ALIGNMENT_PATTERN_CENTERS: [&[usize]; 41] = [
    &[],
    &[],
    &[6, 18],
    &[6, 22],
    &[6, 26],
    &[6, 30],
    &[6, 34],
    &[6, 22, 38],
    &[6, 24, 42],
    &[6, 26, 46],
    &[6, 28, 50],
    &[6, 30, 54],
    &[6, 32, 58],
    &[6, 34, 62],
    &[6, 26, 46, 66],
    &[6, 26, 48, 70],
    &[6, 26, 50, 74],
    &[6, 30, 54, 78],
    &[6, 30, 56, 82],
    &[6, 30, 58, 86],
    &[6, 34, 62, 90],
    &[6, 28, 50, 72, 94],
    &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102],
    &[6, 28, 54, 80, 106],
    &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114],
    &[6, 34, 62, 90, 118],
    &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126],
    &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134],
    &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142],
    &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150],
    &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158],
    &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166],
    &[6, 30, 58, 86, 114, 142, 170],
];

/// One run of identically sized blocks: `count` blocks carrying
/// `data_codewords` data codewords each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlockGroup {
    /// Number of blocks in this group
    pub count: usize,
    /// Data codewords per block in this group
    pub data_codewords: usize,
}

/// Block structure of one (version, EC level) combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcBlocks {
    /// Error correction codewords appended to every block
    pub ec_codewords_per_block: usize,
    /// Block groups, shorter blocks first
    pub groups: Vec<EcBlockGroup>,
}

impl EcBlocks {
    /// Total number of blocks
    pub fn num_blocks(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Error correction codewords across all blocks
    pub fn total_ec_codewords(&self) -> usize {
        self.ec_codewords_per_block * self.num_blocks()
    }
}

/// QR code version, 1 through 40
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    number: u8,
}

impl Version {
    /// Version by number, 1 through 40
    pub fn get(number: u8) -> Result<Self, Error> {
        if !(1..=40).contains(&number) {
            return Err(Error::IllegalArgument("version must be in 1..=40"));
        }
        Ok(Self { number })
    }

    /// The version number
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Side length in modules: 17 + 4 * version
    pub fn dimension(&self) -> usize {
        17 + 4 * self.number as usize
    }

    /// Data plus error correction codeword count
    pub fn total_codewords(&self) -> usize {
        TOTAL_CODEWORDS[self.number as usize]
    }

    /// Row/column coordinates of the alignment pattern centers
    pub fn alignment_pattern_centers(&self) -> &'static [usize] {
        ALIGNMENT_PATTERN_CENTERS[self.number as usize]
    }

    /// Data and error correction block layout at the given EC level. Blocks
    /// come in at most two sizes; the longer ones carry one extra data
    /// codeword and always follow the shorter ones.
    pub fn ec_blocks(&self, level: ECLevel) -> EcBlocks {
        let v = self.number as usize;
        let ec_per_block = EC_CODEWORDS_PER_BLOCK[level.ordinal()][v] as usize;
        let num_blocks = NUM_EC_BLOCKS[level.ordinal()][v] as usize;
        let data_total = self.total_codewords() - ec_per_block * num_blocks;
        let short_len = data_total / num_blocks;
        let num_long = data_total % num_blocks;
        let num_short = num_blocks - num_long;

        let mut groups = vec![EcBlockGroup {
            count: num_short,
            data_codewords: short_len,
        }];
        if num_long > 0 {
            groups.push(EcBlockGroup {
                count: num_long,
                data_codewords: short_len + 1,
            });
        }
        EcBlocks {
            ec_codewords_per_block: ec_per_block,
            groups,
        }
    }

    /// The version whose symbol has the given side length
    pub fn provisional_for_dimension(dimension: usize) -> Result<Self, Error> {
        if dimension % 4 != 1 {
            return Err(Error::Format("dimension is not 4k + 1"));
        }
        Self::get(((dimension - 17) / 4) as u8).map_err(|_| Error::Format("dimension out of range"))
    }

    /// The 18-bit BCH-protected version field, defined for versions >= 7
    pub fn version_info_bits(&self) -> u32 {
        ((self.number as u32) << 12) | calculate_bch_code(self.number as u32, VERSION_INFO_POLY)
    }

    /// Recover a version from a possibly corrupted 18-bit field, tolerating
    /// up to 3 bit errors.
    pub fn decode_version_information(version_bits: u32) -> Option<Self> {
        let mut best_difference = u32::MAX;
        let mut best_version = 0u8;
        for number in 7..=40u8 {
            let target = Version { number }.version_info_bits();
            if target == version_bits {
                return Some(Version { number });
            }
            let difference = (version_bits ^ target).count_ones();
            if difference < best_difference {
                best_difference = difference;
                best_version = number;
            }
        }
        if best_difference <= 3 {
            return Some(Version {
                number: best_version,
            });
        }
        None
    }

    /// Matrix marking every function module (finders, separators, timing,
    /// alignment, format, version) so the codeword reader can skip them.
    pub fn build_function_pattern(&self) -> BitMatrix {
        let dimension = self.dimension();
        let mut bits = BitMatrix::square(dimension);

        // Finder patterns with their separators and format areas
        bits.set_region(0, 0, 9, 9).unwrap();
        bits.set_region(dimension - 8, 0, 8, 9).unwrap();
        bits.set_region(0, dimension - 8, 9, 8).unwrap();

        // Alignment patterns, skipping the three finder corners
        let centers = self.alignment_pattern_centers();
        let max = centers.len();
        for x in 0..max {
            let i = centers[x] - 2;
            for y in 0..max {
                if (x == 0 && (y == 0 || y == max - 1)) || (x == max - 1 && y == 0) {
                    continue;
                }
                bits.set_region(centers[y] - 2, i, 5, 5).unwrap();
            }
        }

        // Timing patterns
        bits.set_region(6, 9, 1, dimension - 17).unwrap();
        bits.set_region(9, 6, dimension - 17, 1).unwrap();

        if self.number > 6 {
            // Version info areas
            bits.set_region(dimension - 11, 0, 3, 6).unwrap();
            bits.set_region(0, dimension - 11, 6, 3).unwrap();
        }
        bits
    }
}
