use crate::decoder::format::FormatInformation;
use crate::decoder::version::Version;
use crate::error::Error;
use crate::models::BitMatrix;

/// Reads version, format information and codewords out of a sampled module
/// grid. A single stateful parser handles mirrored symbols through the
/// `mirror` flag, which transposes every coordinate read.
pub struct BitMatrixParser {
    bits: BitMatrix,
    parsed_version: Option<Version>,
    parsed_format_info: Option<FormatInformation>,
    mirror: bool,
}

impl BitMatrixParser {
    /// Wrap a sampled grid; the dimension must be a valid symbol size
    pub fn new(bits: BitMatrix) -> Result<Self, Error> {
        let dimension = bits.height();
        if dimension < 21 || dimension & 0x03 != 1 || bits.width() != dimension {
            return Err(Error::Format("not a sampled QR grid"));
        }
        Ok(Self {
            bits,
            parsed_version: None,
            parsed_format_info: None,
            mirror: false,
        })
    }

    /// Prepare the parser for a mirrored read; forgets previous parses
    pub fn set_mirror(&mut self, mirror: bool) {
        self.parsed_version = None;
        self.parsed_format_info = None;
        self.mirror = mirror;
    }

    fn copy_bit(&self, i: usize, j: usize, version_bits: u32) -> u32 {
        let bit = if self.mirror {
            self.bits.get(j, i)
        } else {
            self.bits.get(i, j)
        };
        if bit {
            (version_bits << 1) | 0x1
        } else {
            version_bits << 1
        }
    }

    /// Read the format information from one of its two locations
    pub fn read_format_information(&mut self) -> Result<FormatInformation, Error> {
        if let Some(info) = self.parsed_format_info {
            return Ok(info);
        }

        // Read top-left format info bits
        let mut format_info_bits1 = 0u32;
        for i in 0..6 {
            format_info_bits1 = self.copy_bit(i, 8, format_info_bits1);
        }
        format_info_bits1 = self.copy_bit(7, 8, format_info_bits1);
        format_info_bits1 = self.copy_bit(8, 8, format_info_bits1);
        format_info_bits1 = self.copy_bit(8, 7, format_info_bits1);
        for j in (0..6).rev() {
            format_info_bits1 = self.copy_bit(8, j, format_info_bits1);
        }

        // Read the top-right/bottom-left pattern too
        let dimension = self.bits.height();
        let mut format_info_bits2 = 0u32;
        let j_min = dimension - 7;
        for j in (j_min..dimension).rev() {
            format_info_bits2 = self.copy_bit(8, j, format_info_bits2);
        }
        for i in dimension - 8..dimension {
            format_info_bits2 = self.copy_bit(i, 8, format_info_bits2);
        }

        match FormatInformation::decode(format_info_bits1, format_info_bits2) {
            Some(info) => {
                self.parsed_format_info = Some(info);
                Ok(info)
            }
            None => Err(Error::Format("format information unreadable")),
        }
    }

    /// Read the version, from the side length for small symbols or from the
    /// two 18-bit version fields above 6.
    pub fn read_version(&mut self) -> Result<Version, Error> {
        if let Some(version) = self.parsed_version {
            return Ok(version);
        }

        let dimension = self.bits.height();
        let provisional_number = ((dimension - 17) / 4) as u8;
        if provisional_number <= 6 {
            return Version::get(provisional_number);
        }

        // Read top-right version info: 3 wide by 6 tall
        let mut version_bits = 0u32;
        let ij_min = dimension - 11;
        for j in (0..6).rev() {
            for i in (ij_min..dimension - 8).rev() {
                version_bits = self.copy_bit(i, j, version_bits);
            }
        }
        if let Some(version) = Version::decode_version_information(version_bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }

        // Hmm, failed. Try bottom left: 6 wide by 3 tall
        let mut version_bits = 0u32;
        for i in (0..6).rev() {
            for j in (ij_min..dimension - 8).rev() {
                version_bits = self.copy_bit(i, j, version_bits);
            }
        }
        if let Some(version) = Version::decode_version_information(version_bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }
        Err(Error::Format("version information unreadable"))
    }

    /// Unmask the data area and read the codewords in the standard zig-zag
    /// order, skipping every function module.
    pub fn read_codewords(&mut self) -> Result<Vec<u8>, Error> {
        let format_info = self.read_format_information()?;
        let version = self.read_version()?;

        // Undo the data mask over the whole grid; function modules are
        // filtered out below, so remasking them here is harmless
        let dimension = self.bits.height();
        format_info.data_mask.unmask_bit_matrix(&mut self.bits, dimension);

        let function_pattern = version.build_function_pattern();

        let mut result = Vec::with_capacity(version.total_codewords());
        let mut current_byte = 0u32;
        let mut bits_read = 0usize;
        let mut reading_up = true;

        // Read columns in pairs, from right to left
        let mut j = dimension as isize - 1;
        while j > 0 {
            if j == 6 {
                // Skip whole column with vertical timing pattern
                j -= 1;
            }
            for count in 0..dimension {
                let i = if reading_up {
                    dimension - 1 - count
                } else {
                    count
                };
                for col in 0..2usize {
                    let jj = j as usize - col;
                    // Ignore bits covered by the function pattern
                    if !function_pattern.get(jj, i) {
                        bits_read += 1;
                        current_byte <<= 1;
                        if self.bits.get(jj, i) {
                            current_byte |= 1;
                        }
                        if bits_read == 8 {
                            result.push(current_byte as u8);
                            bits_read = 0;
                            current_byte = 0;
                        }
                    }
                }
            }
            reading_up = !reading_up;
            j -= 2;
        }

        if result.len() != version.total_codewords() {
            return Err(Error::Format("did not read the expected codeword count"));
        }
        Ok(result)
    }

    /// Revert the data mask applied by `read_codewords`
    pub fn remask(&mut self) {
        if let Some(format_info) = self.parsed_format_info {
            let dimension = self.bits.height();
            format_info.data_mask.unmask_bit_matrix(&mut self.bits, dimension);
        }
    }

    /// Mirror the bit matrix in place along the main diagonal
    pub fn mirror(&mut self) {
        let width = self.bits.width();
        let height = self.bits.height();
        for x in 0..width {
            for y in x + 1..height {
                if self.bits.get(x, y) != self.bits.get(y, x) {
                    self.bits.flip(y, x);
                    self.bits.flip(x, y);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(BitMatrixParser::new(BitMatrix::square(20)).is_err());
        assert!(BitMatrixParser::new(BitMatrix::square(22)).is_err());
        assert!(BitMatrixParser::new(BitMatrix::new(21, 25)).is_err());
        assert!(BitMatrixParser::new(BitMatrix::square(21)).is_ok());
    }

    #[test]
    fn test_mirror_is_transpose() {
        let mut matrix = BitMatrix::square(21);
        matrix.set(3, 10);
        matrix.set(7, 2);
        let mut parser = BitMatrixParser::new(matrix).unwrap();
        parser.mirror();
        assert!(parser.bits.get(10, 3));
        assert!(parser.bits.get(2, 7));
        assert!(!parser.bits.get(3, 10));
    }

    #[test]
    fn test_version_from_dimension() {
        let parser_bits = BitMatrix::square(25);
        let mut parser = BitMatrixParser::new(parser_bits).unwrap();
        assert_eq!(parser.read_version().unwrap().number(), 2);
    }
}
