/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ECLevel {
    /// Decode the 2-bit format-information encoding (00=M, 01=L, 10=H, 11=Q)
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x03 {
            0 => Some(ECLevel::M),
            1 => Some(ECLevel::L),
            2 => Some(ECLevel::H),
            3 => Some(ECLevel::Q),
            _ => None,
        }
    }

    /// The 2-bit value written into format information
    pub fn bits(&self) -> u8 {
        match self {
            ECLevel::L => 0x01,
            ECLevel::M => 0x00,
            ECLevel::Q => 0x03,
            ECLevel::H => 0x02,
        }
    }

    /// Index used for the per-version block tables (L=0, M=1, Q=2, H=3)
    pub fn ordinal(&self) -> usize {
        match self {
            ECLevel::L => 0,
            ECLevel::M => 1,
            ECLevel::Q => 2,
            ECLevel::H => 3,
        }
    }

    /// Single-letter name used in result metadata
    pub fn name(&self) -> &'static str {
        match self {
            ECLevel::L => "L",
            ECLevel::M => "M",
            ECLevel::Q => "Q",
            ECLevel::H => "H",
        }
    }
}

/// Data mask pattern (0-7), applied to the data region to balance the
/// distribution of dark and light modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPattern {
    /// (i + j) % 2 == 0
    Pattern0 = 0,
    /// i % 2 == 0
    Pattern1 = 1,
    /// j % 3 == 0
    Pattern2 = 2,
    /// (i + j) % 3 == 0
    Pattern3 = 3,
    /// (i/2 + j/3) % 2 == 0
    Pattern4 = 4,
    /// (i*j)%2 + (i*j)%3 == 0
    Pattern5 = 5,
    /// ((i*j)%2 + (i*j)%3) % 2 == 0
    Pattern6 = 6,
    /// ((i+j)%2 + (i*j)%3) % 2 == 0
    Pattern7 = 7,
}

impl MaskPattern {
    /// Get mask pattern from its 3-bit encoding
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x07 {
            0 => Some(MaskPattern::Pattern0),
            1 => Some(MaskPattern::Pattern1),
            2 => Some(MaskPattern::Pattern2),
            3 => Some(MaskPattern::Pattern3),
            4 => Some(MaskPattern::Pattern4),
            5 => Some(MaskPattern::Pattern5),
            6 => Some(MaskPattern::Pattern6),
            7 => Some(MaskPattern::Pattern7),
            _ => None,
        }
    }

    /// Check if the module at (i = row, j = column) is inverted by this mask
    pub fn is_masked(&self, i: usize, j: usize) -> bool {
        match self {
            MaskPattern::Pattern0 => (i + j) % 2 == 0,
            MaskPattern::Pattern1 => i % 2 == 0,
            MaskPattern::Pattern2 => j % 3 == 0,
            MaskPattern::Pattern3 => (i + j) % 3 == 0,
            MaskPattern::Pattern4 => (i / 2 + j / 3) % 2 == 0,
            MaskPattern::Pattern5 => ((i * j) % 2 + (i * j) % 3) == 0,
            MaskPattern::Pattern6 => (((i * j) % 2) + ((i * j) % 3)) % 2 == 0,
            MaskPattern::Pattern7 => (((i + j) % 2) + ((i * j) % 3)) % 2 == 0,
        }
    }

    /// XOR the mask over the whole matrix. Function modules are skipped later
    /// by the codeword reader, and the operation is self-inverse.
    pub fn unmask_bit_matrix(&self, bits: &mut crate::models::BitMatrix, dimension: usize) {
        for i in 0..dimension {
            for j in 0..dimension {
                if self.is_masked(i, j) {
                    bits.flip(j, i);
                }
            }
        }
    }
}

/// Data encoding mode as defined by ISO 18004
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// End of the bit stream
    Terminator,
    /// Digits, three per 10 bits
    Numeric,
    /// The 45-character alphabet, two per 11 bits
    Alphanumeric,
    /// Multi-symbol message header
    StructuredAppend,
    /// Raw bytes under the active character set
    Byte,
    /// GS1 flag, first position
    Fnc1First,
    /// GS1 flag, second position
    Fnc1Second,
    /// Character set switch
    Eci,
    /// Shift_JIS double-byte characters, 13 bits each
    Kanji,
    /// GB2312 double-byte characters, 13 bits each
    Hanzi,
}

impl Mode {
    /// Decode a 4-bit mode indicator
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x0 => Some(Mode::Terminator),
            0x1 => Some(Mode::Numeric),
            0x2 => Some(Mode::Alphanumeric),
            0x3 => Some(Mode::StructuredAppend),
            0x4 => Some(Mode::Byte),
            0x5 => Some(Mode::Fnc1First),
            0x7 => Some(Mode::Eci),
            0x8 => Some(Mode::Kanji),
            0x9 => Some(Mode::Fnc1Second),
            0xD => Some(Mode::Hanzi),
            _ => None,
        }
    }

    /// The 4-bit mode indicator
    pub fn bits(&self) -> u8 {
        match self {
            Mode::Terminator => 0x0,
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::StructuredAppend => 0x3,
            Mode::Byte => 0x4,
            Mode::Fnc1First => 0x5,
            Mode::Eci => 0x7,
            Mode::Kanji => 0x8,
            Mode::Fnc1Second => 0x9,
            Mode::Hanzi => 0xD,
        }
    }

    /// Width of the character count field for this mode at a given version.
    /// The width is bucketed by version: 1-9, 10-26 and 27-40.
    pub fn character_count_bits(&self, version: u8) -> usize {
        let bucket = if version <= 9 {
            0
        } else if version <= 26 {
            1
        } else {
            2
        };
        match self {
            Mode::Numeric => [10, 12, 14][bucket],
            Mode::Alphanumeric => [9, 11, 13][bucket],
            Mode::Byte => [8, 16, 16][bucket],
            Mode::Kanji | Mode::Hanzi => [8, 10, 12][bucket],
            _ => 0,
        }
    }
}

/// Barcode symbology tag carried on results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    /// QR Code (ISO 18004)
    QrCode,
    /// Code 128
    Code128,
    /// Code 39
    Code39,
    /// Code 93
    Code93,
    /// Codabar
    Codabar,
    /// Interleaved 2 of 5
    Itf,
    /// EAN-8
    Ean8,
    /// EAN-13
    Ean13,
    /// UPC-A
    UpcA,
    /// UPC-E
    UpcE,
}
