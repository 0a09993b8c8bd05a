use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{BarcodeFormat, Point};

/// Keys for the metadata attached to a [`ScanResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultMetadataType {
    /// Symbol rotation in degrees (0, 90, 180, 270)
    Orientation,
    /// Raw byte content of each byte-mode segment, per active ECI
    ByteSegments,
    /// Error correction level used ("L", "M", "Q", "H")
    ErrorCorrectionLevel,
    /// Structured-append sequence byte (4-bit index, 4-bit count)
    StructuredAppendSequence,
    /// Structured-append parity byte
    StructuredAppendParity,
    /// The symbol was read mirrored
    Mirrored,
    /// Issue number (periodical supplements)
    IssueNumber,
    /// Suggested retail price (periodical supplements)
    SuggestedPrice,
}

/// Value stored under a [`ResultMetadataType`] key
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// A small integer
    Int(i32),
    /// Free-form text
    Text(String),
    /// A flag
    Bool(bool),
    /// Raw bytes of each byte-mode segment
    ByteSegments(Vec<Vec<u8>>),
}

/// Final result of a decode: the payload plus everything known about the
/// symbol that carried it.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Decoded content
    pub text: String,
    /// Raw payload bytes, before character set interpretation
    pub raw_bytes: Vec<u8>,
    /// Key detection points: bottom-left, top-left, top-right and, when one
    /// was used, the alignment pattern
    pub points: Vec<Point>,
    /// Symbology of the decoded barcode
    pub format: BarcodeFormat,
    /// Milliseconds since the epoch at which the result was produced
    pub timestamp: u64,
    /// Extra per-symbol facts keyed by type
    pub metadata: HashMap<ResultMetadataType, MetadataValue>,
}

impl ScanResult {
    /// Build a result stamped with the current time
    pub fn new(
        text: String,
        raw_bytes: Vec<u8>,
        points: Vec<Point>,
        format: BarcodeFormat,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            text,
            raw_bytes,
            points,
            format,
            timestamp,
            metadata: HashMap::new(),
        }
    }

    /// Attach one metadata entry
    pub fn put_metadata(&mut self, key: ResultMetadataType, value: MetadataValue) {
        self.metadata.insert(key, value);
    }
}

/// Output of the QR bitstream decoder, before the reader turns it into a
/// [`ScanResult`].
#[derive(Debug, Clone)]
pub struct DecoderResult {
    /// Corrected data codewords
    pub raw_bytes: Vec<u8>,
    /// Decoded text
    pub text: String,
    /// Bytes of each byte-mode segment, grouped per ECI run
    pub byte_segments: Vec<Vec<u8>>,
    /// Error correction level the symbol was encoded at
    pub ec_level: Option<&'static str>,
    /// Structured-append sequence byte, or -1 when absent
    pub structured_append_sequence: i32,
    /// Structured-append parity byte, or -1 when absent
    pub structured_append_parity: i32,
    /// Set when the symbol was only readable mirrored. The caller must swap
    /// the reported bottom-left and top-right points.
    pub mirrored: bool,
}

impl DecoderResult {
    /// A result with only payload and text; metadata is filled by the caller
    pub fn new(raw_bytes: Vec<u8>, text: String) -> Self {
        Self {
            raw_bytes,
            text,
            byte_segments: Vec::new(),
            ec_level: None,
            structured_append_sequence: -1,
            structured_append_parity: -1,
            mirrored: false,
        }
    }

    /// Whether the symbol carried a structured-append header
    pub fn has_structured_append(&self) -> bool {
        self.structured_append_sequence >= 0 && self.structured_append_parity >= 0
    }

    /// Swap bottom-left and top-right once a mirrored read succeeded
    pub fn apply_mirrored_correction(&self, points: &mut [Point]) {
        if !self.mirrored || points.len() < 3 {
            return;
        }
        points.swap(0, 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_correction_swaps_corners() {
        let mut result = DecoderResult::new(Vec::new(), String::new());
        result.mirrored = true;
        let bl = Point::new(0.0, 20.0);
        let tl = Point::new(0.0, 0.0);
        let tr = Point::new(20.0, 0.0);
        let mut points = [bl, tl, tr];
        result.apply_mirrored_correction(&mut points);
        assert_eq!(points[0], tr);
        assert_eq!(points[1], tl);
        assert_eq!(points[2], bl);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut result = ScanResult::new(
            "x".into(),
            vec![1, 2],
            Vec::new(),
            BarcodeFormat::QrCode,
        );
        result.put_metadata(
            ResultMetadataType::ErrorCorrectionLevel,
            MetadataValue::Text("M".into()),
        );
        assert_eq!(
            result.metadata.get(&ResultMetadataType::ErrorCorrectionLevel),
            Some(&MetadataValue::Text("M".into()))
        );
    }
}
