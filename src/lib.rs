//! qrcodec - QR code detection, decoding and encoding
//!
//! A pure Rust implementation of the QR Code symbology (ISO 18004 Model 2):
//! binarization, finder/alignment detection, perspective rectification,
//! Reed-Solomon error correction, bitstream decoding and the full encode
//! pipeline with masking penalty evaluation.
//!
//! The decode entry point takes an 8-bit greyscale image; the encode entry
//! point takes text and returns a rendered module matrix. Image file I/O is
//! deliberately out of scope: callers bring their own pixels.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Greyscale to black/white conversion
pub mod binarize;
pub(crate) mod debug;
/// QR code decoding (parser, data blocks, bitstream, charsets)
pub mod decoder;
/// QR code detection (finder patterns, alignment, sampling)
pub mod detector;
/// Galois fields, polynomials and Reed-Solomon codecs
pub mod ec;
/// The error taxonomy shared by all operations
pub mod error;
/// QR code encoding (mode selection, interleaving, masking)
pub mod encoder;
/// Greyscale image sources
pub mod luminance;
/// Core data structures
pub mod models;

use binarize::{Binarizer, HybridBinarizer};
use decoder::Decoder;
use detector::{DefaultGridSampler, Detector};

pub use error::Error;
pub use luminance::{Luma8Source, LuminanceSource};
pub use models::{
    BarcodeFormat, BitArray, BitMatrix, DecoderResult, ECLevel, MaskPattern, MetadataValue, Mode,
    Point, ResultMetadataType, ScanResult,
};

/// Options steering a decode call
#[derive(Default)]
pub struct DecodeHints<'a> {
    /// Spend more time trying to find a symbol (denser row scanning)
    pub try_harder: bool,
    /// The image is exactly an unrotated, margin-surrounded symbol; enables
    /// the fast pure-bits extraction path
    pub pure_barcode: bool,
    /// Byte-mode character set override used when the symbol carries no ECI
    pub character_set: Option<String>,
    /// Called once for each confirmed finder or alignment candidate
    pub result_point_callback: Option<&'a dyn Fn(Point)>,
}

/// Options steering an encode call
#[derive(Default, Clone)]
pub struct EncodeHints {
    /// Error correction level, L when unset
    pub error_correction: Option<ECLevel>,
    /// Byte-mode character set, ISO-8859-1 when unset
    pub character_set: Option<String>,
    /// Quiet zone width in modules, 4 when unset
    pub margin: Option<usize>,
}

/// Decodes QR codes from greyscale images. One reader holds one Reed-Solomon
/// decoder, so reusing an instance across calls amortizes its setup; it is
/// not meant to be shared across threads.
pub struct QrReader {
    decoder: Decoder,
}

impl QrReader {
    /// Create a new reader
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
        }
    }

    /// Locate and decode a QR code in the source image
    pub fn decode<S: LuminanceSource>(
        &self,
        source: S,
        hints: &DecodeHints<'_>,
    ) -> Result<ScanResult, Error> {
        let mut binarizer = HybridBinarizer::new(source);
        self.decode_binarizer(&mut binarizer, hints)
    }

    /// Decode using a caller-chosen binarizer
    pub fn decode_binarizer<B: Binarizer>(
        &self,
        binarizer: &mut B,
        hints: &DecodeHints<'_>,
    ) -> Result<ScanResult, Error> {
        let image = binarizer.black_matrix()?;

        let (bits, mut points) = if hints.pure_barcode {
            (extract_pure_bits(image)?, Vec::new())
        } else {
            let sampler = DefaultGridSampler;
            let mut detector = Detector::new(image, &sampler);
            if let Some(callback) = hints.result_point_callback {
                detector = detector.with_result_point_callback(callback);
            }
            let detected = detector.detect(hints.try_harder, hints.pure_barcode)?;
            (detected.bits, detected.points)
        };

        let decoder_result = self
            .decoder
            .decode(&bits, hints.character_set.as_deref())?;
        decoder_result.apply_mirrored_correction(&mut points);

        let mut result = ScanResult::new(
            decoder_result.text.clone(),
            decoder_result.raw_bytes.clone(),
            points,
            BarcodeFormat::QrCode,
        );
        if !decoder_result.byte_segments.is_empty() {
            result.put_metadata(
                ResultMetadataType::ByteSegments,
                MetadataValue::ByteSegments(decoder_result.byte_segments.clone()),
            );
        }
        if let Some(ec_level) = decoder_result.ec_level {
            result.put_metadata(
                ResultMetadataType::ErrorCorrectionLevel,
                MetadataValue::Text(ec_level.to_string()),
            );
        }
        if decoder_result.has_structured_append() {
            result.put_metadata(
                ResultMetadataType::StructuredAppendSequence,
                MetadataValue::Int(decoder_result.structured_append_sequence),
            );
            result.put_metadata(
                ResultMetadataType::StructuredAppendParity,
                MetadataValue::Int(decoder_result.structured_append_parity),
            );
        }
        if decoder_result.mirrored {
            result.put_metadata(ResultMetadataType::Mirrored, MetadataValue::Bool(true));
        }
        if let Some(orientation) = orientation_from_points(&result.points) {
            result.put_metadata(
                ResultMetadataType::Orientation,
                MetadataValue::Int(orientation),
            );
        }
        Ok(result)
    }
}

impl Default for QrReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a QR code from raw greyscale bytes (0 = black, 255 = white)
pub fn decode_luma(
    gray: Vec<u8>,
    width: usize,
    height: usize,
    hints: &DecodeHints<'_>,
) -> Result<ScanResult, Error> {
    let source = Luma8Source::new(gray, width, height)?;
    QrReader::new().decode(source, hints)
}

/// Encode `contents` as a QR code rendered into a pixel-addressed bit matrix
/// (1 = dark). `width` and `height` are minimum output dimensions; pass 0 for
/// the symbol's intrinsic size. The symbol is scaled by a whole factor and
/// centered, keeping at least the configured quiet zone.
pub fn encode(
    contents: &str,
    format: BarcodeFormat,
    width: usize,
    height: usize,
    hints: &EncodeHints,
) -> Result<BitMatrix, Error> {
    if format != BarcodeFormat::QrCode {
        return Err(Error::IllegalArgument("only QR codes are supported"));
    }
    if contents.is_empty() {
        return Err(Error::IllegalArgument("found empty contents"));
    }

    let ec_level = hints.error_correction.unwrap_or(ECLevel::L);
    let margin = hints.margin.unwrap_or(4);
    let code = encoder::encode(contents, ec_level, hints.character_set.as_deref())?;
    render_result(&code.matrix, width, height, margin)
}

/// Scale the module matrix onto the requested canvas with a quiet zone
fn render_result(
    input: &encoder::ByteMatrix,
    width: usize,
    height: usize,
    quiet_zone: usize,
) -> Result<BitMatrix, Error> {
    let input_width = input.width();
    let input_height = input.height();
    let qr_width = input_width + quiet_zone * 2;
    let qr_height = input_height + quiet_zone * 2;
    let output_width = width.max(qr_width);
    let output_height = height.max(qr_height);

    let multiple = (output_width / qr_width).min(output_height / qr_height);
    // Padding includes both the quiet zone and the extra white pixels to
    // accommodate the requested dimensions
    let left_padding = (output_width - input_width * multiple) / 2;
    let top_padding = (output_height - input_height * multiple) / 2;

    let mut output = BitMatrix::new(output_width, output_height);
    for input_y in 0..input_height {
        let output_y = top_padding + input_y * multiple;
        for input_x in 0..input_width {
            if input.get(input_x, input_y) == 1 {
                let output_x = left_padding + input_x * multiple;
                output.set_region(output_x, output_y, multiple, multiple)?;
            }
        }
    }
    Ok(output)
}

/// Fast path for clean, unrotated symbols: find the symbol's bounding box,
/// derive the module size from the top-left finder and sample on a rigid
/// grid.
fn extract_pure_bits(image: &BitMatrix) -> Result<BitMatrix, Error> {
    let (left, top) = image.top_left_on_bit().ok_or(Error::NotFound)?;
    let (right, bottom) = image.bottom_right_on_bit().ok_or(Error::NotFound)?;

    let module_size = pure_module_size(left, top, image)?;

    if left >= right || top >= bottom {
        return Err(Error::NotFound);
    }
    let mut right = right;
    if bottom - top != right - left {
        // Special case: a rectangular image cut off on the right
        right = left + (bottom - top);
        if right >= image.width() {
            return Err(Error::NotFound);
        }
    }

    let matrix_width = ((right - left + 1) as f32 / module_size).round() as usize;
    let matrix_height = ((bottom - top + 1) as f32 / module_size).round() as usize;
    if matrix_width == 0 || matrix_height == 0 || matrix_width != matrix_height {
        return Err(Error::NotFound);
    }

    // Push the sampling points to module centers
    let nudge = (module_size / 2.0) as usize;
    let mut top = top + nudge;
    let mut left = left + nudge;

    let nudged_too_far_right =
        (left + ((matrix_width - 1) as f32 * module_size) as usize) as isize - right as isize;
    if nudged_too_far_right > 0 {
        if nudged_too_far_right as usize > nudge {
            return Err(Error::NotFound);
        }
        left -= nudged_too_far_right as usize;
    }
    let nudged_too_far_down =
        (top + ((matrix_height - 1) as f32 * module_size) as usize) as isize - bottom as isize;
    if nudged_too_far_down > 0 {
        if nudged_too_far_down as usize > nudge {
            return Err(Error::NotFound);
        }
        top -= nudged_too_far_down as usize;
    }

    let mut bits = BitMatrix::new(matrix_width, matrix_height);
    for y in 0..matrix_height {
        let i_offset = top + (y as f32 * module_size) as usize;
        for x in 0..matrix_width {
            if image.get(left + (x as f32 * module_size) as usize, i_offset) {
                bits.set(x, y);
            }
        }
    }
    Ok(bits)
}

/// Module size from the top-left finder pattern's diagonal
fn pure_module_size(left: usize, top: usize, image: &BitMatrix) -> Result<f32, Error> {
    let height = image.height();
    let width = image.width();
    let mut x = left;
    let mut y = top;
    let mut in_black = true;
    let mut transitions = 0;
    while x < width && y < height {
        if in_black != image.get(x, y) {
            transitions += 1;
            if transitions == 5 {
                break;
            }
            in_black = !in_black;
        }
        x += 1;
        y += 1;
    }
    if x == width || y == height {
        return Err(Error::NotFound);
    }
    Ok((x - left) as f32 / 7.0)
}

/// Rotation of the symbol in degrees, from the top edge's direction
fn orientation_from_points(points: &[Point]) -> Option<i32> {
    if points.len() < 3 {
        return None;
    }
    let top_left = points[1];
    let top_right = points[2];
    let angle = (top_right.y - top_left.y).atan2(top_right.x - top_left.x);
    let degrees = angle.to_degrees();
    // Snap to the nearest quarter turn
    let snapped = ((degrees / 90.0).round() as i32).rem_euclid(4) * 90;
    Some(snapped)
}
