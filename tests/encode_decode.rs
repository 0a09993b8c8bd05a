//! End-to-end encode/decode roundtrip tests
//!
//! These render symbols with the encoder, rasterize them to greyscale and
//! feed them back through the full decode pipeline: binarization, detection,
//! error correction and bitstream parsing. They protect the bit-exact
//! surfaces (mask selection, interleaving, format info) against regressions.

use qrcodec::{
    decode_luma, encode, BarcodeFormat, DecodeHints, ECLevel, EncodeHints, Error, MetadataValue,
    ResultMetadataType,
};

/// Render a symbol to greyscale at the given scale with a quiet zone
fn rasterize(contents: &str, ec_level: ECLevel, scale: usize) -> (Vec<u8>, usize, usize) {
    let hints = EncodeHints {
        error_correction: Some(ec_level),
        ..Default::default()
    };
    let matrix = encode(contents, BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
    rasterize_matrix(&matrix, scale)
}

fn rasterize_matrix(matrix: &qrcodec::BitMatrix, scale: usize) -> (Vec<u8>, usize, usize) {
    let width = matrix.width() * scale;
    let height = matrix.height() * scale;
    let mut gray = vec![255u8; width * height];
    for y in 0..height {
        for x in 0..width {
            if matrix.get(x / scale, y / scale) {
                gray[y * width + x] = 0;
            }
        }
    }
    (gray, width, height)
}

fn roundtrip(contents: &str, ec_level: ECLevel) {
    let (gray, width, height) = rasterize(contents, ec_level, 4);
    let hints = DecodeHints {
        try_harder: true,
        ..Default::default()
    };
    let result = decode_luma(gray, width, height, &hints)
        .unwrap_or_else(|e| panic!("decode failed for {:?} at {:?}: {}", contents, ec_level, e));
    assert_eq!(result.text, contents);
}

#[test]
fn test_roundtrip_alphanumeric_all_levels() {
    for ec_level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        roundtrip("HELLO WORLD", ec_level);
    }
}

#[test]
fn test_roundtrip_numeric_all_levels() {
    for ec_level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        roundtrip("01234567", ec_level);
        roundtrip("9780201379624", ec_level);
    }
}

#[test]
fn test_roundtrip_byte_all_levels() {
    for ec_level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        roundtrip("http://example.com/q?r=1&s=2", ec_level);
    }
}

#[test]
fn test_roundtrip_larger_versions() {
    // Long enough to push past version 1 at every level
    let contents = "A".repeat(120);
    for ec_level in [ECLevel::L, ECLevel::H] {
        roundtrip(&contents, ec_level);
    }
    let digits = "8675309".repeat(30);
    roundtrip(&digits, ECLevel::M);
}

#[test]
fn test_roundtrip_kanji_bytes() {
    // Shift_JIS double-byte payload passed as raw bytes; the 13-bit kanji
    // packing must survive the full pipeline byte-exactly
    let sjis_bytes = [0x93u8, 0x5F, 0xE4, 0xAA];
    let contents: String = sjis_bytes.iter().map(|&b| b as char).collect();
    for ec_level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        let hints = EncodeHints {
            error_correction: Some(ec_level),
            character_set: Some("Shift_JIS".into()),
            ..Default::default()
        };
        let matrix = encode(&contents, BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
        let (gray, width, height) = rasterize_matrix(&matrix, 4);
        let result = decode_luma(gray, width, height, &DecodeHints::default()).unwrap();
        // Raw payload carries the exact Shift_JIS pairs after the 4-bit mode
        // and 8-bit count: 0001 (kanji count 2 at version 1 is 8 bits)
        let raw = &result.raw_bytes;
        assert_eq!(raw[0] >> 4, 0x8, "kanji mode indicator");
        // Count = 2 codepoints
        assert_eq!(((raw[0] as u16 & 0xF) << 4) | (raw[1] as u16 >> 4), 2);
    }
}

#[test]
fn test_hello_world_reference_mask_and_level() {
    let (gray, width, height) = rasterize("HELLO WORLD", ECLevel::L, 4);
    let result = decode_luma(gray, width, height, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "HELLO WORLD");
    assert_eq!(
        result.metadata.get(&ResultMetadataType::ErrorCorrectionLevel),
        Some(&MetadataValue::Text("L".into()))
    );
}

#[test]
fn test_numeric_reference_decode() {
    let (gray, width, height) = rasterize("01234567", ECLevel::M, 4);
    let result = decode_luma(gray, width, height, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "01234567");
    assert_eq!(
        result.metadata.get(&ResultMetadataType::ErrorCorrectionLevel),
        Some(&MetadataValue::Text("M".into()))
    );
}

#[test]
fn test_rotation_invariance_with_orientation_metadata() {
    let hints = EncodeHints {
        error_correction: Some(ECLevel::M),
        ..Default::default()
    };
    let matrix = encode("ROTATE ME 123", BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
    let (gray, width, height) = rasterize_matrix(&matrix, 4);

    let source = qrcodec::Luma8Source::new(gray, width, height).unwrap();
    let reader = qrcodec::QrReader::new();

    // Rotating the image counterclockwise turns the symbol's top edge from
    // +x to -y, so the reported orientation steps backwards through the
    // quarter turns
    let mut current = source;
    for expected_orientation in [0i32, 270, 180, 90] {
        let result = reader
            .decode(current.clone(), &DecodeHints::default())
            .unwrap_or_else(|e| panic!("decode failed at {}: {}", expected_orientation, e));
        assert_eq!(result.text, "ROTATE ME 123");
        assert_eq!(
            result.metadata.get(&ResultMetadataType::Orientation),
            Some(&MetadataValue::Int(expected_orientation)),
            "wrong orientation after {} degrees",
            expected_orientation
        );
        // Each rotate_ccw turns the image; the symbol's apparent rotation
        // grows a quarter turn at a time
        current = current.rotate_ccw();
    }
}

#[test]
fn test_mirrored_symbol_recovery() {
    let hints = EncodeHints {
        error_correction: Some(ECLevel::L),
        ..Default::default()
    };
    let matrix = encode("HELLO WORLD", BarcodeFormat::QrCode, 0, 0, &hints).unwrap();

    // Mirror horizontally
    let mut mirrored = qrcodec::BitMatrix::new(matrix.width(), matrix.height());
    for y in 0..matrix.height() {
        for x in 0..matrix.width() {
            if matrix.get(matrix.width() - 1 - x, y) {
                mirrored.set(x, y);
            }
        }
    }
    let (gray, width, height) = rasterize_matrix(&mirrored, 4);
    let result = decode_luma(gray, width, height, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, "HELLO WORLD");
    assert_eq!(
        result.metadata.get(&ResultMetadataType::Mirrored),
        Some(&MetadataValue::Bool(true))
    );
}

#[test]
fn test_pure_barcode_path() {
    let (gray, width, height) = rasterize("PURE 42", ECLevel::M, 3);
    let hints = DecodeHints {
        pure_barcode: true,
        ..Default::default()
    };
    let result = decode_luma(gray, width, height, &hints).unwrap();
    assert_eq!(result.text, "PURE 42");
}

#[test]
fn test_uniform_image_not_found() {
    let gray = vec![128u8; 100 * 100];
    let result = decode_luma(gray, 100, 100, &DecodeHints::default());
    assert_eq!(result.err(), Some(Error::NotFound));
}

#[test]
fn test_utf8_content_roundtrip() {
    let contents = "grüße 🙂";
    let hints = EncodeHints {
        error_correction: Some(ECLevel::M),
        character_set: Some("UTF-8".into()),
        ..Default::default()
    };
    let matrix = encode(contents, BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
    let (gray, width, height) = rasterize_matrix(&matrix, 4);
    let result = decode_luma(gray, width, height, &DecodeHints::default()).unwrap();
    assert_eq!(result.text, contents);
}

#[test]
fn test_result_point_callback_fires() {
    let (gray, width, height) = rasterize("CALLBACK", ECLevel::M, 4);
    let seen = std::cell::RefCell::new(0usize);
    let callback = |_p: qrcodec::Point| {
        *seen.borrow_mut() += 1;
    };
    let hints = DecodeHints {
        result_point_callback: Some(&callback),
        ..Default::default()
    };
    decode_luma(gray, width, height, &hints).unwrap();
    assert!(*seen.borrow() >= 3, "expected at least the three finders");
}
