//! Detector geometry tests on synthetic renderings
//!
//! These verify the detector's reported geometry (finder centers, module
//! size, dimension) against symbols whose exact layout is known, without
//! involving the bitstream decoder.

use qrcodec::binarize::{Binarizer, HybridBinarizer};
use qrcodec::detector::{DefaultGridSampler, Detector};
use qrcodec::{encode, BarcodeFormat, ECLevel, EncodeHints, Luma8Source};

/// Render at 4x with the default 4-module quiet zone and binarize
fn detect_setup(contents: &str) -> qrcodec::BitMatrix {
    let hints = EncodeHints {
        error_correction: Some(ECLevel::L),
        ..Default::default()
    };
    let matrix = encode(contents, BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
    let scale = 4;
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
    let source = Luma8Source::new(gray, width, height).unwrap();
    let mut binarizer = HybridBinarizer::new(source);
    binarizer.black_matrix().unwrap().clone()
}

#[test]
fn test_detector_geometry_on_version1() {
    // 21x21 modules at 4 px/module with a 4-module quiet zone
    let image = detect_setup("HELLO WORLD");
    let sampler = DefaultGridSampler;
    let detector = Detector::new(&image, &sampler);
    let result = detector.detect(false, false).unwrap();

    assert_eq!(result.bits.width(), 21);
    assert_eq!(result.bits.height(), 21);
    // Version 1: no alignment pattern, three points
    assert_eq!(result.points.len(), 3);

    // Finder centers sit at module coordinates (3.5, 3.5), (17.5, 3.5) and
    // (3.5, 17.5); with the quiet zone the image coordinate is (m + 4) * 4
    let expect = |p: &qrcodec::Point, mx: f32, my: f32| {
        let ex = (mx + 4.0) * 4.0;
        let ey = (my + 4.0) * 4.0;
        assert!(
            (p.x - ex).abs() < 4.0 && (p.y - ey).abs() < 4.0,
            "point ({}, {}) expected near ({}, {})",
            p.x,
            p.y,
            ex,
            ey
        );
    };
    expect(&result.points[1], 3.5, 3.5); // top-left
    expect(&result.points[2], 17.5, 3.5); // top-right
    expect(&result.points[0], 3.5, 17.5); // bottom-left
}

#[test]
fn test_detector_finds_alignment_on_version2() {
    // 33 characters of alphanumeric force version 2 at EC L, which carries
    // one alignment pattern
    let image = detect_setup("HELLO WORLD HELLO WORLD HELLO WOR");
    let sampler = DefaultGridSampler;
    let detector = Detector::new(&image, &sampler);
    let result = detector.detect(false, false).unwrap();
    assert_eq!(result.bits.width(), 25);
    // Three finders plus the alignment pattern
    assert_eq!(result.points.len(), 4);
}

#[test]
fn test_detected_grid_matches_encoded_modules() {
    let hints = EncodeHints {
        error_correction: Some(ECLevel::L),
        ..Default::default()
    };
    let encoded = encode("GRID CHECK 99", BarcodeFormat::QrCode, 0, 0, &hints).unwrap();
    let image = detect_setup("GRID CHECK 99");
    let sampler = DefaultGridSampler;
    let detector = Detector::new(&image, &sampler);
    let result = detector.detect(false, false).unwrap();

    // The sampled grid must reproduce the encoded modules bit for bit (the
    // quiet zone offset is 4 modules in the rendered matrix)
    for y in 0..result.bits.height() {
        for x in 0..result.bits.width() {
            assert_eq!(
                result.bits.get(x, y),
                encoded.get(x + 4, y + 4),
                "module mismatch at ({}, {})",
                x,
                y
            );
        }
    }
}
