//! Core data structures shared by the whole pipeline
//!
//! This module defines the main types used throughout the library:
//! - BitArray / BitMatrix / BitSource: packed bit storage and bit-level readers
//! - Point: 2D coordinates for geometry calculations
//! - ECLevel, MaskPattern, Mode: QR code metadata
//! - ScanResult / DecoderResult: decode outputs

/// Packed bit sequences
pub mod bit_array;
/// Packed 2D bit grids
pub mod bit_matrix;
/// Sequential bit reading from bytes
pub mod bit_source;
/// 2D points and pattern ordering
pub mod point;
/// Decode result and metadata types
pub mod result;
/// EC levels, masks, modes and format tags
pub mod types;

pub use bit_array::BitArray;
pub use bit_matrix::BitMatrix;
pub use bit_source::BitSource;
pub use point::{order_best_patterns, Point};
pub use result::{DecoderResult, MetadataValue, ResultMetadataType, ScanResult};
pub use types::{BarcodeFormat, ECLevel, MaskPattern, Mode};
