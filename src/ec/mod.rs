//! Galois field arithmetic and Reed-Solomon codecs
//!
//! The shared algebraic kernel of the library:
//! - GF(2^m) fields with precomputed log/exp tables
//! - Polynomials over those fields
//! - Reed-Solomon encoding (generator polynomial cache)
//! - Reed-Solomon decoding (Euclidean algorithm, Chien search, Forney)

/// Reed-Solomon decoder
pub mod decode;
/// Reed-Solomon encoder
pub mod encode;
/// GF(2^m) field arithmetic and the predefined symbology fields
pub mod galois;
/// Polynomials over a Galois field
pub mod poly;

pub use decode::ReedSolomonDecoder;
pub use encode::ReedSolomonEncoder;
pub use galois::{qr_code_field_256, GaloisField};
pub use poly::GfPoly;
