//! QR code decoding
//!
//! Everything after detection: reading version and format information out of
//! the sampled grid, deinterleaving data blocks, Reed-Solomon correction and
//! mode-by-mode bitstream parsing.

/// BCH arithmetic for the format and version fields
pub mod bch;
/// Mode-sensitive bitstream parsing
pub mod bitstream;
/// Character set registry and encoding guessing
pub mod charset;
/// Data block deinterleaving
pub mod data_block;
/// Format information decoding (EC level, mask pattern)
pub mod format;
/// Version, format and codeword extraction from the module grid
pub mod parser;
/// Version tables and function pattern layout
pub mod version;

use crate::debug::debug_enabled;
use crate::ec::{qr_code_field_256, ReedSolomonDecoder};
use crate::error::Error;
use crate::models::{BitMatrix, DecoderResult};

pub use charset::CharacterSetEci;
pub use data_block::DataBlock;
pub use format::FormatInformation;
pub use parser::BitMatrixParser;
pub use version::Version;

/// Decodes a sampled module grid into text. Reuses one Reed-Solomon decoder
/// across blocks and retries the mirrored orientation before giving up.
pub struct Decoder {
    rs_decoder: ReedSolomonDecoder,
}

impl Decoder {
    /// A decoder over the QR code field
    pub fn new() -> Self {
        Self {
            rs_decoder: ReedSolomonDecoder::new(qr_code_field_256()),
        }
    }

    /// Decode a grid of sampled modules, where true means black
    pub fn decode(
        &self,
        bits: &BitMatrix,
        character_set_hint: Option<&str>,
    ) -> Result<DecoderResult, Error> {
        let mut parser = BitMatrixParser::new(bits.clone())?;

        let first_failure = match self.decode_parsed(&mut parser, character_set_hint) {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        // Revert the bit matrix and try the mirrored orientation
        parser.remask();
        parser.set_mirror(true);
        let mirrored = (|| {
            parser.read_version()?;
            parser.read_format_information()?;
            parser.mirror();
            self.decode_parsed(&mut parser, character_set_hint)
        })();

        match mirrored {
            Ok(mut result) => {
                if debug_enabled() {
                    eprintln!("DECODE: mirrored re-parse succeeded");
                }
                result.mirrored = true;
                Ok(result)
            }
            // Surface the original failure, not the mirrored one
            Err(_) => Err(first_failure),
        }
    }

    fn decode_parsed(
        &self,
        parser: &mut BitMatrixParser,
        character_set_hint: Option<&str>,
    ) -> Result<DecoderResult, Error> {
        let version = parser.read_version()?;
        let format_info = parser.read_format_information()?;
        let ec_level = format_info.ec_level;

        let codewords = parser.read_codewords()?;
        let data_blocks = DataBlock::get_data_blocks(&codewords, version, ec_level)?;

        let total_bytes: usize = data_blocks.iter().map(|b| b.num_data_codewords).sum();
        let mut result_bytes = Vec::with_capacity(total_bytes);
        for block in &data_blocks {
            let mut codeword_ints: Vec<i32> =
                block.codewords.iter().map(|&b| b as i32).collect();
            let ec_count = block.codewords.len() - block.num_data_codewords;
            self.rs_decoder.decode(&mut codeword_ints, ec_count)?;
            result_bytes.extend(
                codeword_ints[..block.num_data_codewords]
                    .iter()
                    .map(|&w| w as u8),
            );
        }

        bitstream::decode(&result_bytes, version, Some(ec_level), character_set_hint)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
