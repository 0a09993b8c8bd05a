//! QR code encoding
//!
//! Text goes in, a module matrix comes out:
//! - Mode selection (numeric, alphanumeric, byte, kanji)
//! - Version selection by capacity at the requested EC level
//! - Reed-Solomon block generation and interleaving
//! - Matrix construction and minimum-penalty mask selection

/// Module grid under construction
pub mod byte_matrix;
/// Mask penalty rules
pub mod mask;
/// Function pattern and data placement
pub mod matrix_util;

use crate::debug::debug_enabled;
use crate::decoder::charset::CharacterSetEci;
use crate::decoder::version::Version;
use crate::ec::{qr_code_field_256, ReedSolomonEncoder};
use crate::error::Error;
use crate::models::{BitArray, ECLevel, MaskPattern, Mode};

pub use byte_matrix::ByteMatrix;

const ALPHANUMERIC_TABLE: [i8; 96] = [
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, // 0x00-0x0f
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, // 0x10-0x1f
    36, -1, -1, -1, 37, 38, -1, -1, -1, -1, 39, 40, -1, 41, 42, 43, // 0x20-0x2f
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 44, -1, -1, -1, -1, -1, // 0x30-0x3f
    -1, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, // 0x40-0x4f
    25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, -1, -1, -1, -1, -1, // 0x50-0x5f
];

/// The default byte-mode interpretation
const DEFAULT_BYTE_MODE_ENCODING: CharacterSetEci = CharacterSetEci::Iso8859_1;

/// The finished symbol: its parameters plus the module matrix
pub struct EncodedQrCode {
    /// Mode the payload was encoded in
    pub mode: Mode,
    /// Error correction level
    pub ec_level: ECLevel,
    /// Selected version
    pub version: Version,
    /// Mask that minimized the penalty score
    pub mask_pattern: MaskPattern,
    /// The finished module grid
    pub matrix: ByteMatrix,
}

/// Encode `content` at the requested EC level. The character set hint picks
/// the byte-mode encoding (ISO-8859-1 unless told otherwise); Shift_JIS
/// payloads whose bytes are all double-byte kanji use KANJI mode.
pub fn encode(
    content: &str,
    ec_level: ECLevel,
    character_set: Option<&str>,
) -> Result<EncodedQrCode, Error> {
    if content.is_empty() {
        return Err(Error::IllegalArgument("found empty contents"));
    }

    let encoding = match character_set {
        Some(name) => CharacterSetEci::from_name(name)
            .ok_or(Error::IllegalArgument("unsupported character set"))?,
        None => DEFAULT_BYTE_MODE_ENCODING,
    };

    // Pick an internal byte representation up front; mode choice and the
    // byte-mode payload both work from it
    let content_bytes = encode_content(content, encoding)?;
    let mode = choose_mode(content, &content_bytes, encoding);

    // ECI header when the caller asked for a non-default byte encoding
    let mut header_bits = BitArray::new();
    if mode == Mode::Byte && character_set.is_some() && encoding != DEFAULT_BYTE_MODE_ENCODING {
        append_eci(encoding, &mut header_bits)?;
    }
    header_bits.append_bits(mode.bits() as u32, 4)?;

    let mut data_bits = BitArray::new();
    append_bytes(content, mode, &content_bytes, &mut data_bits)?;

    let version = recommend_version(ec_level, mode, &header_bits, &data_bits)?;

    let mut header_and_data_bits = BitArray::new();
    header_and_data_bits.append_bit_array(&header_bits);
    let num_letters = match mode {
        Mode::Byte => data_bits.size_in_bytes(),
        Mode::Kanji => content_bytes.len() / 2,
        _ => content.chars().count(),
    };
    append_length_info(num_letters, version, mode, &mut header_and_data_bits)?;
    header_and_data_bits.append_bit_array(&data_bits);

    let ec_blocks = version.ec_blocks(ec_level);
    let num_data_bytes = version.total_codewords() - ec_blocks.total_ec_codewords();
    terminate_bits(num_data_bytes, &mut header_and_data_bits)?;

    let final_bits = interleave_with_ec_bytes(
        &header_and_data_bits,
        version.total_codewords(),
        num_data_bytes,
        ec_blocks.num_blocks(),
    )?;

    let dimension = version.dimension();
    let mut matrix = ByteMatrix::new(dimension, dimension);
    let mask_pattern = choose_mask_pattern(&final_bits, ec_level, version, &mut matrix)?;
    matrix_util::build_matrix(&final_bits, ec_level, version, mask_pattern, &mut matrix)?;

    if debug_enabled() {
        eprintln!(
            "ENCODE: mode={:?}, version={}, mask={:?}",
            mode,
            version.number(),
            mask_pattern
        );
    }

    Ok(EncodedQrCode {
        mode,
        ec_level,
        version,
        mask_pattern,
        matrix,
    })
}

fn alphanumeric_code(c: char) -> i8 {
    let code = c as usize;
    if code < ALPHANUMERIC_TABLE.len() {
        ALPHANUMERIC_TABLE[code]
    } else {
        -1
    }
}

/// Map the content onto bytes in the requested encoding. ISO-8859-1 covers
/// code points up to 0xFF; Shift_JIS payloads are expected to arrive as raw
/// bytes widened into chars.
fn encode_content(content: &str, encoding: CharacterSetEci) -> Result<Vec<u8>, Error> {
    match encoding {
        CharacterSetEci::Utf8 => Ok(content.as_bytes().to_vec()),
        _ => content
            .chars()
            .map(|c| {
                let code = c as u32;
                if code <= 0xFF {
                    Ok(code as u8)
                } else {
                    Err(Error::writer(format!(
                        "character {:?} is not encodable in {}",
                        c,
                        encoding.name()
                    )))
                }
            })
            .collect(),
    }
}

fn choose_mode(content: &str, content_bytes: &[u8], encoding: CharacterSetEci) -> Mode {
    if encoding == CharacterSetEci::ShiftJis && is_only_double_byte_kanji(content_bytes) {
        return Mode::Kanji;
    }
    let mut has_numeric = false;
    let mut has_alphanumeric = false;
    for c in content.chars() {
        if c.is_ascii_digit() {
            has_numeric = true;
        } else if alphanumeric_code(c) != -1 {
            has_alphanumeric = true;
        } else {
            return Mode::Byte;
        }
    }
    if has_alphanumeric {
        return Mode::Alphanumeric;
    }
    if has_numeric {
        return Mode::Numeric;
    }
    Mode::Byte
}

fn is_only_double_byte_kanji(bytes: &[u8]) -> bool {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return false;
    }
    for pair in bytes.chunks_exact(2) {
        let byte1 = pair[0];
        if !(0x81..=0x9F).contains(&byte1) && !(0xE0..=0xEB).contains(&byte1) {
            return false;
        }
    }
    true
}

fn append_eci(eci: CharacterSetEci, bits: &mut BitArray) -> Result<(), Error> {
    bits.append_bits(Mode::Eci.bits() as u32, 4)?;
    // Single-byte designator covers every registered value below 128
    bits.append_bits(eci.value(), 8)
}

fn calculate_bits_needed(
    mode: Mode,
    header_bits: &BitArray,
    data_bits: &BitArray,
    version: Version,
) -> usize {
    header_bits.size() + mode.character_count_bits(version.number()) + data_bits.size()
}

/// Smallest version able to carry the payload at this EC level. The count
/// field width depends on the version, so decide provisionally at version 1
/// and then re-evaluate.
fn recommend_version(
    ec_level: ECLevel,
    mode: Mode,
    header_bits: &BitArray,
    data_bits: &BitArray,
) -> Result<Version, Error> {
    let provisional_bits_needed =
        calculate_bits_needed(mode, header_bits, data_bits, Version::get(1)?);
    let provisional_version = choose_version(provisional_bits_needed, ec_level)?;
    let bits_needed = calculate_bits_needed(mode, header_bits, data_bits, provisional_version);
    choose_version(bits_needed, ec_level)
}

fn choose_version(num_input_bits: usize, ec_level: ECLevel) -> Result<Version, Error> {
    for version_num in 1..=40u8 {
        let version = Version::get(version_num)?;
        if will_fit(num_input_bits, version, ec_level) {
            return Ok(version);
        }
    }
    Err(Error::writer("data too big for any version"))
}

fn will_fit(num_input_bits: usize, version: Version, ec_level: ECLevel) -> bool {
    let num_bytes = version.total_codewords();
    let ec_blocks = version.ec_blocks(ec_level);
    let num_data_bytes = num_bytes - ec_blocks.total_ec_codewords();
    // Integer ceiling division
    let total_input_bytes = (num_input_bits + 7) / 8;
    num_data_bytes >= total_input_bytes
}

fn append_length_info(
    num_letters: usize,
    version: Version,
    mode: Mode,
    bits: &mut BitArray,
) -> Result<(), Error> {
    let num_bits = mode.character_count_bits(version.number());
    if num_letters >= (1 << num_bits) {
        return Err(Error::writer(format!(
            "{} is bigger than {}",
            num_letters,
            (1 << num_bits) - 1
        )));
    }
    bits.append_bits(num_letters as u32, num_bits)
}

fn append_bytes(
    content: &str,
    mode: Mode,
    content_bytes: &[u8],
    bits: &mut BitArray,
) -> Result<(), Error> {
    match mode {
        Mode::Numeric => append_numeric_bytes(content, bits),
        Mode::Alphanumeric => append_alphanumeric_bytes(content, bits),
        Mode::Byte => {
            for &b in content_bytes {
                bits.append_bits(b as u32, 8)?;
            }
            Ok(())
        }
        Mode::Kanji => append_kanji_bytes(content_bytes, bits),
        _ => Err(Error::IllegalArgument("invalid mode for payload")),
    }
}

fn append_numeric_bytes(content: &str, bits: &mut BitArray) -> Result<(), Error> {
    let digits: Vec<u32> = content
        .chars()
        .map(|c| c.to_digit(10).ok_or(Error::writer("non-digit in numeric mode")))
        .collect::<Result<_, _>>()?;
    let mut i = 0;
    while i + 3 <= digits.len() {
        bits.append_bits(digits[i] * 100 + digits[i + 1] * 10 + digits[i + 2], 10)?;
        i += 3;
    }
    match digits.len() - i {
        2 => bits.append_bits(digits[i] * 10 + digits[i + 1], 7)?,
        1 => bits.append_bits(digits[i], 4)?,
        _ => {}
    }
    Ok(())
}

fn append_alphanumeric_bytes(content: &str, bits: &mut BitArray) -> Result<(), Error> {
    let codes: Vec<u32> = content
        .chars()
        .map(|c| {
            let code = alphanumeric_code(c);
            if code < 0 {
                Err(Error::writer("character not in alphanumeric alphabet"))
            } else {
                Ok(code as u32)
            }
        })
        .collect::<Result<_, _>>()?;
    let mut i = 0;
    while i + 2 <= codes.len() {
        bits.append_bits(codes[i] * 45 + codes[i + 1], 11)?;
        i += 2;
    }
    if i < codes.len() {
        bits.append_bits(codes[i], 6)?;
    }
    Ok(())
}

/// Pack Shift_JIS double-byte pairs into 13 bits each
fn append_kanji_bytes(bytes: &[u8], bits: &mut BitArray) -> Result<(), Error> {
    if bytes.len() % 2 != 0 {
        return Err(Error::writer("kanji byte size not even"));
    }
    for pair in bytes.chunks_exact(2) {
        let code = ((pair[0] as u32) << 8) | pair[1] as u32;
        let subtracted = if (0x8140..=0x9FFC).contains(&code) {
            code - 0x8140
        } else if (0xE040..=0xEBBF).contains(&code) {
            code - 0xC140
        } else {
            return Err(Error::writer("invalid byte sequence for kanji mode"));
        };
        let encoded = ((subtracted >> 8) * 0xC0) + (subtracted & 0xFF);
        bits.append_bits(encoded, 13)?;
    }
    Ok(())
}

/// Terminator, byte alignment, then alternating 0xEC / 0x11 padding
fn terminate_bits(num_data_bytes: usize, bits: &mut BitArray) -> Result<(), Error> {
    let capacity = num_data_bytes * 8;
    if bits.size() > capacity {
        return Err(Error::writer(format!(
            "data bits cannot fit in the QR code: {} > {}",
            bits.size(),
            capacity
        )));
    }
    for _ in 0..4 {
        if bits.size() >= capacity {
            break;
        }
        bits.append_bit(false);
    }
    // Pad out the last byte
    let num_bits_in_last_byte = bits.size() & 0x07;
    if num_bits_in_last_byte > 0 {
        for _ in num_bits_in_last_byte..8 {
            bits.append_bit(false);
        }
    }
    let num_padding_bytes = num_data_bytes - bits.size_in_bytes();
    for i in 0..num_padding_bytes {
        bits.append_bits(if i & 1 == 0 { 0xEC } else { 0x11 }, 8)?;
    }
    if bits.size() != capacity {
        return Err(Error::writer("bits size does not equal capacity"));
    }
    Ok(())
}

fn num_bytes_for_block(
    num_total_bytes: usize,
    num_data_bytes: usize,
    num_rs_blocks: usize,
    block_id: usize,
) -> Result<(usize, usize), Error> {
    // Shorter blocks first, then the blocks carrying one extra byte
    let num_rs_blocks_in_group2 = num_total_bytes % num_rs_blocks;
    let num_rs_blocks_in_group1 = num_rs_blocks - num_rs_blocks_in_group2;
    let num_total_bytes_in_group1 = num_total_bytes / num_rs_blocks;
    let num_total_bytes_in_group2 = num_total_bytes_in_group1 + 1;
    let num_data_bytes_in_group1 = num_data_bytes / num_rs_blocks;
    let num_data_bytes_in_group2 = num_data_bytes_in_group1 + 1;
    let num_ec_bytes_in_group1 = num_total_bytes_in_group1 - num_data_bytes_in_group1;
    let num_ec_bytes_in_group2 = num_total_bytes_in_group2 - num_data_bytes_in_group2;

    if num_ec_bytes_in_group1 != num_ec_bytes_in_group2
        || num_total_bytes
            != (num_data_bytes_in_group1 + num_ec_bytes_in_group1) * num_rs_blocks_in_group1
                + (num_data_bytes_in_group2 + num_ec_bytes_in_group2) * num_rs_blocks_in_group2
    {
        return Err(Error::writer("block size accounting mismatch"));
    }

    if block_id < num_rs_blocks_in_group1 {
        Ok((num_data_bytes_in_group1, num_ec_bytes_in_group1))
    } else {
        Ok((num_data_bytes_in_group2, num_ec_bytes_in_group2))
    }
}

fn generate_ec_bytes(data_bytes: &[u8], num_ec_bytes: usize) -> Result<Vec<u8>, Error> {
    let mut to_encode: Vec<i32> = data_bytes.iter().map(|&b| b as i32).collect();
    to_encode.resize(data_bytes.len() + num_ec_bytes, 0);
    let mut encoder = ReedSolomonEncoder::new(qr_code_field_256());
    encoder.encode(&mut to_encode, num_ec_bytes)?;
    Ok(to_encode[data_bytes.len()..].iter().map(|&w| w as u8).collect())
}

/// Split the data into blocks, append Reed-Solomon bytes to each and write
/// data then EC codewords column-major across blocks.
fn interleave_with_ec_bytes(
    bits: &BitArray,
    num_total_bytes: usize,
    num_data_bytes: usize,
    num_rs_blocks: usize,
) -> Result<BitArray, Error> {
    if bits.size_in_bytes() != num_data_bytes {
        return Err(Error::writer("number of bits and data bytes does not match"));
    }

    let mut data_bytes_offset = 0usize;
    let mut max_num_data_bytes = 0usize;
    let mut max_num_ec_bytes = 0usize;
    let mut blocks: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(num_rs_blocks);

    for block_id in 0..num_rs_blocks {
        let (num_data_bytes_in_block, num_ec_bytes_in_block) =
            num_bytes_for_block(num_total_bytes, num_data_bytes, num_rs_blocks, block_id)?;

        let mut data_bytes = vec![0u8; num_data_bytes_in_block];
        bits.to_bytes(8 * data_bytes_offset, &mut data_bytes, 0, num_data_bytes_in_block);
        let ec_bytes = generate_ec_bytes(&data_bytes, num_ec_bytes_in_block)?;

        max_num_data_bytes = max_num_data_bytes.max(num_data_bytes_in_block);
        max_num_ec_bytes = max_num_ec_bytes.max(ec_bytes.len());
        data_bytes_offset += num_data_bytes_in_block;
        blocks.push((data_bytes, ec_bytes));
    }
    if num_data_bytes != data_bytes_offset {
        return Err(Error::writer("data bytes does not match offset"));
    }

    let mut result = BitArray::new();
    for i in 0..max_num_data_bytes {
        for (data_bytes, _) in &blocks {
            if i < data_bytes.len() {
                result.append_bits(data_bytes[i] as u32, 8)?;
            }
        }
    }
    for i in 0..max_num_ec_bytes {
        for (_, ec_bytes) in &blocks {
            if i < ec_bytes.len() {
                result.append_bits(ec_bytes[i] as u32, 8)?;
            }
        }
    }
    if num_total_bytes != result.size_in_bytes() {
        return Err(Error::writer(format!(
            "interleaving error: {} and {} differ",
            num_total_bytes,
            result.size_in_bytes()
        )));
    }
    Ok(result)
}

/// Build the matrix under all eight masks and keep the cheapest
fn choose_mask_pattern(
    bits: &BitArray,
    ec_level: ECLevel,
    version: Version,
    matrix: &mut ByteMatrix,
) -> Result<MaskPattern, Error> {
    let mut min_penalty = u32::MAX;
    let mut best_mask_pattern = MaskPattern::Pattern0;
    for mask_bits in 0..8u8 {
        let mask_pattern = MaskPattern::from_bits(mask_bits).unwrap();
        matrix_util::build_matrix(bits, ec_level, version, mask_pattern, matrix)?;
        let penalty = mask::calculate_mask_penalty(matrix);
        if penalty < min_penalty {
            min_penalty = penalty;
            best_mask_pattern = mask_pattern;
        }
    }
    Ok(best_mask_pattern)
}
