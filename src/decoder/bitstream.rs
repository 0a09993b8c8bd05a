use crate::decoder::charset::{guess_encoding, CharacterSetEci};
use crate::decoder::version::Version;
use crate::error::Error;
use crate::models::{BitSource, DecoderResult, ECLevel, Mode};

/// GB2312 subset indicator carried by the HANZI mode header
const GB2312_SUBSET: u32 = 1;

const ALPHANUMERIC_CHARS: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Turn corrected data codewords into text, walking segments until the
/// terminator. Modes may alternate freely within one symbol.
pub fn decode(
    bytes: &[u8],
    version: Version,
    ec_level: Option<ECLevel>,
    character_set_hint: Option<&str>,
) -> Result<DecoderResult, Error> {
    let mut bits = BitSource::new(bytes);
    let mut text = String::new();
    let mut byte_segments: Vec<Vec<u8>> = Vec::new();
    let mut symbol_sequence = -1i32;
    let mut parity_data = -1i32;
    let mut current_charset: Option<CharacterSetEci> = None;
    let mut fc1_in_effect = false;

    loop {
        // Not enough bits left for another mode indicator means an implicit
        // terminator
        let mode = if bits.available() < 4 {
            Mode::Terminator
        } else {
            let mode_bits = bits.read_bits(4).ok_or(Error::Format("bit stream exhausted"))?;
            Mode::from_bits(mode_bits as u8).ok_or(Error::Format("unknown mode indicator"))?
        };

        match mode {
            Mode::Terminator => break,
            Mode::Fnc1First | Mode::Fnc1Second => {
                // Only affects alphanumeric percent post-processing
                fc1_in_effect = true;
            }
            Mode::StructuredAppend => {
                if bits.available() < 16 {
                    return Err(Error::Format("structured append header truncated"));
                }
                symbol_sequence = bits.read_bits(8).unwrap() as i32;
                parity_data = bits.read_bits(8).unwrap() as i32;
            }
            Mode::Eci => {
                let value = parse_eci_value(&mut bits)?;
                current_charset = CharacterSetEci::from_value(value)?;
                if current_charset.is_none() {
                    return Err(Error::Format("unknown ECI designator"));
                }
            }
            Mode::Hanzi => {
                let subset = bits
                    .read_bits(4)
                    .ok_or(Error::Format("bit stream exhausted"))?;
                let count = bits
                    .read_bits(mode.character_count_bits(version.number()))
                    .ok_or(Error::Format("bit stream exhausted"))? as usize;
                if subset == GB2312_SUBSET {
                    decode_hanzi_segment(&mut bits, &mut text, count)?;
                }
            }
            _ => {
                let count = bits
                    .read_bits(mode.character_count_bits(version.number()))
                    .ok_or(Error::Format("bit stream exhausted"))? as usize;
                match mode {
                    Mode::Numeric => decode_numeric_segment(&mut bits, &mut text, count)?,
                    Mode::Alphanumeric => {
                        decode_alphanumeric_segment(&mut bits, &mut text, count, fc1_in_effect)?
                    }
                    Mode::Byte => decode_byte_segment(
                        &mut bits,
                        &mut text,
                        count,
                        current_charset,
                        character_set_hint,
                        &mut byte_segments,
                    )?,
                    Mode::Kanji => decode_kanji_segment(&mut bits, &mut text, count)?,
                    _ => return Err(Error::Format("mode not allowed here")),
                }
            }
        }
    }

    let mut result = DecoderResult::new(bytes.to_vec(), text);
    result.byte_segments = byte_segments;
    result.ec_level = ec_level.map(|l| l.name());
    result.structured_append_sequence = symbol_sequence;
    result.structured_append_parity = parity_data;
    Ok(result)
}

/// ECI designators are 1, 2 or 3 bytes, sized by a unary-ish prefix
fn parse_eci_value(bits: &mut BitSource) -> Result<u32, Error> {
    let first_byte = bits
        .read_bits(8)
        .ok_or(Error::Format("bit stream exhausted"))?;
    if first_byte & 0x80 == 0 {
        return Ok(first_byte & 0x7F);
    }
    if first_byte & 0xC0 == 0x80 {
        let second_byte = bits
            .read_bits(8)
            .ok_or(Error::Format("bit stream exhausted"))?;
        return Ok(((first_byte & 0x3F) << 8) | second_byte);
    }
    if first_byte & 0xE0 == 0xC0 {
        let second_third_bytes = bits
            .read_bits(16)
            .ok_or(Error::Format("bit stream exhausted"))?;
        return Ok(((first_byte & 0x1F) << 16) | second_third_bytes);
    }
    Err(Error::Format("bad ECI designator prefix"))
}

/// Three digits in 10 bits, two in 7, one in 4; values past the digit range
/// mean a corrupted stream.
fn decode_numeric_segment(
    bits: &mut BitSource,
    text: &mut String,
    mut count: usize,
) -> Result<(), Error> {
    while count >= 3 {
        let three_digits = bits
            .read_bits(10)
            .ok_or(Error::Format("bit stream exhausted"))?;
        if three_digits >= 1000 {
            return Err(Error::Format("digit group out of range"));
        }
        text.push(to_alphanumeric_char(three_digits / 100)?);
        text.push(to_alphanumeric_char((three_digits / 10) % 10)?);
        text.push(to_alphanumeric_char(three_digits % 10)?);
        count -= 3;
    }
    if count == 2 {
        let two_digits = bits
            .read_bits(7)
            .ok_or(Error::Format("bit stream exhausted"))?;
        if two_digits >= 100 {
            return Err(Error::Format("digit group out of range"));
        }
        text.push(to_alphanumeric_char(two_digits / 10)?);
        text.push(to_alphanumeric_char(two_digits % 10)?);
    } else if count == 1 {
        let digit = bits
            .read_bits(4)
            .ok_or(Error::Format("bit stream exhausted"))?;
        if digit >= 10 {
            return Err(Error::Format("digit out of range"));
        }
        text.push(to_alphanumeric_char(digit)?);
    }
    Ok(())
}

fn decode_alphanumeric_segment(
    bits: &mut BitSource,
    text: &mut String,
    mut count: usize,
    fc1_in_effect: bool,
) -> Result<(), Error> {
    let start = text.len();
    while count > 1 {
        let next_two = bits
            .read_bits(11)
            .ok_or(Error::Format("bit stream exhausted"))?;
        text.push(to_alphanumeric_char(next_two / 45)?);
        text.push(to_alphanumeric_char(next_two % 45)?);
        count -= 2;
    }
    if count == 1 {
        let value = bits
            .read_bits(6)
            .ok_or(Error::Format("bit stream exhausted"))?;
        text.push(to_alphanumeric_char(value)?);
    }

    if fc1_in_effect {
        // In a GS1-flagged symbol, %% is a literal percent and a lone % is a
        // field separator
        let tail: String = text[start..].to_string();
        let mut rewritten = String::with_capacity(tail.len());
        let mut chars = tail.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' {
                if chars.peek() == Some(&'%') {
                    chars.next();
                    rewritten.push('%');
                } else {
                    rewritten.push('\u{1D}');
                }
            } else {
                rewritten.push(c);
            }
        }
        text.truncate(start);
        text.push_str(&rewritten);
    }
    Ok(())
}

fn to_alphanumeric_char(value: u32) -> Result<char, Error> {
    if value as usize >= ALPHANUMERIC_CHARS.len() {
        return Err(Error::Format("alphanumeric value out of range"));
    }
    Ok(ALPHANUMERIC_CHARS[value as usize] as char)
}

fn decode_byte_segment(
    bits: &mut BitSource,
    text: &mut String,
    count: usize,
    current_charset: Option<CharacterSetEci>,
    character_set_hint: Option<&str>,
    byte_segments: &mut Vec<Vec<u8>>,
) -> Result<(), Error> {
    if 8 * count > bits.available() {
        return Err(Error::Format("byte segment longer than stream"));
    }
    let mut read_bytes = Vec::with_capacity(count);
    for _ in 0..count {
        read_bytes.push(bits.read_bits(8).unwrap() as u8);
    }
    let charset = match current_charset {
        Some(charset) => charset,
        None => guess_encoding(&read_bytes, character_set_hint),
    };
    text.push_str(&charset.decode_to_string(&read_bytes));
    byte_segments.push(read_bytes);
    Ok(())
}

/// 13-bit packed Shift_JIS pairs
fn decode_kanji_segment(
    bits: &mut BitSource,
    text: &mut String,
    count: usize,
) -> Result<(), Error> {
    if count * 13 > bits.available() {
        return Err(Error::Format("kanji segment longer than stream"));
    }
    let mut buffer = Vec::with_capacity(2 * count);
    for _ in 0..count {
        let two_bytes = bits.read_bits(13).unwrap();
        let mut assembled = ((two_bytes / 0x0C0) << 8) | (two_bytes % 0x0C0);
        if assembled < 0x01F00 {
            // In the 0x8140 to 0x9FFC range
            assembled += 0x08140;
        } else {
            // In the 0xE040 to 0xEBBF range
            assembled += 0x0C140;
        }
        buffer.push((assembled >> 8) as u8);
        buffer.push((assembled & 0xFF) as u8);
    }
    text.push_str(&CharacterSetEci::ShiftJis.decode_to_string(&buffer));
    Ok(())
}

/// 13-bit packed GB2312 pairs
fn decode_hanzi_segment(
    bits: &mut BitSource,
    text: &mut String,
    count: usize,
) -> Result<(), Error> {
    if count * 13 > bits.available() {
        return Err(Error::Format("hanzi segment longer than stream"));
    }
    let mut buffer = Vec::with_capacity(2 * count);
    for _ in 0..count {
        let two_bytes = bits.read_bits(13).unwrap();
        let mut assembled = ((two_bytes / 0x060) << 8) | (two_bytes % 0x060);
        if assembled < 0x00A00 {
            // In the 0xA1A1 to 0xAAFE range
            assembled += 0x0A1A1;
        } else {
            // In the 0xB0A1 to 0xFAFE range
            assembled += 0x0A6A1;
        }
        buffer.push((assembled >> 8) as u8);
        buffer.push((assembled & 0xFF) as u8);
    }
    text.push_str(&CharacterSetEci::Gb18030.decode_to_string(&buffer));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BitArray;

    fn version1() -> Version {
        Version::get(1).unwrap()
    }

    fn bits_to_bytes(bits: &BitArray) -> Vec<u8> {
        let mut bytes = vec![0u8; (bits.size() + 7) / 8];
        let padded = {
            let mut copy = bits.clone();
            while copy.size() % 8 != 0 {
                copy.append_bit(false);
            }
            copy
        };
        let bytes_len = bytes.len();
        padded.to_bytes(0, &mut bytes, 0, bytes_len);
        bytes
    }

    #[test]
    fn test_numeric_segment() {
        // "01234567" at version 1: mode 0001, count 8, then 012 345 67
        let mut bits = BitArray::new();
        bits.append_bits(0x1, 4).unwrap();
        bits.append_bits(8, 10).unwrap();
        bits.append_bits(12, 10).unwrap();
        bits.append_bits(345, 10).unwrap();
        bits.append_bits(67, 7).unwrap();
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), Some(ECLevel::M), None).unwrap();
        assert_eq!(result.text, "01234567");
        assert_eq!(result.ec_level, Some("M"));
    }

    #[test]
    fn test_numeric_rejects_out_of_range_group() {
        let mut bits = BitArray::new();
        bits.append_bits(0x1, 4).unwrap();
        bits.append_bits(3, 10).unwrap();
        bits.append_bits(1000, 10).unwrap();
        let bytes = bits_to_bytes(&bits);
        assert!(decode(&bytes, version1(), None, None).is_err());
    }

    #[test]
    fn test_alphanumeric_segment() {
        // "AC-42" from the standard's example
        let mut bits = BitArray::new();
        bits.append_bits(0x2, 4).unwrap();
        bits.append_bits(5, 9).unwrap();
        // AC = 10*45 + 12 = 462; -4 = 41*45 + 4 = 1849; 2 = 2
        bits.append_bits(462, 11).unwrap();
        bits.append_bits(1849, 11).unwrap();
        bits.append_bits(2, 6).unwrap();
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        assert_eq!(result.text, "AC-42");
    }

    #[test]
    fn test_byte_segment_utf8() {
        let payload = "héllo".as_bytes();
        let mut bits = BitArray::new();
        bits.append_bits(0x4, 4).unwrap();
        bits.append_bits(payload.len() as u32, 8).unwrap();
        for &b in payload {
            bits.append_bits(b as u32, 8).unwrap();
        }
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        assert_eq!(result.text, "héllo");
        assert_eq!(result.byte_segments, vec![payload.to_vec()]);
    }

    #[test]
    fn test_structured_append_recorded() {
        let mut bits = BitArray::new();
        bits.append_bits(0x3, 4).unwrap();
        // Symbol 2 of 4 (index 1, count-1 = 3), parity 0xA5
        bits.append_bits(0x13, 8).unwrap();
        bits.append_bits(0xA5, 8).unwrap();
        bits.append_bits(0x1, 4).unwrap();
        bits.append_bits(1, 10).unwrap();
        bits.append_bits(7, 4).unwrap();
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        assert_eq!(result.text, "7");
        assert_eq!(result.structured_append_sequence, 0x13);
        assert_eq!(result.structured_append_parity, 0xA5);
        assert!(result.has_structured_append());
    }

    #[test]
    fn test_eci_switches_charset() {
        // ECI 3 (ISO-8859-1), then a byte segment with a Latin-1 e-acute
        let mut bits = BitArray::new();
        bits.append_bits(0x7, 4).unwrap();
        bits.append_bits(3, 8).unwrap();
        bits.append_bits(0x4, 4).unwrap();
        bits.append_bits(4, 8).unwrap();
        for &b in &[0x63u8, 0x61, 0x66, 0xE9] {
            bits.append_bits(b as u32, 8).unwrap();
        }
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        assert_eq!(result.text, "café");
    }

    #[test]
    fn test_eci_out_of_range_is_format_error() {
        let mut bits = BitArray::new();
        bits.append_bits(0x7, 4).unwrap();
        // Two-byte form encoding 900
        bits.append_bits(0x80 | (900 >> 8), 8).unwrap();
        bits.append_bits(900 & 0xFF, 8).unwrap();
        let bytes = bits_to_bytes(&bits);
        assert!(decode(&bytes, version1(), None, None).is_err());
    }

    #[test]
    fn test_fnc1_percent_rewriting() {
        let mut bits = BitArray::new();
        bits.append_bits(0x5, 4).unwrap();
        bits.append_bits(0x2, 4).unwrap();
        bits.append_bits(4, 9).unwrap();
        // "A%%B": A% = 10*45+38, %B = 38*45+11
        bits.append_bits(10 * 45 + 38, 11).unwrap();
        bits.append_bits(38 * 45 + 11, 11).unwrap();
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        assert_eq!(result.text, "A%B");
    }

    #[test]
    fn test_kanji_13_bit_unpacking() {
        // One codepoint: SJIS 0x935F packs to (0x935F - 0x8140) -> 13 bits
        let sjis = 0x935Fu32;
        let subtracted = sjis - 0x8140;
        let packed = ((subtracted >> 8) * 0xC0) + (subtracted & 0xFF);
        let mut bits = BitArray::new();
        bits.append_bits(0x8, 4).unwrap();
        bits.append_bits(1, 8).unwrap();
        bits.append_bits(packed, 13).unwrap();
        bits.append_bits(0, 4).unwrap();
        let bytes = bits_to_bytes(&bits);
        let result = decode(&bytes, version1(), None, None).unwrap();
        // The raw Shift_JIS pair is preserved in the payload stream;
        // rendering is lossy
        assert_eq!(result.raw_bytes, bytes);
    }

    #[test]
    fn test_truncated_stream_is_format_error() {
        let mut bits = BitArray::new();
        bits.append_bits(0x4, 4).unwrap();
        bits.append_bits(10, 8).unwrap();
        bits.append_bits(0x41, 8).unwrap();
        let bytes = bits_to_bytes(&bits);
        assert!(decode(&bytes, version1(), None, None).is_err());
    }
}
