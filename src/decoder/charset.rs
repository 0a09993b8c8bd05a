use crate::error::Error;

/// Character set designators from the Extended Channel Interpretation
/// registry (ISO 18004 Table 4). Each entry knows its assigned ECI values and
/// its canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSetEci {
    /// PC code page 437
    Cp437,
    /// Latin-1
    Iso8859_1,
    /// Latin-2
    Iso8859_2,
    /// Latin-3
    Iso8859_3,
    /// Latin-4
    Iso8859_4,
    /// Latin/Cyrillic
    Iso8859_5,
    /// Latin/Arabic
    Iso8859_6,
    /// Latin/Greek
    Iso8859_7,
    /// Latin/Hebrew
    Iso8859_8,
    /// Latin-5
    Iso8859_9,
    /// Latin-6
    Iso8859_10,
    /// Latin/Thai
    Iso8859_11,
    /// Latin-7
    Iso8859_13,
    /// Latin-8
    Iso8859_14,
    /// Latin-9
    Iso8859_15,
    /// Latin-10
    Iso8859_16,
    /// Japanese, JIS X 0208 with single-byte extensions
    ShiftJis,
    /// Windows Central European
    Cp1250,
    /// Windows Cyrillic
    Cp1251,
    /// Windows Western
    Cp1252,
    /// Windows Arabic
    Cp1256,
    /// UTF-16, big endian, no byte order mark
    Utf16Be,
    /// UTF-8
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// Traditional Chinese
    Big5,
    /// Simplified Chinese
    Gb18030,
    /// Korean
    EucKr,
}

/// (charset, assigned ECI values, canonical name)
const REGISTRY: &[(CharacterSetEci, &[u32], &str)] = &[
    (CharacterSetEci::Cp437, &[0, 2], "Cp437"),
    (CharacterSetEci::Iso8859_1, &[1, 3], "ISO-8859-1"),
    (CharacterSetEci::Iso8859_2, &[4], "ISO-8859-2"),
    (CharacterSetEci::Iso8859_3, &[5], "ISO-8859-3"),
    (CharacterSetEci::Iso8859_4, &[6], "ISO-8859-4"),
    (CharacterSetEci::Iso8859_5, &[7], "ISO-8859-5"),
    (CharacterSetEci::Iso8859_6, &[8], "ISO-8859-6"),
    (CharacterSetEci::Iso8859_7, &[9], "ISO-8859-7"),
    (CharacterSetEci::Iso8859_8, &[10], "ISO-8859-8"),
    (CharacterSetEci::Iso8859_9, &[11], "ISO-8859-9"),
    (CharacterSetEci::Iso8859_10, &[12], "ISO-8859-10"),
    (CharacterSetEci::Iso8859_11, &[13], "ISO-8859-11"),
    (CharacterSetEci::Iso8859_13, &[15], "ISO-8859-13"),
    (CharacterSetEci::Iso8859_14, &[16], "ISO-8859-14"),
    (CharacterSetEci::Iso8859_15, &[17], "ISO-8859-15"),
    (CharacterSetEci::Iso8859_16, &[18], "ISO-8859-16"),
    (CharacterSetEci::ShiftJis, &[20], "Shift_JIS"),
    (CharacterSetEci::Cp1250, &[21], "windows-1250"),
    (CharacterSetEci::Cp1251, &[22], "windows-1251"),
    (CharacterSetEci::Cp1252, &[23], "windows-1252"),
    (CharacterSetEci::Cp1256, &[24], "windows-1256"),
    (CharacterSetEci::Utf16Be, &[25], "UTF-16BE"),
    (CharacterSetEci::Utf8, &[26], "UTF-8"),
    (CharacterSetEci::Ascii, &[27, 170], "US-ASCII"),
    (CharacterSetEci::Big5, &[28], "Big5"),
    (CharacterSetEci::Gb18030, &[29], "GB18030"),
    (CharacterSetEci::EucKr, &[30], "EUC-KR"),
];

impl CharacterSetEci {
    /// Look up a parsed ECI designator value. Values outside [0, 900) are a
    /// format failure; unassigned values inside the range yield None.
    pub fn from_value(value: u32) -> Result<Option<Self>, Error> {
        if value >= 900 {
            return Err(Error::Format("ECI value out of range"));
        }
        Ok(REGISTRY
            .iter()
            .find(|(_, values, _)| values.contains(&value))
            .map(|&(charset, _, _)| charset))
    }

    /// Look up by canonical name (case-insensitive), for the CHARACTER_SET
    /// hint and the encoder's ECI header.
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(_, _, canonical)| canonical.eq_ignore_ascii_case(name))
            .map(|&(charset, _, _)| charset)
    }

    /// The charset's first assigned ECI value
    pub fn value(&self) -> u32 {
        REGISTRY
            .iter()
            .find(|(charset, _, _)| charset == self)
            .map(|&(_, values, _)| values[0])
            .unwrap()
    }

    /// Canonical name per the registry table
    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(charset, _, _)| charset == self)
            .map(|&(_, _, name)| name)
            .unwrap()
    }

    /// Turn raw bytes into text under this charset. Single-byte Latin sets
    /// and the Unicode encodings are interpreted exactly; the legacy
    /// multi-byte CJK sets are passed through lossily, with the exact bytes
    /// preserved separately in the result's byte segments.
    pub fn decode_to_string(&self, bytes: &[u8]) -> String {
        match self {
            CharacterSetEci::Utf8 | CharacterSetEci::Ascii => {
                String::from_utf8_lossy(bytes).into_owned()
            }
            CharacterSetEci::Iso8859_1 => bytes.iter().map(|&b| b as char).collect(),
            CharacterSetEci::Utf16Be => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            _ => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Guess the byte-mode encoding from the content when no ECI designator was
/// seen: prefer UTF-8 when the bytes validate, then Shift_JIS when enough
/// double-byte candidates appear, then ISO-8859-1.
pub fn guess_encoding(bytes: &[u8], hint: Option<&str>) -> CharacterSetEci {
    if let Some(charset) = hint.and_then(CharacterSetEci::from_name) {
        return charset;
    }

    // A UTF-8 byte order mark settles it
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        return CharacterSetEci::Utf8;
    }

    let mut can_be_iso88591 = true;
    let mut can_be_utf8 = true;
    let mut utf8_bytes_left = 0usize;
    let mut sjis_double_byte_count = 0usize;
    let mut sjis_expect_low = false;

    let mut can_be_shift_jis = true;
    for &byte in bytes {
        // UTF-8 multi-byte sequence validation
        if can_be_utf8 {
            if utf8_bytes_left > 0 {
                if byte & 0xC0 != 0x80 {
                    can_be_utf8 = false;
                } else {
                    utf8_bytes_left -= 1;
                }
            } else if byte & 0x80 != 0 {
                if byte & 0x40 == 0 {
                    can_be_utf8 = false;
                } else if byte & 0x20 == 0 {
                    utf8_bytes_left = 1;
                } else if byte & 0x10 == 0 {
                    utf8_bytes_left = 2;
                } else if byte & 0x08 == 0 {
                    utf8_bytes_left = 3;
                } else {
                    can_be_utf8 = false;
                }
            }
        }

        // Shift_JIS double-byte candidates; any high-ASCII byte also vetoes
        // ISO-8859-1
        if sjis_expect_low {
            if (0x40..=0x9F).contains(&byte) || (0xE0..=0xFC).contains(&byte) {
                sjis_double_byte_count += 1;
            } else {
                can_be_shift_jis = false;
            }
            sjis_expect_low = false;
        } else if (0x81..=0x9F).contains(&byte) || (0xE0..=0xEF).contains(&byte) {
            can_be_iso88591 = false;
            sjis_expect_low = true;
        } else if byte >= 0x80 {
            can_be_iso88591 = false;
        }
    }
    if sjis_expect_low || utf8_bytes_left > 0 {
        // Truncated multi-byte sequence
        can_be_shift_jis = false;
        can_be_utf8 = false;
    }

    if can_be_utf8 {
        return CharacterSetEci::Utf8;
    }
    if can_be_shift_jis && sjis_double_byte_count > 0 {
        return CharacterSetEci::ShiftJis;
    }
    if can_be_iso88591 {
        return CharacterSetEci::Iso8859_1;
    }
    // Platform default
    CharacterSetEci::Iso8859_1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_values() {
        assert_eq!(
            CharacterSetEci::from_value(0).unwrap(),
            Some(CharacterSetEci::Cp437)
        );
        assert_eq!(
            CharacterSetEci::from_value(3).unwrap(),
            Some(CharacterSetEci::Iso8859_1)
        );
        assert_eq!(
            CharacterSetEci::from_value(20).unwrap(),
            Some(CharacterSetEci::ShiftJis)
        );
        assert_eq!(
            CharacterSetEci::from_value(26).unwrap(),
            Some(CharacterSetEci::Utf8)
        );
        assert_eq!(
            CharacterSetEci::from_value(170).unwrap(),
            Some(CharacterSetEci::Ascii)
        );
        // In range but unassigned
        assert_eq!(CharacterSetEci::from_value(100).unwrap(), None);
        // Out of range
        assert!(CharacterSetEci::from_value(900).is_err());
    }

    #[test]
    fn test_names_roundtrip() {
        assert_eq!(
            CharacterSetEci::from_name("Shift_JIS"),
            Some(CharacterSetEci::ShiftJis)
        );
        assert_eq!(
            CharacterSetEci::from_name("iso-8859-1"),
            Some(CharacterSetEci::Iso8859_1)
        );
        assert_eq!(CharacterSetEci::Utf8.name(), "UTF-8");
        assert_eq!(CharacterSetEci::ShiftJis.value(), 20);
    }

    #[test]
    fn test_guess_prefers_valid_utf8() {
        assert_eq!(
            guess_encoding("héllo".as_bytes(), None),
            CharacterSetEci::Utf8
        );
        assert_eq!(guess_encoding(b"plain ascii", None), CharacterSetEci::Utf8);
    }

    #[test]
    fn test_guess_shift_jis_pairs() {
        // Two kana in Shift_JIS; invalid as UTF-8
        let bytes = [0x83, 0x41, 0x83, 0x43];
        assert_eq!(guess_encoding(&bytes, None), CharacterSetEci::ShiftJis);
    }

    #[test]
    fn test_guess_latin1_when_utf8_invalid() {
        // 0xE9 alone is invalid UTF-8 and not an SJIS lead-in pair
        let bytes = [b'c', b'a', b'f', 0xE9, b'!'];
        assert_eq!(guess_encoding(&bytes, None), CharacterSetEci::Iso8859_1);
    }

    #[test]
    fn test_hint_overrides_guess() {
        assert_eq!(
            guess_encoding(b"anything", Some("Shift_JIS")),
            CharacterSetEci::ShiftJis
        );
    }

    #[test]
    fn test_latin1_decode() {
        let text = CharacterSetEci::Iso8859_1.decode_to_string(&[0x63, 0x61, 0x66, 0xE9]);
        assert_eq!(text, "café");
    }

    #[test]
    fn test_utf16be_decode() {
        let text = CharacterSetEci::Utf16Be.decode_to_string(&[0x00, 0x41, 0x30, 0x42]);
        assert_eq!(text, "Aあ");
    }
}
