use std::fmt::{Display, Error, Formatter};

use encoding_rs::Encoding;

use crate::common::error::{QRError, QRResult};

// Character set
//------------------------------------------------------------------------------

/// Character sets a byte segment may be declared in through an ECI designator.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum CharacterSet {
    Iso8859_1,
    Iso8859_2,
    Iso8859_3,
    Iso8859_4,
    Iso8859_5,
    Iso8859_6,
    Iso8859_7,
    Iso8859_8,
    Iso8859_9,
    Iso8859_10,
    Iso8859_11,
    Iso8859_13,
    Iso8859_14,
    Iso8859_15,
    Iso8859_16,
    ShiftJis,
    Cp1250,
    Cp1251,
    Cp1252,
    Cp1256,
    Utf16BE,
    Utf8,
    Ascii,
    Big5,
    Gb18030,
    EucKr,
}

impl CharacterSet {
    pub fn from_eci(value: u32) -> QRResult<Self> {
        let cs = match value {
            1 | 3 => Self::Iso8859_1,
            4 => Self::Iso8859_2,
            5 => Self::Iso8859_3,
            6 => Self::Iso8859_4,
            7 => Self::Iso8859_5,
            8 => Self::Iso8859_6,
            9 => Self::Iso8859_7,
            10 => Self::Iso8859_8,
            11 => Self::Iso8859_9,
            12 => Self::Iso8859_10,
            13 => Self::Iso8859_11,
            15 => Self::Iso8859_13,
            16 => Self::Iso8859_14,
            17 => Self::Iso8859_15,
            18 => Self::Iso8859_16,
            20 => Self::ShiftJis,
            21 => Self::Cp1250,
            22 => Self::Cp1251,
            23 => Self::Cp1252,
            24 => Self::Cp1256,
            25 => Self::Utf16BE,
            26 => Self::Utf8,
            27 | 170 => Self::Ascii,
            28 => Self::Big5,
            29 => Self::Gb18030,
            30 => Self::EucKr,
            _ => return Err(QRError::UnsupportedEci(value)),
        };
        Ok(cs)
    }

    /// Primary ECI designator.
    pub fn eci(self) -> u32 {
        match self {
            Self::Iso8859_1 => 3,
            Self::Iso8859_2 => 4,
            Self::Iso8859_3 => 5,
            Self::Iso8859_4 => 6,
            Self::Iso8859_5 => 7,
            Self::Iso8859_6 => 8,
            Self::Iso8859_7 => 9,
            Self::Iso8859_8 => 10,
            Self::Iso8859_9 => 11,
            Self::Iso8859_10 => 12,
            Self::Iso8859_11 => 13,
            Self::Iso8859_13 => 15,
            Self::Iso8859_14 => 16,
            Self::Iso8859_15 => 17,
            Self::Iso8859_16 => 18,
            Self::ShiftJis => 20,
            Self::Cp1250 => 21,
            Self::Cp1251 => 22,
            Self::Cp1252 => 23,
            Self::Cp1256 => 24,
            Self::Utf16BE => 25,
            Self::Utf8 => 26,
            Self::Ascii => 27,
            Self::Big5 => 28,
            Self::Gb18030 => 29,
            Self::EucKr => 30,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Iso8859_2 => "ISO-8859-2",
            Self::Iso8859_3 => "ISO-8859-3",
            Self::Iso8859_4 => "ISO-8859-4",
            Self::Iso8859_5 => "ISO-8859-5",
            Self::Iso8859_6 => "ISO-8859-6",
            Self::Iso8859_7 => "ISO-8859-7",
            Self::Iso8859_8 => "ISO-8859-8",
            Self::Iso8859_9 => "ISO-8859-9",
            Self::Iso8859_10 => "ISO-8859-10",
            Self::Iso8859_11 => "ISO-8859-11",
            Self::Iso8859_13 => "ISO-8859-13",
            Self::Iso8859_14 => "ISO-8859-14",
            Self::Iso8859_15 => "ISO-8859-15",
            Self::Iso8859_16 => "ISO-8859-16",
            Self::ShiftJis => "Shift_JIS",
            Self::Cp1250 => "windows-1250",
            Self::Cp1251 => "windows-1251",
            Self::Cp1252 => "windows-1252",
            Self::Cp1256 => "windows-1256",
            Self::Utf16BE => "UTF-16BE",
            Self::Utf8 => "UTF-8",
            Self::Ascii => "US-ASCII",
            Self::Big5 => "Big5",
            Self::Gb18030 => "GB18030",
            Self::EucKr => "EUC-KR",
        }
    }

    // ISO-8859-1 and ASCII are mapped byte for byte instead
    fn encoding(self) -> Option<&'static Encoding> {
        let enc = match self {
            Self::Iso8859_1 | Self::Ascii => return None,
            Self::Iso8859_2 => encoding_rs::ISO_8859_2,
            Self::Iso8859_3 => encoding_rs::ISO_8859_3,
            Self::Iso8859_4 => encoding_rs::ISO_8859_4,
            Self::Iso8859_5 => encoding_rs::ISO_8859_5,
            Self::Iso8859_6 => encoding_rs::ISO_8859_6,
            Self::Iso8859_7 => encoding_rs::ISO_8859_7,
            Self::Iso8859_8 => encoding_rs::ISO_8859_8,
            Self::Iso8859_9 => encoding_rs::WINDOWS_1254,
            Self::Iso8859_10 => encoding_rs::ISO_8859_10,
            Self::Iso8859_11 => encoding_rs::WINDOWS_874,
            Self::Iso8859_13 => encoding_rs::ISO_8859_13,
            Self::Iso8859_14 => encoding_rs::ISO_8859_14,
            Self::Iso8859_15 => encoding_rs::ISO_8859_15,
            Self::Iso8859_16 => encoding_rs::ISO_8859_16,
            Self::ShiftJis => encoding_rs::SHIFT_JIS,
            Self::Cp1250 => encoding_rs::WINDOWS_1250,
            Self::Cp1251 => encoding_rs::WINDOWS_1251,
            Self::Cp1252 => encoding_rs::WINDOWS_1252,
            Self::Cp1256 => encoding_rs::WINDOWS_1256,
            Self::Utf16BE => encoding_rs::UTF_16BE,
            Self::Utf8 => encoding_rs::UTF_8,
            Self::Big5 => encoding_rs::BIG5,
            Self::Gb18030 => encoding_rs::GB18030,
            Self::EucKr => encoding_rs::EUC_KR,
        };
        Some(enc)
    }

    /// Decodes bytes into text. Bytes that aren't valid in this character set are an error.
    pub fn decode(self, bytes: &[u8]) -> QRResult<String> {
        let invalid = || QRError::InvalidText(self.name());
        match (self, self.encoding()) {
            (Self::Ascii, _) => bytes
                .iter()
                .map(|&b| if b < 0x80 { Ok(b as char) } else { Err(invalid()) })
                .collect(),
            (Self::Utf16BE, Some(enc)) => match enc.decode(bytes) {
                (_, _, true) => Err(invalid()),
                (text, ..) => Ok(text.into_owned()),
            },
            (_, Some(enc)) => match enc.decode_without_bom_handling(bytes) {
                (_, true) => Err(invalid()),
                (text, _) => Ok(text.into_owned()),
            },
            (_, None) => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encodes text, or returns `None` if some character isn't representable.
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match (self, self.encoding()) {
            (Self::Ascii, _) => {
                text.chars().map(|c| if c.is_ascii() { Some(c as u8) } else { None }).collect()
            }
            (Self::Iso8859_1, _) => text.chars().map(|c| u8::try_from(c as u32).ok()).collect(),
            (Self::Utf8, _) => Some(text.as_bytes().to_vec()),
            (Self::Utf16BE, _) => Some(text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()),
            (_, Some(enc)) => {
                let (bytes, _, has_err) = enc.encode(text);
                if has_err {
                    None
                } else {
                    Some(bytes.into_owned())
                }
            }
            (_, None) => None,
        }
    }
}

impl Display for CharacterSet {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod charset_tests {
    use test_case::test_case;

    use super::CharacterSet::{self, *};
    use crate::common::error::QRError;

    #[test]
    fn test_eci_mapping() {
        assert_eq!(CharacterSet::from_eci(1), Ok(Iso8859_1));
        assert_eq!(CharacterSet::from_eci(18), Ok(Iso8859_16));
        assert_eq!(CharacterSet::from_eci(170), Ok(Ascii));
        assert_eq!(CharacterSet::from_eci(0), Err(QRError::UnsupportedEci(0)));
        assert_eq!(CharacterSet::from_eci(2), Err(QRError::UnsupportedEci(2)));
        assert_eq!(CharacterSet::from_eci(14), Err(QRError::UnsupportedEci(14)));
        assert_eq!(CharacterSet::from_eci(899), Err(QRError::UnsupportedEci(899)));
    }

    #[test]
    fn test_eci_round_trip() {
        for v in (3..=30).filter(|v| ![14, 19].contains(v)) {
            let cs = CharacterSet::from_eci(v).unwrap();
            assert_eq!(cs.eci(), v, "Charset {cs}");
        }
    }

    #[test_case(Iso8859_1, "café", b"caf\xe9")]
    #[test_case(Utf8, "café", b"caf\xc3\xa9")]
    #[test_case(Utf16BE, "aé", b"\x00a\x00\xe9")]
    #[test_case(ShiftJis, "点", b"\x93\x5f")]
    #[test_case(Cp1251, "Жж", b"\xc6\xe6")]
    #[test_case(Ascii, "ok", b"ok")]
    fn test_codec(cs: CharacterSet, text: &str, bytes: &[u8]) {
        assert_eq!(cs.encode(text).as_deref(), Some(bytes));
        assert_eq!(cs.decode(bytes).as_deref(), Ok(text));
    }

    #[test]
    fn test_unrepresentable() {
        assert_eq!(Iso8859_1.encode("Ω"), None);
        assert_eq!(Ascii.encode("é"), None);
        assert_eq!(ShiftJis.encode("é"), None);
    }

    #[test]
    fn test_malformed_decode() {
        assert_eq!(Ascii.decode(b"a\xffb"), Err(QRError::InvalidText("US-ASCII")));
        assert_eq!(Utf8.decode(b"a\xffb"), Err(QRError::InvalidText("UTF-8")));
        assert_eq!(ShiftJis.decode(b"\x93"), Err(QRError::InvalidText("Shift_JIS")));
        assert_eq!(Iso8859_1.decode(b"\xff\xfe").as_deref(), Ok("ÿþ"));
    }
}

// Character set guesser
//------------------------------------------------------------------------------

/// Infers the character set of an undeclared byte segment: UTF-16 by byte order mark, then
/// whichever of UTF-8, Shift_JIS and ISO-8859-1 the byte patterns favor.
pub fn guess_charset(bytes: &[u8], hint: Option<CharacterSet>) -> CharacterSet {
    if let Some(cs) = hint {
        return cs;
    }

    let len = bytes.len();
    if len > 2 && matches!(bytes[..2], [0xfe, 0xff] | [0xff, 0xfe]) {
        return CharacterSet::Utf16BE;
    }

    let mut can_be_iso8859_1 = true;
    let mut can_be_shift_jis = true;
    let mut can_be_utf8 = true;

    let mut utf8_bytes_left = 0;
    let mut utf8_multi_byte_chars = 0;
    let mut sjis_bytes_left = 0;
    let mut sjis_katakana_chars = 0;
    let mut sjis_cur_katakana_len = 0;
    let mut sjis_cur_double_byte_len = 0;
    let mut sjis_max_katakana_len = 0;
    let mut sjis_max_double_byte_len = 0;
    let mut iso_high_other = 0;

    let utf8_bom = len > 3 && bytes[..3] == [0xef, 0xbb, 0xbf];

    for &b in bytes {
        if !(can_be_iso8859_1 || can_be_shift_jis || can_be_utf8) {
            break;
        }

        if can_be_utf8 {
            if utf8_bytes_left > 0 {
                if b & 0x80 == 0 {
                    can_be_utf8 = false;
                } else {
                    utf8_bytes_left -= 1;
                }
            } else if b & 0x80 != 0 {
                match b {
                    _ if b & 0x40 == 0 => can_be_utf8 = false,
                    _ if b & 0x20 == 0 => utf8_bytes_left = 1,
                    _ if b & 0x10 == 0 => utf8_bytes_left = 2,
                    _ if b & 0x08 == 0 => utf8_bytes_left = 3,
                    _ => can_be_utf8 = false,
                }
                if can_be_utf8 {
                    utf8_multi_byte_chars += 1;
                }
            }
        }

        if can_be_iso8859_1 {
            if b > 0x7f && b < 0xa0 {
                can_be_iso8859_1 = false;
            } else if b > 0x9f && (b < 0xc0 || b == 0xd7 || b == 0xf7) {
                iso_high_other += 1;
            }
        }

        if can_be_shift_jis {
            if sjis_bytes_left > 0 {
                if b < 0x40 || b == 0x7f || b > 0xfc {
                    can_be_shift_jis = false;
                } else {
                    sjis_bytes_left -= 1;
                }
            } else if b == 0x80 || b == 0xa0 || b > 0xef {
                can_be_shift_jis = false;
            } else if b > 0xa0 && b < 0xe0 {
                sjis_katakana_chars += 1;
                sjis_cur_double_byte_len = 0;
                sjis_cur_katakana_len += 1;
                sjis_max_katakana_len = sjis_max_katakana_len.max(sjis_cur_katakana_len);
            } else if b > 0x7f {
                sjis_bytes_left += 1;
                sjis_cur_katakana_len = 0;
                sjis_cur_double_byte_len += 1;
                sjis_max_double_byte_len = sjis_max_double_byte_len.max(sjis_cur_double_byte_len);
            } else {
                sjis_cur_katakana_len = 0;
                sjis_cur_double_byte_len = 0;
            }
        }
    }

    if utf8_bytes_left > 0 {
        can_be_utf8 = false;
    }
    if sjis_bytes_left > 0 {
        can_be_shift_jis = false;
    }

    if can_be_utf8 && (utf8_bom || utf8_multi_byte_chars > 0) {
        return CharacterSet::Utf8;
    }
    if can_be_shift_jis && (sjis_max_katakana_len >= 3 || sjis_max_double_byte_len >= 3) {
        return CharacterSet::ShiftJis;
    }
    if can_be_iso8859_1 && can_be_shift_jis {
        return if (sjis_max_katakana_len == 2 && sjis_katakana_chars == 2)
            || iso_high_other * 10 >= len
        {
            CharacterSet::ShiftJis
        } else {
            CharacterSet::Iso8859_1
        };
    }
    if can_be_iso8859_1 {
        return CharacterSet::Iso8859_1;
    }
    if can_be_shift_jis {
        return CharacterSet::ShiftJis;
    }
    CharacterSet::Utf8
}
