use crate::common::error::{QRError, QRResult};
use crate::common::metadata::Version;

// Mode
//------------------------------------------------------------------------------

/// Segment type announced by the 4-bit indicator at the head of every segment.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mode {
    Terminator = 0b0000,
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    StructuredAppend = 0b0011,
    Byte = 0b0100,
    Fnc1FirstPosition = 0b0101,
    Eci = 0b0111,
    Kanji = 0b1000,
    Fnc1SecondPosition = 0b1001,
    Hanzi = 0b1101,
}

impl Mode {
    pub const INDICATOR_BITS: usize = 4;

    pub fn from_bits(bits: u32) -> QRResult<Self> {
        let mode = match bits {
            0b0000 => Self::Terminator,
            0b0001 => Self::Numeric,
            0b0010 => Self::Alphanumeric,
            0b0011 => Self::StructuredAppend,
            0b0100 => Self::Byte,
            0b0101 => Self::Fnc1FirstPosition,
            0b0111 => Self::Eci,
            0b1000 => Self::Kanji,
            0b1001 => Self::Fnc1SecondPosition,
            0b1101 => Self::Hanzi,
            _ => return Err(QRError::InvalidMode(bits)),
        };
        Ok(mode)
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Width of the character count field following the indicator.
    pub fn char_cnt_bits(self, ver: Version) -> usize {
        let widths = match self {
            Self::Numeric => [10, 12, 14],
            Self::Alphanumeric => [9, 11, 13],
            Self::Byte => [8, 16, 16],
            Self::Kanji | Self::Hanzi => [8, 10, 12],
            _ => [0, 0, 0],
        };
        widths[ver.tier()]
    }

    pub fn contains(self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => alphanumeric_value(byte).is_some(),
            Self::Byte => true,
            _ => false,
        }
    }

    pub fn encode_chunk(self, data: &[u8]) -> u16 {
        let len = data.len();
        match self {
            Self::Numeric => {
                debug_assert!(len <= 3, "Data is too long for numeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 10 + numeric_digit(*b))
            }
            Self::Alphanumeric => {
                debug_assert!(len <= 2, "Data is too long for alphanumeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 45 + alphanumeric_digit(*b))
            }
            _ => unreachable!("Chunks only exist for numeric & alphanumeric modes"),
        }
    }

    /// Bit length of `len` characters (bytes for byte mode) once packed.
    pub fn encoded_len(self, len: usize) -> usize {
        match self {
            Self::Numeric => (len * 10).div_ceil(3),
            Self::Alphanumeric => (len * 11).div_ceil(2),
            Self::Byte => len * 8,
            Self::Kanji | Self::Hanzi => len * 13,
            _ => 0,
        }
    }
}

#[inline]
fn numeric_digit(char: u8) -> u16 {
    debug_assert!(char.is_ascii_digit(), "Invalid numeric data: {char}");
    (char - b'0') as u16
}

#[inline]
fn alphanumeric_digit(char: u8) -> u16 {
    debug_assert!(Mode::Alphanumeric.contains(char), "Invalid alphanumeric data: {char}");
    alphanumeric_value(char).unwrap_or(0) as u16
}

pub fn alphanumeric_value(char: u8) -> Option<u8> {
    ALPHANUMERIC_CHARS.iter().position(|&c| c == char).map(|p| p as u8)
}

pub fn alphanumeric_char(value: u32) -> QRResult<char> {
    ALPHANUMERIC_CHARS
        .get(value as usize)
        .map(|&c| c as char)
        .ok_or(QRError::InvalidValue("alphanumeric", value))
}


// Structured append
//------------------------------------------------------------------------------

/// Position of a symbol within a message split over up to 16 symbols. `parity` is the XOR of
/// every byte of the whole message and must match across the set.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub struct StructuredAppend {
    pub index: u8,
    pub total: u8,
    pub parity: u8,
}

impl StructuredAppend {
    pub fn new(index: u8, total: u8, message: &[u8]) -> Self {
        let parity = message.iter().fold(0, |acc, b| acc ^ b);
        Self { index, total, parity }
    }

    /// Packed sequence byte as carried in the symbol: index in the high nibble, total less one
    /// in the low nibble.
    pub fn sequence(&self) -> u8 {
        (self.index << 4) | (self.total.wrapping_sub(1) & 0xf)
    }

    pub fn from_sequence(sequence: u8, parity: u8) -> Self {
        Self { index: sequence >> 4, total: (sequence & 0xf) + 1, parity }
    }
}

#[cfg(test)]
mod structured_append_tests {
    use super::StructuredAppend;

    #[test]
    fn test_sequence() {
        let sa = StructuredAppend::new(2, 4, b"ABCD");
        assert_eq!(sa.parity, b'A' ^ b'B' ^ b'C' ^ b'D');
        assert_eq!(sa.sequence(), 0x23);
        assert_eq!(StructuredAppend::from_sequence(0x23, sa.parity), sa);
    }
}

// Global constants
//------------------------------------------------------------------------------

pub static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];

pub static ALPHANUMERIC_CHARS: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Group separator substituted for `%` in alphanumeric segments under FNC1.
pub const GS: char = '\u{1d}';
