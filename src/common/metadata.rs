use std::fmt::{Display, Error, Formatter};
use std::ops::Deref;

use super::bit_matrix::BitMatrix;
use super::error::{QRError, QRResult};
use super::mask::MaskPattern;

// Color
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    pub fn select<T>(self, light: T, dark: T) -> T {
        match self {
            Self::Light => light,
            Self::Dark => dark,
        }
    }
}

impl From<bool> for Color {
    fn from(dark: bool) -> Self {
        if dark {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

// Error correction level
//------------------------------------------------------------------------------

/// Recovery capacity of a symbol, ordered from weakest to strongest.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub enum ECLevel {
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl ECLevel {
    /// Two-bit value stored in format info.
    pub fn format_bits(self) -> u32 {
        match self {
            Self::L => 0b01,
            Self::M => 0b00,
            Self::Q => 0b11,
            Self::H => 0b10,
        }
    }

    pub fn from_format_bits(bits: u32) -> Self {
        debug_assert!(bits < 4, "Invalid ec level bits {bits}");

        match bits & 0b11 {
            0b01 => Self::L,
            0b00 => Self::M,
            0b11 => Self::Q,
            _ => Self::H,
        }
    }
}

impl Display for ECLevel {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

// Version
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub struct Version(u8);

impl Deref for Version {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn new(number: u8) -> Self {
        debug_assert!((1..=40).contains(&number), "Invalid version {number}");
        Self(number)
    }

    pub fn from_number(number: u32) -> QRResult<Self> {
        match number {
            1..=40 => Ok(Self(number as u8)),
            _ => Err(QRError::InvalidVersion(number)),
        }
    }

    /// Version implied by a sampled symbol width.
    pub fn from_dimension(dimension: usize) -> QRResult<Self> {
        if dimension < 21 || dimension > 177 || dimension & 3 != 1 {
            return Err(QRError::InvalidDimension(dimension));
        }
        Ok(Self(((dimension - 17) >> 2) as u8))
    }

    pub fn all() -> impl Iterator<Item = Version> {
        (1..=40).map(Version)
    }

    pub fn width(self) -> usize {
        17 + 4 * self.0 as usize
    }

    pub fn alignment_pattern(self) -> &'static [usize] {
        ALIGNMENT_PATTERN_POSITIONS[self.0 as usize - 1]
    }

    pub fn total_codewords(self) -> usize {
        let (ec, c1, d1, c2, d2) = EC_BLOCKS[self.0 as usize - 1][0];
        c1 * (d1 + ec) + c2 * (d2 + ec)
    }

    pub fn ecc_per_block(self, ecl: ECLevel) -> usize {
        EC_BLOCKS[self.0 as usize - 1][ecl as usize].0
    }

    /// Returns `(block1_size, block1_count, block2_size, block2_count)` data codeword layout.
    pub fn data_codewords_per_block(self, ecl: ECLevel) -> (usize, usize, usize, usize) {
        let (_, c1, d1, c2, d2) = EC_BLOCKS[self.0 as usize - 1][ecl as usize];
        (d1, c1, d2, c2)
    }

    pub fn block_count(self, ecl: ECLevel) -> usize {
        let (_, c1, _, c2) = self.data_codewords_per_block(ecl);
        c1 + c2
    }

    pub fn data_codewords(self, ecl: ECLevel) -> usize {
        let (d1, c1, d2, c2) = self.data_codewords_per_block(ecl);
        d1 * c1 + d2 * c2
    }

    pub fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        self.data_codewords(ecl) << 3
    }

    /// Index into character count width tables: versions 1-9, 10-26 and 27-40.
    pub fn tier(self) -> usize {
        match self.0 {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod version_tests {
    use test_case::test_case;

    use super::{ECLevel, Version};
    use crate::common::error::QRError;

    // Number of modules left for codewords once function patterns are removed
    fn raw_data_modules(v: usize) -> usize {
        let mut res = (16 * v + 128) * v + 64;
        if v >= 2 {
            let align = v / 7 + 2;
            res -= (25 * align - 10) * align - 55;
            if v >= 7 {
                res -= 36;
            }
        }
        res
    }

    #[test]
    fn test_block_tables_consistent() {
        for v in Version::all() {
            let total = v.total_codewords();
            assert_eq!(total, raw_data_modules(*v as usize) / 8, "Version {v}");
            for ecl in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
                let (d1, c1, d2, c2) = v.data_codewords_per_block(ecl);
                let ec = v.ecc_per_block(ecl);
                assert_eq!(c1 * (d1 + ec) + c2 * (d2 + ec), total, "Version {v} {ecl}");
                assert!(c2 == 0 || d2 == d1 + 1, "Version {v} {ecl}");
            }
        }
    }

    #[test_case(1, ECLevel::L, 19)]
    #[test_case(1, ECLevel::H, 9)]
    #[test_case(5, ECLevel::Q, 62)]
    #[test_case(40, ECLevel::L, 2956)]
    #[test_case(40, ECLevel::H, 1276)]
    fn test_data_codewords(v: u8, ecl: ECLevel, exp: usize) {
        assert_eq!(Version::new(v).data_codewords(ecl), exp);
    }

    #[test]
    fn test_from_dimension() {
        assert_eq!(Version::from_dimension(21), Ok(Version::new(1)));
        assert_eq!(Version::from_dimension(177), Ok(Version::new(40)));
        assert_eq!(Version::from_dimension(23), Err(QRError::InvalidDimension(23)));
        assert_eq!(Version::from_dimension(181), Err(QRError::InvalidDimension(181)));
        assert_eq!(Version::from_number(41), Err(QRError::InvalidVersion(41)));
    }

    #[test]
    fn test_alignment_spacing() {
        for v in Version::all() {
            let pos = v.alignment_pattern();
            assert_eq!(pos.len(), if *v == 1 { 0 } else { *v as usize / 7 + 2 });
            if let Some(&last) = pos.last() {
                assert_eq!(last, v.width() - 7, "Version {v}");
            }
        }
    }
}

// Function pattern
//------------------------------------------------------------------------------

impl Version {
    /// Marks every module that doesn't carry codewords: finder patterns with their separators
    /// and format info, alignment patterns, timing patterns and version info.
    pub fn build_function_pattern(self) -> BitMatrix {
        let dim = self.width();
        let mut bm = BitMatrix::square(dim);

        bm.set_region(0, 0, 9, 9);
        bm.set_region(dim - 8, 0, 8, 9);
        bm.set_region(0, dim - 8, 9, 8);

        let pos = self.alignment_pattern();
        let max = pos.len();
        for x in 0..max {
            let i = pos[x] - 2;
            for y in 0..max {
                if (x == 0 && (y == 0 || y == max - 1)) || (x == max - 1 && y == 0) {
                    continue;
                }
                bm.set_region(pos[y] - 2, i, 5, 5);
            }
        }

        bm.set_region(6, 9, 1, dim - 17);
        bm.set_region(9, 6, dim - 17, 1);

        if *self > 6 {
            bm.set_region(dim - 11, 0, 3, 6);
            bm.set_region(0, dim - 11, 6, 3);
        }
        bm
    }
}


// Format & version info
//------------------------------------------------------------------------------

/// Error correction level and data mask recovered from the 15-bit format info.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct FormatInfo {
    pub ec_level: ECLevel,
    pub mask: MaskPattern,
}

impl FormatInfo {
    pub fn new(ec_level: ECLevel, mask: MaskPattern) -> Self {
        Self { ec_level, mask }
    }

    fn from_data(data: u32) -> Self {
        Self {
            ec_level: ECLevel::from_format_bits((data >> 3) & 0b11),
            mask: MaskPattern::new((data & 0b111) as u8),
        }
    }

    /// Masked 15-bit BCH codeword for this format info.
    pub fn encode(self) -> u32 {
        let data = (self.ec_level.format_bits() << 3) | *self.mask as u32;
        ((data << 10) | bch_code(data, FORMAT_INFO_POLY)) ^ FORMAT_INFO_MASK
    }

    /// Decodes the two redundant readings, accepting the closest valid codeword within
    /// Hamming distance 3. Readings that were never masked are tried as a fallback.
    pub fn decode(bits1: u32, bits2: u32) -> Option<Self> {
        Self::decode_masked(bits1, bits2)
            .or_else(|| Self::decode_masked(bits1 ^ FORMAT_INFO_MASK, bits2 ^ FORMAT_INFO_MASK))
    }

    fn decode_masked(bits1: u32, bits2: u32) -> Option<Self> {
        let (best, dist) = (0..32u32)
            .map(|data| {
                let target = Self::from_data(data).encode();
                let d1 = (bits1 ^ target).count_ones();
                let d2 = (bits2 ^ target).count_ones();
                (data, d1.min(d2))
            })
            .min_by_key(|&(_, d)| d)?;

        if dist <= 3 {
            Some(Self::from_data(best))
        } else {
            None
        }
    }
}

impl Version {
    /// 18-bit version info: 6-bit version number followed by its 12-bit BCH code.
    pub fn info(self) -> u32 {
        let v = self.0 as u32;
        (v << 12) | bch_code(v, VERSION_INFO_POLY)
    }

    pub fn decode_info(bits: u32) -> Option<Self> {
        let (best, dist) = (7..=40u8)
            .map(|v| (v, (Version(v).info() ^ bits).count_ones()))
            .min_by_key(|&(_, d)| d)?;

        if dist <= 3 {
            Some(Version(best))
        } else {
            None
        }
    }
}

fn bch_code(value: u32, poly: u32) -> u32 {
    let msb = |v: u32| 32 - v.leading_zeros();
    let poly_msb = msb(poly);
    let mut value = value << (poly_msb - 1);
    while msb(value) >= poly_msb {
        value ^= poly << (msb(value) - poly_msb);
    }
    value
}


// Global constants
//------------------------------------------------------------------------------

const FORMAT_INFO_POLY: u32 = 0x537;

const FORMAT_INFO_MASK: u32 = 0x5412;

const VERSION_INFO_POLY: u32 = 0x1f25;

static ALIGNMENT_PATTERN_POSITIONS: [&[usize]; 40] = [
    &[],
    &[6, 18],
    &[6, 22],
    &[6, 26],
    &[6, 30],
    &[6, 34],
    &[6, 22, 38],
    &[6, 24, 42],
    &[6, 26, 46],
    &[6, 28, 50],
    &[6, 30, 54],
    &[6, 32, 58],
    &[6, 34, 62],
    &[6, 26, 46, 66],
    &[6, 26, 48, 70],
    &[6, 26, 50, 74],
    &[6, 30, 54, 78],
    &[6, 30, 56, 82],
    &[6, 30, 58, 86],
    &[6, 34, 62, 90],
    &[6, 28, 50, 72, 94],
    &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102],
    &[6, 28, 54, 80, 106],
    &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114],
    &[6, 34, 62, 90, 118],
    &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126],
    &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134],
    &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142],
    &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150],
    &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158],
    &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166],
    &[6, 30, 58, 86, 114, 142, 170],
];

// (ec codewords per block, block1 count, block1 data codewords, block2 count, block2 data
// codewords) for L, M, Q, H
static EC_BLOCKS: [[(usize, usize, usize, usize, usize); 4]; 40] = [
    [(7, 1, 19, 0, 0), (10, 1, 16, 0, 0), (13, 1, 13, 0, 0), (17, 1, 9, 0, 0)],
    [(10, 1, 34, 0, 0), (16, 1, 28, 0, 0), (22, 1, 22, 0, 0), (28, 1, 16, 0, 0)],
    [(15, 1, 55, 0, 0), (26, 1, 44, 0, 0), (18, 2, 17, 0, 0), (22, 2, 13, 0, 0)],
    [(20, 1, 80, 0, 0), (18, 2, 32, 0, 0), (26, 2, 24, 0, 0), (16, 4, 9, 0, 0)],
    [(26, 1, 108, 0, 0), (24, 2, 43, 0, 0), (18, 2, 15, 2, 16), (22, 2, 11, 2, 12)],
    [(18, 2, 68, 0, 0), (16, 4, 27, 0, 0), (24, 4, 19, 0, 0), (28, 4, 15, 0, 0)],
    [(20, 2, 78, 0, 0), (18, 4, 31, 0, 0), (18, 2, 14, 4, 15), (26, 4, 13, 1, 14)],
    [(24, 2, 97, 0, 0), (22, 2, 38, 2, 39), (22, 4, 18, 2, 19), (26, 4, 14, 2, 15)],
    [(30, 2, 116, 0, 0), (22, 3, 36, 2, 37), (20, 4, 16, 4, 17), (24, 4, 12, 4, 13)],
    [(18, 2, 68, 2, 69), (26, 4, 43, 1, 44), (24, 6, 19, 2, 20), (28, 6, 15, 2, 16)],
    [(20, 4, 81, 0, 0), (30, 1, 50, 4, 51), (28, 4, 22, 4, 23), (24, 3, 12, 8, 13)],
    [(24, 2, 92, 2, 93), (22, 6, 36, 2, 37), (26, 4, 20, 6, 21), (28, 7, 14, 4, 15)],
    [(26, 4, 107, 0, 0), (22, 8, 37, 1, 38), (24, 8, 20, 4, 21), (22, 12, 11, 4, 12)],
    [(30, 3, 115, 1, 116), (24, 4, 40, 5, 41), (20, 11, 16, 5, 17), (24, 11, 12, 5, 13)],
    [(22, 5, 87, 1, 88), (24, 5, 41, 5, 42), (30, 5, 24, 7, 25), (24, 11, 12, 7, 13)],
    [(24, 5, 98, 1, 99), (28, 7, 45, 3, 46), (24, 15, 19, 2, 20), (30, 3, 15, 13, 16)],
    [(28, 1, 107, 5, 108), (28, 10, 46, 1, 47), (28, 1, 22, 15, 23), (28, 2, 14, 17, 15)],
    [(30, 5, 120, 1, 121), (26, 9, 43, 4, 44), (28, 17, 22, 1, 23), (28, 2, 14, 19, 15)],
    [(28, 3, 113, 4, 114), (26, 3, 44, 11, 45), (26, 17, 21, 4, 22), (26, 9, 13, 16, 14)],
    [(28, 3, 107, 5, 108), (26, 3, 41, 13, 42), (30, 15, 24, 5, 25), (28, 15, 15, 10, 16)],
    [(28, 4, 116, 4, 117), (26, 17, 42, 0, 0), (28, 17, 22, 6, 23), (30, 19, 16, 6, 17)],
    [(28, 2, 111, 7, 112), (28, 17, 46, 0, 0), (30, 7, 24, 16, 25), (24, 34, 13, 0, 0)],
    [(30, 4, 121, 5, 122), (28, 4, 47, 14, 48), (30, 11, 24, 14, 25), (30, 16, 15, 14, 16)],
    [(30, 6, 117, 4, 118), (28, 6, 45, 14, 46), (30, 11, 24, 16, 25), (30, 30, 16, 2, 17)],
    [(26, 8, 106, 4, 107), (28, 8, 47, 13, 48), (30, 7, 24, 22, 25), (30, 22, 15, 13, 16)],
    [(28, 10, 114, 2, 115), (28, 19, 46, 4, 47), (28, 28, 22, 6, 23), (30, 33, 16, 4, 17)],
    [(30, 8, 122, 4, 123), (28, 22, 45, 3, 46), (30, 8, 23, 26, 24), (30, 12, 15, 28, 16)],
    [(30, 3, 117, 10, 118), (28, 3, 45, 23, 46), (30, 4, 24, 31, 25), (30, 11, 15, 31, 16)],
    [(30, 7, 116, 7, 117), (28, 21, 45, 7, 46), (30, 1, 23, 37, 24), (30, 19, 15, 26, 16)],
    [(30, 5, 115, 10, 116), (28, 19, 47, 10, 48), (30, 15, 24, 25, 25), (30, 23, 15, 25, 16)],
    [(30, 13, 115, 3, 116), (28, 2, 46, 29, 47), (30, 42, 24, 1, 25), (30, 23, 15, 28, 16)],
    [(30, 17, 115, 0, 0), (28, 10, 46, 23, 47), (30, 10, 24, 35, 25), (30, 19, 15, 35, 16)],
    [(30, 17, 115, 1, 116), (28, 14, 46, 21, 47), (30, 29, 24, 19, 25), (30, 11, 15, 46, 16)],
    [(30, 13, 115, 6, 116), (28, 14, 46, 23, 47), (30, 44, 24, 7, 25), (30, 59, 16, 1, 17)],
    [(30, 12, 121, 7, 122), (28, 12, 47, 26, 48), (30, 39, 24, 14, 25), (30, 22, 15, 41, 16)],
    [(30, 6, 121, 14, 122), (28, 6, 47, 34, 48), (30, 46, 24, 10, 25), (30, 2, 15, 64, 16)],
    [(30, 17, 122, 4, 123), (28, 29, 46, 14, 47), (30, 49, 24, 10, 25), (30, 24, 15, 46, 16)],
    [(30, 4, 122, 18, 123), (28, 13, 46, 32, 47), (30, 48, 24, 14, 25), (30, 42, 15, 32, 16)],
    [(30, 20, 117, 4, 118), (28, 40, 47, 7, 48), (30, 43, 24, 22, 25), (30, 10, 15, 67, 16)],
    [(30, 19, 118, 6, 119), (28, 18, 47, 31, 48), (30, 34, 24, 34, 25), (30, 20, 15, 61, 16)],
];
