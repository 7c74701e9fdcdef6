use tracing::trace;

use crate::common::{BitMatrix, EncRegionIter, FormatInfo, QRError, QRResult, Version};

// Bit matrix parser
//------------------------------------------------------------------------------

/// Reads format info, version and raw codewords out of a sampled module grid, dark modules
/// set and `x` being the column.
#[derive(Debug, Clone)]
pub struct BitMatrixParser<'a> {
    bits: &'a BitMatrix,
    dimension: usize,
}

impl<'a> BitMatrixParser<'a> {
    pub fn new(bits: &'a BitMatrix) -> QRResult<Self> {
        let dimension = bits.height();
        if dimension < 21 || dimension & 0x03 != 1 || bits.width() != dimension {
            return Err(QRError::InvalidDimension(dimension));
        }
        Ok(Self { bits, dimension })
    }

    fn copy_bit(&self, x: usize, y: usize, acc: u32) -> u32 {
        (acc << 1) | self.bits.get(x, y) as u32
    }

    /// Reads both copies of the format info, around the top left finder and split between
    /// the other two.
    pub fn read_format_info(&self) -> QRResult<FormatInfo> {
        let dim = self.dimension;

        let mut bits1 = (0..6).fold(0, |acc, i| self.copy_bit(i, 8, acc));
        bits1 = self.copy_bit(7, 8, bits1);
        bits1 = self.copy_bit(8, 8, bits1);
        bits1 = self.copy_bit(8, 7, bits1);
        bits1 = (0..6).rev().fold(bits1, |acc, j| self.copy_bit(8, j, acc));

        let bits2 = (dim - 7..dim).rev().fold(0, |acc, j| self.copy_bit(8, j, acc));
        let bits2 = (dim - 8..dim).fold(bits2, |acc, i| self.copy_bit(i, 8, acc));

        let info = FormatInfo::decode(bits1, bits2).ok_or(QRError::InvalidFormatInfo)?;
        trace!(bits1, bits2, ?info, "Format info");
        Ok(info)
    }

    /// Versions up to 6 follow from the dimension alone. Larger ones carry two copies of
    /// the version info, either of which has to agree with the dimension.
    pub fn read_version(&self) -> QRResult<Version> {
        let dim = self.dimension;
        let provisional = (dim - 17) / 4;
        if provisional <= 6 {
            return Version::from_dimension(dim);
        }

        let top_right = (0..6).rev().fold(0, |acc, j| {
            (dim - 11..=dim - 9).rev().fold(acc, |acc, i| self.copy_bit(i, j, acc))
        });
        if let Some(v) = Version::decode_info(top_right).filter(|v| v.width() == dim) {
            return Ok(v);
        }

        let bottom_left = (0..6).rev().fold(0, |acc, i| {
            (dim - 11..=dim - 9).rev().fold(acc, |acc, j| self.copy_bit(i, j, acc))
        });
        match Version::decode_info(bottom_left).filter(|v| v.width() == dim) {
            Some(v) => Ok(v),
            None => Err(QRError::InvalidVersionInfo),
        }
    }

    /// Unmasks the data region and reads it in placement order, 8 modules per codeword.
    pub fn read_codewords(&self, version: Version, format: FormatInfo) -> QRResult<Vec<u8>> {
        let func = version.build_function_pattern();
        let mask_fn = format.mask.mask_function();

        let total = version.total_codewords();
        let mut codewords = Vec::with_capacity(total);
        let mut current = 0u8;
        let mut bit_count = 0;
        for (r, c) in EncRegionIter::new(version) {
            let (x, y) = (c as usize, r as usize);
            if func.get(x, y) {
                continue;
            }

            let bit = self.bits.get(x, y) ^ mask_fn(r as i32, c as i32);
            current = (current << 1) | bit as u8;
            bit_count += 1;
            if bit_count == 8 {
                codewords.push(current);
                current = 0;
                bit_count = 0;
            }
        }

        // Leftover remainder bits are dropped
        if codewords.len() != total {
            return Err(QRError::CodewordCountMismatch(codewords.len(), total));
        }
        Ok(codewords)
    }
}

#[cfg(test)]
mod parser_tests {
    use test_case::test_case;

    use super::BitMatrixParser;
    use crate::builder::QRBuilder;
    use crate::common::{BitMatrix, ECLevel, FormatInfo, MaskPattern, QRError, Version};

    #[test_case(20)]
    #[test_case(23)]
    #[test_case(24)]
    fn test_invalid_dimension(dim: usize) {
        let bits = BitMatrix::square(dim);
        assert_eq!(BitMatrixParser::new(&bits).err(), Some(QRError::InvalidDimension(dim)));
    }

    #[test]
    fn test_non_square() {
        let bits = BitMatrix::new(25, 21);
        assert!(BitMatrixParser::new(&bits).is_err());
    }

    #[test_case(ECLevel::L, 0)]
    #[test_case(ECLevel::M, 3)]
    #[test_case(ECLevel::Q, 5)]
    #[test_case(ECLevel::H, 7)]
    fn test_read_format_info(ecl: ECLevel, mask: u8) {
        let qr = QRBuilder::new("FORMAT").ec_level(ecl).mask(mask).build().unwrap();
        let parser = BitMatrixParser::new(&qr.matrix).unwrap();
        let exp = FormatInfo::new(ecl, MaskPattern::new(mask));
        assert_eq!(parser.read_format_info(), Ok(exp));
    }

    #[test]
    fn test_read_format_info_damaged_copy() {
        let qr = QRBuilder::new("FORMAT").ec_level(ECLevel::Q).mask(2).build().unwrap();
        let mut bits = qr.matrix.clone();
        // Wreck the copy around the top left finder
        for i in 0..6 {
            bits.flip(i, 8);
        }
        let parser = BitMatrixParser::new(&bits).unwrap();
        let exp = FormatInfo::new(ECLevel::Q, MaskPattern::new(2));
        assert_eq!(parser.read_format_info(), Ok(exp));
    }

    #[test_case(1)]
    #[test_case(6)]
    #[test_case(7)]
    #[test_case(21)]
    #[test_case(40)]
    fn test_read_version(version: u32) {
        let qr = QRBuilder::new("VERSION").version(version).build().unwrap();
        let parser = BitMatrixParser::new(&qr.matrix).unwrap();
        assert_eq!(parser.read_version(), Ok(Version::new(version as u8)));
    }

    #[test]
    fn test_read_version_one_copy_damaged() {
        let qr = QRBuilder::new("VERSION").version(12).build().unwrap();
        let dim = qr.width();
        let mut bits = qr.matrix.clone();
        for j in 0..6 {
            bits.flip(dim - 10, j);
        }
        let parser = BitMatrixParser::new(&bits).unwrap();
        assert_eq!(parser.read_version(), Ok(Version::new(12)));
    }

    #[test]
    fn test_read_version_both_copies_damaged() {
        let qr = QRBuilder::new("VERSION").version(12).build().unwrap();
        let dim = qr.width();
        let mut bits = qr.matrix.clone();
        for k in 0..6 {
            bits.flip(dim - 10, k);
            bits.flip(dim - 9, k);
            bits.flip(k, dim - 10);
            bits.flip(k, dim - 9);
        }
        let parser = BitMatrixParser::new(&bits).unwrap();
        assert_eq!(parser.read_version(), Err(QRError::InvalidVersionInfo));
    }

    #[test_case("1", ECLevel::L)]
    #[test_case("Codewords of a medium sized symbol", ECLevel::H)]
    fn test_read_codewords_count(data: &str, ecl: ECLevel) {
        let qr = QRBuilder::new(data).ec_level(ecl).build().unwrap();
        let parser = BitMatrixParser::new(&qr.matrix).unwrap();
        let version = parser.read_version().unwrap();
        let format = parser.read_format_info().unwrap();
        let codewords = parser.read_codewords(version, format).unwrap();
        assert_eq!(codewords.len(), version.total_codewords());
    }

    #[test]
    fn test_read_codewords_unmasks() {
        // Same content under two masks reads back to identical codewords
        let a = QRBuilder::new("MASKED").ec_level(ECLevel::M).mask(1).build().unwrap();
        let b = QRBuilder::new("MASKED").ec_level(ECLevel::M).mask(6).build().unwrap();
        assert_ne!(a.matrix, b.matrix);

        let read = |bits: &BitMatrix| {
            let parser = BitMatrixParser::new(bits).unwrap();
            let format = parser.read_format_info().unwrap();
            parser.read_codewords(Version::new(1), format).unwrap()
        };
        assert_eq!(read(&a.matrix), read(&b.matrix));
    }
}
