pub use encode::*;

// Encoder
//------------------------------------------------------------------------------

pub mod encode {
    use tracing::debug;

    use super::writer::{
        push_alphanumeric_data, push_byte_data, push_char_count, push_eci, push_kanji_data,
        push_numeric_data, push_structured_append, terminate,
    };
    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{CharacterSet, Mode, StructuredAppend};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::{ECLevel, Version};

    /// Optional header fields and constraints for [`encode`].
    #[derive(Debug, Default, Clone, Copy)]
    pub struct EncodeOptions {
        pub version: Option<Version>,
        pub charset: Option<CharacterSet>,
        pub gs1: bool,
        pub structured_append: Option<StructuredAppend>,
    }

    /// Data codewords of a symbol, padded to the full data capacity of `version`.
    #[derive(Debug, Clone)]
    pub struct EncodedData {
        pub mode: Mode,
        pub version: Version,
        pub data: BitStream,
    }

    /// Assembles header and payload bits of `content` as a single segment. With no version in
    /// `opts` the smallest one that fits at `ecl` is chosen.
    pub fn encode(content: &str, ecl: ECLevel, opts: &EncodeOptions) -> QRResult<EncodedData> {
        if content.is_empty() {
            return Err(QRError::EmptyData);
        }
        let EncodeOptions { version, charset, gs1, structured_append } = *opts;

        let mode = choose_mode(content, charset);
        let byte_charset = byte_mode_charset(content, charset);

        let mut header = BitStream::new();
        if let Some(sa) = structured_append {
            push_structured_append(sa, &mut header)?;
        }
        if mode == Mode::Byte {
            if let Some(cs) = byte_charset.filter(|_| charset.is_some() || !is_latin1(content)) {
                push_eci(cs.eci(), &mut header);
            }
        }
        if gs1 {
            header.push_bits(Mode::Fnc1FirstPosition.bits(), Mode::INDICATOR_BITS);
        }
        header.push_bits(mode.bits(), Mode::INDICATOR_BITS);

        let payload = encode_payload(content, mode, byte_charset)?;

        let version = match version {
            Some(v) => {
                let bits_needed = bits_needed(mode, &header, &payload, v);
                if !will_fit(bits_needed, v, ecl) {
                    return Err(QRError::DataTooLongForVersion(*v));
                }
                v
            }
            None => recommend_version(ecl, mode, &header, &payload)?,
        };

        let num_letters =
            if mode == Mode::Byte { payload.len_bytes() } else { content.chars().count() };

        let num_data_bytes = version.data_codewords(ecl);
        let mut data = BitStream::with_capacity(num_data_bytes << 3);
        data.append(&header);
        push_char_count(num_letters, version, mode, &mut data)?;
        data.append(&payload);
        terminate(num_data_bytes, &mut data)?;

        debug!(?mode, %version, %ecl, bits = data.len(), "Encoded data codewords");
        Ok(EncodedData { mode, version, data })
    }

    pub fn choose_mode(content: &str, charset: Option<CharacterSet>) -> Mode {
        let sjis_allowed = matches!(charset, None | Some(CharacterSet::ShiftJis));
        if sjis_allowed && is_only_double_byte_kanji(content) {
            return Mode::Kanji;
        }

        let bytes = content.as_bytes();
        if bytes.iter().all(|&b| Mode::Numeric.contains(b)) {
            Mode::Numeric
        } else if bytes.iter().all(|&b| Mode::Alphanumeric.contains(b)) {
            Mode::Alphanumeric
        } else {
            Mode::Byte
        }
    }

    fn is_only_double_byte_kanji(content: &str) -> bool {
        let bytes = match CharacterSet::ShiftJis.encode(content) {
            Some(b) => b,
            None => return false,
        };
        if bytes.len() & 1 != 0 {
            return false;
        }
        bytes.chunks(2).all(|c| matches!(c[0], 0x81..=0x9f | 0xe0..=0xeb))
    }

    fn is_latin1(content: &str) -> bool {
        content.chars().all(|c| (c as u32) < 0x100)
    }

    // ISO-8859-1 unless requested otherwise, UTF-8 for content outside of it
    fn byte_mode_charset(content: &str, charset: Option<CharacterSet>) -> Option<CharacterSet> {
        match charset {
            Some(cs) => Some(cs),
            None if is_latin1(content) => Some(CharacterSet::Iso8859_1),
            None => Some(CharacterSet::Utf8),
        }
    }

    fn encode_payload(
        content: &str,
        mode: Mode,
        charset: Option<CharacterSet>,
    ) -> QRResult<BitStream> {
        let mut out = BitStream::new();
        match mode {
            Mode::Numeric => push_numeric_data(content.as_bytes(), &mut out)?,
            Mode::Alphanumeric => push_alphanumeric_data(content.as_bytes(), &mut out)?,
            Mode::Kanji => {
                let bytes = CharacterSet::ShiftJis
                    .encode(content)
                    .ok_or(QRError::UnencodableContent("Shift_JIS"))?;
                push_kanji_data(&bytes, &mut out)?;
            }
            _ => {
                let cs = charset.unwrap_or(CharacterSet::Iso8859_1);
                let bytes = cs.encode(content).ok_or(QRError::UnencodableContent(cs.name()))?;
                push_byte_data(&bytes, &mut out);
            }
        }
        Ok(out)
    }

    fn bits_needed(mode: Mode, header: &BitStream, payload: &BitStream, ver: Version) -> usize {
        header.len() + mode.char_cnt_bits(ver) + payload.len()
    }

    fn will_fit(bits_needed: usize, ver: Version, ecl: ECLevel) -> bool {
        ver.data_codewords(ecl) >= bits_needed.div_ceil(8)
    }

    fn choose_version(bits_needed: usize, ecl: ECLevel) -> QRResult<Version> {
        Version::all().find(|&v| will_fit(bits_needed, v, ecl)).ok_or(QRError::DataTooLong)
    }

    // Count field width depends on the version, so size with version 1 first then re-solve
    fn recommend_version(
        ecl: ECLevel,
        mode: Mode,
        header: &BitStream,
        payload: &BitStream,
    ) -> QRResult<Version> {
        let provisional_bits = bits_needed(mode, header, payload, Version::MIN);
        let provisional = choose_version(provisional_bits, ecl)?;
        choose_version(bits_needed(mode, header, payload, provisional), ecl)
    }

    #[cfg(test)]
    mod encode_tests {
        use test_case::test_case;

        use super::{choose_mode, encode, EncodeOptions};
        use crate::common::codec::{CharacterSet, Mode, StructuredAppend};
        use crate::common::error::QRError;
        use crate::common::metadata::{ECLevel, Version};

        #[test_case("0123456789", None, Mode::Numeric)]
        #[test_case("HELLO WORLD", None, Mode::Alphanumeric)]
        #[test_case("A1 $%*+-./:", None, Mode::Alphanumeric)]
        #[test_case("Hello", None, Mode::Byte)]
        #[test_case("点茗", None, Mode::Kanji)]
        #[test_case("点茗", Some(CharacterSet::ShiftJis), Mode::Kanji)]
        #[test_case("点茗", Some(CharacterSet::Utf8), Mode::Byte)]
        #[test_case("ｱ", None, Mode::Byte)]
        fn test_choose_mode(content: &str, cs: Option<CharacterSet>, exp: Mode) {
            assert_eq!(choose_mode(content, cs), exp);
        }

        #[test_case("1".repeat(41), ECLevel::L, 1)]
        #[test_case("1".repeat(42), ECLevel::L, 2)]
        #[test_case("A".repeat(25), ECLevel::L, 1)]
        #[test_case("A".repeat(26), ECLevel::L, 2)]
        #[test_case("a".repeat(17), ECLevel::L, 1)]
        #[test_case("a".repeat(18), ECLevel::L, 2)]
        #[test_case("HELLO WORLD".to_string(), ECLevel::Q, 1)]
        #[test_case("a".repeat(2953), ECLevel::L, 40)]
        #[test_case("1".repeat(7089), ECLevel::L, 40)]
        fn test_version_selection(content: String, ecl: ECLevel, exp: u8) {
            let encoded = encode(&content, ecl, &EncodeOptions::default()).unwrap();
            assert_eq!(encoded.version, Version::new(exp));
            assert_eq!(encoded.data.len(), encoded.version.data_bit_capacity(ecl));
        }

        #[test]
        fn test_data_too_long() {
            let content = "a".repeat(2954);
            let res = encode(&content, ECLevel::L, &EncodeOptions::default());
            assert_eq!(res.err(), Some(QRError::DataTooLong));
            let content = "a".repeat(18);
            let opts = EncodeOptions { version: Some(Version::new(1)), ..Default::default() };
            let res = encode(&content, ECLevel::L, &opts);
            assert_eq!(res.err(), Some(QRError::DataTooLongForVersion(1)));
        }

        #[test]
        fn test_empty_data() {
            let res = encode("", ECLevel::L, &EncodeOptions::default());
            assert_eq!(res.err(), Some(QRError::EmptyData));
        }

        #[test]
        fn test_encode_hello_world() {
            // Version 1-Q, alphanumeric
            let encoded = encode("HELLO WORLD", ECLevel::Q, &EncodeOptions::default()).unwrap();
            assert_eq!(encoded.mode, Mode::Alphanumeric);
            assert_eq!(
                encoded.data.data(),
                [32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236]
            );
        }

        #[test]
        fn test_encode_eci_header() {
            // ECI 26 for content outside ISO-8859-1
            let encoded = encode("aΩ", ECLevel::L, &EncodeOptions::default()).unwrap();
            assert_eq!(encoded.data.data()[..2], [0b0111_0001, 0b1010_0100]);

            // Explicit charset always announces itself
            let opts =
                EncodeOptions { charset: Some(CharacterSet::Iso8859_1), ..Default::default() };
            let encoded = encode("a", ECLevel::L, &opts).unwrap();
            assert_eq!(encoded.data.data()[..2], [0b0111_0000, 0b0011_0100]);

            // Plain latin content carries no designator
            let encoded = encode("a", ECLevel::L, &EncodeOptions::default()).unwrap();
            assert_eq!(encoded.data.data()[0] >> 4, 0b0100);
        }

        #[test]
        fn test_encode_gs1() {
            let opts = EncodeOptions { gs1: true, ..Default::default() };
            let encoded = encode("01", ECLevel::L, &opts).unwrap();
            assert_eq!(encoded.data.data()[0], 0b0101_0001);
        }

        #[test]
        fn test_encode_structured_append() {
            let sa = StructuredAppend { index: 1, total: 3, parity: 0x5a };
            let opts = EncodeOptions { structured_append: Some(sa), ..Default::default() };
            let encoded = encode("1", ECLevel::L, &opts).unwrap();
            // 0011 0001 0010 01011010 0001
            assert_eq!(encoded.data.data()[..3], [0b0011_0001, 0b0010_0101, 0b1010_0001]);
        }

        #[test]
        fn test_version_monotonic() {
            let mut last = Version::MIN;
            for n in (1..400).step_by(7) {
                let opts = EncodeOptions::default();
                let v = encode(&"x".repeat(n), ECLevel::M, &opts).unwrap().version;
                assert!(v >= last);
                last = v;
            }
        }
    }
}

// Writer for encoded data
//------------------------------------------------------------------------------

pub(super) mod writer {
    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{Mode, StructuredAppend, PADDING_CODEWORDS};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::Version;

    pub fn push_structured_append(sa: StructuredAppend, out: &mut BitStream) -> QRResult<()> {
        if sa.total == 0 || sa.total > 16 || sa.index >= sa.total {
            return Err(QRError::InvalidStructuredAppend(sa.index, sa.total));
        }
        out.push_bits(Mode::StructuredAppend.bits(), Mode::INDICATOR_BITS);
        out.push_bits(sa.sequence(), 8);
        out.push_bits(sa.parity, 8);
        Ok(())
    }

    pub fn push_eci(value: u32, out: &mut BitStream) {
        out.push_bits(Mode::Eci.bits(), Mode::INDICATOR_BITS);
        match value {
            0..=0x7f => out.push_bits(value, 8),
            0x80..=0x3fff => out.push_bits(0x8000 | value, 16),
            _ => out.push_bits(0xc0_0000 | (value & 0x1f_ffff), 24),
        }
    }

    pub fn push_char_count(
        count: usize,
        ver: Version,
        mode: Mode,
        out: &mut BitStream,
    ) -> QRResult<()> {
        let bits = mode.char_cnt_bits(ver);
        if count >= 1 << bits {
            return Err(QRError::CountOverflow { count, bits });
        }
        out.push_bits(count as u32, bits);
        Ok(())
    }

    pub fn push_numeric_data(data: &[u8], out: &mut BitStream) -> QRResult<()> {
        if let Some(&b) = data.iter().find(|&&b| !Mode::Numeric.contains(b)) {
            return Err(QRError::InvalidChar(b as char));
        }
        for chunk in data.chunks(3) {
            let len = Mode::Numeric.encoded_len(chunk.len());
            out.push_bits(Mode::Numeric.encode_chunk(chunk), len);
        }
        Ok(())
    }

    pub fn push_alphanumeric_data(data: &[u8], out: &mut BitStream) -> QRResult<()> {
        if let Some(&b) = data.iter().find(|&&b| !Mode::Alphanumeric.contains(b)) {
            return Err(QRError::InvalidChar(b as char));
        }
        for chunk in data.chunks(2) {
            let len = Mode::Alphanumeric.encoded_len(chunk.len());
            out.push_bits(Mode::Alphanumeric.encode_chunk(chunk), len);
        }
        Ok(())
    }

    pub fn push_byte_data(data: &[u8], out: &mut BitStream) {
        out.extend(data);
    }

    // Shift_JIS double byte codes squeezed into 13 bits
    pub fn push_kanji_data(data: &[u8], out: &mut BitStream) -> QRResult<()> {
        for pair in data.chunks(2) {
            let code = match pair {
                &[hi, lo] => ((hi as u16) << 8) | lo as u16,
                _ => return Err(QRError::UnencodableContent("Shift_JIS")),
            };
            let sub = match code {
                0x8140..=0x9ffc => code - 0x8140,
                0xe040..=0xebbf => code - 0xc140,
                _ => return Err(QRError::UnencodableContent("Shift_JIS")),
            };
            out.push_bits((sub >> 8) * 0xc0 + (sub & 0xff), 13);
        }
        Ok(())
    }

    /// Fills the stream up to `num_data_bytes` with the terminator, zero bits up to the byte
    /// boundary and alternating padding codewords.
    pub fn terminate(num_data_bytes: usize, out: &mut BitStream) -> QRResult<()> {
        let capacity = num_data_bytes << 3;
        if out.len() > capacity {
            return Err(QRError::CapacityMismatch(out.len(), capacity));
        }
        push_terminator(capacity, out);
        push_padding_bits(out);
        push_padding_codewords(capacity, out);
        if out.len() != capacity {
            return Err(QRError::CapacityMismatch(out.len(), capacity));
        }
        Ok(())
    }

    fn push_terminator(capacity: usize, out: &mut BitStream) {
        let term_len = (capacity - out.len()).min(4);
        out.push_bits(0u8, term_len);
    }

    fn push_padding_bits(out: &mut BitStream) {
        let offset = out.len() & 7;
        if offset > 0 {
            out.push_bits(0u8, 8 - offset);
        }
    }

    fn push_padding_codewords(capacity: usize, out: &mut BitStream) {
        debug_assert!(out.len() & 7 == 0, "Bit offset should be zero before padding codewords");

        let remaining = capacity.saturating_sub(out.len()) >> 3;
        PADDING_CODEWORDS.iter().cycle().take(remaining).for_each(|&pc| out.push_bits(pc, 8));
    }

    #[cfg(test)]
    mod writer_tests {
        use super::{
            push_alphanumeric_data, push_byte_data, push_char_count, push_eci, push_kanji_data,
            push_numeric_data, terminate,
        };
        use crate::common::bit_utils::BitStream;
        use crate::common::codec::{CharacterSet, Mode, PADDING_CODEWORDS};
        use crate::common::error::QRError;
        use crate::common::metadata::Version;

        fn to_bit_str(bs: &BitStream) -> String {
            (0..bs.len()).map(|i| if bs.get(i) { '1' } else { '0' }).collect()
        }

        #[test]
        fn test_push_char_count() {
            let mut bs = BitStream::new();
            push_char_count(1, Version::new(1), Mode::Numeric, &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "0000000001");
            let mut bs = BitStream::new();
            push_char_count(2, Version::new(10), Mode::Alphanumeric, &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "00000000010");
            let mut bs = BitStream::new();
            push_char_count(255, Version::new(27), Mode::Byte, &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "0000000011111111");
            let mut bs = BitStream::new();
            push_char_count(512, Version::new(40), Mode::Kanji, &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "001000000000");
        }

        #[test]
        fn test_push_char_count_overflow() {
            let mut bs = BitStream::new();
            let res = push_char_count(256, Version::new(1), Mode::Byte, &mut bs);
            assert_eq!(res, Err(QRError::CountOverflow { count: 256, bits: 8 }));
        }

        #[test]
        fn test_push_numeric_data() {
            let mut bs = BitStream::new();
            push_numeric_data(b"1", &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "0001");
            let mut bs = BitStream::new();
            push_numeric_data(b"12", &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "0001100");
            let mut bs = BitStream::new();
            push_numeric_data(b"1234", &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "00011110110100");
            let mut bs = BitStream::new();
            push_numeric_data(b"01234567", &mut bs).unwrap();
            assert_eq!(bs.data(), [0b00000011, 0b00010101, 0b10011000, 0b01100000]);
        }

        #[test]
        fn test_push_alphanumeric_data() {
            let mut bs = BitStream::new();
            push_alphanumeric_data(b"A", &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "001010");
            let mut bs = BitStream::new();
            push_alphanumeric_data(b"ABC", &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "00111001101001100");
            let mut bs = BitStream::new();
            assert_eq!(push_alphanumeric_data(b"abc", &mut bs), Err(QRError::InvalidChar('a')));
        }

        #[test]
        fn test_push_byte_data() {
            let mut bs = BitStream::new();
            push_byte_data(b"abc", &mut bs);
            assert_eq!(to_bit_str(&bs), "011000010110001001100011");
        }

        #[test]
        fn test_push_kanji_data() {
            let mut bs = BitStream::new();
            let sjis = CharacterSet::ShiftJis.encode("点").unwrap();
            push_kanji_data(&sjis, &mut bs).unwrap();
            assert_eq!(to_bit_str(&bs), "0110110011111");
            let mut bs = BitStream::new();
            assert!(push_kanji_data(b"\x41\x42", &mut bs).is_err());
        }

        #[test]
        fn test_push_eci() {
            let mut bs = BitStream::new();
            push_eci(26, &mut bs);
            assert_eq!(to_bit_str(&bs), "011100011010");
            let mut bs = BitStream::new();
            push_eci(899, &mut bs);
            assert_eq!(to_bit_str(&bs), "01111000001110000011");
        }

        #[test]
        fn test_terminate() {
            let mut bs = BitStream::new();
            terminate(0, &mut bs).unwrap();
            assert_eq!(bs.len(), 0);

            let mut bs = BitStream::new();
            terminate(1, &mut bs).unwrap();
            assert_eq!(bs.data(), [0]);

            let mut bs = BitStream::new();
            bs.push_bits(0u8, 3);
            terminate(3, &mut bs).unwrap();
            assert_eq!(bs.data(), [0, 0xec, 0x11]);

            let mut bs = BitStream::new();
            bs.push_bits(0b1u8, 1);
            terminate(19, &mut bs).unwrap();
            let mut output = vec![0b10000000];
            output.extend(PADDING_CODEWORDS.iter().cycle().take(18));
            assert_eq!(bs.data(), output);
        }

        #[test]
        fn test_terminate_overflow() {
            let mut bs = BitStream::new();
            bs.push_bits(0u16, 9);
            assert_eq!(terminate(1, &mut bs), Err(QRError::CapacityMismatch(9, 8)));
        }
    }
}
