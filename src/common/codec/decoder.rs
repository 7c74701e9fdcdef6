pub use decode::*;

// Decoder
//------------------------------------------------------------------------------

pub mod decode {
    use tracing::trace;

    use super::reader::{
        take_alphanumeric, take_byte, take_char_count, take_eci, take_hanzi, take_kanji,
        take_numeric, SegmentState,
    };
    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{CharacterSet, Mode, StructuredAppend};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::{ECLevel, Version};

    /// Text and metadata recovered from the corrected data codewords of one symbol.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DecoderResult {
        pub text: String,
        pub raw_bytes: Vec<u8>,
        pub byte_segments: Vec<Vec<u8>>,
        pub ec_level: ECLevel,
        pub structured_append: Option<StructuredAppend>,
        pub symbology_modifier: u8,
        pub errors_corrected: usize,
        pub mirrored: bool,
    }

    impl DecoderResult {
        /// AIM symbology identifier, `]Q` followed by the modifier digit.
        pub fn symbology_identifier(&self) -> String {
            format!("]Q{}", self.symbology_modifier)
        }
    }

    /// Parses the segment sequence packed into `bytes`. Byte segments without an ECI designator
    /// are decoded in `hint` or, failing that, a guessed character set.
    pub fn decode(
        bytes: &[u8],
        version: Version,
        ecl: ECLevel,
        hint: Option<CharacterSet>,
    ) -> QRResult<DecoderResult> {
        let mut inp = BitStream::from(bytes);
        let mut state = SegmentState::new(hint);
        let mut byte_segments = Vec::new();
        let mut structured_append = None;
        let mut fnc1_first = false;
        let mut fnc1_second = false;

        loop {
            // Fewer than 4 bits left is an implicit terminator
            let mode = match inp.take_bits(Mode::INDICATOR_BITS) {
                Some(bits) => Mode::from_bits(bits)?,
                None => Mode::Terminator,
            };
            trace!(?mode, remaining = inp.available(), "Segment");

            match mode {
                Mode::Terminator => break,
                Mode::Fnc1FirstPosition => {
                    fnc1_first = true;
                    state.fnc1 = true;
                }
                Mode::Fnc1SecondPosition => {
                    fnc1_second = true;
                    state.fnc1 = true;
                }
                Mode::StructuredAppend => {
                    if inp.available() < 16 {
                        return Err(QRError::TruncatedSegment);
                    }
                    let sequence = inp.take_bits(8).ok_or(QRError::TruncatedSegment)? as u8;
                    let parity = inp.take_bits(8).ok_or(QRError::TruncatedSegment)? as u8;
                    structured_append = Some(StructuredAppend::from_sequence(sequence, parity));
                }
                Mode::Eci => {
                    let value = take_eci(&mut inp)?;
                    state.eci = Some(CharacterSet::from_eci(value)?);
                }
                Mode::Hanzi => {
                    let subset = inp.take_bits(4).ok_or(QRError::TruncatedSegment)?;
                    let count = take_char_count(&mut inp, version, mode)?;
                    if subset == GB2312_SUBSET {
                        take_hanzi(&mut inp, count, &mut state)?;
                    }
                }
                Mode::Numeric => {
                    let count = take_char_count(&mut inp, version, mode)?;
                    take_numeric(&mut inp, count, &mut state)?;
                }
                Mode::Alphanumeric => {
                    let count = take_char_count(&mut inp, version, mode)?;
                    take_alphanumeric(&mut inp, count, &mut state)?;
                }
                Mode::Byte => {
                    let count = take_char_count(&mut inp, version, mode)?;
                    byte_segments.push(take_byte(&mut inp, count, &mut state)?);
                }
                Mode::Kanji => {
                    let count = take_char_count(&mut inp, version, mode)?;
                    take_kanji(&mut inp, count, &mut state)?;
                }
            }
        }

        let symbology_modifier = match (state.eci.is_some(), fnc1_first, fnc1_second) {
            (true, true, _) => 4,
            (true, false, true) => 6,
            (true, false, false) => 2,
            (false, true, _) => 3,
            (false, false, true) => 5,
            (false, false, false) => 1,
        };

        Ok(DecoderResult {
            text: state.text,
            raw_bytes: bytes.to_vec(),
            byte_segments,
            ec_level: ecl,
            structured_append,
            symbology_modifier,
            errors_corrected: 0,
            mirrored: false,
        })
    }

    const GB2312_SUBSET: u32 = 1;

    #[cfg(test)]
    mod decode_tests {
        use super::decode;
        use crate::common::bit_utils::BitStream;
        use crate::common::codec::encoder::writer::{
            push_alphanumeric_data, push_eci, push_kanji_data, push_numeric_data,
        };
        use crate::common::codec::{CharacterSet, StructuredAppend, GS};
        use crate::common::error::QRError;
        use crate::common::metadata::{ECLevel, Version};

        fn decode_v1(bs: &BitStream) -> Result<super::DecoderResult, QRError> {
            decode(bs.data(), Version::new(1), ECLevel::L, None)
        }

        #[test]
        fn test_simple_byte_mode() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(3u8, 8);
            bs.extend(&[0xf1, 0xf2, 0xf3]);
            let res = decode_v1(&bs).unwrap();
            assert_eq!(res.text, "\u{f1}\u{f2}\u{f3}");
            assert_eq!(res.byte_segments, [vec![0xf1, 0xf2, 0xf3]]);
            assert_eq!(res.symbology_identifier(), "]Q1");
        }

        #[test]
        fn test_simple_sjis() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(4u8, 8);
            bs.extend(&[0xa1, 0xa2, 0xa3, 0xd0]);
            assert_eq!(decode_v1(&bs).unwrap().text, "\u{ff61}\u{ff62}\u{ff63}\u{ff90}");
        }

        #[test]
        fn test_byte_mode_with_hint() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(2u8, 8);
            bs.extend(&[0xc4, 0xe5]);
            let res =
                decode(bs.data(), Version::new(1), ECLevel::L, Some(CharacterSet::Iso8859_7));
            assert_eq!(res.unwrap().text, "Δε");
        }

        #[test]
        fn test_eci_utf8() {
            let mut bs = BitStream::new();
            push_eci(26, &mut bs);
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(2u8, 8);
            bs.extend("Ω".as_bytes());
            let res = decode_v1(&bs).unwrap();
            assert_eq!(res.text, "Ω");
            assert_eq!(res.symbology_modifier, 2);
        }

        #[test]
        fn test_unsupported_eci() {
            let mut bs = BitStream::new();
            push_eci(2, &mut bs);
            assert_eq!(decode_v1(&bs).err(), Some(QRError::UnsupportedEci(2)));
        }

        #[test]
        fn test_hanzi() {
            let mut bs = BitStream::new();
            bs.push_bits(0b1101u8, 4);
            bs.push_bits(1u8, 4);
            bs.push_bits(1u8, 8);
            bs.push_bits(0x03c1u16, 13);
            assert_eq!(decode_v1(&bs).unwrap().text, "阿");
        }

        #[test]
        fn test_kanji() {
            let mut bs = BitStream::new();
            bs.push_bits(0b1000u8, 4);
            bs.push_bits(2u8, 8);
            let sjis = CharacterSet::ShiftJis.encode("点茗").unwrap();
            push_kanji_data(&sjis, &mut bs).unwrap();
            assert_eq!(decode_v1(&bs).unwrap().text, "点茗");
        }

        #[test]
        fn test_numeric_and_alphanumeric() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0001u8, 4);
            bs.push_bits(8u16, 10);
            push_numeric_data(b"12345670", &mut bs).unwrap();
            bs.push_bits(0b0010u8, 4);
            bs.push_bits(3u16, 9);
            push_alphanumeric_data(b"A-Z", &mut bs).unwrap();
            assert_eq!(decode_v1(&bs).unwrap().text, "12345670A-Z");
        }

        #[test]
        fn test_fnc1_percent_escape() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0101u8, 4);
            bs.push_bits(0b0010u8, 4);
            bs.push_bits(6u16, 9);
            push_alphanumeric_data(b"A%%B%C", &mut bs).unwrap();
            let res = decode_v1(&bs).unwrap();
            assert_eq!(res.text, format!("A%B{GS}C"));
            assert_eq!(res.symbology_modifier, 3);
        }

        #[test]
        fn test_fnc1_second_reads_no_bits() {
            let mut bs = BitStream::new();
            bs.push_bits(0b1001u8, 4);
            bs.push_bits(0b0001u8, 4);
            bs.push_bits(1u16, 10);
            push_numeric_data(b"7", &mut bs).unwrap();
            let res = decode_v1(&bs).unwrap();
            assert_eq!(res.text, "7");
            assert_eq!(res.symbology_modifier, 5);
        }

        #[test]
        fn test_structured_append() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0011u8, 4);
            bs.push_bits(0x12u8, 8);
            bs.push_bits(0x5au8, 8);
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(1u8, 8);
            bs.extend(b"a");
            let res = decode_v1(&bs).unwrap();
            assert_eq!(res.text, "a");
            let sa = StructuredAppend { index: 1, total: 3, parity: 0x5a };
            assert_eq!(res.structured_append, Some(sa));
        }

        #[test]
        fn test_truncated_structured_append() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0011u8, 4);
            bs.push_bits(0x12u8, 8);
            assert_eq!(decode_v1(&bs).err(), Some(QRError::TruncatedSegment));
        }

        #[test]
        fn test_invalid_mode() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0110u8, 4);
            bs.push_bits(0u8, 4);
            assert_eq!(decode_v1(&bs).err(), Some(QRError::InvalidMode(0b0110)));
        }

        #[test]
        fn test_invalid_numeric_value() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0001u8, 4);
            bs.push_bits(3u16, 10);
            bs.push_bits(1000u16, 10);
            assert_eq!(decode_v1(&bs).err(), Some(QRError::InvalidValue("numeric", 1000)));
        }

        #[test]
        fn test_truncated_byte_segment() {
            let mut bs = BitStream::new();
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(5u8, 8);
            bs.extend(b"ab");
            assert_eq!(decode_v1(&bs).err(), Some(QRError::TruncatedSegment));
        }

        #[test]
        fn test_implicit_terminator() {
            // 21 bits of segment padded to 3 bytes leaves 3 bits, too few for a mode indicator
            let mut bs = BitStream::new();
            bs.push_bits(0b0001u8, 4);
            bs.push_bits(2u16, 10);
            push_numeric_data(b"42", &mut bs).unwrap();
            assert_eq!(bs.len(), 21);
            assert_eq!(bs.data().len(), 3);
            assert_eq!(decode_v1(&bs).unwrap().text, "42");
        }

        #[test]
        fn test_malformed_utf8_under_eci() {
            let mut bs = BitStream::new();
            push_eci(26, &mut bs);
            bs.push_bits(0b0100u8, 4);
            bs.push_bits(2u8, 8);
            bs.extend(&[0xff, 0xfe]);
            let err = decode_v1(&bs).unwrap_err();
            assert_eq!(err, QRError::InvalidText("UTF-8"));
            assert_eq!(err.kind(), crate::common::error::ErrorKind::Format);
        }

        #[test]
        fn test_malformed_kanji() {
            // 0x3f expands to 0x817f and 0x7f is never a Shift_JIS trail byte
            let mut bs = BitStream::new();
            bs.push_bits(0b1000u8, 4);
            bs.push_bits(1u8, 8);
            bs.push_bits(0x3fu16, 13);
            assert_eq!(decode_v1(&bs).err(), Some(QRError::InvalidText("Shift_JIS")));
        }
    }
}

// Reader for encoded data
//------------------------------------------------------------------------------

pub(super) mod reader {
    use crate::common::bit_utils::BitStream;
    use crate::common::codec::{alphanumeric_char, guess_charset, CharacterSet, Mode, GS};
    use crate::common::error::{QRError, QRResult};
    use crate::common::metadata::Version;

    /// Decoded text along with the state segments leave behind for the ones that follow.
    pub struct SegmentState {
        pub text: String,
        pub eci: Option<CharacterSet>,
        pub fnc1: bool,
        hint: Option<CharacterSet>,
    }

    impl SegmentState {
        pub fn new(hint: Option<CharacterSet>) -> Self {
            Self { text: String::new(), eci: None, fnc1: false, hint }
        }
    }

    fn take(inp: &mut BitStream, n: usize) -> QRResult<u32> {
        inp.take_bits(n).ok_or(QRError::TruncatedSegment)
    }

    fn ensure_available(inp: &BitStream, bits: usize) -> QRResult<()> {
        if inp.available() < bits {
            return Err(QRError::TruncatedSegment);
        }
        Ok(())
    }

    pub fn take_char_count(inp: &mut BitStream, ver: Version, mode: Mode) -> QRResult<usize> {
        Ok(take(inp, mode.char_cnt_bits(ver))? as usize)
    }

    pub fn take_eci(inp: &mut BitStream) -> QRResult<u32> {
        let first = take(inp, 8)?;
        if first & 0x80 == 0 {
            Ok(first & 0x7f)
        } else if first & 0xc0 == 0x80 {
            Ok(((first & 0x3f) << 8) | take(inp, 8)?)
        } else if first & 0xe0 == 0xc0 {
            Ok(((first & 0x1f) << 16) | take(inp, 16)?)
        } else {
            Err(QRError::InvalidValue("ECI", first))
        }
    }

    pub fn take_numeric(
        inp: &mut BitStream,
        mut count: usize,
        st: &mut SegmentState,
    ) -> QRResult<()> {
        while count >= 3 {
            let chunk = take(inp, 10)?;
            if chunk >= 1000 {
                return Err(QRError::InvalidValue("numeric", chunk));
            }
            st.text.push_str(&format!("{chunk:03}"));
            count -= 3;
        }
        match count {
            2 => {
                let chunk = take(inp, 7)?;
                if chunk >= 100 {
                    return Err(QRError::InvalidValue("numeric", chunk));
                }
                st.text.push_str(&format!("{chunk:02}"));
            }
            1 => {
                let chunk = take(inp, 4)?;
                if chunk >= 10 {
                    return Err(QRError::InvalidValue("numeric", chunk));
                }
                st.text.push_str(&chunk.to_string());
            }
            _ => (),
        }
        Ok(())
    }

    pub fn take_alphanumeric(
        inp: &mut BitStream,
        mut count: usize,
        st: &mut SegmentState,
    ) -> QRResult<()> {
        let mut seg = String::with_capacity(count);
        while count > 1 {
            let chunk = take(inp, 11)?;
            seg.push(alphanumeric_char(chunk / 45)?);
            seg.push(alphanumeric_char(chunk % 45)?);
            count -= 2;
        }
        if count == 1 {
            seg.push(alphanumeric_char(take(inp, 6)?)?);
        }

        if !st.fnc1 {
            st.text.push_str(&seg);
            return Ok(());
        }

        // Under FNC1 "%%" is a literal percent and a lone '%' is the group separator
        let mut chars = seg.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '%' if chars.peek() == Some(&'%') => {
                    chars.next();
                    st.text.push('%');
                }
                '%' => st.text.push(GS),
                _ => st.text.push(c),
            }
        }
        Ok(())
    }

    pub fn take_byte(
        inp: &mut BitStream,
        count: usize,
        st: &mut SegmentState,
    ) -> QRResult<Vec<u8>> {
        ensure_available(inp, count * 8)?;
        let bytes =
            (0..count).map(|_| take(inp, 8).map(|b| b as u8)).collect::<QRResult<Vec<_>>>()?;

        let charset = st.eci.unwrap_or_else(|| guess_charset(&bytes, st.hint));
        st.text.push_str(&charset.decode(&bytes)?);
        Ok(bytes)
    }

    pub fn take_kanji(inp: &mut BitStream, count: usize, st: &mut SegmentState) -> QRResult<()> {
        let offset = |v| if v < 0x1f00 { 0x8140 } else { 0xc140 };
        let bytes = take_double_byte(inp, count, 0xc0, offset)?;
        st.text.push_str(&CharacterSet::ShiftJis.decode(&bytes)?);
        Ok(())
    }

    pub fn take_hanzi(inp: &mut BitStream, count: usize, st: &mut SegmentState) -> QRResult<()> {
        let offset = |v| if v < 0xa00 { 0xa1a1 } else { 0xa6a1 };
        let bytes = take_double_byte(inp, count, 0x60, offset)?;
        st.text.push_str(&CharacterSet::Gb18030.decode(&bytes)?);
        Ok(())
    }

    // 13-bit codes expanded back into two bytes of a double byte character set
    fn take_double_byte(
        inp: &mut BitStream,
        count: usize,
        row_len: u32,
        offset: impl Fn(u32) -> u32,
    ) -> QRResult<Vec<u8>> {
        ensure_available(inp, count * 13)?;
        let mut bytes = Vec::with_capacity(count * 2);
        for _ in 0..count {
            let chunk = take(inp, 13)?;
            let assembled = ((chunk / row_len) << 8) | (chunk % row_len);
            let code = assembled + offset(assembled);
            bytes.push((code >> 8) as u8);
            bytes.push(code as u8);
        }
        Ok(bytes)
    }

    #[cfg(test)]
    mod reader_tests {
        use super::{take_eci, take_numeric, SegmentState};
        use crate::common::bit_utils::BitStream;
        use crate::common::error::QRError;

        #[test]
        fn test_take_eci_forms() {
            let mut bs = BitStream::from(&[0x1a]);
            assert_eq!(take_eci(&mut bs), Ok(26));
            let mut bs = BitStream::from(&[0x83, 0x83]);
            assert_eq!(take_eci(&mut bs), Ok(899));
            let mut bs = BitStream::from(&[0xc1, 0x00, 0x00]);
            assert_eq!(take_eci(&mut bs), Ok(0x10000));
            let mut bs = BitStream::from(&[0xe0]);
            assert_eq!(take_eci(&mut bs), Err(QRError::InvalidValue("ECI", 0xe0)));
        }

        #[test]
        fn test_take_numeric_leading_zeros() {
            let mut bs = BitStream::new();
            bs.push_bits(7u16, 10);
            bs.push_bits(5u8, 7);
            let mut st = SegmentState::new(None);
            take_numeric(&mut bs, 5, &mut st).unwrap();
            assert_eq!(st.text, "00705");
        }

        #[test]
        fn test_take_numeric_truncated() {
            let mut bs = BitStream::new();
            bs.push_bits(7u16, 10);
            let mut st = SegmentState::new(None);
            assert_eq!(take_numeric(&mut bs, 4, &mut st), Err(QRError::TruncatedSegment));
        }
    }
}
