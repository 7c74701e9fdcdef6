use std::collections::HashMap;

use super::utils::ResultPoint;
use crate::common::{DecoderResult, ECLevel};

// Result metadata
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ResultMetadataType {
    /// Raw bytes of every byte mode segment, in order.
    ByteSegments,
    ErrorCorrectionLevel,
    /// Packed structured append byte: index in the high nibble, total less one in the low.
    StructuredAppendSequence,
    StructuredAppendParity,
    /// AIM identifier such as `]Q1`.
    SymbologyIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    ByteSegments(Vec<Vec<u8>>),
    ECLevel(ECLevel),
    Number(u32),
    Text(String),
}

// Read result
//------------------------------------------------------------------------------

/// Decoded symbol with where it was found. Points are bottom left, top left and top right
/// finder centres followed by the alignment centre when one was located; pure barcode reads
/// carry none.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    text: String,
    raw_bytes: Vec<u8>,
    points: Vec<ResultPoint>,
    metadata: HashMap<ResultMetadataType, MetadataValue>,
    mirrored: bool,
}

impl ReadResult {
    pub fn new(decoded: DecoderResult, mut points: Vec<ResultPoint>) -> Self {
        // A mirrored grid was read through its transpose, which swaps the outer corners
        if decoded.mirrored && points.len() >= 3 {
            points.swap(0, 2);
        }

        let mut metadata = HashMap::new();
        if !decoded.byte_segments.is_empty() {
            let segments = MetadataValue::ByteSegments(decoded.byte_segments.clone());
            metadata.insert(ResultMetadataType::ByteSegments, segments);
        }
        metadata.insert(
            ResultMetadataType::ErrorCorrectionLevel,
            MetadataValue::ECLevel(decoded.ec_level),
        );
        if let Some(sa) = decoded.structured_append {
            metadata.insert(
                ResultMetadataType::StructuredAppendSequence,
                MetadataValue::Number(sa.sequence() as u32),
            );
            metadata.insert(
                ResultMetadataType::StructuredAppendParity,
                MetadataValue::Number(sa.parity as u32),
            );
        }
        metadata.insert(
            ResultMetadataType::SymbologyIdentifier,
            MetadataValue::Text(decoded.symbology_identifier()),
        );

        Self {
            text: decoded.text,
            raw_bytes: decoded.raw_bytes,
            points,
            metadata,
            mirrored: decoded.mirrored,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Corrected data codewords, padding included.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn points(&self) -> &[ResultPoint] {
        &self.points
    }

    pub fn metadata(&self) -> &HashMap<ResultMetadataType, MetadataValue> {
        &self.metadata
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn ec_level(&self) -> Option<ECLevel> {
        match self.metadata.get(&ResultMetadataType::ErrorCorrectionLevel) {
            Some(MetadataValue::ECLevel(ecl)) => Some(*ecl),
            _ => None,
        }
    }

    pub fn byte_segments(&self) -> Option<&[Vec<u8>]> {
        match self.metadata.get(&ResultMetadataType::ByteSegments) {
            Some(MetadataValue::ByteSegments(segments)) => Some(segments),
            _ => None,
        }
    }

    pub fn symbology_identifier(&self) -> Option<&str> {
        match self.metadata.get(&ResultMetadataType::SymbologyIdentifier) {
            Some(MetadataValue::Text(id)) => Some(id),
            _ => None,
        }
    }

    /// `(sequence, parity)` when the symbol is part of a structured append set.
    pub fn structured_append(&self) -> Option<(u8, u8)> {
        let sequence = self.metadata.get(&ResultMetadataType::StructuredAppendSequence)?;
        let parity = self.metadata.get(&ResultMetadataType::StructuredAppendParity)?;
        match (sequence, parity) {
            (MetadataValue::Number(s), MetadataValue::Number(p)) => Some((*s as u8, *p as u8)),
            _ => None,
        }
    }

    /// Concatenates the parts of a structured append message, ordered by sequence. The
    /// merged result has no points and keeps the metadata of the first part, minus its
    /// structured append entries.
    pub fn merge_structured_append(mut parts: Vec<ReadResult>) -> Option<ReadResult> {
        parts.sort_by_key(|p| p.structured_append().map(|(seq, _)| seq));
        let mut parts = parts.into_iter();
        let first = parts.next()?;

        let mut segment = first.byte_segments().map(|s| s.concat()).unwrap_or_default();
        let mut text = first.text;
        let mut raw_bytes = first.raw_bytes;
        let mut metadata = first.metadata;
        for part in parts {
            text.push_str(&part.text);
            raw_bytes.extend_from_slice(&part.raw_bytes);
            if let Some(segments) = part.byte_segments() {
                segments.iter().for_each(|s| segment.extend_from_slice(s));
            }
        }

        metadata.remove(&ResultMetadataType::StructuredAppendSequence);
        metadata.remove(&ResultMetadataType::StructuredAppendParity);
        if segment.is_empty() {
            metadata.remove(&ResultMetadataType::ByteSegments);
        } else {
            metadata.insert(
                ResultMetadataType::ByteSegments,
                MetadataValue::ByteSegments(vec![segment]),
            );
        }

        Some(ReadResult { text, raw_bytes, points: Vec::new(), metadata, mirrored: false })
    }
}

#[cfg(test)]
mod result_tests {
    use super::{MetadataValue, ReadResult, ResultMetadataType};
    use crate::common::{DecoderResult, ECLevel, StructuredAppend};
    use crate::reader::utils::ResultPoint;

    fn decoded(text: &str, sa: Option<StructuredAppend>) -> DecoderResult {
        DecoderResult {
            text: text.to_string(),
            raw_bytes: text.as_bytes().to_vec(),
            byte_segments: vec![text.as_bytes().to_vec()],
            ec_level: ECLevel::Q,
            structured_append: sa,
            symbology_modifier: 1,
            errors_corrected: 0,
            mirrored: false,
        }
    }

    fn points() -> Vec<ResultPoint> {
        vec![ResultPoint::new(1.0, 9.0), ResultPoint::new(1.0, 1.0), ResultPoint::new(9.0, 1.0)]
    }

    #[test]
    fn test_metadata() {
        let res = ReadResult::new(decoded("abc", None), points());
        assert_eq!(res.text(), "abc");
        assert_eq!(res.ec_level(), Some(ECLevel::Q));
        assert_eq!(res.symbology_identifier(), Some("]Q1"));
        assert_eq!(res.byte_segments(), Some(&[b"abc".to_vec()][..]));
        assert_eq!(res.structured_append(), None);
        assert!(!res.metadata().contains_key(&ResultMetadataType::StructuredAppendParity));
    }

    #[test]
    fn test_structured_append_metadata() {
        let sa = StructuredAppend::new(2, 3, b"abcdef");
        let res = ReadResult::new(decoded("ef", Some(sa)), points());
        assert_eq!(res.structured_append(), Some((0x22, sa.parity)));
        assert_eq!(
            res.metadata().get(&ResultMetadataType::StructuredAppendSequence),
            Some(&MetadataValue::Number(0x22))
        );
    }

    #[test]
    fn test_mirrored_swaps_points() {
        let mut dec = decoded("abc", None);
        dec.mirrored = true;
        let res = ReadResult::new(dec, points());
        assert!(res.is_mirrored());
        assert_eq!(res.points()[0], ResultPoint::new(9.0, 1.0));
        assert_eq!(res.points()[2], ResultPoint::new(1.0, 9.0));
    }

    #[test]
    fn test_merge_structured_append() {
        let parts = ["ab", "cd", "ef"]
            .iter()
            .enumerate()
            .rev()
            .map(|(i, t)| {
                let sa = StructuredAppend::new(i as u8, 3, b"abcdef");
                ReadResult::new(decoded(t, Some(sa)), points())
            })
            .collect();
        let merged = ReadResult::merge_structured_append(parts).unwrap();
        assert_eq!(merged.text(), "abcdef");
        assert_eq!(merged.raw_bytes(), b"abcdef");
        assert_eq!(merged.byte_segments(), Some(&[b"abcdef".to_vec()][..]));
        assert!(merged.points().is_empty());
        assert_eq!(merged.structured_append(), None);
    }

    #[test]
    fn test_merge_nothing() {
        assert_eq!(ReadResult::merge_structured_append(Vec::new()), None);
    }
}
