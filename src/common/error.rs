use thiserror::Error;

// Error kind
//------------------------------------------------------------------------------

/// Coarse classification of every [`QRError`].
///
/// `NotFound` means nothing symbol-like could be located, `Format` means the bits were
/// located but are structurally invalid, `Checksum` means Reed-Solomon could not repair a
/// block and `Writer` covers every rejected encode request.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ErrorKind {
    NotFound,
    Format,
    Checksum,
    Writer,
}

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum QRError {
    // QR builder
    #[error("Empty data")]
    EmptyData,
    #[error("Data too big for any version at the requested error correction level")]
    DataTooLong,
    #[error("Data too big for requested version {0}")]
    DataTooLongForVersion(u8),
    #[error("Invalid version {0}")]
    InvalidVersion(u32),
    #[error("Invalid mask pattern {0}")]
    InvalidMaskPattern(u8),
    #[error("Character {0:?} cannot be encoded in the selected mode")]
    InvalidChar(char),
    #[error("Content cannot be represented in character set {0}")]
    UnencodableContent(&'static str),
    #[error("Count {count} doesn't fit in {bits} bits")]
    CountOverflow { count: usize, bits: usize },
    #[error("Bit stream doesn't match the data capacity: {0} bits, capacity {1} bits")]
    CapacityMismatch(usize, usize),
    #[error("Invalid structured append position {0} of {1}")]
    InvalidStructuredAppend(u8, u8),

    // QR reader
    #[error("Insufficient contrast to binarize image")]
    LowContrast,
    #[error("Finder patterns not found")]
    FinderNotFound,
    #[error("Alignment pattern not found")]
    AlignmentNotFound,
    #[error("Estimated module size is too small")]
    ModuleSizeTooSmall,
    #[error("Estimated dimension {0} doesn't match any version")]
    InvalidEstimatedDimension(usize),
    #[error("Sampled point lies outside the image")]
    PointOutOfBounds,
    #[error("Symbol not found")]
    SymbolNotFound,
    #[error("Invalid symbol dimension {0}")]
    InvalidDimension(usize),
    #[error("Invalid format info")]
    InvalidFormatInfo,
    #[error("Invalid version info")]
    InvalidVersionInfo,
    #[error("Read {0} codewords, expected {1}")]
    CodewordCountMismatch(usize, usize),
    #[error("Invalid mode indicator {0:#x}")]
    InvalidMode(u32),
    #[error("Segment is truncated")]
    TruncatedSegment,
    #[error("Invalid {0} value {1}")]
    InvalidValue(&'static str, u32),
    #[error("Unsupported ECI designator {0}")]
    UnsupportedEci(u32),
    #[error("Segment bytes are not valid {0} text")]
    InvalidText(&'static str),
    #[error("Too many errors to correct successfully")]
    TooManyErrors,
}

impl QRError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyData
            | Self::DataTooLong
            | Self::DataTooLongForVersion(_)
            | Self::InvalidVersion(_)
            | Self::InvalidMaskPattern(_)
            | Self::InvalidChar(_)
            | Self::UnencodableContent(_)
            | Self::CountOverflow { .. }
            | Self::CapacityMismatch(..)
            | Self::InvalidStructuredAppend(..) => ErrorKind::Writer,

            Self::LowContrast
            | Self::FinderNotFound
            | Self::AlignmentNotFound
            | Self::ModuleSizeTooSmall
            | Self::InvalidEstimatedDimension(_)
            | Self::PointOutOfBounds
            | Self::SymbolNotFound => ErrorKind::NotFound,

            Self::InvalidDimension(_)
            | Self::InvalidFormatInfo
            | Self::InvalidVersionInfo
            | Self::CodewordCountMismatch(..)
            | Self::InvalidMode(_)
            | Self::TruncatedSegment
            | Self::InvalidValue(..)
            | Self::UnsupportedEci(_)
            | Self::InvalidText(_) => ErrorKind::Format,

            Self::TooManyErrors => ErrorKind::Checksum,
        }
    }

    pub(crate) fn is_recoverable_by_mirroring(&self) -> bool {
        matches!(self.kind(), ErrorKind::Format | ErrorKind::Checksum)
    }
}

pub type QRResult<T> = Result<T, QRError>;

#[cfg(test)]
mod error_tests {
    use test_case::test_case;

    use super::{ErrorKind, QRError};

    #[test_case(QRError::EmptyData, ErrorKind::Writer)]
    #[test_case(QRError::InvalidMaskPattern(9), ErrorKind::Writer)]
    #[test_case(QRError::FinderNotFound, ErrorKind::NotFound)]
    #[test_case(QRError::LowContrast, ErrorKind::NotFound)]
    #[test_case(QRError::InvalidFormatInfo, ErrorKind::Format)]
    #[test_case(QRError::InvalidMode(6), ErrorKind::Format)]
    #[test_case(QRError::InvalidText("UTF-8"), ErrorKind::Format)]
    #[test_case(QRError::TooManyErrors, ErrorKind::Checksum)]
    fn test_kind(err: QRError, kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_mirror_recoverable() {
        assert!(QRError::TooManyErrors.is_recoverable_by_mirroring());
        assert!(QRError::InvalidVersionInfo.is_recoverable_by_mirroring());
        assert!(!QRError::FinderNotFound.is_recoverable_by_mirroring());
    }

    #[test]
    fn test_display() {
        assert_eq!(QRError::InvalidMode(0xe).to_string(), "Invalid mode indicator 0xe");
        assert_eq!(
            QRError::CountOverflow { count: 300, bits: 8 }.to_string(),
            "Count 300 doesn't fit in 8 bits"
        );
    }
}
