//! # qrcodec
//!
//! A Rust library for writing and reading QR codes.
//!
//! ## Features
//!
//! - **Encoding**: numeric, alphanumeric, byte and kanji segments, ECI character sets,
//!   structured append and GS1, with automatic version and mask selection
//! - **Decoding**: hybrid or global binarization, finder and alignment pattern detection,
//!   perspective sampling and Reed-Solomon error correction
//! - **Mirrored symbols**: grids that fail to decode are retried as their mirror image
//! - **Multiple symbols**: every symbol in an image is read, and structured append parts are
//!   stitched back together
//!
//! ## Quick Start
//!
//! ### Generating a QR code
//!
//! ```rust
//! use qrcodec::{ECLevel, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new("Hello, World!")
//!     .ec_level(ECLevel::M) // Defaults to L
//!     .version(2)           // Smallest fitting version when left out
//!     .mask(3)              // Lowest penalty mask when left out
//!     .build()?;
//!
//! let img = qr.to_image(4); // 4 pixels per module
//! assert_eq!(img.width(), (25 + 8) * 4);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading it back
//!
//! ```rust
//! use qrcodec::{decode, DecodeHints, QRBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = QRBuilder::new("Hello, World!").build()?.to_image(4);
//!
//! let res = decode(&img, &DecodeHints::default())?;
//! assert_eq!(res.text(), "Hello, World!");
//! # Ok(())
//! # }
//! ```
//!
//! ### Tuning the reader
//!
//! ```rust
//! use qrcodec::{BinarizerKind, CharacterSet, QRBuilder, QRReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = QRBuilder::new("Καλημέρα").build()?.to_image(3);
//!
//! let res = QRReader::new()
//!     .try_harder(true)
//!     .binarizer(BinarizerKind::GlobalHistogram)
//!     .character_set(CharacterSet::Utf8)
//!     .read(&img)?;
//! assert_eq!(res.text(), "Καλημέρα");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% of codewords can be restored
//! - **M (Medium)**: ~15%
//! - **Q (Quartile)**: ~25%
//! - **H (High)**: ~30%

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub(crate) mod common;
pub mod reader;

pub use builder::{encode, QRBuilder, QRCode, QUIET_ZONE};
pub use common::{
    BitMatrix, CharacterSet, ECLevel, ErrorKind, MaskPattern, Mode, QRError, QRResult,
    StructuredAppend, Version,
};
pub use reader::{
    decode, decode_multi, Binarizer, BinarizerKind, DecodeHints, DefaultGridSampler,
    GridSampler, Luminance, MetadataValue, PerspectiveTransform, QRReader, ReadResult,
    ResultMetadataType, ResultPoint,
};
