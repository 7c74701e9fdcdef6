mod qr;

pub(crate) use qr::{Module, QR};

use std::fmt::{Display, Error, Formatter};
use std::ops::Deref;

use image::GrayImage;
use tracing::debug;

use crate::common::{
    bit_matrix::BitMatrix,
    bit_utils::BitStream,
    codec::{self, CharacterSet, EncodeOptions, Mode, StructuredAppend},
    ec::ecc,
    error::{QRError, QRResult},
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

/// Quiet zone width in modules used when none is configured.
pub const QUIET_ZONE: u32 = 4;

// QR code
//------------------------------------------------------------------------------

/// Finished symbol: the module matrix with the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QRCode {
    pub mode: Mode,
    pub ec_level: ECLevel,
    pub version: Version,
    pub mask: MaskPattern,
    pub matrix: BitMatrix,
}

impl QRCode {
    pub fn width(&self) -> usize {
        self.matrix.width()
    }

    /// Scales the symbol by the largest whole multiple that fits `width` x `height` once a
    /// quiet zone of `margin` modules is added, centered on the canvas. The canvas never shrinks
    /// below the symbol and its quiet zone.
    pub fn render(&self, width: u32, height: u32, margin: u32) -> BitMatrix {
        let input_w = self.matrix.width() as u32;
        let input_h = self.matrix.height() as u32;
        let qr_w = input_w + 2 * margin;
        let qr_h = input_h + 2 * margin;
        let output_w = width.max(qr_w);
        let output_h = height.max(qr_h);

        let multiple = (output_w / qr_w).min(output_h / qr_h);
        let left = (output_w - input_w * multiple) / 2;
        let top = (output_h - input_h * multiple) / 2;

        let mut output = BitMatrix::new(output_w as usize, output_h as usize);
        let m = multiple as usize;
        for y in 0..input_h as usize {
            for x in 0..input_w as usize {
                if self.matrix.get(x, y) {
                    output.set_region(left as usize + x * m, top as usize + y * m, m, m);
                }
            }
        }
        output
    }

    /// Grayscale rendering with `module_size` pixels per module and the default quiet zone.
    pub fn to_image(&self, module_size: u32) -> GrayImage {
        let side = (self.matrix.width() as u32 + 2 * QUIET_ZONE) * module_size;
        self.render(side, side, QUIET_ZONE).to_image()
    }
}

impl Display for QRCode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        writeln!(f, "mode: {:?}", self.mode)?;
        writeln!(f, "ecLevel: {}", self.ec_level)?;
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "maskPattern: {}", *self.mask)?;
        write!(f, "matrix:\n{}", self.matrix)
    }
}


// QR builder
//------------------------------------------------------------------------------

pub struct QRBuilder<'a> {
    data: &'a str,
    version: Option<u32>,
    ec_level: ECLevel,
    mask: Option<u8>,
    margin: u32,
    character_set: Option<CharacterSet>,
    gs1: bool,
    structured_append: Option<StructuredAppend>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            data,
            version: None,
            ec_level: ECLevel::L,
            mask: None,
            margin: QUIET_ZONE,
            character_set: None,
            gs1: false,
            structured_append: None,
        }
    }

    pub fn data(&mut self, data: &'a str) -> &mut Self {
        self.data = data;
        self
    }

    /// Pins the version; numbers outside 1..=40 are rejected by [`QRBuilder::build`].
    pub fn version(&mut self, version: u32) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    /// Pins the mask pattern instead of searching for the best one.
    pub fn mask(&mut self, mask: u8) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn margin(&mut self, margin: u32) -> &mut Self {
        self.margin = margin;
        self
    }

    pub fn character_set(&mut self, character_set: CharacterSet) -> &mut Self {
        self.character_set = Some(character_set);
        self
    }

    pub fn gs1(&mut self, gs1: bool) -> &mut Self {
        self.gs1 = gs1;
        self
    }

    pub fn structured_append(&mut self, sa: StructuredAppend) -> &mut Self {
        self.structured_append = Some(sa);
        self
    }

    pub fn metadata(&self) -> String {
        let version = match self.version {
            Some(v) => v.to_string(),
            None => "None".to_string(),
        };
        let charset = match self.character_set {
            Some(cs) => cs.name(),
            None => "None",
        };
        format!(
            "{{ Version: {version}, Ec level: {}, Charset: {charset}, Gs1: {} }}",
            self.ec_level, self.gs1
        )
    }
}

#[cfg(test)]
mod qrbuilder_util_tests {
    use super::QRBuilder;
    use crate::common::{CharacterSet, ECLevel};

    #[test]
    fn test_metadata() {
        let mut qr_builder = QRBuilder::new("Hello, world!");
        qr_builder.version(1).ec_level(ECLevel::Q).character_set(CharacterSet::Utf8);
        assert_eq!(
            qr_builder.metadata(),
            "{ Version: 1, Ec level: Q, Charset: UTF-8, Gs1: false }"
        );
        qr_builder.unset_version();
        assert_eq!(
            qr_builder.metadata(),
            "{ Version: None, Ec level: Q, Charset: UTF-8, Gs1: false }"
        );
    }
}

impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QRCode> {
        debug!("Generating QR {}", self.metadata());

        let version = self.version.map(Version::from_number).transpose()?;
        let mask = self.mask.map(MaskPattern::try_new).transpose()?;

        let opts = EncodeOptions {
            version,
            charset: self.character_set,
            gs1: self.gs1,
            structured_append: self.structured_append,
        };
        let encoded = codec::encode(self.data, self.ec_level, &opts)?;
        let version = encoded.version;

        let payload = Self::construct_payload(encoded.data.data(), version, self.ec_level);

        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(payload);

        let mask = match mask {
            Some(m) => {
                qr.apply_mask(m);
                m
            }
            None => apply_best_mask(&mut qr),
        };

        debug!(
            mode = ?encoded.mode,
            %version,
            mask = *mask,
            dark_modules = qr.count_dark_modules(),
            "QR generated"
        );

        Ok(QRCode {
            mode: encoded.mode,
            ec_level: self.ec_level,
            version,
            mask,
            matrix: qr.to_bit_matrix(),
        })
    }

    /// Builds the symbol and scales it onto a `width` x `height` canvas with the configured
    /// margin.
    pub fn render(&self, width: u32, height: u32) -> QRResult<BitMatrix> {
        Ok(self.build()?.render(width, height, self.margin))
    }

    // Data codewords split into blocks, each followed by its EC codewords, both interleaved
    fn construct_payload(data: &[u8], version: Version, ec_level: ECLevel) -> BitStream {
        let (data_blocks, ecc_blocks) = Self::compute_ecc(data, version, ec_level);

        let mut payload = BitStream::with_capacity(version.total_codewords() << 3);
        payload.extend(&Self::interleave(&data_blocks));
        payload.extend(&Self::interleave(&ecc_blocks));
        payload
    }

    // ECC: Error Correction Codeword generator
    fn compute_ecc(
        data: &[u8],
        version: Version,
        ec_level: ECLevel,
    ) -> (Vec<&[u8]>, Vec<Vec<u8>>) {
        let data_blocks = Self::blockify(data, version, ec_level);

        let ecc_size_per_block = version.ecc_per_block(ec_level);
        let ecc_blocks = data_blocks.iter().map(|b| ecc(b, ecc_size_per_block)).collect::<Vec<_>>();

        (data_blocks, ecc_blocks)
    }

    pub(crate) fn blockify(data: &[u8], version: Version, ec_level: ECLevel) -> Vec<&[u8]> {
        let (block1_size, block1_count, block2_size, block2_count) =
            version.data_codewords_per_block(ec_level);

        let total_blocks = block1_count + block2_count;
        let total_block1_size = block1_size * block1_count;
        let total_size = total_block1_size + block2_size * block2_count;

        debug_assert!(
            total_size == data.len(),
            "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
            data.len(),
            total_size
        );

        let mut data_blocks = Vec::with_capacity(total_blocks);
        data_blocks.extend(data[..total_block1_size].chunks(block1_size));
        if block2_size > 0 {
            data_blocks.extend(data[total_block1_size..].chunks(block2_size));
        }
        data_blocks
    }

    pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
        let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
        let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
        let mut res = Vec::with_capacity(total_size);
        for i in 0..max_block_size {
            for b in blocks {
                if i < b.len() {
                    res.push(b[i]);
                }
            }
        }
        res
    }
}

/// Encodes `text` with every setting at its default and renders it onto a `width` x `height`
/// canvas.
pub fn encode(text: &str, width: u32, height: u32) -> QRResult<BitMatrix> {
    QRBuilder::new(text).render(width, height)
}
