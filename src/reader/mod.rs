mod alignment;
mod binarize;
mod decoder;
mod detector;
mod finder;
mod luminance;
mod multi;
mod parser;
mod result;
mod sampler;
mod utils;

pub use binarize::{
    Binarizer, BinarizerKind, GlobalHistogramBinarizer, HybridBinarizer, HYBRID_MIN_DIMENSION,
};
pub use decoder::decode_bit_matrix;
pub use detector::{Detector, DetectorResult};
pub use luminance::Luminance;
pub use result::{MetadataValue, ReadResult, ResultMetadataType};
pub use sampler::{DefaultGridSampler, GridSampler};
pub use utils::{PerspectiveTransform, ResultPoint};

use tracing::{debug, trace};

use crate::common::{BitMatrix, CharacterSet, QRError, QRResult};

static DEFAULT_SAMPLER: DefaultGridSampler = DefaultGridSampler;

// Decode hints
//------------------------------------------------------------------------------

/// Per call decode settings.
#[derive(Clone, Copy, Default)]
pub struct DecodeHints<'a> {
    /// Scan every row and accept weaker finder candidates.
    pub try_harder: bool,
    /// The image is exactly one unrotated symbol with a quiet zone, so detection is skipped.
    pub pure_barcode: bool,
    /// Character set for byte segments that don't declare one.
    pub character_set: Option<CharacterSet>,
    /// Called with every finder and alignment candidate as it is found.
    pub point_callback: Option<&'a dyn Fn(ResultPoint)>,
}

impl<'a> DecodeHints<'a> {
    pub fn try_harder(&mut self, try_harder: bool) -> &mut Self {
        self.try_harder = try_harder;
        self
    }

    pub fn pure_barcode(&mut self, pure_barcode: bool) -> &mut Self {
        self.pure_barcode = pure_barcode;
        self
    }

    pub fn character_set(&mut self, character_set: CharacterSet) -> &mut Self {
        self.character_set = Some(character_set);
        self
    }

    pub fn point_callback(&mut self, callback: &'a dyn Fn(ResultPoint)) -> &mut Self {
        self.point_callback = Some(callback);
        self
    }
}

// QR reader
//------------------------------------------------------------------------------

/// Reads symbols out of luminance buffers. Cheap to build and copy; nothing is cached
/// between reads.
#[derive(Clone, Copy)]
pub struct QRReader<'a> {
    hints: DecodeHints<'a>,
    binarizer: BinarizerKind,
    hybrid_min_dimension: usize,
    sampler: &'a dyn GridSampler,
}

impl Default for QRReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> QRReader<'a> {
    pub fn new() -> Self {
        Self {
            hints: DecodeHints::default(),
            binarizer: BinarizerKind::default(),
            hybrid_min_dimension: HYBRID_MIN_DIMENSION,
            sampler: &DEFAULT_SAMPLER,
        }
    }

    pub fn hints(&mut self, hints: DecodeHints<'a>) -> &mut Self {
        self.hints = hints;
        self
    }

    pub fn try_harder(&mut self, try_harder: bool) -> &mut Self {
        self.hints.try_harder(try_harder);
        self
    }

    pub fn pure_barcode(&mut self, pure_barcode: bool) -> &mut Self {
        self.hints.pure_barcode(pure_barcode);
        self
    }

    pub fn character_set(&mut self, character_set: CharacterSet) -> &mut Self {
        self.hints.character_set(character_set);
        self
    }

    pub fn point_callback(&mut self, callback: &'a dyn Fn(ResultPoint)) -> &mut Self {
        self.hints.point_callback(callback);
        self
    }

    pub fn binarizer(&mut self, binarizer: BinarizerKind) -> &mut Self {
        self.binarizer = binarizer;
        self
    }

    /// Images narrower or shorter than this are thresholded globally even with the hybrid
    /// binarizer. Values below [`HYBRID_MIN_DIMENSION`] are raised to it.
    pub fn hybrid_min_dimension(&mut self, min_dimension: usize) -> &mut Self {
        self.hybrid_min_dimension = min_dimension;
        self
    }

    pub fn sampler(&mut self, sampler: &'a dyn GridSampler) -> &mut Self {
        self.sampler = sampler;
        self
    }

    fn binarize(&self, source: Luminance) -> QRResult<Box<dyn Binarizer>> {
        if source.width() == 0 || source.height() == 0 {
            return Err(QRError::SymbolNotFound);
        }
        debug!(
            binarizer = ?self.binarizer,
            width = source.width(),
            height = source.height(),
            "Binarizing image"
        );
        Ok(self.binarizer.create(source, self.hybrid_min_dimension))
    }

    /// Locates and decodes a single symbol.
    pub fn read(&self, source: impl Into<Luminance>) -> QRResult<ReadResult> {
        let binarizer = self.binarize(source.into())?;
        let image = binarizer.black_matrix()?;
        let DecodeHints { try_harder, pure_barcode, character_set, point_callback } = self.hints;

        let (decoded, points) = if pure_barcode {
            let bits = extract_pure_bits(image)?;
            (decode_bit_matrix(&bits, character_set)?, Vec::new())
        } else {
            let detected =
                Detector::new(image, self.sampler, point_callback).detect(try_harder)?;
            (decode_bit_matrix(&detected.bits, character_set)?, detected.points)
        };

        let res = ReadResult::new(decoded, points);
        debug!(text_len = res.text().len(), mirrored = res.is_mirrored(), "Symbol decoded");
        Ok(res)
    }

    /// Decodes every symbol found in the image. Symbols that fail to decode are skipped, and
    /// the parts of a structured append message are merged into one result at the end.
    pub fn read_multi(&self, source: impl Into<Luminance>) -> QRResult<Vec<ReadResult>> {
        let binarizer = self.binarize(source.into())?;
        let image = binarizer.black_matrix()?;
        let DecodeHints { try_harder, character_set, point_callback, .. } = self.hints;

        let detector = Detector::new(image, self.sampler, point_callback);
        let mut results = Vec::new();
        for detected in detector.detect_multi(try_harder)? {
            match decode_bit_matrix(&detected.bits, character_set) {
                Ok(decoded) => results.push(ReadResult::new(decoded, detected.points)),
                Err(e) => trace!("Skipping undecodable symbol: {e}"),
            }
        }
        debug!("Decoded {} symbols", results.len());
        Ok(merge_structured_append(results))
    }
}

/// Decodes a single symbol with the default binarizer and sampler.
pub fn decode(source: impl Into<Luminance>, hints: &DecodeHints) -> QRResult<ReadResult> {
    QRReader::new().hints(*hints).read(source)
}

/// Decodes every symbol in the image with the default binarizer and sampler.
pub fn decode_multi(
    source: impl Into<Luminance>,
    hints: &DecodeHints,
) -> QRResult<Vec<ReadResult>> {
    QRReader::new().hints(*hints).read_multi(source)
}

// Structured append
//------------------------------------------------------------------------------

/// Keeps standalone results in order and appends a single merged result for all the parts
/// carrying structured append metadata.
fn merge_structured_append(results: Vec<ReadResult>) -> Vec<ReadResult> {
    let (parts, mut standalone): (Vec<_>, Vec<_>) =
        results.into_iter().partition(|r| r.structured_append().is_some());

    if let Some(merged) = ReadResult::merge_structured_append(parts) {
        debug!("Merged structured append parts");
        standalone.push(merged);
    }
    standalone
}

// Pure barcode extraction
//------------------------------------------------------------------------------

/// Samples a symbol that fills the image squarely, taking its bounds from the outermost dark
/// pixels and its module size from the top left finder.
fn extract_pure_bits(image: &BitMatrix) -> QRResult<BitMatrix> {
    let (left_top, right_bottom) = match (image.top_left_on_bit(), image.bottom_right_on_bit()) {
        (Some(lt), Some(rb)) => (lt, rb),
        _ => return Err(QRError::SymbolNotFound),
    };

    let module_size = pure_module_size(left_top, image)?;

    let (mut left, mut top) = (left_top.0 as i32, left_top.1 as i32);
    let (mut right, bottom) = (right_bottom.0 as i32, right_bottom.1 as i32);
    if left >= right || top >= bottom {
        return Err(QRError::SymbolNotFound);
    }

    // The last dark pixel may sit left of the symbol's right edge, so assume a square
    if bottom - top != right - left {
        right = left + (bottom - top);
        if right >= image.width() as i32 {
            return Err(QRError::SymbolNotFound);
        }
    }

    let matrix_width = ((right - left + 1) as f32 / module_size).round() as i32;
    let matrix_height = ((bottom - top + 1) as f32 / module_size).round() as i32;
    if matrix_width <= 0 || matrix_height <= 0 || matrix_width != matrix_height {
        return Err(QRError::SymbolNotFound);
    }

    // Sample module centres, pulling back if rounding pushed the last column or row past
    // the symbol
    let nudge = (module_size / 2.0) as i32;
    top += nudge;
    left += nudge;

    let too_far_right = left + ((matrix_width - 1) as f32 * module_size) as i32 - right;
    if too_far_right > 0 {
        if too_far_right > nudge {
            return Err(QRError::SymbolNotFound);
        }
        left -= too_far_right;
    }
    let too_far_down = top + ((matrix_height - 1) as f32 * module_size) as i32 - bottom;
    if too_far_down > 0 {
        if too_far_down > nudge {
            return Err(QRError::SymbolNotFound);
        }
        top -= too_far_down;
    }

    let dim = matrix_width as usize;
    let mut bits = BitMatrix::square(dim);
    for y in 0..dim {
        let image_y = top + (y as f32 * module_size) as i32;
        for x in 0..dim {
            if image.get_checked(left + (x as f32 * module_size) as i32, image_y) {
                bits.set(x, y);
            }
        }
    }
    trace!(dim, module_size, "Extracted pure symbol");
    Ok(bits)
}

/// Walks the diagonal from the top left dark pixel across the finder. The fifth colour
/// change lands 7 modules in.
fn pure_module_size((left, top): (usize, usize), image: &BitMatrix) -> QRResult<f32> {
    let (w, h) = (image.width(), image.height());
    let (mut x, mut y) = (left, top);
    let mut in_black = true;
    let mut transitions = 0;
    while x < w && y < h {
        if in_black != image.get(x, y) {
            transitions += 1;
            if transitions == 5 {
                break;
            }
            in_black = !in_black;
        }
        x += 1;
        y += 1;
    }
    if x == w || y == h {
        return Err(QRError::SymbolNotFound);
    }
    Ok((x - left) as f32 / 7.0)
}
