use std::sync::OnceLock;

use tracing::debug;

use super::luminance::Luminance;
use crate::common::{BitMatrix, QRError, QRResult};

// Binarizer
//------------------------------------------------------------------------------

/// Turns a luminance buffer into a dark/light matrix. Implementations compute the matrix
/// once and hand out the cached result afterwards.
pub trait Binarizer {
    fn luminance(&self) -> &Luminance;

    fn black_matrix(&self) -> QRResult<&BitMatrix>;

    fn width(&self) -> usize {
        self.luminance().width()
    }

    fn height(&self) -> usize {
        self.luminance().height()
    }
}

/// Thresholding strategy used by the reader.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Default)]
pub enum BinarizerKind {
    /// Local thresholds over 8x8 blocks; the default, robust to shadows and gradients.
    #[default]
    Hybrid,
    /// A single threshold taken from the luminance histogram; faster on evenly lit input.
    GlobalHistogram,
}

impl BinarizerKind {
    pub fn create(self, source: Luminance, min_dimension: usize) -> Box<dyn Binarizer> {
        match self {
            Self::Hybrid => Box::new(HybridBinarizer::with_min_dimension(source, min_dimension)),
            Self::GlobalHistogram => Box::new(GlobalHistogramBinarizer::new(source)),
        }
    }
}

// Global histogram binarizer
//------------------------------------------------------------------------------

const LUMINANCE_BITS: usize = 5;
const LUMINANCE_SHIFT: usize = 8 - LUMINANCE_BITS;
const LUMINANCE_BUCKETS: usize = 1 << LUMINANCE_BITS;

pub struct GlobalHistogramBinarizer {
    source: Luminance,
    matrix: OnceLock<QRResult<BitMatrix>>,
}

impl GlobalHistogramBinarizer {
    pub fn new(source: Luminance) -> Self {
        Self { source, matrix: OnceLock::new() }
    }
}

impl Binarizer for GlobalHistogramBinarizer {
    fn luminance(&self) -> &Luminance {
        &self.source
    }

    fn black_matrix(&self) -> QRResult<&BitMatrix> {
        self.matrix
            .get_or_init(|| global_histogram_matrix(&self.source))
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn global_histogram_matrix(source: &Luminance) -> QRResult<BitMatrix> {
    let (w, h) = (source.width(), source.height());

    // Sample four rows across the middle three fifths of the image
    let mut buckets = [0u32; LUMINANCE_BUCKETS];
    for y in 1..5 {
        let row = source.row(h * y / 5);
        for &l in &row[w / 5..w * 4 / 5] {
            buckets[l as usize >> LUMINANCE_SHIFT] += 1;
        }
    }
    let black_point = estimate_black_point(&buckets)?;
    debug!("Global histogram black point {black_point}");

    let mut matrix = BitMatrix::new(w, h);
    for y in 0..h {
        for (x, &l) in source.row(y).iter().enumerate() {
            if (l as u32) < black_point {
                matrix.set(x, y);
            }
        }
    }
    Ok(matrix)
}

/// Picks the deepest valley between the two dominant histogram peaks. Fails when the peaks
/// are too close to tell dark from light.
fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> QRResult<u32> {
    let mut max_count = 0;
    let mut first_peak = 0;
    let mut first_peak_size = 0;
    for (x, &count) in buckets.iter().enumerate() {
        if count > first_peak_size {
            first_peak = x;
            first_peak_size = count;
        }
        max_count = max_count.max(count);
    }

    // Second peak favours buckets far from the first
    let mut second_peak = 0;
    let mut second_peak_score = 0;
    for (x, &count) in buckets.iter().enumerate() {
        let dist = x.abs_diff(first_peak) as u64;
        let score = count as u64 * dist * dist;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    if first_peak > second_peak {
        std::mem::swap(&mut first_peak, &mut second_peak);
    }

    if second_peak - first_peak <= LUMINANCE_BUCKETS / 16 {
        return Err(QRError::LowContrast);
    }

    let mut best_valley = second_peak - 1;
    let mut best_valley_score = -1i64;
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_count - buckets[x]) as i64;
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }

    Ok((best_valley << LUMINANCE_SHIFT) as u32)
}


// Hybrid binarizer
//------------------------------------------------------------------------------

const BLOCK_SIZE_POWER: usize = 3;
const BLOCK_SIZE: usize = 1 << BLOCK_SIZE_POWER;
const BLOCK_SIZE_MASK: usize = BLOCK_SIZE - 1;
const MIN_DYNAMIC_RANGE: u32 = 24;

/// Default smallest width and height the hybrid binarizer applies local thresholds to.
/// Anything smaller is handed to the global histogram.
pub const HYBRID_MIN_DIMENSION: usize = BLOCK_SIZE * 5;

/// Local thresholding: each 8x8 block is thresholded at the mean black point of the 5x5
/// block neighbourhood around it.
pub struct HybridBinarizer {
    source: Luminance,
    min_dimension: usize,
    matrix: OnceLock<QRResult<BitMatrix>>,
}

impl HybridBinarizer {
    pub fn new(source: Luminance) -> Self {
        Self::with_min_dimension(source, HYBRID_MIN_DIMENSION)
    }

    pub fn with_min_dimension(source: Luminance, min_dimension: usize) -> Self {
        // Needs at least 5 blocks per side for the threshold neighbourhood
        let min_dimension = min_dimension.max(HYBRID_MIN_DIMENSION);
        Self { source, min_dimension, matrix: OnceLock::new() }
    }

    fn compute(&self) -> QRResult<BitMatrix> {
        let (w, h) = (self.source.width(), self.source.height());
        if w < self.min_dimension || h < self.min_dimension {
            debug!("Image {w}x{h} too small for local thresholds, using global histogram");
            return global_histogram_matrix(&self.source);
        }

        let sub_w = (w >> BLOCK_SIZE_POWER) + usize::from(w & BLOCK_SIZE_MASK != 0);
        let sub_h = (h >> BLOCK_SIZE_POWER) + usize::from(h & BLOCK_SIZE_MASK != 0);
        let black_points = block_black_points(&self.source, sub_w, sub_h);

        let mut matrix = BitMatrix::new(w, h);
        threshold_blocks(&self.source, sub_w, sub_h, &black_points, &mut matrix);
        Ok(matrix)
    }
}

impl Binarizer for HybridBinarizer {
    fn luminance(&self) -> &Luminance {
        &self.source
    }

    fn black_matrix(&self) -> QRResult<&BitMatrix> {
        self.matrix.get_or_init(|| self.compute()).as_ref().map_err(Clone::clone)
    }
}

/// Mean luminance of every block, or an estimate of the dark level for blocks without
/// enough contrast. The last block in each direction overlaps its neighbour rather than
/// running past the image.
fn block_black_points(source: &Luminance, sub_w: usize, sub_h: usize) -> Vec<Vec<u32>> {
    let (w, h) = (source.width(), source.height());
    let max_y_offset = h - BLOCK_SIZE;
    let max_x_offset = w - BLOCK_SIZE;
    let mut black_points = vec![vec![0u32; sub_w]; sub_h];

    for y in 0..sub_h {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        for x in 0..sub_w {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);

            let (mut sum, mut min, mut max) = (0u32, u32::MAX, 0u32);
            for yy in 0..BLOCK_SIZE {
                let row = &source.row(y_offset + yy)[x_offset..x_offset + BLOCK_SIZE];
                for &l in row {
                    let l = l as u32;
                    sum += l;
                    min = min.min(l);
                    max = max.max(l);
                }
            }

            let mut average = sum >> (BLOCK_SIZE_POWER * 2);
            if max - min <= MIN_DYNAMIC_RANGE {
                // Flat blocks are taken as background. Half the minimum keeps them light
                // unless the neighbouring black points are higher
                average = min / 2;
                if y > 0 && x > 0 {
                    let neighbour = (black_points[y - 1][x]
                        + 2 * black_points[y][x - 1]
                        + black_points[y - 1][x - 1])
                        / 4;
                    if min < neighbour {
                        average = neighbour;
                    }
                }
            }
            black_points[y][x] = average;
        }
    }
    black_points
}

fn threshold_blocks(
    source: &Luminance,
    sub_w: usize,
    sub_h: usize,
    black_points: &[Vec<u32>],
    matrix: &mut BitMatrix,
) {
    let (w, h) = (source.width(), source.height());
    let max_y_offset = h - BLOCK_SIZE;
    let max_x_offset = w - BLOCK_SIZE;

    for y in 0..sub_h {
        let y_offset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        let top = cap(y, sub_h - 3);
        for x in 0..sub_w {
            let x_offset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let left = cap(x, sub_w - 3);

            let sum: u32 = black_points[top - 2..=top + 2]
                .iter()
                .map(|row| row[left - 2..=left + 2].iter().sum::<u32>())
                .sum();
            let threshold = sum / 25;

            for yy in 0..BLOCK_SIZE {
                let row = &source.row(y_offset + yy)[x_offset..x_offset + BLOCK_SIZE];
                for (xx, &l) in row.iter().enumerate() {
                    if l as u32 <= threshold {
                        matrix.set(x_offset + xx, y_offset + yy);
                    }
                }
            }
        }
    }
}

fn cap(value: usize, max: usize) -> usize {
    if value < 2 {
        2
    } else {
        value.min(max)
    }
}
