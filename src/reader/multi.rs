use tracing::debug;

use super::finder::{
    initial_row_skip, shift_counts_by_two, FinderPatternFinder, FinderPatternInfo, Pattern,
};
use super::utils::{is_finder_ratio, ResultPoint};
use crate::common::{BitMatrix, QRError, QRResult};

// Multi finder pattern finder
//------------------------------------------------------------------------------

const MAX_MODULE_COUNT_PER_EDGE: f32 = 180.0;
const MIN_MODULE_COUNT_PER_EDGE: f32 = 9.0;

// Module sizes in a triple may differ by at most 0.5 pixels or 5%
const DIFF_MODSIZE_CUTOFF: f32 = 0.5;
const DIFF_MODSIZE_CUTOFF_PERCENT: f32 = 0.05;

// Edges may differ by up to 10% in length and from a right angle
const EDGE_RATIO_CUTOFF: f32 = 0.1;

/// Collects every finder candidate in the image, then returns each triple that could be
/// the corners of one symbol.
pub struct MultiFinderPatternFinder<'a> {
    inner: FinderPatternFinder<'a>,
}

impl<'a> MultiFinderPatternFinder<'a> {
    pub fn new(image: &'a BitMatrix, callback: Option<&'a dyn Fn(ResultPoint)>) -> Self {
        Self { inner: FinderPatternFinder::new(image, callback) }
    }

    pub fn find_multi(&mut self, try_harder: bool) -> QRResult<Vec<FinderPatternInfo>> {
        let image = self.inner.image();
        let max_i = image.height() as i32;
        let max_j = image.width() as i32;
        let i_skip = initial_row_skip(max_i, try_harder);

        // Unlike the single finder this never stops early or skips ahead
        for i in (i_skip - 1..max_i).step_by(i_skip as usize) {
            let mut counts = [0u32; 5];
            let mut state = 0;
            for j in 0..max_j {
                if image.get(j as usize, i as usize) {
                    if state & 1 == 1 {
                        state += 1;
                    }
                    counts[state] += 1;
                } else if state & 1 == 1 {
                    counts[state] += 1;
                } else if state < 4 {
                    state += 1;
                    counts[state] += 1;
                } else if is_finder_ratio(&counts, false)
                    && self.inner.handle_possible_center(&counts, i, j)
                {
                    state = 0;
                    counts = [0; 5];
                } else {
                    shift_counts_by_two(&mut counts);
                    state = 3;
                }
            }

            if is_finder_ratio(&counts, false) {
                self.inner.handle_possible_center(&counts, i, max_j);
            }
        }

        let infos = self.select_multiple_best_patterns()?;
        debug!("Found {} candidate symbols", infos.len());
        Ok(infos)
    }

    /// Every triple of similar module size that forms a plausible symbol: 9 to 180 modules
    /// per edge, edges of near equal length and a near right angle at the top left.
    fn select_multiple_best_patterns(&self) -> QRResult<Vec<FinderPatternInfo>> {
        let mut centers = self.inner.possible_centers().to_vec();
        let n = centers.len();
        if n < 3 {
            return Err(QRError::FinderNotFound);
        }
        if n == 3 {
            return Ok(vec![FinderPatternInfo::new([centers[0], centers[1], centers[2]])]);
        }

        // Largest modules first so each inner loop can stop at the first size mismatch
        centers.sort_by(|a, b| b.module_size.total_cmp(&a.module_size));

        let mut results = Vec::new();
        for i1 in 0..n - 2 {
            let p1 = centers[i1];
            for i2 in i1 + 1..n - 1 {
                let p2 = centers[i2];
                if !similar_module_size(&p1, &p2) {
                    break;
                }

                for &p3 in &centers[i2 + 1..] {
                    if !similar_module_size(&p2, &p3) {
                        break;
                    }

                    let info = FinderPatternInfo::new([p1, p2, p3]);
                    if is_plausible_symbol(&info, p1.module_size) {
                        results.push(info);
                    }
                }
            }
        }

        if results.is_empty() {
            Err(QRError::FinderNotFound)
        } else {
            Ok(results)
        }
    }
}

fn similar_module_size(a: &Pattern, b: &Pattern) -> bool {
    let abs = (a.module_size - b.module_size).abs();
    let rel = (a.module_size - b.module_size) / a.module_size.min(b.module_size);
    abs <= DIFF_MODSIZE_CUTOFF || rel < DIFF_MODSIZE_CUTOFF_PERCENT
}

fn is_plausible_symbol(info: &FinderPatternInfo, module_size: f32) -> bool {
    let d_a = info.top_left.distance(info.bottom_left.center);
    let d_b = info.top_left.distance(info.top_right.center);
    let d_c = info.top_right.distance(info.bottom_left.center);

    let module_count = (d_a + d_b) / (module_size * 2.0);
    if !(MIN_MODULE_COUNT_PER_EDGE..=MAX_MODULE_COUNT_PER_EDGE).contains(&module_count) {
        return false;
    }

    // Edge lengths
    if ((d_a - d_b) / d_a.min(d_b)).abs() >= EDGE_RATIO_CUTOFF {
        return false;
    }

    // Diagonal against the one a right angle at the top left would give
    let d_c_expected = (d_a * d_a + d_b * d_b).sqrt();
    ((d_c - d_c_expected) / d_c.min(d_c_expected)).abs() < EDGE_RATIO_CUTOFF
}

#[cfg(test)]
mod multi_tests {
    use super::{is_plausible_symbol, similar_module_size, MultiFinderPatternFinder};
    use crate::builder::QRBuilder;
    use crate::common::{BitMatrix, ECLevel, QRError};
    use crate::reader::finder::{FinderPatternInfo, Pattern, PatternKind};

    fn finder(x: f32, y: f32, module_size: f32) -> Pattern {
        Pattern::new(PatternKind::Finder, x, y, module_size)
    }

    #[test]
    fn test_similar_module_size() {
        // Larger module size first, as in the sorted candidate list
        assert!(similar_module_size(&finder(0.0, 0.0, 4.4), &finder(0.0, 0.0, 4.0)));
        assert!(similar_module_size(&finder(0.0, 0.0, 20.9), &finder(0.0, 0.0, 20.0)));
        assert!(!similar_module_size(&finder(0.0, 0.0, 5.0), &finder(0.0, 0.0, 4.0)));
    }

    #[test]
    fn test_plausible_symbol() {
        let info = FinderPatternInfo::new([
            finder(10.0, 10.0, 4.0),
            finder(90.0, 10.0, 4.0),
            finder(10.0, 90.0, 4.0),
        ]);
        assert!(is_plausible_symbol(&info, 4.0));
        // Too few modules between centres
        assert!(!is_plausible_symbol(&info, 20.0));

        let skewed = FinderPatternInfo::new([
            finder(10.0, 10.0, 4.0),
            finder(90.0, 10.0, 4.0),
            finder(60.0, 90.0, 4.0),
        ]);
        assert!(!is_plausible_symbol(&skewed, 4.0));
    }

    #[test]
    fn test_find_two_symbols() {
        let first = QRBuilder::new("LEFT").ec_level(ECLevel::L).build().unwrap();
        let second = QRBuilder::new("RIGHT").ec_level(ECLevel::L).build().unwrap();
        let (a, b) = (first.render(116, 116, 4), second.render(116, 116, 4));

        // Far enough apart that no cross-symbol triple looks square
        let mut image = BitMatrix::new(332, 116);
        for y in 0..116 {
            for x in 0..116 {
                image.put(x, y, a.get(x, y));
                image.put(x + 216, y, b.get(x, y));
            }
        }

        let infos = MultiFinderPatternFinder::new(&image, None).find_multi(true).unwrap();
        let near = |x: f32, y: f32| {
            infos.iter().any(|i| (i.top_left.x - x).abs() < 1.0 && (i.top_left.y - y).abs() < 1.0)
        };
        assert!(near(30.0, 30.0) && near(246.0, 30.0), "{infos:?}");
    }

    #[test]
    fn test_blank_image() {
        let image = BitMatrix::square(80);
        let res = MultiFinderPatternFinder::new(&image, None).find_multi(false);
        assert_eq!(res, Err(QRError::FinderNotFound));
    }
}
