use std::ops::Deref;

use tracing::{debug, trace};

use super::utils::{is_finder_ratio, order_best_patterns, ResultPoint};
use crate::common::{BitMatrix, QRError, QRResult};

// Pattern
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PatternKind {
    Finder,
    Alignment,
}

/// Candidate centre of a finder or alignment pattern. `count` is how many scans agreed
/// on it.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Pattern {
    pub center: ResultPoint,
    pub module_size: f32,
    pub count: u32,
    pub kind: PatternKind,
}

impl Deref for Pattern {
    type Target = ResultPoint;
    fn deref(&self) -> &Self::Target {
        &self.center
    }
}

impl Pattern {
    pub fn new(kind: PatternKind, x: f32, y: f32, module_size: f32) -> Self {
        Self { center: ResultPoint::new(x, y), module_size, count: 1, kind }
    }

    /// Whether a new sighting at row `i`, column `j` is the same pattern.
    pub fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.y).abs() <= module_size && (j - self.x).abs() <= module_size {
            let diff = (module_size - self.module_size).abs();
            diff <= 1.0 || diff <= self.module_size
        } else {
            false
        }
    }

    /// Averages a new sighting into this one, weighted by the sightings so far.
    pub fn combine_estimate(&self, i: f32, j: f32, module_size: f32) -> Self {
        let count = self.count + 1;
        let weight = self.count as f32;
        let n = count as f32;
        Self {
            center: ResultPoint::new((weight * self.x + j) / n, (weight * self.y + i) / n),
            module_size: (weight * self.module_size + module_size) / n,
            count,
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod pattern_tests {
    use super::{Pattern, PatternKind};

    #[test]
    fn test_about_equals() {
        let p = Pattern::new(PatternKind::Finder, 10.0, 20.0, 3.0);
        assert!(p.about_equals(3.0, 21.0, 12.0));
        assert!(!p.about_equals(3.0, 24.0, 10.0));
        assert!(p.about_equals(5.5, 20.0, 10.0));
        assert!(!p.about_equals(7.0, 20.0, 10.0));
    }

    #[test]
    fn test_combine_estimate() {
        let p = Pattern::new(PatternKind::Finder, 10.0, 20.0, 3.0)
            .combine_estimate(22.0, 13.0, 4.0)
            .combine_estimate(18.0, 7.0, 2.0);
        assert_eq!(p.count, 3);
        assert_eq!((p.x, p.y), (10.0, 20.0));
        assert_eq!(p.module_size, 3.0);
    }
}

// Finder pattern info
//------------------------------------------------------------------------------

/// The three finder pattern centres of one symbol in reading orientation.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct FinderPatternInfo {
    pub bottom_left: Pattern,
    pub top_left: Pattern,
    pub top_right: Pattern,
}

impl FinderPatternInfo {
    /// Orders an unordered triple.
    pub fn new(patterns: [Pattern; 3]) -> Self {
        let [bottom_left, top_left, top_right] = order_best_patterns(patterns);
        Self { bottom_left, top_left, top_right }
    }
}

// Finder pattern finder
//------------------------------------------------------------------------------

/// Sightings needed before a centre counts as confirmed.
pub(super) const CENTER_QUORUM: u32 = 2;
/// Fewest rows skipped between scans.
pub(super) const MIN_SKIP: i32 = 3;
/// Largest symbol the row skip heuristic plans for, in modules.
pub(super) const MAX_MODULES: i32 = 97;

/// Scans rows of a binarized image for 1:1:3:1:1 runs, confirms each hit with vertical,
/// horizontal and diagonal cross checks, and merges repeated sightings.
pub struct FinderPatternFinder<'a> {
    image: &'a BitMatrix,
    possible_centers: Vec<Pattern>,
    has_skipped: bool,
    callback: Option<&'a dyn Fn(ResultPoint)>,
}

impl<'a> FinderPatternFinder<'a> {
    pub fn new(image: &'a BitMatrix, callback: Option<&'a dyn Fn(ResultPoint)>) -> Self {
        Self { image, possible_centers: Vec::new(), has_skipped: false, callback }
    }

    pub fn image(&self) -> &'a BitMatrix {
        self.image
    }

    pub fn possible_centers(&self) -> &[Pattern] {
        &self.possible_centers
    }

    pub fn find(&mut self, try_harder: bool) -> QRResult<FinderPatternInfo> {
        let max_i = self.image.height() as i32;
        let max_j = self.image.width() as i32;

        let mut i_skip = initial_row_skip(max_i, try_harder);
        let mut done = false;
        let mut i = i_skip - 1;
        while i < max_i && !done {
            let mut counts = [0u32; 5];
            let mut state = 0;
            let mut j = 0;
            while j < max_j {
                if self.get(j, i) {
                    // Dark pixel closes a light run
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
                    && self.handle_possible_center(&counts, i, j)
                {
                    // Every other row is enough once something has been confirmed
                    i_skip = 2;
                    if self.has_skipped {
                        done = self.have_multiply_confirmed_centers();
                    } else {
                        let row_skip = self.find_row_skip();
                        if row_skip > counts[2] as i32 {
                            // Jump towards the presumed third centre, backing off by the
                            // last centre run and the skip about to be added
                            i += row_skip - counts[2] as i32 - i_skip;
                            j = max_j - 1;
                        }
                    }
                    state = 0;
                    counts = [0; 5];
                } else {
                    shift_counts_by_two(&mut counts);
                    state = 3;
                }
                j += 1;
            }

            if is_finder_ratio(&counts, false) && self.handle_possible_center(&counts, i, max_j) {
                i_skip = counts[0] as i32;
                if self.has_skipped {
                    done = self.have_multiply_confirmed_centers();
                }
            }
            i += i_skip;
        }

        let best = self.select_best_patterns()?;
        let info = FinderPatternInfo::new(best);
        debug!(
            bottom_left = ?info.bottom_left.center,
            top_left = ?info.top_left.center,
            top_right = ?info.top_right.center,
            "Finder patterns located"
        );
        Ok(info)
    }

    fn get(&self, x: i32, y: i32) -> bool {
        self.image.get(x as usize, y as usize)
    }

    /// Confirms the run ending at column `j` of row `i`, merging it into a known centre or
    /// recording a new one. Returns false when a cross check rejects it.
    pub(super) fn handle_possible_center(&mut self, counts: &[u32; 5], i: i32, j: i32) -> bool {
        let total: u32 = counts.iter().sum();
        let center_j = center_from_end(counts, j);
        let Some(center_i) = self.cross_check_vertical(i, center_j as i32, counts[2], total)
        else {
            return false;
        };
        let Some(center_j) =
            self.cross_check_horizontal(center_j as i32, center_i as i32, counts[2], total)
        else {
            return false;
        };
        if !self.cross_check_diagonal(center_i as i32, center_j as i32) {
            return false;
        }

        let module_size = total as f32 / 7.0;
        let known = self
            .possible_centers
            .iter_mut()
            .find(|c| c.about_equals(module_size, center_i, center_j));
        match known {
            Some(c) => *c = c.combine_estimate(center_i, center_j, module_size),
            None => {
                let p = Pattern::new(PatternKind::Finder, center_j, center_i, module_size);
                trace!("New finder candidate at ({center_j:.1}, {center_i:.1})");
                self.possible_centers.push(p);
                if let Some(cb) = self.callback {
                    cb(p.center);
                }
            }
        }
        true
    }

    fn cross_check_vertical(
        &self,
        start_i: i32,
        center_j: i32,
        max_count: u32,
        original_total: u32,
    ) -> Option<f32> {
        let max_i = self.image.height() as i32;
        let get = |i: i32| self.get(center_j, i);
        let mut counts = [0u32; 5];

        // Up through the centre, the light ring and the outer dark ring
        let mut i = start_i;
        while i >= 0 && get(i) {
            counts[2] += 1;
            i -= 1;
        }
        if i < 0 {
            return None;
        }
        while i >= 0 && !get(i) && counts[1] <= max_count {
            counts[1] += 1;
            i -= 1;
        }
        if i < 0 || counts[1] > max_count {
            return None;
        }
        while i >= 0 && get(i) && counts[0] <= max_count {
            counts[0] += 1;
            i -= 1;
        }
        if counts[0] > max_count {
            return None;
        }

        // Then down
        let mut i = start_i + 1;
        while i < max_i && get(i) {
            counts[2] += 1;
            i += 1;
        }
        if i == max_i {
            return None;
        }
        while i < max_i && !get(i) && counts[3] < max_count {
            counts[3] += 1;
            i += 1;
        }
        if i == max_i || counts[3] >= max_count {
            return None;
        }
        while i < max_i && get(i) && counts[4] < max_count {
            counts[4] += 1;
            i += 1;
        }
        if counts[4] >= max_count {
            return None;
        }

        // Reject runs much longer or shorter than the horizontal one
        let total: u32 = counts.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        is_finder_ratio(&counts, false).then(|| center_from_end(&counts, i))
    }

    fn cross_check_horizontal(
        &self,
        start_j: i32,
        center_i: i32,
        max_count: u32,
        original_total: u32,
    ) -> Option<f32> {
        let max_j = self.image.width() as i32;
        let get = |j: i32| self.get(j, center_i);
        let mut counts = [0u32; 5];

        let mut j = start_j;
        while j >= 0 && get(j) {
            counts[2] += 1;
            j -= 1;
        }
        if j < 0 {
            return None;
        }
        while j >= 0 && !get(j) && counts[1] <= max_count {
            counts[1] += 1;
            j -= 1;
        }
        if j < 0 || counts[1] > max_count {
            return None;
        }
        while j >= 0 && get(j) && counts[0] <= max_count {
            counts[0] += 1;
            j -= 1;
        }
        if counts[0] > max_count {
            return None;
        }

        let mut j = start_j + 1;
        while j < max_j && get(j) {
            counts[2] += 1;
            j += 1;
        }
        if j == max_j {
            return None;
        }
        while j < max_j && !get(j) && counts[3] < max_count {
            counts[3] += 1;
            j += 1;
        }
        if j == max_j || counts[3] >= max_count {
            return None;
        }
        while j < max_j && get(j) && counts[4] < max_count {
            counts[4] += 1;
            j += 1;
        }
        if counts[4] >= max_count {
            return None;
        }

        let total: u32 = counts.iter().sum();
        if 5 * total.abs_diff(original_total) >= original_total {
            return None;
        }
        is_finder_ratio(&counts, false).then(|| center_from_end(&counts, j))
    }

    /// Walks the main diagonal through the candidate centre, which rules out most false
    /// positives from text and other row/column aligned clutter.
    fn cross_check_diagonal(&self, center_i: i32, center_j: i32) -> bool {
        let (max_i, max_j) = (self.image.height() as i32, self.image.width() as i32);
        let get = |d: i32| self.get(center_j + d, center_i + d);
        let in_upper = |k: i32| center_i >= k && center_j >= k;
        let in_lower = |k: i32| center_i + k < max_i && center_j + k < max_j;
        let mut counts = [0u32; 5];

        let mut k = 0;
        while in_upper(k) && get(-k) {
            counts[2] += 1;
            k += 1;
        }
        if counts[2] == 0 {
            return false;
        }
        while in_upper(k) && !get(-k) {
            counts[1] += 1;
            k += 1;
        }
        if counts[1] == 0 {
            return false;
        }
        while in_upper(k) && get(-k) {
            counts[0] += 1;
            k += 1;
        }
        if counts[0] == 0 {
            return false;
        }

        let mut k = 1;
        while in_lower(k) && get(k) {
            counts[2] += 1;
            k += 1;
        }
        while in_lower(k) && !get(k) {
            counts[3] += 1;
            k += 1;
        }
        if counts[3] == 0 {
            return false;
        }
        while in_lower(k) && get(k) {
            counts[4] += 1;
            k += 1;
        }
        if counts[4] == 0 {
            return false;
        }

        is_finder_ratio(&counts, true)
    }

    /// Once two centres are confirmed, estimates how many rows can be skipped before the
    /// third could show up.
    fn find_row_skip(&mut self) -> i32 {
        if self.possible_centers.len() <= 1 {
            return 0;
        }

        let mut first: Option<ResultPoint> = None;
        for c in self.possible_centers.iter().filter(|c| c.count >= CENTER_QUORUM) {
            match first {
                None => first = Some(c.center),
                Some(f) => {
                    self.has_skipped = true;
                    return (((f.x - c.x).abs() - (f.y - c.y).abs()) / 2.0) as i32;
                }
            }
        }
        0
    }

    /// At least three confirmed centres whose module sizes agree within 5%.
    fn have_multiply_confirmed_centers(&self) -> bool {
        let confirmed: Vec<_> =
            self.possible_centers.iter().filter(|c| c.count >= CENTER_QUORUM).collect();
        if confirmed.len() < 3 {
            return false;
        }

        let total_module_size: f32 = confirmed.iter().map(|c| c.module_size).sum();
        let average = total_module_size / self.possible_centers.len() as f32;
        let total_deviation: f32 =
            self.possible_centers.iter().map(|c| (c.module_size - average).abs()).sum();
        total_deviation <= 0.05 * total_module_size
    }

    /// Picks the triple of similar module size closest to an isosceles right triangle.
    fn select_best_patterns(&mut self) -> QRResult<[Pattern; 3]> {
        let n = self.possible_centers.len();
        if n < 3 {
            debug!("Only {n} finder candidates");
            return Err(QRError::FinderNotFound);
        }

        self.possible_centers.sort_by(|a, b| a.module_size.total_cmp(&b.module_size));
        let pc = &self.possible_centers;

        let mut best: Option<([Pattern; 3], f64)> = None;
        for i in 0..n - 2 {
            let min_module_size = pc[i].module_size;
            for j in i + 1..n - 1 {
                let ij = pc[i].squared_distance(pc[j].center);
                for k in j + 1..n {
                    if pc[k].module_size > min_module_size * 1.4 {
                        continue;
                    }

                    let jk = pc[j].squared_distance(pc[k].center);
                    let ik = pc[i].squared_distance(pc[k].center);
                    let mut sides = [ij, jk, ik];
                    sides.sort_by(f64::total_cmp);
                    let [a, b, c] = sides;

                    // Zero for an isosceles right triangle: c = 2a = 2b in squared lengths
                    let distortion = (c - 2.0 * b).abs() + (c - 2.0 * a).abs();
                    if best.map_or(true, |(_, d)| distortion < d) {
                        best = Some(([pc[i], pc[j], pc[k]], distortion));
                    }
                }
            }
        }

        best.map(|(patterns, _)| patterns).ok_or(QRError::FinderNotFound)
    }
}

/// Rows stepped over between scans. Trying harder scans every row.
pub(super) fn initial_row_skip(max_i: i32, try_harder: bool) -> i32 {
    if try_harder {
        return 1;
    }
    ((3 * max_i) / (4 * MAX_MODULES)).max(MIN_SKIP)
}

/// Column or row of the centre of the middle run, given the end of the last run.
fn center_from_end(counts: &[u32; 5], end: i32) -> f32 {
    (end - counts[4] as i32 - counts[3] as i32) as f32 - counts[2] as f32 / 2.0
}

pub(super) fn shift_counts_by_two(counts: &mut [u32; 5]) {
    counts[0] = counts[2];
    counts[1] = counts[3];
    counts[2] = counts[4];
    counts[3] = 1;
    counts[4] = 0;
}
