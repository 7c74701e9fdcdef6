use tracing::trace;

use super::finder::{Pattern, PatternKind};
use super::utils::{is_alignment_ratio, ResultPoint};
use crate::common::{BitMatrix, QRError, QRResult};

// Alignment pattern finder
//------------------------------------------------------------------------------

/// Searches a window of the image for the 1:1:1 light/dark/light run through the centre
/// of an alignment pattern, scanning rows outwards from the middle of the window.
pub struct AlignmentPatternFinder<'a> {
    image: &'a BitMatrix,
    start_x: i32,
    start_y: i32,
    width: i32,
    height: i32,
    module_size: f32,
    possible_centers: Vec<Pattern>,
    callback: Option<&'a dyn Fn(ResultPoint)>,
}

impl<'a> AlignmentPatternFinder<'a> {
    pub fn new(
        image: &'a BitMatrix,
        (start_x, start_y): (i32, i32),
        (width, height): (i32, i32),
        module_size: f32,
        callback: Option<&'a dyn Fn(ResultPoint)>,
    ) -> Self {
        Self {
            image,
            start_x,
            start_y,
            width,
            height,
            module_size,
            possible_centers: Vec::new(),
            callback,
        }
    }

    /// Returns the first pattern seen twice, or failing that the first one seen at all.
    pub fn find(&mut self) -> QRResult<Pattern> {
        let start_x = self.start_x;
        let max_j = start_x + self.width;
        let middle_i = self.start_y + self.height / 2;

        for i_gen in 0..self.height {
            // Alternate below and above the middle row
            let offset = (i_gen + 1) / 2;
            let i = if i_gen & 1 == 0 { middle_i + offset } else { middle_i - offset };

            let mut counts = [0u32; 3];
            let mut j = start_x;
            // A light run touching the window edge could extend past it, so skip it
            while j < max_j && !self.get(j, i) {
                j += 1;
            }

            let mut state = 0;
            while j < max_j {
                if self.get(j, i) {
                    if state == 1 {
                        counts[1] += 1;
                    } else if state == 2 {
                        if is_alignment_ratio(&counts, self.module_size) {
                            if let Some(p) = self.handle_possible_center(&counts, i, j) {
                                return Ok(p);
                            }
                        }
                        counts = [counts[2], 1, 0];
                        state = 1;
                    } else {
                        state += 1;
                        counts[state] += 1;
                    }
                } else {
                    if state == 1 {
                        state += 1;
                    }
                    counts[state] += 1;
                }
                j += 1;
            }

            if is_alignment_ratio(&counts, self.module_size) {
                if let Some(p) = self.handle_possible_center(&counts, i, max_j) {
                    return Ok(p);
                }
            }
        }

        self.possible_centers.first().copied().ok_or(QRError::AlignmentNotFound)
    }

    fn get(&self, x: i32, y: i32) -> bool {
        self.image.get(x as usize, y as usize)
    }

    fn handle_possible_center(&mut self, counts: &[u32; 3], i: i32, j: i32) -> Option<Pattern> {
        let total: u32 = counts.iter().sum();
        let center_j = center_from_end(counts, j);
        let center_i = self.cross_check_vertical(i, center_j as i32, 2 * counts[1], total)?;

        let module_size = total as f32 / 3.0;
        let known = self
            .possible_centers
            .iter()
            .find(|c| c.about_equals(module_size, center_i, center_j));
        if let Some(c) = known {
            return Some(c.combine_estimate(center_i, center_j, module_size));
        }

        let p = Pattern::new(PatternKind::Alignment, center_j, center_i, module_size);
        trace!("Alignment candidate at ({center_j:.1}, {center_i:.1})");
        self.possible_centers.push(p);
        if let Some(cb) = self.callback {
            cb(p.center);
        }
        None
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
        let mut counts = [0u32; 3];

        let mut i = start_i;
        while i >= 0 && get(i) && counts[1] <= max_count {
            counts[1] += 1;
            i -= 1;
        }
        if i < 0 || counts[1] > max_count {
            return None;
        }
        while i >= 0 && !get(i) && counts[0] <= max_count {
            counts[0] += 1;
            i -= 1;
        }
        if counts[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && get(i) && counts[1] <= max_count {
            counts[1] += 1;
            i += 1;
        }
        if i == max_i || counts[1] > max_count {
            return None;
        }
        while i < max_i && !get(i) && counts[2] <= max_count {
            counts[2] += 1;
            i += 1;
        }
        if counts[2] > max_count {
            return None;
        }

        let total: u32 = counts.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        is_alignment_ratio(&counts, self.module_size).then(|| center_from_end(&counts, i))
    }
}

fn center_from_end(counts: &[u32; 3], end: i32) -> f32 {
    (end - counts[2] as i32) as f32 - counts[1] as f32 / 2.0
}

#[cfg(test)]
mod alignment_tests {
    use super::AlignmentPatternFinder;
    use crate::common::{BitMatrix, QRError};
    use crate::reader::finder::PatternKind;

    // Alignment pattern with 3 pixel modules, centre module at (30, 30) to (32, 32)
    fn alignment_image() -> BitMatrix {
        let mut image = BitMatrix::square(60);
        image.set_region(24, 24, 15, 15);
        let mut light = BitMatrix::square(60);
        light.set_region(27, 27, 9, 9);
        for y in 0..60 {
            for x in 0..60 {
                if light.get(x, y) {
                    image.unset(x, y);
                }
            }
        }
        image.set_region(30, 30, 3, 3);
        image
    }

    #[test]
    fn test_find_alignment() {
        let image = alignment_image();
        let mut finder = AlignmentPatternFinder::new(&image, (18, 18), (27, 27), 3.0, None);
        let p = finder.find().unwrap();
        assert_eq!(p.kind, PatternKind::Alignment);
        assert!((p.x - 31.5).abs() < 1.0 && (p.y - 31.5).abs() < 1.0, "{p:?}");
        assert!((p.module_size - 3.0).abs() < 0.5);
    }

    #[test]
    fn test_wrong_module_size() {
        let image = alignment_image();
        let mut finder = AlignmentPatternFinder::new(&image, (18, 18), (27, 27), 8.0, None);
        assert_eq!(finder.find(), Err(QRError::AlignmentNotFound));
    }

    #[test]
    fn test_empty_window() {
        let image = alignment_image();
        let mut finder = AlignmentPatternFinder::new(&image, (0, 0), (15, 15), 3.0, None);
        assert_eq!(finder.find(), Err(QRError::AlignmentNotFound));
    }
}
