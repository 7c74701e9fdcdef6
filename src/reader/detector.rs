use tracing::{debug, trace};

use super::alignment::AlignmentPatternFinder;
use super::finder::{FinderPatternFinder, FinderPatternInfo, Pattern};
use super::multi::MultiFinderPatternFinder;
use super::sampler::GridSampler;
use super::utils::{distance, round, PerspectiveTransform, ResultPoint};
use crate::common::{BitMatrix, QRError, QRResult, Version};

// Detector result
//------------------------------------------------------------------------------

/// Sampled module grid with the image points it was read from: bottom left, top left and
/// top right finder centres, then the alignment pattern centre when one was used.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorResult {
    pub bits: BitMatrix,
    pub points: Vec<ResultPoint>,
}

// Detector
//------------------------------------------------------------------------------

/// Locates symbols in a binarized image and samples their module grids.
pub struct Detector<'a> {
    image: &'a BitMatrix,
    sampler: &'a dyn GridSampler,
    callback: Option<&'a dyn Fn(ResultPoint)>,
}

impl<'a> Detector<'a> {
    pub fn new(
        image: &'a BitMatrix,
        sampler: &'a dyn GridSampler,
        callback: Option<&'a dyn Fn(ResultPoint)>,
    ) -> Self {
        Self { image, sampler, callback }
    }

    pub fn detect(&self, try_harder: bool) -> QRResult<DetectorResult> {
        let info = FinderPatternFinder::new(self.image, self.callback).find(try_harder)?;
        self.process_finder_pattern_info(&info)
    }

    /// Samples every plausible symbol. Triples whose geometry doesn't work out are dropped
    /// silently, so the result may be empty.
    pub fn detect_multi(&self, try_harder: bool) -> QRResult<Vec<DetectorResult>> {
        let mut finder = MultiFinderPatternFinder::new(self.image, self.callback);
        let infos = finder.find_multi(try_harder)?;
        let results = infos
            .iter()
            .filter_map(|info| match self.process_finder_pattern_info(info) {
                Ok(res) => Some(res),
                Err(e) => {
                    trace!("Dropping candidate symbol: {e}");
                    None
                }
            })
            .collect();
        Ok(results)
    }

    pub fn process_finder_pattern_info(
        &self,
        info: &FinderPatternInfo,
    ) -> QRResult<DetectorResult> {
        let FinderPatternInfo { top_left, top_right, bottom_left } = info;

        let module_size = self.calculate_module_size(top_left, top_right, bottom_left);
        if module_size < 1.0 {
            return Err(QRError::ModuleSizeTooSmall);
        }
        let dimension = compute_dimension(top_left, top_right, bottom_left, module_size)?;
        let provisional = Version::from_dimension(dimension)?;
        let modules_between_centers = provisional.width() - 7;

        let mut alignment = None;
        if !provisional.alignment_pattern().is_empty() {
            // Bottom right corner of the parallelogram spanned by the finders
            let br_x = top_right.x - top_left.x + bottom_left.x;
            let br_y = top_right.y - top_left.y + bottom_left.y;

            // The alignment pattern sits 3 modules in from the bottom right finder position
            let correction = 1.0 - 3.0 / modules_between_centers as f32;
            let est_x = (top_left.x + correction * (br_x - top_left.x)) as i32;
            let est_y = (top_left.y + correction * (br_y - top_left.y)) as i32;

            // Widen the search window until something turns up
            for allowance in [4, 8, 16] {
                match self.find_alignment_in_region(module_size, est_x, est_y, allowance as f32) {
                    Ok(p) => {
                        alignment = Some(p);
                        break;
                    }
                    Err(_) => continue,
                }
            }
            if alignment.is_none() {
                debug!("No alignment pattern near ({est_x}, {est_y}), using finders only");
            }
        }

        let transform =
            create_transform(top_left, top_right, bottom_left, alignment.as_ref(), dimension);
        let bits = self.sampler.sample_grid(self.image, dimension, dimension, &transform)?;
        debug!(dimension, module_size, alignment = alignment.is_some(), "Symbol sampled");

        let mut points = vec![bottom_left.center, top_left.center, top_right.center];
        if let Some(a) = alignment {
            points.push(a.center);
        }
        Ok(DetectorResult { bits, points })
    }

    /// Mean of the module sizes measured along the top and left edges.
    fn calculate_module_size(
        &self,
        top_left: &Pattern,
        top_right: &Pattern,
        bottom_left: &Pattern,
    ) -> f32 {
        (self.module_size_one_way(top_left, top_right)
            + self.module_size_one_way(top_left, bottom_left))
            / 2.0
    }

    /// Each finder spans 7 modules, so the two black/white/black runs through both centres
    /// add up to 14 modules.
    fn module_size_one_way(&self, pattern: &Pattern, other: &Pattern) -> f32 {
        let (px, py) = (pattern.x as i32, pattern.y as i32);
        let (ox, oy) = (other.x as i32, other.y as i32);
        let est1 = self.size_of_black_white_black_run_both_ways(px, py, ox, oy);
        let est2 = self.size_of_black_white_black_run_both_ways(ox, oy, px, py);
        match (est1.is_nan(), est2.is_nan()) {
            (true, _) => est2 / 7.0,
            (_, true) => est1 / 7.0,
            _ => (est1 + est2) / 14.0,
        }
    }

    /// Measures from the centre out towards `to` and then the same distance the other way,
    /// clipped to the image.
    fn size_of_black_white_black_run_both_ways(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> f32 {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let mut result = self.size_of_black_white_black_run(from_x, from_y, to_x, to_y);

        let mut scale = 1.0;
        let mut other_to_x = from_x - (to_x - from_x);
        if other_to_x < 0 {
            scale = from_x as f32 / (from_x - other_to_x) as f32;
            other_to_x = 0;
        } else if other_to_x >= w {
            scale = (w - 1 - from_x) as f32 / (other_to_x - from_x) as f32;
            other_to_x = w - 1;
        }
        let mut other_to_y = (from_y as f32 - (to_y - from_y) as f32 * scale) as i32;

        scale = 1.0;
        if other_to_y < 0 {
            scale = from_y as f32 / (from_y - other_to_y) as f32;
            other_to_y = 0;
        } else if other_to_y >= h {
            scale = (h - 1 - from_y) as f32 / (other_to_y - from_y) as f32;
            other_to_y = h - 1;
        }
        other_to_x = (from_x as f32 + (other_to_x - from_x) as f32 * scale) as i32;

        result += self.size_of_black_white_black_run(from_x, from_y, other_to_x, other_to_y);
        // The centre pixel was counted twice
        result - 1.0
    }

    /// Length of the dark, light, dark run sequence starting at `from` along the Bresenham
    /// line towards `to`, or NaN if the line ends before the second dark run does.
    fn size_of_black_white_black_run(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> f32 {
        let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
        let (from_x, from_y, to_x, to_y) =
            if steep { (from_y, from_x, to_y, to_x) } else { (from_x, from_y, to_x, to_y) };

        let dx = (to_x - from_x).abs();
        let dy = (to_y - from_y).abs();
        let mut error = -dx / 2;
        let x_step = if from_x < to_x { 1 } else { -1 };
        let y_step = if from_y < to_y { 1 } else { -1 };

        // 0: first dark run, 1: light run, 2: second dark run
        let mut state = 0;
        let x_limit = to_x + x_step;
        let (mut x, mut y) = (from_x, from_y);
        while x != x_limit {
            let (real_x, real_y) = if steep { (y, x) } else { (x, y) };
            if (state == 1) == self.image.get_checked(real_x, real_y) {
                if state == 2 {
                    return distance(x as f32, y as f32, from_x as f32, from_y as f32);
                }
                state += 1;
            }

            error += dy;
            if error > 0 {
                if y == to_y {
                    break;
                }
                y += y_step;
                error -= dx;
            }
            x += x_step;
        }

        // Ran off the end inside the second dark run; count the pixel past the end as light
        if state == 2 {
            return distance((to_x + x_step) as f32, to_y as f32, from_x as f32, from_y as f32);
        }
        f32::NAN
    }

    fn find_alignment_in_region(
        &self,
        module_size: f32,
        est_x: i32,
        est_y: i32,
        allowance_factor: f32,
    ) -> QRResult<Pattern> {
        let (w, h) = (self.image.width() as i32, self.image.height() as i32);
        let allowance = (allowance_factor * module_size) as i32;

        let left = (est_x - allowance).max(0);
        let right = (est_x + allowance).min(w - 1);
        if ((right - left) as f32) < module_size * 3.0 {
            return Err(QRError::AlignmentNotFound);
        }
        let top = (est_y - allowance).max(0);
        let bottom = (est_y + allowance).min(h - 1);
        if ((bottom - top) as f32) < module_size * 3.0 {
            return Err(QRError::AlignmentNotFound);
        }

        AlignmentPatternFinder::new(
            self.image,
            (left, top),
            (right - left, bottom - top),
            module_size,
            self.callback,
        )
        .find()
    }
}

/// Symbol width implied by the finder spacing, snapped to the nearest `4k + 1`.
fn compute_dimension(
    top_left: &Pattern,
    top_right: &Pattern,
    bottom_left: &Pattern,
    module_size: f32,
) -> QRResult<usize> {
    let tltr = round(top_left.distance(top_right.center) / module_size);
    let tlbl = round(top_left.distance(bottom_left.center) / module_size);
    let dimension = (tltr + tlbl) / 2 + 7;
    let dimension = match dimension & 0x03 {
        0 => dimension + 1,
        2 => dimension - 1,
        3 => return Err(QRError::InvalidEstimatedDimension(dimension.max(0) as usize)),
        _ => dimension,
    };
    usize::try_from(dimension).map_err(|_| QRError::InvalidEstimatedDimension(0))
}

/// Maps module space onto the image using the three finder centres and either the
/// alignment centre or the fourth corner they imply.
fn create_transform(
    top_left: &Pattern,
    top_right: &Pattern,
    bottom_left: &Pattern,
    alignment: Option<&Pattern>,
    dimension: usize,
) -> PerspectiveTransform {
    let dim_minus_three = dimension as f32 - 3.5;
    let (br_x, br_y, source_br) = match alignment {
        Some(a) => (a.x, a.y, dim_minus_three - 3.0),
        None => (
            top_right.x - top_left.x + bottom_left.x,
            top_right.y - top_left.y + bottom_left.y,
            dim_minus_three,
        ),
    };

    PerspectiveTransform::quadrilateral_to_quadrilateral(
        [(3.5, 3.5), (dim_minus_three, 3.5), (source_br, source_br), (3.5, dim_minus_three)],
        [
            (top_left.x, top_left.y),
            (top_right.x, top_right.y),
            (br_x, br_y),
            (bottom_left.x, bottom_left.y),
        ],
    )
}
