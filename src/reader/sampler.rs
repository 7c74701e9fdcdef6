use super::utils::PerspectiveTransform;
use crate::common::{BitMatrix, QRError, QRResult};

// Grid sampler
//------------------------------------------------------------------------------

/// Reads a square module grid out of a binarized image through a perspective transform.
/// The reader holds one as a trait object so callers can swap in their own.
pub trait GridSampler: Sync {
    /// Samples `dim_x` by `dim_y` modules, module `(x, y)` being read at the image point
    /// `transform` maps `(x + 0.5, y + 0.5)` to.
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        transform: &PerspectiveTransform,
    ) -> QRResult<BitMatrix>;

    /// Same as [`GridSampler::sample_grid`] with the transform built from four corner
    /// correspondences, `dst` in module space and `src` in image space.
    fn sample_grid_quad(
        &self,
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        dst: [(f32, f32); 4],
        src: [(f32, f32); 4],
    ) -> QRResult<BitMatrix> {
        let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(dst, src);
        self.sample_grid(image, dim_x, dim_y, &transform)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGridSampler;

impl GridSampler for DefaultGridSampler {
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        transform: &PerspectiveTransform,
    ) -> QRResult<BitMatrix> {
        if dim_x == 0 || dim_y == 0 {
            return Err(QRError::PointOutOfBounds);
        }

        let (w, h) = (image.width() as i32, image.height() as i32);
        let mut bits = BitMatrix::new(dim_x, dim_y);
        let mut points = vec![0.0f32; 2 * dim_x];
        for y in 0..dim_y {
            let row = y as f32 + 0.5;
            for (x, xy) in points.chunks_exact_mut(2).enumerate() {
                xy[0] = x as f32 + 0.5;
                xy[1] = row;
            }
            transform.transform_points(&mut points);
            check_and_nudge_points(image, &mut points)?;

            for (x, xy) in points.chunks_exact(2).enumerate() {
                let (px, py) = (xy[0] as i32, xy[1] as i32);
                if px < 0 || py < 0 || px >= w || py >= h {
                    return Err(QRError::PointOutOfBounds);
                }
                if image.get(px as usize, py as usize) {
                    bits.set(x, y);
                }
            }
        }
        Ok(bits)
    }
}

/// Pulls points lying at most one pixel outside the image back onto its edge, working
/// inwards from both ends of the row and stopping at the first point needing no nudge.
/// Anything further outside means the transform doesn't fit the image.
pub fn check_and_nudge_points(image: &BitMatrix, points: &mut [f32]) -> QRResult<()> {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let nudge = |xy: &mut [f32]| -> QRResult<bool> {
        let (x, y) = (xy[0] as i32, xy[1] as i32);
        if x < -1 || x > w || y < -1 || y > h {
            return Err(QRError::PointOutOfBounds);
        }

        let mut nudged = false;
        if x == -1 {
            xy[0] = 0.0;
            nudged = true;
        } else if x == w {
            xy[0] = (w - 1) as f32;
            nudged = true;
        }
        if y == -1 {
            xy[1] = 0.0;
            nudged = true;
        } else if y == h {
            xy[1] = (h - 1) as f32;
            nudged = true;
        }
        Ok(nudged)
    };

    for xy in points.chunks_exact_mut(2) {
        if !nudge(xy)? {
            break;
        }
    }
    for xy in points.chunks_exact_mut(2).rev() {
        if !nudge(xy)? {
            break;
        }
    }
    Ok(())
}
