// Perspective transform
//------------------------------------------------------------------------------

/// Projective mapping between two quadrilaterals, stored as a 3x3 matrix in column-major
/// order `[a11, a21, a31, a12, a22, a32, a13, a23, a33]`. A point maps as
/// `x' = (a11 x + a21 y + a31) / (a13 x + a23 y + a33)` and likewise for `y'`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform([f32; 9]);

impl PerspectiveTransform {
    #[allow(clippy::too_many_arguments)]
    fn new(
        a11: f32,
        a21: f32,
        a31: f32,
        a12: f32,
        a22: f32,
        a32: f32,
        a13: f32,
        a23: f32,
        a33: f32,
    ) -> Self {
        Self([a11, a21, a31, a12, a22, a32, a13, a23, a33])
    }

    /// Maps the quadrilateral `src` onto `dst`, corners given in the same winding order.
    pub fn quadrilateral_to_quadrilateral(src: [(f32, f32); 4], dst: [(f32, f32); 4]) -> Self {
        let q_to_s = Self::quadrilateral_to_square(src);
        let s_to_q = Self::square_to_quadrilateral(dst);
        s_to_q.times(&q_to_s)
    }

    /// Maps the unit square corners (0,0), (1,0), (1,1), (0,1) onto `quad`.
    pub fn square_to_quadrilateral(quad: [(f32, f32); 4]) -> Self {
        let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = quad;
        let dx3 = x0 - x1 + x2 - x3;
        let dy3 = y0 - y1 + y2 - y3;
        if dx3 == 0.0 && dy3 == 0.0 {
            // Affine
            return Self::new(x1 - x0, x2 - x1, x0, y1 - y0, y2 - y1, y0, 0.0, 0.0, 1.0);
        }

        let dx1 = x1 - x2;
        let dx2 = x3 - x2;
        let dy1 = y1 - y2;
        let dy2 = y3 - y2;
        let den = dx1 * dy2 - dx2 * dy1;
        let a13 = (dx3 * dy2 - dx2 * dy3) / den;
        let a23 = (dx1 * dy3 - dx3 * dy1) / den;
        Self::new(
            x1 - x0 + a13 * x1,
            x3 - x0 + a23 * x3,
            x0,
            y1 - y0 + a13 * y1,
            y3 - y0 + a23 * y3,
            y0,
            a13,
            a23,
            1.0,
        )
    }

    pub fn quadrilateral_to_square(quad: [(f32, f32); 4]) -> Self {
        // Adjoint is the inverse up to a scale factor, which projective maps ignore
        Self::square_to_quadrilateral(quad).adjoint()
    }

    fn adjoint(&self) -> Self {
        let [a11, a21, a31, a12, a22, a32, a13, a23, a33] = self.0;
        Self::new(
            a22 * a33 - a23 * a32,
            a23 * a31 - a21 * a33,
            a21 * a32 - a22 * a31,
            a13 * a32 - a12 * a33,
            a11 * a33 - a13 * a31,
            a12 * a31 - a11 * a32,
            a12 * a23 - a13 * a22,
            a13 * a21 - a11 * a23,
            a11 * a22 - a12 * a21,
        )
    }

    /// Composition applying `other` first.
    pub fn times(&self, other: &Self) -> Self {
        let [a11, a21, a31, a12, a22, a32, a13, a23, a33] = self.0;
        let [b11, b21, b31, b12, b22, b32, b13, b23, b33] = other.0;
        Self::new(
            a11 * b11 + a21 * b12 + a31 * b13,
            a11 * b21 + a21 * b22 + a31 * b23,
            a11 * b31 + a21 * b32 + a31 * b33,
            a12 * b11 + a22 * b12 + a32 * b13,
            a12 * b21 + a22 * b22 + a32 * b23,
            a12 * b31 + a22 * b32 + a32 * b33,
            a13 * b11 + a23 * b12 + a33 * b13,
            a13 * b21 + a23 * b22 + a33 * b23,
            a13 * b31 + a23 * b32 + a33 * b33,
        )
    }

    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let [a11, a21, a31, a12, a22, a32, a13, a23, a33] = self.0;
        let den = a13 * x + a23 * y + a33;
        ((a11 * x + a21 * y + a31) / den, (a12 * x + a22 * y + a32) / den)
    }

    /// Maps interleaved `x, y` pairs in place.
    pub fn transform_points(&self, points: &mut [f32]) {
        debug_assert!(points.len() % 2 == 0, "Points must come in x, y pairs");

        for xy in points.chunks_exact_mut(2) {
            let (x, y) = self.map(xy[0], xy[1]);
            xy[0] = x;
            xy[1] = y;
        }
    }
}
