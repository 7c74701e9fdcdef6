use std::ops::Deref;

// Result point
//------------------------------------------------------------------------------

/// Sub-pixel image coordinate of a detected feature, `x` being the column.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResultPoint {
    pub x: f32,
    pub y: f32,
}

impl ResultPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ResultPoint) -> f32 {
        distance(self.x, self.y, other.x, other.y)
    }

    pub fn squared_distance(self, other: ResultPoint) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx * dx + dy * dy
    }

    /// Z component of the cross product of `a - b` and `c - b`.
    pub fn cross_product_z(a: ResultPoint, b: ResultPoint, c: ResultPoint) -> f32 {
        (c.x - b.x) * (a.y - b.y) - (c.y - b.y) * (a.x - b.x)
    }
}

pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

/// Rounds half away from zero.
pub fn round(d: f32) -> i32 {
    (d + if d < 0.0 { -0.5 } else { 0.5 }) as i32
}

/// Orders three finder centers as `[bottom_left, top_left, top_right]`. The top left
/// center is the one opposite the longest side; the other two are then sorted so the
/// triple winds the same way as an upright symbol.
pub fn order_best_patterns<T>(patterns: [T; 3]) -> [T; 3]
where
    T: Deref<Target = ResultPoint> + Copy,
{
    let [p0, p1, p2] = patterns;
    let zero_one = p0.distance(*p1);
    let one_two = p1.distance(*p2);
    let zero_two = p0.distance(*p2);

    let (mut a, b, mut c) = if one_two >= zero_one && one_two >= zero_two {
        (p1, p0, p2)
    } else if zero_two >= one_two && zero_two >= zero_one {
        (p0, p1, p2)
    } else {
        (p0, p2, p1)
    };

    // Mirror image if the triple winds clockwise
    if ResultPoint::cross_product_z(*a, *b, *c) < 0.0 {
        std::mem::swap(&mut a, &mut c);
    }

    [a, b, c]
}
