use std::fmt::{Display, Error, Formatter};

use image::{GrayImage, Luma};

// Bit matrix
//------------------------------------------------------------------------------

/// Dense bit-packed boolean grid. `true` is a dark pixel or module.
///
/// Coordinates are `(x, y)` with `x` the column and `y` the row. Each row occupies
/// `row_size` 32-bit words.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    row_size: usize,
    bits: Vec<u32>,
}

impl BitMatrix {
    pub fn new(width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0, "Dimensions must be positive: {width}x{height}");

        let row_size = (width + 31) >> 5;
        Self { width, height, row_size, bits: vec![0; row_size * height] }
    }

    pub fn square(dimension: usize) -> Self {
        Self::new(dimension, dimension)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, x: usize, y: usize) -> (usize, u32) {
        debug_assert!(
            x < self.width && y < self.height,
            "Index out of bounds: ({x}, {y}) in {}x{}",
            self.width,
            self.height
        );
        (y * self.row_size + (x >> 5), 1 << (x & 31))
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        let (i, m) = self.offset(x, y);
        self.bits[i] & m != 0
    }

    /// Like [`BitMatrix::get`] but signed and bounds-checked, returning `false` outside.
    pub fn get_checked(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.get(x as usize, y as usize)
    }

    pub fn set(&mut self, x: usize, y: usize) {
        let (i, m) = self.offset(x, y);
        self.bits[i] |= m;
    }

    pub fn unset(&mut self, x: usize, y: usize) {
        let (i, m) = self.offset(x, y);
        self.bits[i] &= !m;
    }

    pub fn put(&mut self, x: usize, y: usize, bit: bool) {
        if bit {
            self.set(x, y)
        } else {
            self.unset(x, y)
        }
    }

    pub fn flip(&mut self, x: usize, y: usize) {
        let (i, m) = self.offset(x, y);
        self.bits[i] ^= m;
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    pub fn set_region(&mut self, left: usize, top: usize, width: usize, height: usize) {
        debug_assert!(
            left + width <= self.width && top + height <= self.height,
            "Region exceeds matrix: ({left}, {top}) {width}x{height} in {}x{}",
            self.width,
            self.height
        );

        for y in top..top + height {
            for x in left..left + width {
                self.set(x, y);
            }
        }
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod bit_matrix_tests {
    use super::BitMatrix;

    #[test]
    fn test_get_set() {
        let mut bm = BitMatrix::new(33, 2);
        assert!(!bm.get(32, 1));
        bm.set(32, 1);
        assert!(bm.get(32, 1));
        assert!(!bm.get(31, 1));
        assert!(!bm.get(0, 0));
        bm.flip(32, 1);
        assert!(!bm.get(32, 1));
        bm.put(0, 0, true);
        assert_eq!(bm.count_ones(), 1);
        bm.clear();
        assert_eq!(bm.count_ones(), 0);
    }

    #[test]
    fn test_get_checked() {
        let mut bm = BitMatrix::square(3);
        bm.set(2, 2);
        assert!(bm.get_checked(2, 2));
        assert!(!bm.get_checked(-1, 2));
        assert!(!bm.get_checked(3, 0));
    }

    #[test]
    fn test_set_region() {
        let mut bm = BitMatrix::new(40, 40);
        bm.set_region(30, 5, 5, 3);
        assert_eq!(bm.count_ones(), 15);
        assert!(bm.get(34, 7));
        assert!(!bm.get(35, 7));
        assert!(!bm.get(34, 8));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds() {
        let bm = BitMatrix::new(4, 4);
        bm.get(4, 0);
    }
}

// Geometry helpers
//------------------------------------------------------------------------------

impl BitMatrix {
    /// Flips the matrix along its main diagonal. Only square matrices can be transposed.
    pub fn transpose(&mut self) {
        debug_assert_eq!(self.width, self.height, "Cannot transpose a non-square matrix");

        for x in 0..self.width {
            for y in x + 1..self.height {
                if self.get(x, y) != self.get(y, x) {
                    self.flip(y, x);
                    self.flip(x, y);
                }
            }
        }
    }

    pub fn top_left_on_bit(&self) -> Option<(usize, usize)> {
        let i = self.bits.iter().position(|&w| w != 0)?;
        let y = i / self.row_size;
        let x = ((i % self.row_size) << 5) + self.bits[i].trailing_zeros() as usize;
        Some((x, y))
    }

    pub fn bottom_right_on_bit(&self) -> Option<(usize, usize)> {
        let i = self.bits.iter().rposition(|&w| w != 0)?;
        let y = i / self.row_size;
        let x = ((i % self.row_size) << 5) + 31 - self.bits[i].leading_zeros() as usize;
        Some((x, y))
    }
}

#[cfg(test)]
mod bit_matrix_geometry_tests {
    use super::BitMatrix;

    #[test]
    fn test_transpose() {
        let mut bm = BitMatrix::square(5);
        bm.set(4, 0);
        bm.set(1, 3);
        bm.set(2, 2);
        bm.transpose();
        assert!(bm.get(0, 4));
        assert!(bm.get(3, 1));
        assert!(bm.get(2, 2));
        assert_eq!(bm.count_ones(), 3);
    }

    #[test]
    fn test_on_bits() {
        let mut bm = BitMatrix::new(70, 10);
        assert_eq!(bm.top_left_on_bit(), None);
        assert_eq!(bm.bottom_right_on_bit(), None);
        bm.set(40, 2);
        bm.set(65, 7);
        bm.set(3, 7);
        assert_eq!(bm.top_left_on_bit(), Some((40, 2)));
        assert_eq!(bm.bottom_right_on_bit(), Some((65, 7)));
    }
}

// Render
//------------------------------------------------------------------------------

impl BitMatrix {
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}

impl Display for BitMatrix {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        for y in 0..self.height {
            for x in 0..self.width {
                f.write_str(if self.get(x, y) { "X " } else { "  " })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
