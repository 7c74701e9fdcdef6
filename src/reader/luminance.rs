use image::{DynamicImage, GrayImage, RgbImage};

// Luminance source
//------------------------------------------------------------------------------

/// Row-major 8-bit luminance buffer, 0 being black. Every decode starts from one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Luminance {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Luminance {
    /// Wraps a raw buffer, `None` unless it holds exactly `width * height` samples.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &[u8] {
        debug_assert!(y < self.height, "Row {y} out of bounds");
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub fn matrix(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Self {
        debug_assert!(
            left + width <= self.width && top + height <= self.height,
            "Crop rectangle doesn't fit in the source"
        );

        let mut data = Vec::with_capacity(width * height);
        for y in top..top + height {
            data.extend_from_slice(&self.row(y)[left..left + width]);
        }
        Self { width, height, data }
    }

    /// Rotates the buffer by 90 degrees counter clockwise; width and height swap.
    pub fn rotate_counter_clockwise(&self) -> Self {
        let (w, h) = (self.height, self.width);
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(self.get(self.width - 1 - y, x));
            }
        }
        Self { width: w, height: h, data }
    }

    pub fn invert(&self) -> Self {
        let data = self.data.iter().map(|&l| 255 - l).collect();
        Self { width: self.width, height: self.height, data }
    }
}

impl From<&GrayImage> for Luminance {
    fn from(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self { width: w as usize, height: h as usize, data: img.as_raw().clone() }
    }
}

impl From<GrayImage> for Luminance {
    fn from(img: GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self { width: w as usize, height: h as usize, data: img.into_raw() }
    }
}

// Green counts double, a cheap approximation of perceived brightness
impl From<&RgbImage> for Luminance {
    fn from(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let data = img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                ((r as u32 + 2 * g as u32 + b as u32) / 4) as u8
            })
            .collect();
        Self { width: w as usize, height: h as usize, data }
    }
}

impl From<RgbImage> for Luminance {
    fn from(img: RgbImage) -> Self {
        Self::from(&img)
    }
}

impl From<&DynamicImage> for Luminance {
    fn from(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => Self::from(gray),
            _ => Self::from(&img.to_rgb8()),
        }
    }
}

impl From<DynamicImage> for Luminance {
    fn from(img: DynamicImage) -> Self {
        Self::from(&img)
    }
}

#[cfg(test)]
mod luminance_tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::Luminance;

    fn sample() -> Luminance {
        // 3x2
        Luminance::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_from_raw() {
        assert!(Luminance::from_raw(3, 2, vec![0; 5]).is_none());
        assert!(Luminance::from_raw(0, 2, vec![]).is_none());
        let lum = sample();
        assert_eq!(lum.row(1), [4, 5, 6]);
        assert_eq!(lum.get(2, 0), 3);
    }

    #[test]
    fn test_rgb_luma() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([10, 20, 30]));
        let lum = Luminance::from(&img);
        assert_eq!(lum.matrix(), [63, 20]);
    }

    #[test]
    fn test_gray() {
        let img = GrayImage::from_pixel(4, 4, Luma([77]));
        let lum = Luminance::from(img);
        assert_eq!((lum.width(), lum.height()), (4, 4));
        assert!(lum.matrix().iter().all(|&l| l == 77));
    }

    #[test]
    fn test_crop() {
        let lum = sample().crop(1, 0, 2, 2);
        assert_eq!(lum.matrix(), [2, 3, 5, 6]);
    }

    #[test]
    fn test_rotate_counter_clockwise() {
        let lum = sample().rotate_counter_clockwise();
        assert_eq!((lum.width(), lum.height()), (2, 3));
        assert_eq!(lum.matrix(), [3, 6, 2, 5, 1, 4]);
    }

    #[test]
    fn test_invert() {
        assert_eq!(sample().invert().row(0), [254, 253, 252]);
    }
}
