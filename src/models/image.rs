use image::{GrayImage, RgbImage};

use super::lead::PixelRect;
use crate::error::{EcgError, Result};

/// Raw RGB scan, 3 bytes per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl SourceImage {
    /// Wrap an RGB buffer, checking it matches the dimensions
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(EcgError::EmptyImage);
        }
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(EcgError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Take ownership of a decoded `image` buffer
    pub fn from_rgb_image(img: RgbImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(width as usize, height as usize, img.into_raw())
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGB bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGB value at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Copy out a sub-rectangle (clamped to the image)
    pub fn crop(&self, rect: PixelRect) -> SourceImage {
        let x1 = (rect.x + rect.width).min(self.width);
        let y1 = (rect.y + rect.height).min(self.height);
        let x0 = rect.x.min(x1);
        let y0 = rect.y.min(y1);
        let width = x1 - x0;
        let mut data = Vec::with_capacity(width * (y1 - y0) * 3);
        for y in y0..y1 {
            let start = (y * self.width + x0) * 3;
            data.extend_from_slice(&self.data[start..start + width * 3]);
        }
        SourceImage {
            width,
            height: y1 - y0,
            data,
        }
    }

    /// Convert to an `image` buffer for encoding
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width as u32, self.height as u32))
    }
}

/// Intensity range and mean of a grayscale image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntensityStats {
    /// Darkest value
    pub min: u8,
    /// Brightest value
    pub max: u8,
    /// Mean value, rounded down
    pub mean: u8,
}

impl IntensityStats {
    /// Spread between the brightest and darkest value
    pub fn contrast(&self) -> u8 {
        self.max - self.min
    }
}

/// Single-channel intensity image, 0 = black, 255 = white
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayscaleImage {
    /// Wrap an intensity buffer, checking it matches the dimensions
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(EcgError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Uniform image filled with `value`
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Take ownership of an `image` luma buffer
    pub fn from_luma_image(img: GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width: width as usize,
            height: height as usize,
            data: img.into_raw(),
        }
    }

    /// Image width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height
    pub fn height(&self) -> usize {
        self.height
    }

    /// True if the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw intensity bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Intensity at (x, y)
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Set intensity at (x, y); out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Intensity summary; `None` for an empty image
    pub fn stats(&self) -> Option<IntensityStats> {
        if self.data.is_empty() {
            return None;
        }
        let (min, max, sum) = self
            .data
            .iter()
            .fold((u8::MAX, u8::MIN, 0u64), |(lo, hi, sum), &v| {
                (lo.min(v), hi.max(v), sum + v as u64)
            });
        Some(IntensityStats {
            min,
            max,
            mean: (sum / self.data.len() as u64) as u8,
        })
    }

    /// Copy out a sub-rectangle (clamped to the image)
    pub fn crop(&self, rect: PixelRect) -> GrayscaleImage {
        let x1 = (rect.x + rect.width).min(self.width);
        let y1 = (rect.y + rect.height).min(self.height);
        let x0 = rect.x.min(x1);
        let y0 = rect.y.min(y1);
        let width = x1 - x0;
        let mut data = Vec::with_capacity(width * (y1 - y0));
        for y in y0..y1 {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        GrayscaleImage {
            width,
            height: y1 - y0,
            data,
        }
    }

    /// Convert to an `image` buffer for resizing and encoding
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = SourceImage::new(4, 4, vec![0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            EcgError::BufferSize {
                expected: 48,
                actual: 10
            }
        ));
        assert!(matches!(
            SourceImage::new(0, 4, Vec::new()),
            Err(EcgError::EmptyImage)
        ));
    }

    #[test]
    fn crop_is_clamped() {
        let data: Vec<u8> = (0..16).collect();
        let gray = GrayscaleImage::new(4, 4, data).unwrap();
        let crop = gray.crop(PixelRect {
            x: 2,
            y: 1,
            width: 5,
            height: 2,
        });
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.as_bytes(), &[6, 7, 10, 11]);
    }

    #[test]
    fn rgb_crop_keeps_channels() {
        let mut data = vec![0u8; 3 * 3 * 3];
        data[(1 * 3 + 1) * 3] = 200;
        let img = SourceImage::new(3, 3, data).unwrap();
        let crop = img.crop(PixelRect {
            x: 1,
            y: 1,
            width: 1,
            height: 1,
        });
        assert_eq!(crop.pixel(0, 0), [200, 0, 0]);
    }

    #[test]
    fn intensity_stats() {
        let img = GrayscaleImage::new(3, 1, vec![10, 20, 31]).unwrap();
        let stats = img.stats().unwrap();
        assert_eq!((stats.min, stats.max, stats.mean), (10, 31, 20));
        assert_eq!(stats.contrast(), 21);
        assert!(GrayscaleImage::filled(0, 0, 0).stats().is_none());
    }
}
