/// Luminance conversion for RGB scans
/// Y = 0.2125*R + 0.7154*G + 0.0721*B (Rec. 709 weights)
/// Uses fast integer arithmetic: Y = (54*R + 183*G + 19*B) >> 8
use crate::error::{EcgError, Result};
use crate::models::{GrayscaleImage, SourceImage};

/// Coefficients for grayscale conversion, summing to 256 so white stays 255
const COEF_R: u32 = 54;
const COEF_G: u32 = 183;
const COEF_B: u32 = 19;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert RGB bytes to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixel_count = width * height;
    let mut gray = vec![0u8; pixel_count];
    rgb_to_grayscale_scalar_unrolled(rgb, &mut gray, pixel_count);
    gray
}

fn rgb_to_grayscale_scalar_unrolled(rgb: &[u8], gray: &mut [u8], pixel_count: usize) {
    let mut i = 0;

    // 8 pixels per iteration
    while i + 8 <= pixel_count {
        for j in 0..8 {
            let idx = (i + j) * 3;
            gray[i + j] = luma(rgb[idx], rgb[idx + 1], rgb[idx + 2]);
        }
        i += 8;
    }

    for i in i..pixel_count {
        let idx = i * 3;
        gray[i] = luma(rgb[idx], rgb[idx + 1], rgb[idx + 2]);
    }
}

/// Normalize a source scan into a single-channel intensity image
pub fn normalize(image: &SourceImage) -> Result<GrayscaleImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(EcgError::EmptyImage);
    }
    let gray = rgb_to_grayscale(image.as_bytes(), width, height);
    GrayscaleImage::new(width, height, gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_grayscale() {
        let white = vec![255, 255, 255];
        assert_eq!(rgb_to_grayscale(&white, 1, 1)[0], 255);

        let black = vec![0, 0, 0];
        assert_eq!(rgb_to_grayscale(&black, 1, 1)[0], 0);

        // Green dominates luminance, blue contributes least
        let red = rgb_to_grayscale(&[255, 0, 0], 1, 1)[0];
        let green = rgb_to_grayscale(&[0, 255, 0], 1, 1)[0];
        let blue = rgb_to_grayscale(&[0, 0, 255], 1, 1)[0];
        assert!(green > red && red > blue);
        assert!(green > 150);
    }

    #[test]
    fn test_unrolled_loop_covers_tail() {
        let (w, h) = (37, 11);
        let rgb: Vec<u8> = (0..w * h * 3).map(|i| (i * 7 % 256) as u8).collect();
        let expected: Vec<u8> = rgb.chunks(3).map(|p| luma(p[0], p[1], p[2])).collect();
        assert_eq!(rgb_to_grayscale(&rgb, w, h), expected);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let rgb: Vec<u8> = (0..10 * 10 * 3).map(|i| (i % 251) as u8).collect();
        let img = SourceImage::new(10, 10, rgb).unwrap();
        let a = normalize(&img).unwrap();
        let b = normalize(&img).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.width(), 10);
        assert_eq!(a.height(), 10);
    }
}
