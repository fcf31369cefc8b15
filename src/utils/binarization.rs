use serde::{Deserialize, Serialize};

use imageproc::filter::gaussian_blur_f32;

use crate::models::{BitMatrix, GrayscaleImage};

/// Binarize using Otsu's threshold computed over this image only.
/// Returns the mask (true = ink, i.e. darker than the threshold) and the threshold.
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> (BitMatrix, u8) {
    let threshold = calculate_otsu_threshold(gray);
    (threshold_binarize(gray, width, height, threshold), threshold)
}

/// Calculate Otsu's optimal threshold.
///
/// Pixels strictly below the returned value form the dark class. A
/// histogram with a single occupied bin has no separable classes and
/// yields 0, so nothing is marked as ink.
pub fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut class1_pixels = 0f64;
    let mut class1_sum = 0f64;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 0u8;

    for threshold in 1..=255usize {
        let count = histogram[threshold - 1] as f64;
        class1_pixels += count;
        class1_sum += count * (threshold - 1) as f64;

        let class2_pixels = total_pixels - class1_pixels;
        if class1_pixels == 0.0 || class2_pixels == 0.0 {
            continue;
        }

        let class1_mean = class1_sum / class1_pixels;
        let class2_mean = (total_sum - class1_sum) / class2_pixels;
        let weight1 = class1_pixels / total_pixels;
        let weight2 = class2_pixels / total_pixels;
        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization (ink = below threshold)
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            binary.set(x, y, gray[idx] < threshold);
        }
    }

    binary
}

/// Smoothing + thresholding recipe used to isolate the ink trace.
///
/// Both the preprocessing preview and the digitizer go through
/// [`binarize_for_trace`] with the same value, so they cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceBinarization {
    /// Gaussian sigma in pixels applied before thresholding
    pub blur_sigma: f32,
    /// Smoothed images whose intensity range is below this are treated as
    /// blank paper
    pub min_contrast: u8,
}

impl Default for TraceBinarization {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            min_contrast: 24,
        }
    }
}

/// Result of binarizing one lead image
#[derive(Debug, Clone)]
pub struct TraceMask {
    /// Ink mask
    pub mask: BitMatrix,
    /// Otsu threshold chosen for this lead
    pub threshold: u8,
}

/// Gaussian smoothing; a non-positive sigma leaves the image untouched
fn smooth(image: &GrayscaleImage, sigma: f32) -> GrayscaleImage {
    if image.is_empty() || sigma.is_nan() || sigma <= 0.0 {
        return image.clone();
    }
    GrayscaleImage::from_luma_image(gaussian_blur_f32(&image.to_luma_image(), sigma))
}

/// Blur then Otsu-threshold a lead image, with the threshold derived from
/// this image alone.
pub fn binarize_for_trace(image: &GrayscaleImage, params: &TraceBinarization) -> TraceMask {
    let blurred = smooth(image, params.blur_sigma);
    let contrast = blurred.stats().map_or(0, |s| s.contrast());
    if blurred.is_empty() || contrast < params.min_contrast {
        log::debug!(
            "{}x{} lead has contrast {} below {}, no ink",
            image.width(),
            image.height(),
            contrast,
            params.min_contrast
        );
        return TraceMask {
            mask: BitMatrix::new(image.width(), image.height()),
            threshold: 0,
        };
    }
    let pixels = blurred.as_bytes();
    let (mask, threshold) = otsu_binarize(pixels, blurred.width(), blurred.height());
    log::debug!(
        "binarized {}x{} lead: threshold={} ink_ratio={:.4}",
        image.width(),
        image.height(),
        threshold,
        mask.ink_ratio()
    );
    TraceMask { mask, threshold }
}
