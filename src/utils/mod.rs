//! Image processing helpers
//!
//! - Grayscale conversion (RGB to luminance)
//! - Binarization (Gaussian smoothing, Otsu's method and threshold-based)
//! - Resizing and 1D resampling

pub mod binarization;
pub mod grayscale;
pub mod resample;
