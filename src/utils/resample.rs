//! Image resizing and 1D series resampling

use image::imageops::{self, FilterType};

use crate::models::GrayscaleImage;

/// Resize an intensity image to exactly `width` x `height`
pub fn resize_gray(image: &GrayscaleImage, width: usize, height: usize) -> GrayscaleImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    if image.is_empty() || width == 0 || height == 0 {
        return GrayscaleImage::filled(width, height, 255);
    }
    let resized = imageops::resize(
        &image.to_luma_image(),
        width as u32,
        height as u32,
        FilterType::Triangle,
    );
    GrayscaleImage::from_luma_image(resized)
}

/// Linearly resample `series` to `n` points, keeping both endpoints
pub fn resample_linear(series: &[f64], n: usize) -> Vec<f64> {
    match (series.len(), n) {
        (_, 0) => Vec::new(),
        (0, _) => vec![0.0; n],
        (1, _) => vec![series[0]; n],
        (_, 1) => vec![series[0]],
        (len, _) => {
            let step = (len - 1) as f64 / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let pos = i as f64 * step;
                    let lo = (pos.floor() as usize).min(len - 1);
                    let hi = (lo + 1).min(len - 1);
                    let frac = pos - lo as f64;
                    series[lo] + (series[hi] - series[lo]) * frac
                })
                .collect()
        }
    }
}

/// Fill `None` entries by linear interpolation between known neighbours.
/// Leading/trailing gaps copy the nearest known value. Returns `None` if
/// nothing is known.
pub fn fill_gaps(series: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (&(first_i, first_v), &(last_i, last_v)) = (known.first()?, known.last()?);

    let mut out = vec![0.0; series.len()];
    out[..=first_i].fill(first_v);
    out[last_i..].fill(last_v);
    for pair in known.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        let span = (i1 - i0) as f64;
        for (i, slot) in out.iter_mut().enumerate().take(i1 + 1).skip(i0) {
            *slot = v0 + (v1 - v0) * (i - i0) as f64 / span;
        }
    }
    Some(out)
}
