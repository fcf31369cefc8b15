//! Contour to 1D series conversion

use crate::config::AmplitudeScaling;
use crate::models::TraceContour;
use crate::utils::resample::{fill_gaps, resample_linear};

/// Row position of the trace for every column spanned by the contour.
///
/// Each column is represented by the midpoint of the contour's vertical
/// extent there; columns with no contour point are interpolated.
pub fn column_profile(contour: &TraceContour) -> Vec<f64> {
    let width = contour.width();
    let mut extents: Vec<Option<(i32, i32)>> = vec![None; width];

    for p in &contour.points {
        let Some(col) = (p.x as usize).checked_sub(contour.min_x) else {
            continue;
        };
        if col >= width {
            continue;
        }
        extents[col] = Some(match extents[col] {
            None => (p.y, p.y),
            Some((lo, hi)) => (lo.min(p.y), hi.max(p.y)),
        });
    }

    let rows: Vec<Option<f64>> = extents
        .iter()
        .map(|e| e.map(|(lo, hi)| (lo + hi) as f64 / 2.0))
        .collect();
    fill_gaps(&rows).unwrap_or_default()
}

/// Median of a series, used as the isoelectric baseline
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Resample a row profile to `n` samples and convert it to amplitudes
pub fn scale_profile(
    rows: &[f64],
    n: usize,
    amplitude: AmplitudeScaling,
    mv_per_pixel: f64,
) -> Vec<f64> {
    let resampled = resample_linear(rows, n);
    match amplitude {
        AmplitudeScaling::Millivolts => {
            let baseline = median(rows);
            // Rows grow downward, voltage grows upward
            resampled
                .iter()
                .map(|&y| (baseline - y) * mv_per_pixel)
                .collect()
        }
        AmplitudeScaling::MinMax => {
            let min = resampled.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = resampled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            if !(range > 0.0) {
                return vec![0.0; resampled.len()];
            }
            resampled.iter().map(|&y| (y - min) / range).collect()
        }
    }
}
