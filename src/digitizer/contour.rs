use imageproc::contours::{self, BorderType};

use crate::config::ContourSelection;
use crate::digitizer::components::label_components;
use crate::models::{BitMatrix, PointI, TraceContour};

/// Outer boundaries of every ink component with at least `min_pixels` pixels,
/// in raster order of their first pixel
pub fn find_contours(mask: &BitMatrix, min_pixels: usize) -> Vec<TraceContour> {
    let map = label_components(mask);

    // Each 8-connected component has exactly one outer border; hole borders
    // revisit pixels already on the outline and are skipped
    let mut outlines: Vec<Option<Vec<PointI>>> = vec![None; map.components.len()];
    for border in contours::find_contours::<i32>(&mask.to_foreground_image()) {
        if !matches!(border.border_type, BorderType::Outer) {
            continue;
        }
        let Some(first) = border.points.first() else {
            continue;
        };
        let label = map.label_at(first.x, first.y) as usize;
        if let Some(slot) = label.checked_sub(1).and_then(|i| outlines.get_mut(i)) {
            if slot.is_none() {
                *slot = Some(border.points.into_iter().map(PointI::from).collect());
            }
        }
    }

    map.components
        .iter()
        .zip(outlines)
        .filter(|(c, _)| c.pixel_count >= min_pixels.max(1))
        .map(|(c, outline)| TraceContour {
            points: outline
                .unwrap_or_else(|| vec![PointI::new(c.start.0 as i32, c.start.1 as i32)]),
            min_x: c.min_x,
            min_y: c.min_y,
            max_x: c.max_x,
            max_y: c.max_y,
            pixel_count: c.pixel_count,
        })
        .collect()
}

/// Pick the contour representing the trace; `None` if there are none
pub fn select_trace(
    contours: &[TraceContour],
    policy: ContourSelection,
) -> Option<&TraceContour> {
    let key = |c: &TraceContour| match policy {
        ContourSelection::LargestBoundingArea => (c.bounding_area(), c.pixel_count, 0),
        ContourSelection::LongestPerimeter => (c.perimeter(), c.bounding_area(), c.pixel_count),
    };
    // Strict comparison keeps the earliest contour on ties
    contours.iter().fold(None, |best: Option<&TraceContour>, c| match best {
        Some(b) if key(c) <= key(b) => Some(b),
        _ => Some(c),
    })
}
