/// Connected ink components of a binary mask (8-connectivity)
use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;

use crate::models::BitMatrix;

/// One labelled component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Label in `ComponentMap::labels` (1-based)
    pub label: u32,
    /// First pixel in raster order
    pub start: (usize, usize),
    /// Leftmost column
    pub min_x: usize,
    /// Topmost row
    pub min_y: usize,
    /// Rightmost column
    pub max_x: usize,
    /// Bottom row
    pub max_y: usize,
    /// Ink pixels in the component
    pub pixel_count: usize,
}

/// Label image plus per-component statistics
#[derive(Debug, Clone)]
pub struct ComponentMap {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    /// Components ordered by first appearance in raster order
    pub components: Vec<Component>,
}

impl ComponentMap {
    /// Label at (x, y); 0 = background or out of bounds
    pub fn label_at(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.labels[y as usize * self.width + x as usize]
    }
}

/// Label connected ink regions.
///
/// Labels are renumbered so component `n` is the `n`-th to appear in raster
/// order, independent of how the labeller numbers them.
pub fn label_components(matrix: &BitMatrix) -> ComponentMap {
    let width = matrix.width();
    let height = matrix.height();
    let raw = connected_components(
        &matrix.to_foreground_image(),
        Connectivity::Eight,
        Luma([0u8]),
    );

    let mut compact: HashMap<u32, u32> = HashMap::new();
    let mut components: Vec<Component> = Vec::new();
    let mut labels = vec![0u32; width * height];

    for (x, y, pixel) in raw.enumerate_pixels() {
        let raw_label = pixel[0];
        if raw_label == 0 {
            continue;
        }
        let (x, y) = (x as usize, y as usize);
        let label = *compact.entry(raw_label).or_insert_with(|| {
            components.push(Component {
                label: components.len() as u32 + 1,
                start: (x, y),
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                pixel_count: 0,
            });
            components.len() as u32
        });
        labels[y * width + x] = label;

        let c = &mut components[label as usize - 1];
        c.min_x = c.min_x.min(x);
        c.min_y = c.min_y.min(y);
        c.max_x = c.max_x.max(x);
        c.max_y = c.max_y.max(y);
        c.pixel_count += 1;
    }

    ComponentMap {
        width,
        height,
        labels,
        components,
    }
}
