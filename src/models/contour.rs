use serde::{Deserialize, Serialize};

use super::point::PointI;

/// Outer boundary of one connected ink component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContour {
    /// Outer boundary pixels in tracing order
    pub points: Vec<PointI>,
    /// Leftmost column
    pub min_x: usize,
    /// Topmost row
    pub min_y: usize,
    /// Rightmost column
    pub max_x: usize,
    /// Bottom row
    pub max_y: usize,
    /// Pixels in the enclosed component
    pub pixel_count: usize,
}

impl TraceContour {
    /// Bounding box width
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    /// Bounding box height
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Bounding box area
    pub fn bounding_area(&self) -> usize {
        self.width() * self.height()
    }

    /// Boundary length in traced steps
    pub fn perimeter(&self) -> usize {
        self.points.len()
    }
}
