use std::fmt;

use serde::{Deserialize, Serialize};

use super::image::GrayscaleImage;

/// ECG lead identity
///
/// Declaration order is the canonical feature order: limb leads, augmented
/// leads, chest leads, then the long rhythm strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lead {
    /// Lead I
    #[serde(rename = "I")]
    I,
    /// Lead II
    #[serde(rename = "II")]
    II,
    /// Lead III
    #[serde(rename = "III")]
    III,
    /// Augmented vector right
    #[serde(rename = "aVR")]
    AVR,
    /// Augmented vector left
    #[serde(rename = "aVL")]
    AVL,
    /// Augmented vector foot
    #[serde(rename = "aVF")]
    AVF,
    /// Chest lead V1
    V1,
    /// Chest lead V2
    V2,
    /// Chest lead V3
    V3,
    /// Chest lead V4
    V4,
    /// Chest lead V5
    V5,
    /// Chest lead V6
    V6,
    /// Long rhythm strip across the bottom of the sheet
    #[serde(rename = "rhythm")]
    Rhythm,
}

impl Lead {
    /// All leads in canonical feature order
    pub const CANONICAL: [Lead; 13] = [
        Lead::I,
        Lead::II,
        Lead::III,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
        Lead::Rhythm,
    ];

    /// Position of this lead in the feature vector
    pub fn canonical_index(self) -> usize {
        self as usize
    }

    /// Whether this lead is drawn as the full-width rhythm strip
    pub fn is_rhythm(self) -> bool {
        self == Lead::Rhythm
    }

    /// Printed label
    pub fn name(self) -> &'static str {
        match self {
            Lead::I => "I",
            Lead::II => "II",
            Lead::III => "III",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
            Lead::Rhythm => "II rhythm",
        }
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel rectangle, half-open on the right and bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl PixelRect {
    /// Number of pixels covered
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// One cropped lead of the sheet
#[derive(Debug, Clone)]
pub struct LeadRegion {
    /// Lead drawn in this crop
    pub lead: Lead,
    /// Position in segmenter output (1-based, row-major over the grid)
    pub index: usize,
    /// Fractional bounds `[x0, y0, x1, y1]` within the full image
    pub bounds: [f64; 4],
    /// Pixel rectangle within the full image
    pub rect: PixelRect,
    /// Cropped intensity pixels
    pub image: GrayscaleImage,
}

impl LeadRegion {
    /// Fraction of the full image height covered by this crop
    pub fn height_fraction(&self) -> f64 {
        self.bounds[3] - self.bounds[1]
    }
}
