//! Lead segmentation by a fixed fractional layout
//!
//! The sheet is assumed to follow the standard printout: a 3x4 grid of
//! short leads in the upper three quarters and one rhythm strip spanning
//! the bottom band. Crops come from the layout table, not from content,
//! so rotated or re-cropped scans produce misaligned leads without any
//! error being raised.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EcgError, Result};
use crate::models::{GrayscaleImage, Lead, LeadRegion, PixelRect, SourceImage};

/// Width of the sheet the standard layout was measured on
const REFERENCE_WIDTH: f64 = 2213.0;
/// Height of the sheet the standard layout was measured on
const REFERENCE_HEIGHT: f64 = 1572.0;

/// Grid columns in reference pixels
const GRID_COLUMNS: [(f64, f64); 4] = [
    (150.0, 643.0),
    (646.0, 1135.0),
    (1140.0, 1625.0),
    (1630.0, 2125.0),
];
/// Grid rows in reference pixels
const GRID_ROWS: [(f64, f64); 3] = [(300.0, 600.0), (600.0, 900.0), (900.0, 1200.0)];
/// Leads printed in each grid cell, row-major
const GRID_LEADS: [[Lead; 4]; 3] = [
    [Lead::I, Lead::AVR, Lead::V1, Lead::V4],
    [Lead::II, Lead::AVL, Lead::V2, Lead::V5],
    [Lead::III, Lead::AVF, Lead::V3, Lead::V6],
];
/// Rhythm strip in reference pixels: (x0, y0, x1, y1)
const RHYTHM_STRIP: (f64, f64, f64, f64) = (150.0, 1250.0, 2125.0, 1480.0);

/// Bounding box of one lead as fractions of the full image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadBox {
    /// Lead printed in this box
    pub lead: Lead,
    /// Left edge fraction
    pub x0: f64,
    /// Top edge fraction
    pub y0: f64,
    /// Right edge fraction (exclusive)
    pub x1: f64,
    /// Bottom edge fraction (exclusive)
    pub y1: f64,
}

impl LeadBox {
    fn from_reference(lead: Lead, x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            lead,
            x0: x0 / REFERENCE_WIDTH,
            y0: y0 / REFERENCE_HEIGHT,
            x1: x1 / REFERENCE_WIDTH,
            y1: y1 / REFERENCE_HEIGHT,
        }
    }

    /// Fractional bounds as `[x0, y0, x1, y1]`
    pub fn bounds(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Fraction of the image height covered
    pub fn height_fraction(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Pixel rectangle for an image of the given size; never empty for a
    /// non-empty image
    pub fn pixel_rect(&self, width: usize, height: usize) -> PixelRect {
        let (x, x_end) = span(self.x0, self.x1, width);
        let (y, y_end) = span(self.y0, self.y1, height);
        PixelRect {
            x,
            y,
            width: x_end - x,
            height: y_end - y,
        }
    }

    fn overlaps(&self, other: &LeadBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

fn span(f0: f64, f1: f64, size: usize) -> (usize, usize) {
    if size == 0 {
        return (0, 0);
    }
    let start = ((f0 * size as f64).round() as usize).min(size - 1);
    let end = ((f1 * size as f64).round() as usize).clamp(start + 1, size);
    (start, end)
}

/// Table of lead boxes; swapping it supports other printouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadLayout {
    /// Layout name
    pub name: String,
    /// Boxes in segmenter output order
    pub boxes: Vec<LeadBox>,
}

impl LeadLayout {
    /// Standard 12-lead printout: 3x4 grid plus a lead II rhythm strip
    pub fn standard() -> Self {
        let mut boxes = Vec::with_capacity(13);
        for (row, &(y0, y1)) in GRID_ROWS.iter().enumerate() {
            for (col, &(x0, x1)) in GRID_COLUMNS.iter().enumerate() {
                boxes.push(LeadBox::from_reference(GRID_LEADS[row][col], x0, y0, x1, y1));
            }
        }
        let (x0, y0, x1, y1) = RHYTHM_STRIP;
        boxes.push(LeadBox::from_reference(Lead::Rhythm, x0, y0, x1, y1));
        Self {
            name: "standard-3x4-rhythm".to_string(),
            boxes,
        }
    }

    /// Number of leads
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True if the layout has no boxes
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box for a lead
    pub fn box_for(&self, lead: Lead) -> Option<&LeadBox> {
        self.boxes.iter().find(|b| b.lead == lead)
    }

    /// Check fractions, uniqueness and that boxes do not overlap
    pub fn validate(&self) -> Result<()> {
        if self.boxes.is_empty() {
            return Err(EcgError::InvalidArtifact(format!(
                "layout '{}' has no lead boxes",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for b in &self.boxes {
            let in_range = [b.x0, b.y0, b.x1, b.y1]
                .iter()
                .all(|v| v.is_finite() && (0.0..=1.0).contains(v));
            if !in_range || b.x0 >= b.x1 || b.y0 >= b.y1 {
                return Err(EcgError::InvalidArtifact(format!(
                    "layout '{}': box for lead {} is not a valid fractional rectangle",
                    self.name, b.lead
                )));
            }
            if !seen.insert(b.lead) {
                return Err(EcgError::InvalidArtifact(format!(
                    "layout '{}': lead {} appears more than once",
                    self.name, b.lead
                )));
            }
        }
        for (i, a) in self.boxes.iter().enumerate() {
            if let Some(b) = self.boxes[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(EcgError::InvalidArtifact(format!(
                    "layout '{}': boxes for {} and {} overlap",
                    self.name, a.lead, b.lead
                )));
            }
        }
        Ok(())
    }
}

impl Default for LeadLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Crop the intensity image into one region per layout box, in layout order
pub fn segment(gray: &GrayscaleImage, layout: &LeadLayout) -> Vec<LeadRegion> {
    layout
        .boxes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let rect = b.pixel_rect(gray.width(), gray.height());
            LeadRegion {
                lead: b.lead,
                index: i + 1,
                bounds: b.bounds(),
                rect,
                image: gray.crop(rect),
            }
        })
        .collect()
}

/// Same crops taken from the colour scan, for display
pub fn segment_color(image: &SourceImage, layout: &LeadLayout) -> Vec<(Lead, SourceImage)> {
    layout
        .boxes
        .iter()
        .map(|b| (b.lead, image.crop(b.pixel_rect(image.width(), image.height()))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_is_valid() {
        let layout = LeadLayout::standard();
        assert_eq!(layout.len(), 13);
        layout.validate().unwrap();
        let rhythm = layout.box_for(Lead::Rhythm).unwrap();
        let lead_i = layout.box_for(Lead::I).unwrap();
        assert!(rhythm.x1 - rhythm.x0 > 3.0 * (lead_i.x1 - lead_i.x0));
        assert!(rhythm.y0 > 0.75);
    }

    #[test]
    fn segment_returns_thirteen_regions_in_order() {
        let layout = LeadLayout::standard();
        for &(w, h) in &[(2213usize, 1572usize), (800, 600), (120, 90)] {
            let gray = GrayscaleImage::filled(w, h, 255);
            let regions = segment(&gray, &layout);
            assert_eq!(regions.len(), 13);
            for (i, r) in regions.iter().enumerate() {
                assert_eq!(r.index, i + 1);
                assert_eq!(r.lead, layout.boxes[i].lead);
                assert!(r.rect.area() > 0);
                assert_eq!(r.image.width(), r.rect.width);
                assert_eq!(r.image.height(), r.rect.height);
            }
            assert_eq!(regions[0].lead, Lead::I);
            assert_eq!(regions[1].lead, Lead::AVR);
            assert_eq!(regions[4].lead, Lead::II);
            assert_eq!(regions[12].lead, Lead::Rhythm);
        }
    }

    #[test]
    fn reference_sheet_matches_measured_pixels() {
        let layout = LeadLayout::standard();
        let rect = layout.boxes[0].pixel_rect(2213, 1572);
        assert_eq!(
            rect,
            PixelRect {
                x: 150,
                y: 300,
                width: 493,
                height: 300
            }
        );
        let rhythm = layout.boxes[12].pixel_rect(2213, 1572);
        assert_eq!((rhythm.x, rhythm.y), (150, 1250));
        assert_eq!((rhythm.width, rhythm.height), (1975, 230));
    }

    #[test]
    fn validate_rejects_bad_tables() {
        let mut layout = LeadLayout::standard();
        layout.boxes[1].lead = Lead::I;
        assert!(layout.validate().is_err());

        let mut layout = LeadLayout::standard();
        layout.boxes[0].x1 = 0.6;
        assert!(layout.validate().is_err());

        let mut layout = LeadLayout::standard();
        layout.boxes[3].y0 = 1.5;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn color_crops_match_gray_crops() {
        let layout = LeadLayout::standard();
        let img = SourceImage::new(300, 200, vec![255; 300 * 200 * 3]).unwrap();
        let gray = GrayscaleImage::filled(300, 200, 255);
        let color = segment_color(&img, &layout);
        let regions = segment(&gray, &layout);
        for ((lead, crop), region) in color.iter().zip(&regions) {
            assert_eq!(*lead, region.lead);
            assert_eq!(crop.width(), region.image.width());
            assert_eq!(crop.height(), region.image.height());
        }
    }
}
