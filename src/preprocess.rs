//! Lead preprocessing preview
//!
//! Binarizes each lead crop at its native size for display. The digitizer
//! does not consume this output; it re-derives its own mask from the raw
//! crop with the same [`TraceBinarization`] recipe.

use crate::models::{BitMatrix, Lead, LeadRegion};
use crate::utils::binarization::{TraceBinarization, binarize_for_trace};

/// Thresholded lead crop, same size as the region
#[derive(Debug, Clone)]
pub struct BinarizedLead {
    /// Lead identity
    pub lead: Lead,
    /// Ink mask
    pub mask: BitMatrix,
    /// Otsu threshold chosen for this lead
    pub threshold: u8,
}

/// Smooth and binarize one lead
pub fn preprocess_lead(region: &LeadRegion, params: &TraceBinarization) -> BinarizedLead {
    let result = binarize_for_trace(&region.image, params);
    BinarizedLead {
        lead: region.lead,
        mask: result.mask,
        threshold: result.threshold,
    }
}

/// Smooth and binarize every lead, each with its own threshold
pub fn preprocess_leads(regions: &[LeadRegion], params: &TraceBinarization) -> Vec<BinarizedLead> {
    regions
        .iter()
        .map(|region| preprocess_lead(region, params))
        .collect()
}
