//! Signal digitizer: lead crop to fixed-length amplitude series
//!
//! Each lead is resized to its working size, binarized with the shared
//! trace recipe, reduced to its ink contours, and the chosen contour is
//! projected onto the time axis, resampled and scaled.

pub mod components;
pub mod contour;
pub mod trace;

use crate::config::{DigitizerConfig, MissingTracePolicy};
use crate::error::{EcgError, LeadFailure, Result, Stage};
use crate::models::{LeadRegion, LeadSignal, TraceContour};
use crate::utils::binarization::binarize_for_trace;
use crate::utils::resample::resize_gray;

pub use contour::{find_contours, select_trace};

/// Digitizer output for one lead, with what it was derived from
#[derive(Debug, Clone)]
pub struct DigitizedLead {
    /// Amplitude series
    pub signal: LeadSignal,
    /// Contour the series came from; `None` when zero-filled
    pub contour: Option<TraceContour>,
    /// Otsu threshold computed for this lead
    pub threshold: u8,
    /// Number of contours found before selection
    pub contour_count: usize,
}

/// Digitize one lead. A lead with no usable contour is an error here;
/// the missing-trace policy is applied by [`digitize_leads`].
pub fn digitize_lead(region: &LeadRegion, cfg: &DigitizerConfig) -> Result<DigitizedLead> {
    let size = cfg.working_size(region.lead.is_rhythm());
    let working = resize_gray(&region.image, size.width, size.height);
    let binary = binarize_for_trace(&working, &cfg.binarization);

    let contours = find_contours(&binary.mask, cfg.min_trace_pixels);
    let contour_count = contours.len();
    let Some(trace) = select_trace(&contours, cfg.selection) else {
        log::debug!("lead {}: no contour above {} px", region.lead, cfg.min_trace_pixels);
        return Err(EcgError::NoTraceContour { lead: region.lead });
    };

    let mv_per_pixel = cfg
        .calibration
        .mv_per_pixel(region.height_fraction(), size.height);
    let rows = trace::column_profile(trace);
    let samples = trace::scale_profile(&rows, cfg.sample_count, cfg.amplitude, mv_per_pixel);

    log::debug!(
        "lead {}: threshold={} contours={} selected bbox=({},{})-({},{}) points={}",
        region.lead,
        binary.threshold,
        contour_count,
        trace.min_x,
        trace.min_y,
        trace.max_x,
        trace.max_y,
        trace.perimeter()
    );

    Ok(DigitizedLead {
        signal: LeadSignal {
            lead: region.lead,
            samples,
            mv_per_pixel,
            zero_filled: false,
        },
        contour: Some(trace.clone()),
        threshold: binary.threshold,
        contour_count,
    })
}

/// Digitize every lead, applying the missing-trace policy.
///
/// Under `Abort` all leads are still attempted so the error lists every
/// lead without a trace.
pub fn digitize_leads(regions: &[LeadRegion], cfg: &DigitizerConfig) -> Result<Vec<DigitizedLead>> {
    let mut digitized = Vec::with_capacity(regions.len());
    let mut failures = Vec::new();

    for region in regions {
        match digitize_lead(region, cfg) {
            Ok(lead) => digitized.push(lead),
            Err(EcgError::NoTraceContour { lead }) => match cfg.missing_trace {
                MissingTracePolicy::Abort => failures.push(LeadFailure {
                    lead,
                    stage: Stage::ContourSelection,
                }),
                MissingTracePolicy::ZeroFill => {
                    log::warn!("lead {lead}: no trace found, substituting zeros");
                    let size = cfg.working_size(lead.is_rhythm());
                    let mv_per_pixel = cfg
                        .calibration
                        .mv_per_pixel(region.height_fraction(), size.height);
                    digitized.push(DigitizedLead {
                        signal: LeadSignal::zeros(lead, cfg.sample_count, mv_per_pixel),
                        contour: None,
                        threshold: 0,
                        contour_count: 0,
                    });
                }
            },
            Err(other) => return Err(other),
        }
    }

    if failures.is_empty() {
        Ok(digitized)
    } else {
        Err(EcgError::TraceExtraction { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GrayscaleImage, Lead, PixelRect};

    fn region(lead: Lead, image: GrayscaleImage) -> LeadRegion {
        let rect = PixelRect {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        };
        LeadRegion {
            lead,
            index: 1,
            bounds: [0.0, 0.0, 0.25, 0.2],
            rect,
            image,
        }
    }

    fn line_image(width: usize, height: usize, row: usize) -> GrayscaleImage {
        let mut img = GrayscaleImage::filled(width, height, 245);
        for x in 10..width - 10 {
            for y in row - 1..=row + 1 {
                img.set(x, y, 20);
            }
        }
        img
    }

    #[test]
    fn flat_line_digitizes_to_zero_millivolts() {
        let cfg = DigitizerConfig::default();
        let lead = digitize_lead(&region(Lead::V2, line_image(450, 300, 150)), &cfg).unwrap();
        assert_eq!(lead.signal.len(), cfg.sample_count);
        assert!(lead.signal.samples.iter().all(|v| v.abs() < 1e-9));
        assert!(!lead.signal.zero_filled);
        assert!(lead.contour.is_some());
        assert_eq!(lead.contour_count, 1);
    }

    #[test]
    fn blank_lead_is_a_per_lead_error() {
        let cfg = DigitizerConfig::default();
        let err = digitize_lead(&region(Lead::AVF, GrayscaleImage::filled(120, 80, 255)), &cfg)
            .unwrap_err();
        assert!(matches!(err, EcgError::NoTraceContour { lead: Lead::AVF }));
    }

    #[test]
    fn policy_controls_missing_traces() {
        let regions = vec![
            region(Lead::I, line_image(200, 100, 50)),
            region(Lead::II, GrayscaleImage::filled(200, 100, 255)),
            region(Lead::III, GrayscaleImage::filled(200, 100, 255)),
        ];

        let abort = DigitizerConfig::default();
        let err = digitize_leads(&regions, &abort).unwrap_err();
        assert_eq!(err.failed_leads(), vec![Lead::II, Lead::III]);

        let degrade = DigitizerConfig {
            missing_trace: MissingTracePolicy::ZeroFill,
            ..DigitizerConfig::default()
        };
        let leads = digitize_leads(&regions, &degrade).unwrap();
        assert_eq!(leads.len(), 3);
        assert!(!leads[0].signal.zero_filled);
        assert!(leads[1].signal.zero_filled);
        assert_eq!(leads[2].signal.samples, vec![0.0; degrade.sample_count]);
    }

    #[test]
    fn output_length_ignores_crop_size() {
        let cfg = DigitizerConfig::default();
        for &(w, h) in &[(60usize, 40usize), (493, 300), (900, 500)] {
            let lead = digitize_lead(&region(Lead::V5, line_image(w, h, h / 2)), &cfg).unwrap();
            assert_eq!(lead.signal.len(), cfg.sample_count);
        }
    }
}
