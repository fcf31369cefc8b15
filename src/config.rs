//! Pipeline configuration
//!
//! Defaults describe the standard printout. A `pipeline.json` in the
//! artifact directory replaces them, and a few knobs can be overridden
//! from the environment for experiments.

use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{EcgError, Result};
use crate::segmentation::LeadLayout;
use crate::utils::binarization::TraceBinarization;

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

/// Which contour stands for the trace when several are found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourSelection {
    /// Largest bounding-box area, then most pixels, then first in raster order
    #[default]
    LargestBoundingArea,
    /// Longest traced boundary, then largest bounding-box area, then raster order
    LongestPerimeter,
}

impl FromStr for ContourSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "area" | "largest_bounding_area" => Ok(Self::LargestBoundingArea),
            "perimeter" | "longest_perimeter" => Ok(Self::LongestPerimeter),
            other => Err(format!("unknown contour selection '{other}'")),
        }
    }
}

/// What to do with a lead that has no trace contour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTracePolicy {
    /// Fail the whole request, naming every lead without a trace
    #[default]
    Abort,
    /// Substitute a zero signal and continue
    ZeroFill,
}

impl FromStr for MissingTracePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "zero-fill" | "zero_fill" | "zerofill" => Ok(Self::ZeroFill),
            other => Err(format!("unknown missing-trace policy '{other}'")),
        }
    }
}

/// Amplitude unit of the digitized samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeScaling {
    /// Millivolts relative to the isoelectric baseline
    #[default]
    Millivolts,
    /// Row position min-max scaled into [0, 1] (top of trace = 0)
    MinMax,
}

/// Paper calibration used to turn pixels into millivolts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Physical height of the full scanned sheet
    pub paper_height_mm: f64,
    /// Vertical gain of the printout (10 mm/mV standard)
    pub mm_per_mv: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            paper_height_mm: 210.0,
            mm_per_mv: 10.0,
        }
    }
}

impl Calibration {
    /// Millivolts per pixel of a working image `working_height` rows tall,
    /// resized from a crop covering `height_fraction` of the sheet
    pub fn mv_per_pixel(&self, height_fraction: f64, working_height: usize) -> f64 {
        if working_height == 0 || self.mm_per_mv <= 0.0 {
            return 0.0;
        }
        height_fraction * self.paper_height_mm / (working_height as f64 * self.mm_per_mv)
    }
}

/// Working image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSize {
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
}

/// Signal digitizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitizerConfig {
    /// Samples per lead after length normalization
    pub sample_count: usize,
    /// Working size for grid leads
    pub short_lead_size: WorkingSize,
    /// Working size for the rhythm strip
    pub long_lead_size: WorkingSize,
    /// Smoothing/threshold recipe, shared with the preprocessing preview
    pub binarization: TraceBinarization,
    /// Contour tie-break policy
    pub selection: ContourSelection,
    /// Components with fewer pixels are treated as specks
    pub min_trace_pixels: usize,
    /// Output amplitude unit
    pub amplitude: AmplitudeScaling,
    /// Paper calibration
    pub calibration: Calibration,
    /// Behaviour for leads without a trace
    pub missing_trace: MissingTracePolicy,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            sample_count: 255,
            short_lead_size: WorkingSize {
                width: 450,
                height: 300,
            },
            long_lead_size: WorkingSize {
                width: 2250,
                height: 300,
            },
            binarization: TraceBinarization::default(),
            selection: ContourSelection::default(),
            min_trace_pixels: 12,
            amplitude: AmplitudeScaling::default(),
            calibration: Calibration::default(),
            missing_trace: MissingTracePolicy::default(),
        }
    }
}

impl DigitizerConfig {
    /// Apply `ECG_*` environment overrides; unparseable values are ignored
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = parse_env::<usize>("ECG_SAMPLE_COUNT").filter(|&n| n >= 2) {
            self.sample_count = n;
        }
        let sigma = parse_env::<f32>("ECG_BLUR_SIGMA").filter(|s| s.is_finite() && *s >= 0.0);
        if let Some(sigma) = sigma {
            self.binarization.blur_sigma = sigma;
        }
        if let Some(policy) = parse_env::<MissingTracePolicy>("ECG_MISSING_TRACE") {
            self.missing_trace = policy;
        }
        if let Some(selection) = parse_env::<ContourSelection>("ECG_CONTOUR_SELECTION") {
            self.selection = selection;
        }
        self
    }

    /// Working size for a lead
    pub fn working_size(&self, rhythm: bool) -> WorkingSize {
        if rhythm {
            self.long_lead_size
        } else {
            self.short_lead_size
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.sample_count < 2 {
            return Err(EcgError::InvalidArtifact(format!(
                "sample_count must be at least 2, got {}",
                self.sample_count
            )));
        }
        for size in [self.short_lead_size, self.long_lead_size] {
            if size.width < 2 || size.height < 2 {
                return Err(EcgError::InvalidArtifact(format!(
                    "working size {}x{} is too small",
                    size.width, size.height
                )));
            }
        }
        let sigma = self.binarization.blur_sigma;
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(EcgError::InvalidArtifact(format!(
                "blur sigma must be finite and non-negative, got {sigma}"
            )));
        }
        let cal = self.calibration;
        if !(cal.paper_height_mm > 0.0 && cal.mm_per_mv > 0.0) {
            return Err(EcgError::InvalidArtifact(
                "calibration values must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Smallest image the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinImageSize {
    /// Minimum width
    pub width: usize,
    /// Minimum height
    pub height: usize,
}

impl Default for MinImageSize {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
        }
    }
}

/// Everything about the pipeline except the trained models
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lead layout table
    pub layout: LeadLayout,
    /// Digitizer settings
    pub digitizer: DigitizerConfig,
    /// Minimum accepted input size
    pub min_image_size: MinImageSize,
}

impl PipelineConfig {
    /// Length of the assembled feature vector
    pub fn feature_len(&self) -> usize {
        self.layout.len() * self.digitizer.sample_count
    }

    /// Validate layout and digitizer settings
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.digitizer.validate()
    }
}

static ENV_DEFAULT: OnceLock<PipelineConfig> = OnceLock::new();

/// Default configuration with environment overrides, read once per process
pub fn env_default() -> &'static PipelineConfig {
    ENV_DEFAULT.get_or_init(|| PipelineConfig {
        digitizer: DigitizerConfig::default().with_env_overrides(),
        ..PipelineConfig::default()
    })
}
