use std::fmt;
use std::path::PathBuf;

use crate::models::Lead;

/// Pipeline stage that produced a per-lead failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Lead segmentation
    Segmentation,
    /// Trace binarization
    Binarization,
    /// Contour search and selection
    ContourSelection,
    /// Contour to signal conversion
    SignalConversion,
    /// Feature assembly
    FeatureAssembly,
    /// PCA projection
    Projection,
    /// Classification
    Classification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Segmentation => "segmentation",
            Stage::Binarization => "binarization",
            Stage::ContourSelection => "contour selection",
            Stage::SignalConversion => "signal conversion",
            Stage::FeatureAssembly => "feature assembly",
            Stage::Projection => "projection",
            Stage::Classification => "classification",
        };
        f.write_str(name)
    }
}

/// One lead that could not be digitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadFailure {
    /// Lead that failed
    pub lead: Lead,
    /// Stage at which it failed
    pub stage: Stage,
}

impl fmt::Display for LeadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.lead, self.stage)
    }
}

/// Errors produced by the ECG pipeline and its artifact loader
#[derive(Debug, thiserror::Error)]
pub enum EcgError {
    /// The input image has no pixels.
    #[error("input image is empty")]
    EmptyImage,

    /// The pixel buffer does not match the declared dimensions.
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes required by width x height x channels
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// The input image is below the minimum usable size.
    #[error("image {width}x{height} is below the minimum usable size {min_width}x{min_height}")]
    ImageTooSmall {
        /// Image width
        width: usize,
        /// Image height
        height: usize,
        /// Minimum width
        min_width: usize,
        /// Minimum height
        min_height: usize,
    },

    /// No trace contour was found in a single lead.
    #[error("no trace contour found in lead {lead}")]
    NoTraceContour {
        /// Lead without a trace
        lead: Lead,
    },

    /// One or more leads could not be digitized; the request was aborted.
    #[error("trace extraction failed for {} lead(s): {}", failures.len(), join_failures(failures))]
    TraceExtraction {
        /// Every lead that failed, in layout order
        failures: Vec<LeadFailure>,
    },

    /// A lead signal has the wrong number of samples.
    #[error("lead {lead} has {actual} samples, expected {expected}")]
    SignalLength {
        /// Offending lead
        lead: Lead,
        /// Configured sample count
        expected: usize,
        /// Actual sample count
        actual: usize,
    },

    /// The wrong number of lead signals reached the feature assembler.
    #[error("expected {expected} lead signals, got {actual}")]
    LeadCount {
        /// Number of leads in the layout
        expected: usize,
        /// Number of signals supplied
        actual: usize,
    },

    /// The same lead reached the feature assembler twice.
    #[error("lead {lead} supplied more than once")]
    DuplicateLead {
        /// Repeated lead
        lead: Lead,
    },

    /// A vector length disagrees with a loaded artifact.
    #[error("{stage}: input has dimension {actual}, artifact expects {expected}")]
    DimensionMismatch {
        /// Stage that rejected the input
        stage: Stage,
        /// Dimension expected by the artifact
        expected: usize,
        /// Dimension supplied
        actual: usize,
    },

    /// An artifact file could not be loaded.
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad {
        /// Artifact path
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Artifact contents are inconsistent.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Image file decoding/encoding failed.
    #[error("image I/O failed: {0}")]
    ImageIo(#[from] image::ImageError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, EcgError>;

impl EcgError {
    /// True for errors caused by the submitted image rather than configuration.
    ///
    /// Digitization failures count as input errors: a blank or unreadable
    /// scan is reported to the caller, never treated as a crash.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EcgError::EmptyImage
                | EcgError::BufferSize { .. }
                | EcgError::ImageTooSmall { .. }
                | EcgError::NoTraceContour { .. }
                | EcgError::TraceExtraction { .. }
                | EcgError::ImageIo(_)
        )
    }

    /// True for errors that must stop the process from serving requests.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EcgError::ArtifactLoad { .. }
                | EcgError::InvalidArtifact(_)
                | EcgError::DimensionMismatch { .. }
        )
    }

    /// Leads named by a digitization failure.
    pub fn failed_leads(&self) -> Vec<Lead> {
        match self {
            EcgError::NoTraceContour { lead } => vec![*lead],
            EcgError::TraceExtraction { failures } => failures.iter().map(|f| f.lead).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_failures(failures: &[LeadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
