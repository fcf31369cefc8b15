//! ecg_scan - paper ECG digitization and diagnosis
//!
//! Turns a photographed or scanned 12-lead ECG printout into a diagnosis:
//! grayscale conversion, fixed-layout lead segmentation, per-lead
//! binarization and contour tracing, fixed-length signal extraction, PCA
//! projection and a pretrained classifier.
//!
//! All pretrained state lives in an immutable [`ModelArtifacts`] bundle
//! that is loaded once and passed by reference into each run.
//!
//! ```no_run
//! use ecg_scan::{ModelArtifacts, Pipeline, tools};
//!
//! let artifacts = ModelArtifacts::load_dir("artifacts")?;
//! let scan = tools::load_rgb("scan.jpg")?;
//! let report = Pipeline::new(&artifacts).run(&scan)?;
//! println!("{}", report.label);
//! # Ok::<(), ecg_scan::EcgError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Artifact bundle loading and validation
pub mod artifacts;
/// Pretrained classifier
pub mod classifier;
/// Pipeline configuration and environment overrides
pub mod config;
/// Contour tracing and signal extraction
pub mod digitizer;
/// Error types
pub mod error;
/// Feature vector assembly
pub mod features;
/// Core data structures (images, leads, signals, labels)
pub mod models;
/// Staged pipeline API
pub mod pipeline;
/// Per-lead binarization preview
pub mod preprocess;
/// PCA projection
pub mod projection;
/// Lead segmentation by layout table
pub mod segmentation;
/// Synthetic ECG sheet rendering
pub mod synthetic;
/// File and dataset helpers for the CLI and benches
pub mod tools;
/// Image utilities (grayscale, blur, binarization, resampling)
pub mod utils;

pub use artifacts::ModelArtifacts;
pub use classifier::{Classifier, ClassifierModel};
pub use config::{DigitizerConfig, MissingTracePolicy, PipelineConfig};
pub use error::{EcgError, Result};
pub use models::{
    Condition, DiagnosisLabel, FeatureVector, GrayscaleImage, Lead, LeadRegion, LeadSignal,
    ReducedVector, SourceImage,
};
pub use pipeline::{Pipeline, PipelineReport, diagnose_batch};
pub use projection::Pca;
pub use segmentation::LeadLayout;

/// Diagnose one RGB buffer (3 bytes per pixel) with loaded artifacts
///
/// # Arguments
/// * `rgb` - Raw RGB bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `artifacts` - Pretrained bundle
pub fn diagnose(
    rgb: &[u8],
    width: usize,
    height: usize,
    artifacts: &ModelArtifacts,
) -> Result<DiagnosisLabel> {
    let image = SourceImage::new(width, height, rgb.to_vec())?;
    Pipeline::new(artifacts).diagnose(&image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> ModelArtifacts {
        let config = PipelineConfig::default();
        let d = config.feature_len();
        let pca = Pca {
            mean: vec![0.0; d],
            components: vec![vec![0.0; d]],
        };
        let classifier = Classifier {
            labels: Condition::default_labels(),
            model: ClassifierModel::Linear {
                coefficients: vec![vec![1.0]; 4],
                intercepts: vec![0.0; 4],
            },
        };
        ModelArtifacts::from_parts(config, pca, classifier).unwrap()
    }

    #[test]
    fn test_diagnose_rejects_bad_buffers() {
        let a = artifacts();
        assert!(matches!(diagnose(&[], 0, 0, &a), Err(EcgError::EmptyImage)));
        assert!(matches!(
            diagnose(&[0u8; 10], 2, 2, &a),
            Err(EcgError::BufferSize { expected: 12, actual: 10 })
        ));
    }

    #[test]
    fn test_diagnose_blank_scan() {
        let a = artifacts();
        let white = vec![255u8; 200 * 150 * 3];
        let err = diagnose(&white, 200, 150, &a).unwrap_err();
        assert!(err.is_input_error());
        let layout_order: Vec<Lead> = LeadLayout::standard().boxes.iter().map(|b| b.lead).collect();
        assert_eq!(err.failed_leads(), layout_order);
    }
}
