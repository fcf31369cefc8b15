//! Staged ECG pipeline
//!
//! [`Pipeline`] borrows an immutable [`ModelArtifacts`] bundle and exposes
//! every stage separately, so callers can stop anywhere and inspect the
//! intermediate result. [`Pipeline::run`] chains all stages and keeps every
//! intermediate in a [`PipelineReport`].

use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::artifacts::ModelArtifacts;
use crate::digitizer::{self, DigitizedLead};
use crate::error::{EcgError, Result};
use crate::features;
use crate::models::{
    DiagnosisLabel, FeatureVector, GrayscaleImage, Lead, LeadRegion, LeadSignal, ReducedVector,
    SourceImage,
};
use crate::preprocess::{self, BinarizedLead};
use crate::segmentation;
use crate::utils::grayscale;

/// Wall-clock time spent in each stage of one run
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    /// Grayscale conversion
    pub normalize: Duration,
    /// Cropping
    pub segment: Duration,
    /// Preprocessing preview
    pub preprocess: Duration,
    /// Contour extraction and scaling
    pub digitize: Duration,
    /// Assembly, projection and classification together
    pub inference: Duration,
}

impl StageTimings {
    /// Sum of all stages
    pub fn total(&self) -> Duration {
        self.normalize + self.segment + self.preprocess + self.digitize + self.inference
    }
}

/// Every intermediate of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Grayscale sheet
    pub gray: GrayscaleImage,
    /// Lead crops in layout order
    pub regions: Vec<LeadRegion>,
    /// Binarized preview of each crop
    pub binarized: Vec<BinarizedLead>,
    /// Digitized leads in layout order, with their contours
    pub digitized: Vec<DigitizedLead>,
    /// Assembled feature vector
    pub features: FeatureVector,
    /// PCA output
    pub reduced: ReducedVector,
    /// Predicted label
    pub label: DiagnosisLabel,
    /// Stage timings
    pub timings: StageTimings,
}

impl PipelineReport {
    /// Lead signals in layout order
    pub fn signals(&self) -> impl Iterator<Item = &LeadSignal> + '_ {
        self.digitized.iter().map(|d| &d.signal)
    }

    /// Leads that were substituted with zeros
    pub fn zero_filled_leads(&self) -> Vec<Lead> {
        self.signals()
            .filter(|s| s.zero_filled)
            .map(|s| s.lead)
            .collect()
    }
}

/// Pipeline bound to one artifact bundle
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    artifacts: &'a ModelArtifacts,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over loaded artifacts
    pub fn new(artifacts: &'a ModelArtifacts) -> Self {
        Self { artifacts }
    }

    /// Artifact bundle in use
    pub fn artifacts(&self) -> &'a ModelArtifacts {
        self.artifacts
    }

    /// Reject images below the configured minimum size
    pub fn check_input(&self, image: &SourceImage) -> Result<()> {
        let min = self.artifacts.config().min_image_size;
        if image.width() == 0 || image.height() == 0 {
            return Err(EcgError::EmptyImage);
        }
        if image.width() < min.width || image.height() < min.height {
            return Err(EcgError::ImageTooSmall {
                width: image.width(),
                height: image.height(),
                min_width: min.width,
                min_height: min.height,
            });
        }
        Ok(())
    }

    /// Stage 1: validate and convert to grayscale
    pub fn normalize(&self, image: &SourceImage) -> Result<GrayscaleImage> {
        self.check_input(image)?;
        grayscale::normalize(image)
    }

    /// Stage 2: crop the grayscale sheet into lead regions
    pub fn segment(&self, gray: &GrayscaleImage) -> Vec<LeadRegion> {
        segmentation::segment(gray, &self.artifacts.config().layout)
    }

    /// Colour crops of the input, for display
    pub fn segment_color(&self, image: &SourceImage) -> Vec<(Lead, SourceImage)> {
        segmentation::segment_color(image, &self.artifacts.config().layout)
    }

    /// Stage 3: binarized preview of each lead
    pub fn preprocess(&self, regions: &[LeadRegion]) -> Vec<BinarizedLead> {
        preprocess::preprocess_leads(regions, &self.artifacts.config().digitizer.binarization)
    }

    /// Stage 4 for one lead; no missing-trace policy is applied
    pub fn digitize_lead(&self, region: &LeadRegion) -> Result<DigitizedLead> {
        digitizer::digitize_lead(region, &self.artifacts.config().digitizer)
    }

    /// Stage 4: digitize every lead under the configured missing-trace policy
    pub fn digitize(&self, regions: &[LeadRegion]) -> Result<Vec<DigitizedLead>> {
        digitizer::digitize_leads(regions, &self.artifacts.config().digitizer)
    }

    /// Stage 5: concatenate signals in canonical lead order
    pub fn assemble(&self, signals: &[LeadSignal]) -> Result<FeatureVector> {
        let cfg = self.artifacts.config();
        features::assemble(signals, cfg.layout.len(), cfg.digitizer.sample_count)
    }

    /// Stage 6: PCA projection
    pub fn project(&self, features: &FeatureVector) -> Result<ReducedVector> {
        self.artifacts.pca().project(features)
    }

    /// Stage 7: classification
    pub fn classify(&self, reduced: &ReducedVector) -> Result<DiagnosisLabel> {
        self.artifacts.classifier().classify(reduced)
    }

    /// Run every stage and keep all intermediates
    pub fn run(&self, image: &SourceImage) -> Result<PipelineReport> {
        let mut timings = StageTimings::default();

        let t = Instant::now();
        let gray = self.normalize(image)?;
        timings.normalize = t.elapsed();
        log::debug!("normalized {}x{} image", gray.width(), gray.height());

        let t = Instant::now();
        let regions = self.segment(&gray);
        timings.segment = t.elapsed();
        log::debug!("segmented {} leads", regions.len());

        let t = Instant::now();
        let binarized = self.preprocess(&regions);
        timings.preprocess = t.elapsed();

        let t = Instant::now();
        let digitized = self.digitize(&regions)?;
        timings.digitize = t.elapsed();

        let t = Instant::now();
        let signals: Vec<LeadSignal> = digitized.iter().map(|d| d.signal.clone()).collect();
        let features = self.assemble(&signals)?;
        let reduced = self.project(&features)?;
        let label = self.classify(&reduced)?;
        timings.inference = t.elapsed();

        log::info!(
            "diagnosis: {} (class {}) in {:.1} ms",
            label,
            label.class_index,
            timings.total().as_secs_f64() * 1000.0
        );

        Ok(PipelineReport {
            gray,
            regions,
            binarized,
            digitized,
            features,
            reduced,
            label,
            timings,
        })
    }

    /// Label only, skipping the preprocessing preview
    pub fn diagnose(&self, image: &SourceImage) -> Result<DiagnosisLabel> {
        let gray = self.normalize(image)?;
        let regions = self.segment(&gray);
        let signals: Vec<LeadSignal> = self
            .digitize(&regions)?
            .into_iter()
            .map(|d| d.signal)
            .collect();
        let features = self.assemble(&signals)?;
        let reduced = self.project(&features)?;
        self.classify(&reduced)
    }
}

/// Diagnose independent images in parallel; results keep input order
pub fn diagnose_batch(
    artifacts: &ModelArtifacts,
    images: &[SourceImage],
) -> Vec<Result<DiagnosisLabel>> {
    let pipeline = Pipeline::new(artifacts);
    images.par_iter().map(|image| pipeline.diagnose(image)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierModel};
    use crate::config::{DigitizerConfig, PipelineConfig};
    use crate::models::Condition;
    use crate::projection::Pca;

    fn artifacts(sample_count: usize) -> ModelArtifacts {
        let config = PipelineConfig {
            digitizer: DigitizerConfig {
                sample_count,
                ..DigitizerConfig::default()
            },
            ..PipelineConfig::default()
        };
        let d = config.feature_len();
        let pca = Pca {
            mean: vec![0.0; d],
            components: vec![vec![1.0 / d as f64; d]],
        };
        let classifier = Classifier {
            labels: Condition::default_labels(),
            model: ClassifierModel::Linear {
                coefficients: vec![vec![0.0]; 4],
                intercepts: vec![0.0, 0.0, 1.0, 0.0],
            },
        };
        ModelArtifacts::from_parts(config, pca, classifier).unwrap()
    }

    #[test]
    fn small_images_rejected_before_any_stage() {
        let a = artifacts(16);
        let p = Pipeline::new(&a);
        let tiny = SourceImage::new(10, 10, vec![255; 300]).unwrap();
        let err = p.run(&tiny).unwrap_err();
        assert!(matches!(err, EcgError::ImageTooSmall { width: 10, height: 10, .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn blank_sheet_names_every_lead() {
        let a = artifacts(16);
        let p = Pipeline::new(&a);
        let blank = SourceImage::new(300, 200, vec![255; 300 * 200 * 3]).unwrap();
        let err = p.run(&blank).unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(err.failed_leads().len(), 13);
    }

    #[test]
    fn assemble_uses_configured_length() {
        let a = artifacts(16);
        let p = Pipeline::new(&a);
        let signals: Vec<LeadSignal> = Lead::CANONICAL
            .iter()
            .map(|&l| LeadSignal::zeros(l, 16, 0.0))
            .collect();
        assert_eq!(p.assemble(&signals).unwrap().len(), 13 * 16);
        let short: Vec<LeadSignal> = Lead::CANONICAL
            .iter()
            .map(|&l| LeadSignal::zeros(l, 15, 0.0))
            .collect();
        assert!(matches!(p.assemble(&short), Err(EcgError::SignalLength { .. })));
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let a = artifacts(16);
        let images = vec![
            SourceImage::new(10, 10, vec![255; 300]).unwrap(),
            SourceImage::new(300, 200, vec![255; 300 * 200 * 3]).unwrap(),
        ];
        let results = diagnose_batch(&a, &images);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(EcgError::ImageTooSmall { .. })));
        assert!(matches!(results[1], Err(EcgError::TraceExtraction { .. })));
    }
}
