//! Immutable artifact bundle: pipeline configuration, PCA and classifier
//!
//! Loaded once at startup and shared by reference with every request.
//! A bundle whose parts disagree on dimensions is never constructed.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::error::{EcgError, Result, Stage};
use crate::projection::Pca;

/// PCA file name inside an artifact directory
pub const PCA_FILE: &str = "pca.json";
/// Classifier file name inside an artifact directory
pub const CLASSIFIER_FILE: &str = "classifier.json";
/// Optional pipeline configuration file name
pub const PIPELINE_FILE: &str = "pipeline.json";

/// Everything the pipeline needs besides the image
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    config: PipelineConfig,
    pca: Pca,
    classifier: Classifier,
}

impl ModelArtifacts {
    /// Build a bundle from parts, validating each and their agreement
    pub fn from_parts(config: PipelineConfig, pca: Pca, classifier: Classifier) -> Result<Self> {
        config.validate()?;
        pca.validate()?;
        classifier.validate()?;

        let feature_len = config.feature_len();
        if pca.input_dim() != feature_len {
            return Err(EcgError::DimensionMismatch {
                stage: Stage::Projection,
                expected: pca.input_dim(),
                actual: feature_len,
            });
        }
        if classifier.input_dim() != pca.output_dim() {
            return Err(EcgError::DimensionMismatch {
                stage: Stage::Classification,
                expected: classifier.input_dim(),
                actual: pca.output_dim(),
            });
        }

        Ok(Self {
            config,
            pca,
            classifier,
        })
    }

    /// Load `pca.json`, `classifier.json` and optionally `pipeline.json`.
    ///
    /// Without `pipeline.json` the environment-adjusted defaults are used.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let pipeline_path = dir.join(PIPELINE_FILE);
        let config = if pipeline_path.exists() {
            read_json::<PipelineConfig>(&pipeline_path)?
        } else {
            crate::config::env_default().clone()
        };
        let pca: Pca = read_json(&dir.join(PCA_FILE))?;
        let classifier: Classifier = read_json(&dir.join(CLASSIFIER_FILE))?;

        let artifacts = Self::from_parts(config, pca, classifier)?;
        log::info!(
            "loaded artifacts from {}: layout '{}' ({} leads), N={}, PCA {}->{}, {} classes",
            dir.display(),
            artifacts.config.layout.name,
            artifacts.config.layout.len(),
            artifacts.config.digitizer.sample_count,
            artifacts.pca.input_dim(),
            artifacts.pca.output_dim(),
            artifacts.classifier.class_count()
        );
        Ok(artifacts)
    }

    /// Write the bundle as JSON files into `dir`, creating it if needed
    pub fn save_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        fs::write(dir.join(PIPELINE_FILE), serde_json::to_vec_pretty(&self.config)?)?;
        fs::write(dir.join(PCA_FILE), serde_json::to_vec(&self.pca)?)?;
        fs::write(dir.join(CLASSIFIER_FILE), serde_json::to_vec(&self.classifier)?)?;
        Ok(())
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// PCA projection
    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    /// Classifier
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Ordered label set
    pub fn labels(&self) -> &[String] {
        &self.classifier.labels
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| EcgError::ArtifactLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| EcgError::ArtifactLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
