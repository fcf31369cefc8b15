//! PCA projection stage
//!
//! The fitted transform is stored as the centering vector `mean` (length D)
//! and `components`, K rows of length D. Projection is
//! `y[k] = sum_j (x[j] - mean[j]) * components[k][j]`, accumulated in index
//! order so results are reproducible bit for bit.

use serde::{Deserialize, Serialize};

use crate::error::{EcgError, Result, Stage};
use crate::models::{FeatureVector, ReducedVector};

/// Pretrained principal component projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Per-feature mean subtracted before projecting
    pub mean: Vec<f64>,
    /// Principal axes, one row per output component
    pub components: Vec<Vec<f64>>,
}

impl Pca {
    /// Expected feature vector length
    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    /// Number of output components
    pub fn output_dim(&self) -> usize {
        self.components.len()
    }

    /// Check shapes and values
    pub fn validate(&self) -> Result<()> {
        if self.mean.is_empty() {
            return Err(EcgError::InvalidArtifact("PCA mean vector is empty".to_string()));
        }
        if self.components.is_empty() {
            return Err(EcgError::InvalidArtifact("PCA has no components".to_string()));
        }
        for (k, row) in self.components.iter().enumerate() {
            if row.len() != self.mean.len() {
                return Err(EcgError::InvalidArtifact(format!(
                    "PCA component {k} has length {}, mean has length {}",
                    row.len(),
                    self.mean.len()
                )));
            }
        }
        let finite = self
            .mean
            .iter()
            .chain(self.components.iter().flatten())
            .all(|v| v.is_finite());
        if !finite {
            return Err(EcgError::InvalidArtifact(
                "PCA contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Project a feature vector; the length must match exactly
    pub fn project(&self, features: &FeatureVector) -> Result<ReducedVector> {
        self.project_slice(&features.values)
    }

    /// Project raw values
    pub fn project_slice(&self, x: &[f64]) -> Result<ReducedVector> {
        if x.len() != self.input_dim() {
            return Err(EcgError::DimensionMismatch {
                stage: Stage::Projection,
                expected: self.input_dim(),
                actual: x.len(),
            });
        }

        let reduced = self
            .components
            .iter()
            .map(|axis| {
                let mut acc = 0.0;
                for ((&xi, &mi), &ai) in x.iter().zip(&self.mean).zip(axis) {
                    acc += (xi - mi) * ai;
                }
                acc
            })
            .collect();
        Ok(ReducedVector(reduced))
    }
}
