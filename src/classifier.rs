//! Pretrained classifier over the reduced feature space
//!
//! Models are read-only after loading, so one `Classifier` can serve any
//! number of concurrent requests.

use serde::{Deserialize, Serialize};

use crate::error::{EcgError, Result, Stage};
use crate::models::{Condition, DiagnosisLabel, ReducedVector};

/// Model parameters, tagged by kind in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    /// One linear decision function per class
    Linear {
        /// C rows of K weights
        coefficients: Vec<Vec<f64>>,
        /// C offsets
        intercepts: Vec<f64>,
    },
    /// Majority vote among the k closest training samples
    KNearest {
        /// Neighbours consulted
        k: usize,
        /// M training points of length K
        samples: Vec<Vec<f64>>,
        /// Class index of each training point
        targets: Vec<usize>,
    },
}

/// Classifier with its ordered label set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    /// Label names, indexed by class
    #[serde(default = "Condition::default_labels")]
    pub labels: Vec<String>,
    /// Model parameters
    pub model: ClassifierModel,
}

impl Classifier {
    /// Number of classes the model can emit
    pub fn class_count(&self) -> usize {
        self.labels.len()
    }

    /// Expected reduced vector length
    pub fn input_dim(&self) -> usize {
        match &self.model {
            ClassifierModel::Linear { coefficients, .. } => {
                coefficients.first().map_or(0, Vec::len)
            }
            ClassifierModel::KNearest { samples, .. } => samples.first().map_or(0, Vec::len),
        }
    }

    /// Check shapes, targets and values
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(EcgError::InvalidArtifact(msg)) };
        if self.labels.is_empty() {
            return invalid("classifier has no labels".to_string());
        }
        let dim = self.input_dim();
        if dim == 0 {
            return invalid("classifier has no parameters".to_string());
        }

        match &self.model {
            ClassifierModel::Linear {
                coefficients,
                intercepts,
            } => {
                let classes = self.labels.len();
                if coefficients.len() != classes || intercepts.len() != classes {
                    return invalid(format!(
                        "linear model has {} coefficient rows and {} intercepts for {} labels",
                        coefficients.len(),
                        intercepts.len(),
                        self.labels.len()
                    ));
                }
                if coefficients.iter().any(|row| row.len() != dim) {
                    return invalid("linear model coefficient rows differ in length".to_string());
                }
                if !coefficients.iter().flatten().chain(intercepts).all(|v| v.is_finite()) {
                    return invalid("linear model contains non-finite values".to_string());
                }
            }
            ClassifierModel::KNearest {
                k,
                samples,
                targets,
            } => {
                if *k == 0 || *k > samples.len() {
                    return invalid(format!("k = {k} with {} training samples", samples.len()));
                }
                if targets.len() != samples.len() {
                    return invalid(format!(
                        "{} targets for {} training samples",
                        targets.len(),
                        samples.len()
                    ));
                }
                if samples.iter().any(|row| row.len() != dim) {
                    return invalid("training samples differ in length".to_string());
                }
                if let Some(t) = targets.iter().find(|&&t| t >= self.labels.len()) {
                    return invalid(format!("target {t} has no label"));
                }
                if !samples.iter().flatten().all(|v| v.is_finite()) {
                    return invalid("training samples contain non-finite values".to_string());
                }
            }
        }
        Ok(())
    }

    /// Per-class scores. Higher is better: decision values for the linear
    /// model, neighbour votes for k-nearest.
    pub fn decision_scores(&self, x: &ReducedVector) -> Result<Vec<f64>> {
        self.check_dim(x)?;
        let x = x.as_slice();
        match &self.model {
            ClassifierModel::Linear {
                coefficients,
                intercepts,
            } => Ok(coefficients
                .iter()
                .zip(intercepts)
                .map(|(row, &b)| {
                    let mut acc = b;
                    for (&w, &xi) in row.iter().zip(x) {
                        acc += w * xi;
                    }
                    acc
                })
                .collect()),
            ClassifierModel::KNearest { .. } => Ok(self
                .neighbour_votes(x)
                .into_iter()
                .map(|(votes, _)| votes as f64)
                .collect()),
        }
    }

    /// Predict one label
    pub fn classify(&self, x: &ReducedVector) -> Result<DiagnosisLabel> {
        self.check_dim(x)?;
        let class_index = match &self.model {
            ClassifierModel::Linear { .. } => {
                let scores = self.decision_scores(x)?;
                argmax_first(&scores)
            }
            ClassifierModel::KNearest { .. } => {
                let votes = self.neighbour_votes(x.as_slice());
                let mut best = 0;
                for (class, &(count, dist)) in votes.iter().enumerate().skip(1) {
                    let (best_count, best_dist) = votes[best];
                    if count > best_count || (count == best_count && dist < best_dist) {
                        best = class;
                    }
                }
                best
            }
        };

        let name = self.labels.get(class_index).cloned().ok_or_else(|| {
            EcgError::InvalidArtifact(format!("class {class_index} has no label"))
        })?;
        Ok(DiagnosisLabel { class_index, name })
    }

    fn check_dim(&self, x: &ReducedVector) -> Result<()> {
        if x.len() != self.input_dim() {
            return Err(EcgError::DimensionMismatch {
                stage: Stage::Classification,
                expected: self.input_dim(),
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// Votes and summed distance per class among the k nearest samples
    fn neighbour_votes(&self, x: &[f64]) -> Vec<(usize, f64)> {
        let mut votes = vec![(0usize, 0.0f64); self.labels.len()];
        let ClassifierModel::KNearest {
            k,
            samples,
            targets,
        } = &self.model
        else {
            return votes;
        };

        let mut distances: Vec<(f64, usize)> = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (euclidean(x, s), i))
            .collect();
        // Sample index breaks distance ties
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for &(dist, i) in distances.iter().take(*k) {
            if let Some(slot) = targets.get(i).and_then(|&t| votes.get_mut(t)) {
                slot.0 += 1;
                slot.1 += dist;
            }
        }
        votes
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    let mut acc = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let d = x - y;
        acc += d * d;
    }
    acc.sqrt()
}

/// Index of the largest value; the first one wins ties
fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> Classifier {
        Classifier {
            labels: Condition::default_labels(),
            model: ClassifierModel::Linear {
                coefficients: vec![
                    vec![1.0, 0.0],
                    vec![0.0, 1.0],
                    vec![-1.0, 0.0],
                    vec![0.0, -1.0],
                ],
                intercepts: vec![0.0; 4],
            },
        }
    }

    fn knn(k: usize) -> Classifier {
        Classifier {
            labels: vec!["a".into(), "b".into(), "c".into()],
            model: ClassifierModel::KNearest {
                k,
                samples: vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0], vec![20.0]],
                targets: vec![0, 0, 1, 1, 2],
            },
        }
    }

    #[test]
    fn linear_picks_highest_score() {
        let c = linear();
        c.validate().unwrap();
        let label = c.classify(&ReducedVector(vec![-3.0, 1.0])).unwrap();
        assert_eq!(label.class_index, 2);
        assert_eq!(label.condition(), Some(Condition::Normal));
        let scores = c.decision_scores(&ReducedVector(vec![-3.0, 1.0])).unwrap();
        assert_eq!(scores, vec![-3.0, 1.0, 3.0, -1.0]);
    }

    #[test]
    fn linear_ties_go_to_lowest_index() {
        let label = linear().classify(&ReducedVector(vec![0.0, 0.0])).unwrap();
        assert_eq!(label.class_index, 0);
    }

    #[test]
    fn knn_majority_vote() {
        let c = knn(3);
        c.validate().unwrap();
        assert_eq!(c.classify(&ReducedVector(vec![0.4])).unwrap().name, "a");
        assert_eq!(c.classify(&ReducedVector(vec![12.0])).unwrap().name, "b");
    }

    #[test]
    fn knn_vote_tie_uses_distance() {
        // Two neighbours, one from each class; class 1 is closer
        let c = knn(2);
        let label = c.classify(&ReducedVector(vec![5.6])).unwrap();
        assert_eq!(label.name, "b");
    }

    #[test]
    fn same_input_same_label() {
        let c = knn(3);
        let x = ReducedVector(vec![15.2]);
        let first = c.classify(&x).unwrap();
        for _ in 0..10 {
            assert_eq!(c.classify(&x).unwrap(), first);
        }
    }

    #[test]
    fn dimension_checked() {
        let err = linear().classify(&ReducedVector(vec![1.0])).unwrap_err();
        assert!(matches!(
            err,
            EcgError::DimensionMismatch {
                stage: Stage::Classification,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn validate_rejects_bad_models() {
        let mut c = linear();
        c.labels.pop();
        assert!(c.validate().is_err());

        let mut c = knn(3);
        if let ClassifierModel::KNearest { targets, .. } = &mut c.model {
            targets[0] = 7;
        }
        assert!(c.validate().is_err());

        assert!(knn(0).validate().is_err());
        assert!(knn(6).validate().is_err());
    }

    #[test]
    fn json_tagged_and_default_labels() {
        let json = r#"{"model":{"kind":"k_nearest","k":1,
            "samples":[[0.0],[1.0],[2.0],[3.0]],"targets":[0,1,2,3]}}"#;
        let c: Classifier = serde_json::from_str(json).unwrap();
        c.validate().unwrap();
        assert_eq!(c.labels[2], "Normal");
        assert_eq!(c.classify(&ReducedVector(vec![2.1])).unwrap().name, "Normal");
    }
}
