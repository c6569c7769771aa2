//! Multinomial logistic-regression head over reduced features.

use crate::error::{PipelineError, PipelineResult};
use crate::types::DisputeCategory;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk shape of `classifier.json`: per-class weights exported from the
/// training pipeline, labelled by category.
#[derive(Debug, Deserialize)]
struct ClassifierArtifact {
    /// Category labels, one per coefficient row
    classes: Vec<String>,
    /// Weight rows, one per class, each of feature-space length
    coefficients: Vec<Vec<f32>>,
    /// Bias terms, one per class
    intercepts: Vec<f32>,
}

/// Result of classifying one reduced feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Class with the highest predicted probability
    pub category: DisputeCategory,
    /// That class's probability mass (0.0 - 1.0)
    pub confidence: f64,
}

/// Pre-trained multinomial classifier over the five dispute categories.
pub struct CategoryClassifier {
    // Indexed by DisputeCategory::ALL ordinal.
    coefficients: [Vec<f32>; 5],
    intercepts: [f64; 5],
    input_dim: usize,
}

impl CategoryClassifier {
    /// Load trained weights from `classifier.json` in the artifact directory.
    pub fn load(artifact_dir: &Path) -> PipelineResult<Self> {
        let path = artifact_dir.join("classifier.json");
        let not_loaded = |reason: String| PipelineError::ArtifactNotLoaded {
            name: "classifier.json",
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read(&path).map_err(|e| not_loaded(e.to_string()))?;
        let artifact: ClassifierArtifact =
            serde_json::from_slice(&raw).map_err(|e| not_loaded(e.to_string()))?;

        let classifier = Self::from_artifact(artifact).map_err(not_loaded)?;

        info!(
            input_dim = classifier.input_dim,
            classes = DisputeCategory::ALL.len(),
            path = %path.display(),
            "loaded classifier weights"
        );
        Ok(classifier)
    }

    fn from_artifact(artifact: ClassifierArtifact) -> Result<Self, String> {
        let class_count = DisputeCategory::ALL.len();
        if artifact.classes.len() != class_count
            || artifact.coefficients.len() != class_count
            || artifact.intercepts.len() != class_count
        {
            return Err(format!(
                "expected {class_count} classes, got {} labels / {} rows / {} intercepts",
                artifact.classes.len(),
                artifact.coefficients.len(),
                artifact.intercepts.len()
            ));
        }

        let input_dim = artifact.coefficients[0].len();
        if input_dim == 0 {
            return Err("empty coefficient rows".to_string());
        }
        for (label, row) in artifact.classes.iter().zip(&artifact.coefficients) {
            if row.len() != input_dim {
                return Err(format!(
                    "coefficient row for '{label}' has length {}, expected {input_dim}",
                    row.len()
                ));
            }
        }

        // Re-order artifact rows into canonical category order, requiring
        // each of the five labels exactly once.
        let mut coefficients: [Vec<f32>; 5] = Default::default();
        let mut intercepts = [0.0f64; 5];
        let mut seen = [false; 5];

        for (i, label) in artifact.classes.iter().enumerate() {
            let category = DisputeCategory::from_label(label)
                .ok_or_else(|| format!("unknown category label '{label}'"))?;
            let ordinal = category as usize;
            if seen[ordinal] {
                return Err(format!("duplicate category label '{label}'"));
            }
            seen[ordinal] = true;
            coefficients[ordinal] = artifact.coefficients[i].clone();
            intercepts[ordinal] = artifact.intercepts[i] as f64;
        }

        Ok(Self {
            coefficients,
            intercepts,
            input_dim,
        })
    }

    /// Build a classifier directly from per-category weight rows in
    /// canonical category order.
    pub fn from_parts(coefficients: [Vec<f32>; 5], intercepts: [f64; 5]) -> PipelineResult<Self> {
        let input_dim = coefficients[0].len();
        if input_dim == 0 || coefficients.iter().any(|row| row.len() != input_dim) {
            return Err(PipelineError::ArtifactNotLoaded {
                name: "classifier.json",
                path: "<in-memory>".to_string(),
                reason: "ragged or empty coefficient rows".to_string(),
            });
        }
        Ok(Self {
            coefficients,
            intercepts,
            input_dim,
        })
    }

    /// Feature-space length the classifier expects.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Class probabilities in canonical category order (softmax over
    /// `w·x + b`, numerically stabilized).
    pub fn probabilities(&self, features: &[f32]) -> PipelineResult<[f64; 5]> {
        if features.len() != self.input_dim {
            return Err(PipelineError::DimensionMismatch {
                expected: self.input_dim,
                actual: features.len(),
            });
        }

        let mut logits = [0.0f64; 5];
        for (k, row) in self.coefficients.iter().enumerate() {
            let dot: f64 = row
                .iter()
                .zip(features)
                .map(|(w, x)| *w as f64 * *x as f64)
                .sum();
            logits[k] = dot + self.intercepts[k];
        }

        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut probs = [0.0f64; 5];
        let mut total = 0.0;
        for (p, logit) in probs.iter_mut().zip(logits) {
            *p = (logit - max).exp();
            total += *p;
        }
        for p in &mut probs {
            *p /= total;
        }
        Ok(probs)
    }

    /// Classify a reduced feature vector.
    ///
    /// The winner is the category with the highest probability. Exact ties
    /// resolve to the lower ordinal in canonical category order: the scan
    /// below only replaces the leader on a strictly greater probability.
    pub fn predict(&self, features: &[f32]) -> PipelineResult<Prediction> {
        let probs = self.probabilities(features)?;

        let mut category = DisputeCategory::ALL[0];
        let mut confidence = probs[0];
        for (cat, &p) in DisputeCategory::ALL.into_iter().zip(&probs).skip(1) {
            if p > confidence {
                category = cat;
                confidence = p;
            }
        }

        Ok(Prediction {
            category,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One indicator feature per category: feature k votes for class k.
    fn indicator_classifier() -> CategoryClassifier {
        let mut coefficients: [Vec<f32>; 5] = Default::default();
        for (k, row) in coefficients.iter_mut().enumerate() {
            let mut weights = vec![0.0f32; 5];
            weights[k] = 1.0;
            *row = weights;
        }
        CategoryClassifier::from_parts(coefficients, [0.0; 5]).unwrap()
    }

    #[test]
    fn picks_class_with_highest_logit() {
        let clf = indicator_classifier();

        let pred = clf.predict(&[0.0, 0.0, 5.0, 0.0, 0.0]).unwrap();
        assert_eq!(pred.category, DisputeCategory::Fraud);

        let pred = clf.predict(&[0.0, 0.0, 0.0, 0.0, 5.0]).unwrap();
        assert_eq!(pred.category, DisputeCategory::RefundPending);
    }

    #[test]
    fn confidence_is_winning_probability_in_bounds() {
        let clf = indicator_classifier();
        let pred = clf.predict(&[3.0, 0.0, 0.0, 0.0, 0.0]).unwrap();

        assert_eq!(pred.category, DisputeCategory::DuplicateCharge);
        assert!(pred.confidence > 0.0 && pred.confidence <= 1.0);

        let probs = clf.probabilities(&[3.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(pred.confidence, probs[0]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn exact_tie_resolves_to_lower_ordinal() {
        // All-zero features: every class gets identical probability 0.2.
        let clf = indicator_classifier();
        let pred = clf.predict(&[0.0; 5]).unwrap();

        assert_eq!(pred.category, DisputeCategory::DuplicateCharge);
        assert!((pred.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn two_way_tie_ignores_later_equal_class() {
        // FAILED_TRANSACTION and OTHERS share the top logit.
        let clf = indicator_classifier();
        let pred = clf.predict(&[0.0, 2.0, 0.0, 2.0, 0.0]).unwrap();
        assert_eq!(pred.category, DisputeCategory::FailedTransaction);
    }

    #[test]
    fn prediction_is_deterministic() {
        let clf = indicator_classifier();
        let features = [0.7, -0.2, 1.3, 0.0, 0.4];
        let a = clf.predict(&features).unwrap();
        let b = clf.predict(&features).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let clf = indicator_classifier();
        let err = clf.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn artifact_rows_reordered_by_label() {
        // Artifact lists FRAUD first; prediction must still map feature 0
        // (its weight row) to FRAUD.
        let artifact = ClassifierArtifact {
            classes: vec![
                "FRAUD".to_string(),
                "DUPLICATE_CHARGE".to_string(),
                "FAILED_TRANSACTION".to_string(),
                "OTHERS".to_string(),
                "REFUND_PENDING".to_string(),
            ],
            coefficients: vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
                vec![0.0, 0.0],
                vec![0.0, 0.0],
            ],
            intercepts: vec![0.0; 5],
        };
        let clf = CategoryClassifier::from_artifact(artifact).unwrap();

        let pred = clf.predict(&[4.0, 0.0]).unwrap();
        assert_eq!(pred.category, DisputeCategory::Fraud);

        let pred = clf.predict(&[0.0, 4.0]).unwrap();
        assert_eq!(pred.category, DisputeCategory::DuplicateCharge);
    }

    #[test]
    fn unknown_label_rejected() {
        let artifact = ClassifierArtifact {
            classes: vec![
                "FRAUD".to_string(),
                "DUPLICATE_CHARGE".to_string(),
                "FAILED_TRANSACTION".to_string(),
                "OTHERS".to_string(),
                "CHARGEBACK".to_string(),
            ],
            coefficients: vec![vec![0.0]; 5],
            intercepts: vec![0.0; 5],
        };
        assert!(CategoryClassifier::from_artifact(artifact).is_err());
    }
}
