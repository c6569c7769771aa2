//! Pre-fitted PCA projection for embedding compression.

use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk shape of `pca.json`: the fitted mean and principal components
/// exported from the training pipeline.
#[derive(Debug, Deserialize)]
struct PcaArtifact {
    /// Per-dimension mean of the training embeddings
    mean: Vec<f32>,
    /// Principal components, one row per output dimension
    components: Vec<Vec<f32>>,
}

/// Applies a fitted linear projection: subtract the mean, then project onto
/// the principal-component basis.
///
/// The transform is immutable for the lifetime of the process; it is never
/// refit online.
#[derive(Debug)]
pub struct PcaReducer {
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
}

impl PcaReducer {
    /// Load the fitted transform from `pca.json` in the artifact directory.
    pub fn load(artifact_dir: &Path) -> PipelineResult<Self> {
        let path = artifact_dir.join("pca.json");
        let not_loaded = |reason: String| PipelineError::ArtifactNotLoaded {
            name: "pca.json",
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read(&path).map_err(|e| not_loaded(e.to_string()))?;
        let artifact: PcaArtifact =
            serde_json::from_slice(&raw).map_err(|e| not_loaded(e.to_string()))?;

        let reducer = Self::from_artifact(artifact).map_err(|e| not_loaded(e))?;

        info!(
            input_dim = reducer.input_dim(),
            output_dim = reducer.output_dim(),
            path = %path.display(),
            "loaded PCA transform"
        );
        Ok(reducer)
    }

    fn from_artifact(artifact: PcaArtifact) -> Result<Self, String> {
        if artifact.mean.is_empty() {
            return Err("empty mean vector".to_string());
        }
        if artifact.components.is_empty() {
            return Err("no principal components".to_string());
        }
        for (i, row) in artifact.components.iter().enumerate() {
            if row.len() != artifact.mean.len() {
                return Err(format!(
                    "component row {i} has length {}, expected {}",
                    row.len(),
                    artifact.mean.len()
                ));
            }
        }
        Ok(Self {
            mean: artifact.mean,
            components: artifact.components,
        })
    }

    /// Build a reducer directly from fitted parameters. Rows of
    /// `components` must match the length of `mean`.
    pub fn from_parts(mean: Vec<f32>, components: Vec<Vec<f32>>) -> PipelineResult<Self> {
        Self::from_artifact(PcaArtifact { mean, components }).map_err(|reason| {
            PipelineError::ArtifactNotLoaded {
                name: "pca.json",
                path: "<in-memory>".to_string(),
                reason,
            }
        })
    }

    /// Embedding length the transform was fitted on.
    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    /// Number of principal components, i.e. the reduced vector length.
    pub fn output_dim(&self) -> usize {
        self.components.len()
    }

    /// Project an embedding into the reduced feature space.
    pub fn reduce(&self, embedding: &[f32]) -> PipelineResult<Vec<f32>> {
        if embedding.len() != self.mean.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.mean.len(),
                actual: embedding.len(),
            });
        }

        let centered: Vec<f32> = embedding
            .iter()
            .zip(&self.mean)
            .map(|(x, m)| x - m)
            .collect();

        Ok(self
            .components
            .iter()
            .map(|row| row.iter().zip(&centered).map(|(w, x)| w * x).sum())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_reducer() -> PcaReducer {
        PcaReducer::from_parts(
            vec![1.0, 2.0, 3.0],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn reduce_subtracts_mean_then_projects() {
        let reducer = identity_reducer();
        let out = reducer.reduce(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(out, vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn reduce_projects_onto_components() {
        // Single component picking out the difference of the two inputs.
        let reducer =
            PcaReducer::from_parts(vec![0.0, 0.0], vec![vec![1.0, -1.0]]).unwrap();
        let out = reducer.reduce(&[3.0, 1.0]).unwrap();
        assert_eq!(out, vec![2.0]);
        assert_eq!(reducer.output_dim(), 1);
    }

    #[test]
    fn reduce_is_deterministic() {
        let reducer = identity_reducer();
        let a = reducer.reduce(&[0.5, -0.5, 4.0]).unwrap();
        let b = reducer.reduce(&[0.5, -0.5, 4.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reduce_rejects_wrong_input_length() {
        let reducer = identity_reducer();
        let err = reducer.reduce(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn ragged_components_rejected() {
        let err =
            PcaReducer::from_parts(vec![0.0, 0.0], vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotLoaded { .. }));
    }

    #[test]
    fn load_reports_missing_artifact() {
        let err = PcaReducer::load(Path::new("does/not/exist")).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArtifactNotLoaded { name: "pca.json", .. }
        ));
    }
}
