//! ONNX sentence-embedding encoder for dispute descriptions.
//!
//! Runs a sentence-transformers model (all-MiniLM-L6-v2) exported to ONNX.
//! The artifact directory must contain `model.onnx` and `tokenizer.json`.

use crate::error::{PipelineError, PipelineResult};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::RwLock;
use tokenizers::Tokenizer;
use tracing::info;

/// Maps a dispute description to a fixed-length dense vector.
///
/// Deterministic for a fixed model version: the same text always yields the
/// same vector.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, text: &str) -> PipelineResult<Vec<f32>>;

    /// Length of the vectors `encode` produces.
    fn dim(&self) -> usize;
}

/// Sentence embedder backed by ONNX Runtime.
///
/// Produces 384-dimensional mean-pooled embeddings. Pooled vectors are NOT
/// L2-normalized: the downstream PCA transform was fitted on raw
/// sentence-transformers output.
#[derive(Debug)]
pub struct OnnxEncoder {
    // Session::run takes &mut self; the weights themselves never change.
    session: RwLock<Session>,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxEncoder {
    /// Load the embedding model from a directory containing `model.onnx`
    /// and `tokenizer.json`.
    pub fn load(artifact_dir: &Path, onnx_threads: usize) -> PipelineResult<Self> {
        let model_path = artifact_dir.join("model.onnx");
        let tokenizer_path = artifact_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(missing("model.onnx", &model_path));
        }
        if !tokenizer_path.exists() {
            return Err(missing("tokenizer.json", &tokenizer_path));
        }

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(onnx_threads))
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| PipelineError::ArtifactNotLoaded {
                name: "model.onnx",
                path: model_path.display().to_string(),
                reason: e.to_string(),
            })?;

        // Infer embedding dimension from the model output shape.
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::ArtifactNotLoaded {
                name: "tokenizer.json",
                path: tokenizer_path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        // Truncate to the model's maximum sequence length (256 for MiniLM).
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: 256,
                ..Default::default()
            }))
            .map_err(|e| PipelineError::ArtifactNotLoaded {
                name: "tokenizer.json",
                path: tokenizer_path.display().to_string(),
                reason: format!("set truncation: {e}"),
            })?;

        info!(dim, model = %model_path.display(), "loaded embedding model");

        Ok(Self {
            session: RwLock::new(session),
            tokenizer,
            dim,
        })
    }
}

impl TextEncoder for OnnxEncoder {
    fn encode(&self, text: &str) -> PipelineResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "dispute description is empty".to_string(),
            ));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Embedding(format!("tokenize: {e}")))?;

        let seq_len = encoding.get_ids().len();
        let shape = [1_i64, seq_len as i64];

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> =
            encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let mask = attention_mask.clone();

        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
        let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        let mut session = self
            .session
            .write()
            .map_err(|e| PipelineError::Embedding(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;

        // Token embeddings: [1, seq_len, dim].
        let (output_shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
        let dims: &[i64] = output_shape;
        if dims.len() != 3 || dims[2] as usize != self.dim {
            return Err(PipelineError::Embedding(format!(
                "unexpected output shape {dims:?}, expected [1, {seq_len}, {}]",
                self.dim
            )));
        }

        let actual_seq_len = dims[1] as usize;

        // Attention-mask mean pooling over token embeddings.
        let mut pooled = vec![0.0f32; self.dim];
        let mut token_count = 0.0f32;
        for (j, &mask_val) in mask.iter().enumerate().take(actual_seq_len) {
            if mask_val > 0 {
                let offset = j * self.dim;
                for (d, p) in pooled.iter_mut().enumerate() {
                    *p += output_data[offset + d];
                }
                token_count += mask_val as f32;
            }
        }
        if token_count > 0.0 {
            for p in &mut pooled {
                *p /= token_count;
            }
        }

        Ok(pooled)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

fn missing(name: &'static str, path: &Path) -> PipelineError {
    PipelineError::ArtifactNotLoaded {
        name,
        path: path.display().to_string(),
        reason: "file not found".to_string(),
    }
}

/// Try to infer the embedding dimension from the ONNX model output type.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            // Last dimension is the embedding dim.
            shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Model-file-dependent tests run only when the artifact directory is
    // populated; everything else in the crate tests against stub encoders.
    fn artifact_dir() -> Option<PathBuf> {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("artifacts");
        dir.join("model.onnx").exists().then_some(dir)
    }

    #[test]
    fn load_reports_missing_artifact() {
        let err = OnnxEncoder::load(Path::new("does/not/exist"), 1).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotLoaded { .. }));
    }

    #[test]
    fn encode_single_description() {
        let Some(dir) = artifact_dir() else { return };
        let encoder = OnnxEncoder::load(&dir, 1).unwrap();
        assert_eq!(encoder.dim(), 384);

        let vec = encoder.encode("I was charged twice for the same order").unwrap();
        assert_eq!(vec.len(), 384);
    }

    #[test]
    fn encode_is_deterministic() {
        let Some(dir) = artifact_dir() else { return };
        let encoder = OnnxEncoder::load(&dir, 1).unwrap();

        let a = encoder.encode("refund still pending after ten days").unwrap();
        let b = encoder.encode("refund still pending after ten days").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_rejects_empty_text() {
        let Some(dir) = artifact_dir() else { return };
        let encoder = OnnxEncoder::load(&dir, 1).unwrap();

        for text in ["", "   ", "\n\t"] {
            let err = encoder.encode(text).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidInput(_)));
        }
    }
}
