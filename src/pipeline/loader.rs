//! Startup loading of all model artifacts.

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::classifier::CategoryClassifier;
use crate::pipeline::encoder::OnnxEncoder;
use crate::pipeline::explain::{ExplanationGenerator, OpenAiGenerator};
use crate::pipeline::reducer::PcaReducer;
use crate::pipeline::DisputePipeline;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Loads the embedding model, PCA transform and classifier weights from one
/// artifact directory.
///
/// Loading happens exactly once, at process startup; a missing or
/// inconsistent artifact aborts initialization rather than surfacing later
/// as a per-request failure.
pub struct ArtifactLoader<'a> {
    dir: &'a Path,
    onnx_threads: usize,
}

impl<'a> ArtifactLoader<'a> {
    pub fn new(dir: &'a Path, onnx_threads: usize) -> Self {
        Self { dir, onnx_threads }
    }

    pub fn load_encoder(&self) -> PipelineResult<OnnxEncoder> {
        OnnxEncoder::load(self.dir, self.onnx_threads)
    }

    pub fn load_reducer(&self) -> PipelineResult<PcaReducer> {
        PcaReducer::load(self.dir)
    }

    pub fn load_classifier(&self) -> PipelineResult<CategoryClassifier> {
        CategoryClassifier::load(self.dir)
    }

    /// Load every inference artifact and verify the stages agree on vector
    /// lengths before any request is served.
    pub fn load_inference_stack(
        &self,
    ) -> PipelineResult<(OnnxEncoder, PcaReducer, CategoryClassifier)> {
        let encoder = self.load_encoder()?;
        let reducer = self.load_reducer()?;
        let classifier = self.load_classifier()?;

        use crate::pipeline::encoder::TextEncoder;
        if encoder.dim() != reducer.input_dim() {
            return Err(PipelineError::DimensionMismatch {
                expected: reducer.input_dim(),
                actual: encoder.dim(),
            });
        }
        if reducer.output_dim() != classifier.input_dim() {
            return Err(PipelineError::DimensionMismatch {
                expected: classifier.input_dim(),
                actual: reducer.output_dim(),
            });
        }

        info!(
            embedding_dim = encoder.dim(),
            reduced_dim = reducer.output_dim(),
            "inference artifacts loaded and consistent"
        );
        Ok((encoder, reducer, classifier))
    }
}

/// Assemble the production pipeline from configuration: ONNX encoder, PCA
/// reducer, classifier weights and the OpenAI-backed explanation generator.
pub fn load_pipeline(
    config: &AppConfig,
) -> anyhow::Result<DisputePipeline<OnnxEncoder, OpenAiGenerator>> {
    let loader = ArtifactLoader::new(Path::new(&config.artifacts.dir), config.artifacts.onnx_threads);
    let (encoder, reducer, classifier) = loader.load_inference_stack()?;

    let generator = ExplanationGenerator::new(
        OpenAiGenerator::from_config(&config.llm)?,
        config.llm.max_attempts,
        Duration::from_millis(config.llm.backoff_ms),
    );

    Ok(DisputePipeline::new(encoder, reducer, classifier, generator))
}
