//! Error taxonomy for the dispute triage pipeline.

use thiserror::Error;

/// Errors surfaced by the classification pipeline and duplicate detector.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed or empty input text. Not retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required model artifact is missing or unreadable. Fatal at startup.
    #[error("model artifact '{name}' not loaded from {path}: {reason}")]
    ArtifactNotLoaded {
        name: &'static str,
        path: String,
        reason: String,
    },

    /// Vector length disagrees with what the loaded artifacts expect.
    /// Indicates an artifact version mismatch; fatal, not retried.
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The generative-language service failed after the retry budget.
    #[error("explanation service unavailable after {attempts} attempts")]
    ExplanationUnavailable {
        attempts: u32,
        #[source]
        source: GenerationError,
    },

    /// Embedding inference failed inside the ONNX runtime.
    #[error("embedding inference failed: {0}")]
    Embedding(String),
}

/// Errors from a single call to the generative-language service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
