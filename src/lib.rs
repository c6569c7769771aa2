//! Dispute Triage Pipeline Library
//!
//! Classifies free-text payment dispute descriptions into one of five
//! categories, attaches an LLM-generated explanation, suggested action and
//! justification, and detects likely duplicate charges in transaction sets.

pub mod config;
pub mod consumer;
pub mod duplicates;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::SubjectConsumer;
pub use duplicates::{scan_duplicates, DuplicateDetector};
pub use error::{GenerationError, PipelineError, PipelineResult};
pub use metrics::{MetricsReporter, PipelineMetrics};
pub use pipeline::{load_pipeline, DisputePipeline};
pub use producer::ResultProducer;
pub use types::{
    DisputeCategory, DisputeRecord, DisputeStatus, DisputeSubmission, DuplicateCandidatePair,
    ScanReport, TransactionRecord,
};
