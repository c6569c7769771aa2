//! Dispute classification pipeline: encode → reduce → predict → explain.

pub mod classifier;
pub mod encoder;
pub mod explain;
pub mod loader;
pub mod reducer;

pub use classifier::{CategoryClassifier, Prediction};
pub use encoder::{OnnxEncoder, TextEncoder};
pub use explain::{ExplanationGenerator, GenerativeClient, Narrative, OpenAiGenerator};
pub use loader::{load_pipeline, ArtifactLoader};
pub use reducer::PcaReducer;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DisputeRecord, DisputeStatus, DisputeSubmission};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// The classification pipeline, assembled once at startup.
///
/// All model state is loaded before the first request and immutable
/// afterwards; concurrent classification calls share it read-only. The only
/// suspension point is the generative call inside `classify`.
pub struct DisputePipeline<E: TextEncoder, C: GenerativeClient> {
    encoder: E,
    reducer: PcaReducer,
    classifier: CategoryClassifier,
    generator: ExplanationGenerator<C>,
}

impl<E: TextEncoder, C: GenerativeClient> DisputePipeline<E, C> {
    pub fn new(
        encoder: E,
        reducer: PcaReducer,
        classifier: CategoryClassifier,
        generator: ExplanationGenerator<C>,
    ) -> Self {
        Self {
            encoder,
            reducer,
            classifier,
            generator,
        }
    }

    /// Deterministic inference prefix: embed the description, reduce it and
    /// score it. No network access, no side effects.
    pub fn predict(&self, description: &str) -> PipelineResult<Prediction> {
        if description.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "dispute description is empty".to_string(),
            ));
        }

        let embedding = self.encoder.encode(description)?;
        let reduced = self.reducer.reduce(&embedding)?;
        self.classifier.predict(&reduced)
    }

    /// Classify one dispute submission into a complete record.
    ///
    /// Fails atomically: if any stage errors, including the generative
    /// call, no record is produced, so a persisted record can never carry
    /// a category without its explanation fields.
    pub async fn classify(&self, submission: &DisputeSubmission) -> PipelineResult<DisputeRecord> {
        let prediction = self.predict(&submission.description)?;

        debug!(
            txn_id = %submission.txn_id,
            category = %prediction.category,
            confidence = prediction.confidence,
            "prediction complete, generating narrative"
        );

        let narrative = self
            .generator
            .explain(&submission.description, prediction.category)
            .await?;

        Ok(DisputeRecord {
            dispute_id: Uuid::new_v4().to_string(),
            customer_id: submission.customer_id.clone(),
            txn_id: submission.txn_id.clone(),
            description: submission.description.clone(),
            predicted_category: prediction.category,
            confidence: prediction.confidence,
            explanation: narrative.explanation,
            suggested_action: narrative.suggested_action,
            justification: narrative.justification,
            status: DisputeStatus::Open,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::types::DisputeCategory;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Deterministic stub encoder: a fixed vector per known phrase.
    ///
    /// The fixture vectors are chosen so that, through the identity reducer
    /// and the indicator classifier below, each phrase lands on its ground
    /// truth category.
    struct StubEncoder;

    impl TextEncoder for StubEncoder {
        fn encode(&self, text: &str) -> PipelineResult<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(PipelineError::InvalidInput("empty".to_string()));
            }
            let mut v = vec![0.0f32; 5];
            let ordinal = if text.contains("charged twice") {
                0 // DUPLICATE_CHARGE
            } else if text.contains("failed") {
                1 // FAILED_TRANSACTION
            } else if text.contains("never made") {
                2 // FRAUD
            } else if text.contains("refund") {
                4 // REFUND_PENDING
            } else {
                3 // OTHERS
            };
            v[ordinal] = 4.0;
            Ok(v)
        }

        fn dim(&self) -> usize {
            5
        }
    }

    struct OkClient;

    #[async_trait]
    impl GenerativeClient for OkClient {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            // Echo enough of the prompt to make assertions meaningful.
            let first_line = prompt.lines().next().unwrap_or_default();
            Ok(format!("Generated: {first_line}"))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl GenerativeClient for FailingClient {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn identity_reducer() -> PcaReducer {
        let components = (0..5)
            .map(|k| {
                let mut row = vec![0.0f32; 5];
                row[k] = 1.0;
                row
            })
            .collect();
        PcaReducer::from_parts(vec![0.0; 5], components).unwrap()
    }

    fn indicator_classifier() -> CategoryClassifier {
        let mut coefficients: [Vec<f32>; 5] = Default::default();
        for (k, row) in coefficients.iter_mut().enumerate() {
            let mut weights = vec![0.0f32; 5];
            weights[k] = 1.0;
            *row = weights;
        }
        CategoryClassifier::from_parts(coefficients, [0.0; 5]).unwrap()
    }

    fn pipeline<C: GenerativeClient>(client: C) -> DisputePipeline<StubEncoder, C> {
        DisputePipeline::new(
            StubEncoder,
            identity_reducer(),
            indicator_classifier(),
            ExplanationGenerator::new(client, 2, Duration::from_millis(1)),
        )
    }

    fn submission(description: &str) -> DisputeSubmission {
        DisputeSubmission {
            customer_id: "c_001".to_string(),
            txn_id: "tx_001".to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn classify_builds_complete_open_record() {
        let pipeline = pipeline(OkClient);
        let record = pipeline
            .classify(&submission("I was charged twice for the same coffee order"))
            .await
            .unwrap();

        assert_eq!(record.predicted_category, DisputeCategory::DuplicateCharge);
        assert!(record.confidence >= 0.5);
        assert!(record.confidence <= 1.0);
        assert_eq!(record.status, DisputeStatus::Open);
        assert_eq!(record.suggested_action, "Auto-refund");
        assert!(!record.explanation.is_empty());
        assert!(!record.justification.is_empty());
        assert!(!record.dispute_id.is_empty());
        assert_eq!(record.customer_id, "c_001");
        assert_eq!(record.txn_id, "tx_001");
    }

    #[tokio::test]
    async fn predict_is_deterministic_across_calls() {
        let pipeline = pipeline(OkClient);
        let a = pipeline.predict("the transaction failed but I was debited").unwrap();
        let b = pipeline.predict("the transaction failed but I was debited").unwrap();

        assert_eq!(a.category, b.category);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.category, DisputeCategory::FailedTransaction);
    }

    #[tokio::test]
    async fn generation_failure_yields_no_record() {
        let pipeline = pipeline(FailingClient);
        let err = pipeline
            .classify(&submission("I was charged twice for the same coffee order"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ExplanationUnavailable { .. }));
    }

    #[tokio::test]
    async fn empty_description_rejected_before_any_work() {
        let pipeline = pipeline(OkClient);
        let err = pipeline.classify(&submission("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn distinct_records_get_distinct_ids() {
        let pipeline = pipeline(OkClient);
        let a = pipeline.classify(&submission("refund is late")).await.unwrap();
        let b = pipeline.classify(&submission("refund is late")).await.unwrap();
        assert_ne!(a.dispute_id, b.dispute_id);
        assert_eq!(a.predicted_category, DisputeCategory::RefundPending);
    }
}
