//! NATS message producer for classification results and duplicate pairs

use crate::types::{DisputeRecord, DuplicateCandidatePair};
use anyhow::Result;
use async_nats::Client;
use tracing::{debug, error};

/// Publishes pipeline output: classified dispute records and duplicate
/// candidate pairs, each to its own subject.
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    record_subject: String,
    duplicate_subject: String,
}

impl ResultProducer {
    /// Create a new result producer
    pub fn new(client: Client, record_subject: &str, duplicate_subject: &str) -> Self {
        Self {
            client,
            record_subject: record_subject.to_string(),
            duplicate_subject: duplicate_subject.to_string(),
        }
    }

    /// Publish a classified dispute record
    pub async fn publish_record(&self, record: &DisputeRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)?;

        self.client
            .publish(self.record_subject.clone(), payload.into())
            .await?;

        debug!(
            dispute_id = %record.dispute_id,
            txn_id = %record.txn_id,
            category = %record.predicted_category,
            confidence = record.confidence,
            "published dispute record"
        );

        Ok(())
    }

    /// Publish the candidate pairs from one duplicate scan
    pub async fn publish_duplicates(&self, pairs: &[DuplicateCandidatePair]) -> Result<()> {
        for pair in pairs {
            let payload = serde_json::to_vec(pair)?;
            if let Err(e) = self
                .client
                .publish(self.duplicate_subject.clone(), payload.into())
                .await
            {
                error!(
                    original = %pair.original_txn_id,
                    duplicate = %pair.duplicate_txn_id,
                    error = %e,
                    "failed to publish duplicate pair"
                );
            }
        }
        Ok(())
    }

    /// Subject classified records are published to
    pub fn record_subject(&self) -> &str {
        &self.record_subject
    }

    /// Subject duplicate pairs are published to
    pub fn duplicate_subject(&self) -> &str {
        &self.duplicate_subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
