//! NATS message consumers for pipeline input subjects

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for one pipeline input subject: dispute submissions or
/// duplicate-scan requests.
pub struct SubjectConsumer {
    client: Client,
    subject: String,
}

impl SubjectConsumer {
    /// Create a consumer bound to a subject
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the bound subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "subscribed to input subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
