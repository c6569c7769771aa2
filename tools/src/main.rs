//! Test Dispute Producer
//!
//! Generates and publishes sample dispute submissions and duplicate-seeded
//! transaction batches to NATS for pipeline testing.

use chrono::{Duration as ChronoDuration, Utc};
use dispute_triage_pipeline::types::{DisputeSubmission, TransactionRecord};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Description phrasings per category, in the voice of real dispute text.
const DUPLICATE_PHRASES: &[&str] = &[
    "I was charged twice for the same coffee order",
    "There are two identical charges from the same store on my statement",
    "The same payment went through two times within minutes",
];

const FAILED_PHRASES: &[&str] = &[
    "The transaction failed but the money left my account anyway",
    "Payment showed an error at checkout yet I was still debited",
    "The app said the transfer did not go through but my balance dropped",
];

const FRAUD_PHRASES: &[&str] = &[
    "I never made this purchase, my card must have been stolen",
    "There is a charge from a city I have never visited",
    "Someone used my card at a store I do not recognize",
];

const REFUND_PHRASES: &[&str] = &[
    "I returned the item two weeks ago and the refund is still pending",
    "The merchant promised a refund but nothing has arrived",
    "Still waiting for my money back after the cancelled booking",
];

const OTHER_PHRASES: &[&str] = &[
    "The amount charged does not match the receipt",
    "I want to understand a fee that appeared this month",
    "My subscription was renewed even though I cancelled it",
];

const MERCHANTS: &[&str] = &[
    "Corner Cafe",
    "Blue Bottle Coffee",
    "City Transit",
    "Fresh Mart",
    "Streamly",
];

/// Sample data generator for disputes and transactions
struct SampleGenerator {
    rng: rand::rngs::ThreadRng,
    dispute_counter: u64,
    txn_counter: u64,
}

impl SampleGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            dispute_counter: 0,
            txn_counter: 0,
        }
    }

    /// Generate a dispute submission with a random category phrasing
    fn generate_submission(&mut self) -> DisputeSubmission {
        self.dispute_counter += 1;

        let phrases = match self.rng.gen_range(0..5) {
            0 => DUPLICATE_PHRASES,
            1 => FAILED_PHRASES,
            2 => FRAUD_PHRASES,
            3 => REFUND_PHRASES,
            _ => OTHER_PHRASES,
        };

        DisputeSubmission {
            customer_id: format!("cust_{:04}", self.rng.gen_range(1..200)),
            txn_id: format!("txn_{:08}", self.rng.gen_range(1..1_000_000)),
            description: self.random_choice(phrases).to_string(),
        }
    }

    /// Generate a transaction batch seeded with duplicate-shaped pairs
    fn generate_transaction_batch(&mut self, size: usize, duplicate_rate: f64) -> Vec<TransactionRecord> {
        let mut batch = Vec::with_capacity(size + size / 4);
        let base = Utc::now();

        for _ in 0..size {
            self.txn_counter += 1;
            let customer_id = format!("cust_{:04}", self.rng.gen_range(1..50));
            let merchant = self.random_choice(MERCHANTS).to_string();
            let amount = f64::from(self.rng.gen_range(100..10_000)) / 100.0;
            let timestamp = base - ChronoDuration::seconds(self.rng.gen_range(0..86_400));

            let tx = TransactionRecord::new(
                customer_id,
                format!("tx_{:010}", self.txn_counter),
                amount,
                merchant,
                timestamp,
            );

            // Occasionally echo the charge moments later, the shape the
            // detector is meant to flag.
            if self.rng.gen_bool(duplicate_rate) {
                self.txn_counter += 1;
                let mut duplicate = tx.clone();
                duplicate.txn_id = format!("tx_{:010}", self.txn_counter);
                duplicate.timestamp = tx.timestamp
                    + ChronoDuration::seconds(self.rng.gen_range(5..280));
                batch.push(duplicate);
            }

            batch.push(tx);
        }

        batch
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Dispute Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let dispute_subject = args.get(2).map(|s| s.as_str()).unwrap_or("disputes.submitted");
    let scan_subject = args.get(3).map(|s| s.as_str()).unwrap_or("transactions.scan");
    let count: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(50);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        nats_url = %nats_url,
        dispute_subject = %dispute_subject,
        scan_subject = %scan_subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let mut generator = SampleGenerator::new();

    // Publish one transaction batch for the duplicate scanner first
    let batch = generator.generate_transaction_batch(40, 0.2);
    let payload = serde_json::to_vec(&batch)?;
    client.publish(scan_subject.to_string(), payload.into()).await?;
    info!(batch_size = batch.len(), "Published transaction scan batch");

    // Generate and publish dispute submissions
    info!("Starting to publish {} dispute submissions...", count);

    for i in 0..count {
        let submission = generator.generate_submission();
        let payload = serde_json::to_vec(&submission)?;

        client
            .publish(dispute_subject.to_string(), payload.into())
            .await?;

        if (i + 1) % 10 == 0 {
            info!("Published {}/{} dispute submissions", i + 1, count);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Published {} dispute submissions", count);

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = SampleGenerator::new();

    let batch = generator.generate_transaction_batch(10, 0.3);
    info!(
        "Sample transaction batch:\n{}",
        serde_json::to_string_pretty(&batch)?
    );

    for i in 0..count {
        let submission = generator.generate_submission();
        let json = serde_json::to_string_pretty(&submission)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample dispute submission {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
