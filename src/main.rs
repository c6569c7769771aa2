//! Dispute Triage Pipeline - Main Entry Point
//!
//! Consumes dispute submissions from NATS, runs the classify-then-explain
//! pipeline, and publishes complete dispute records. A second subject
//! serves fuzzy duplicate-transaction scans. Submissions are processed by a
//! bounded pool of parallel workers.

use anyhow::Result;
use dispute_triage_pipeline::{
    config::AppConfig,
    consumer::SubjectConsumer,
    duplicates::DuplicateDetector,
    error::PipelineError,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::load_pipeline,
    producer::ResultProducer,
    types::{DisputeSubmission, TransactionRecord},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dispute_triage_pipeline=info".parse()?),
        )
        .init();

    info!("Starting Dispute Triage Pipeline");

    // Load configuration
    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Load model artifacts and assemble the pipeline. Any missing artifact
    // aborts startup here instead of failing per-request later.
    let pipeline = Arc::new(load_pipeline(&config)?);
    info!("Classification pipeline initialized");

    let detector = DuplicateDetector::new(config.duplicates.window_secs);
    info!(
        window_secs = config.duplicates.window_secs,
        "Duplicate detector initialized"
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize consumers and producer
    let dispute_consumer = SubjectConsumer::new(client.clone(), &config.nats.dispute_subject);
    let scan_consumer = SubjectConsumer::new(client.clone(), &config.nats.scan_subject);
    let producer = Arc::new(ResultProducer::new(
        client.clone(),
        &config.nats.record_subject,
        &config.nats.duplicate_subject,
    ));

    let num_workers = config.pipeline.workers;
    let request_timeout = Duration::from_millis(config.pipeline.timeout_ms);
    info!(
        workers = num_workers,
        timeout_ms = config.pipeline.timeout_ms,
        "Starting dispute processing loop"
    );
    info!("Listening on subject: {}", config.nats.dispute_subject);
    info!("Publishing records to: {}", config.nats.record_subject);

    // Semaphore to limit concurrent classification tasks
    let semaphore = Arc::new(Semaphore::new(num_workers));

    // Start metrics reporter (prints summary every 30 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    // Serve duplicate scans from their own task; a scan is a fast pure
    // computation and never blocks on the network.
    {
        let mut scan_subscription = scan_consumer.subscribe().await?;
        let producer = producer.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            while let Some(message) = scan_subscription.next().await {
                match serde_json::from_slice::<Vec<TransactionRecord>>(&message.payload) {
                    Ok(transactions) => {
                        let report = detector.scan(&transactions);
                        metrics.record_scan(report.pairs.len(), report.skipped);
                        info!(
                            scanned = transactions.len(),
                            pairs = report.pairs.len(),
                            skipped = report.skipped,
                            "duplicate scan complete"
                        );
                        if let Err(e) = producer.publish_duplicates(&report.pairs).await {
                            error!(error = %e, "failed to publish duplicate pairs");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to deserialize scan request");
                    }
                }
            }
        });
    }

    // Process dispute submissions in parallel
    let mut subscription = dispute_consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        // Clone shared resources for the spawned task
        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            match serde_json::from_slice::<DisputeSubmission>(&message.payload) {
                Ok(submission) => {
                    let txn_id = submission.txn_id.clone();

                    // A per-request deadline on top of the LLM client
                    // timeout, so an abandoned call cannot outlive its
                    // budget.
                    let outcome =
                        tokio::time::timeout(request_timeout, pipeline.classify(&submission)).await;

                    match outcome {
                        Ok(Ok(record)) => {
                            let processing_time = start_time.elapsed();
                            metrics.record_classification(
                                processing_time,
                                record.predicted_category,
                                record.confidence,
                            );

                            if let Err(e) = producer.publish_record(&record).await {
                                error!(
                                    txn_id = %txn_id,
                                    dispute_id = %record.dispute_id,
                                    error = %e,
                                    "failed to publish dispute record"
                                );
                            } else {
                                info!(
                                    txn_id = %txn_id,
                                    dispute_id = %record.dispute_id,
                                    category = %record.predicted_category,
                                    confidence = record.confidence,
                                    processing_time_ms = processing_time.as_millis(),
                                    "dispute classified"
                                );
                            }
                        }
                        Ok(Err(e)) => {
                            metrics.record_failure(error_kind(&e));
                            error!(
                                txn_id = %txn_id,
                                error = %e,
                                "classification failed"
                            );
                        }
                        Err(_) => {
                            metrics.record_failure("Timeout");
                            error!(
                                txn_id = %txn_id,
                                timeout_ms = request_timeout.as_millis(),
                                "classification timed out"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to deserialize dispute submission");
                }
            }

            debug!("worker finished");
            // Release permit when done
            drop(permit);
        });
    }

    // Print final summary
    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Stable short label per error kind, for failure metrics.
fn error_kind(error: &PipelineError) -> &'static str {
    match error {
        PipelineError::InvalidInput(_) => "InvalidInput",
        PipelineError::ArtifactNotLoaded { .. } => "ArtifactNotLoaded",
        PipelineError::DimensionMismatch { .. } => "DimensionMismatch",
        PipelineError::ExplanationUnavailable { .. } => "ExplanationUnavailable",
        PipelineError::Embedding(_) => "Embedding",
    }
}
