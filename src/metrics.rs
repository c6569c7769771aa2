//! Performance metrics and statistics tracking for the dispute triage pipeline.

use crate::types::DisputeCategory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the classification and duplicate-scan paths.
///
/// Observational only: nothing in the pipeline reads these values back.
pub struct PipelineMetrics {
    /// Total disputes classified successfully
    pub disputes_classified: AtomicU64,
    /// Total classification failures (any error kind)
    pub classification_failures: AtomicU64,
    /// Classifications per category
    by_category: RwLock<HashMap<&'static str, u64>>,
    /// Failures per error kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// End-to-end classification times (in milliseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Confidence distribution buckets (10 deciles)
    confidence_buckets: RwLock<[u64; 10]>,
    /// Duplicate scans served
    pub scans_run: AtomicU64,
    /// Candidate pairs flagged across all scans
    pub pairs_flagged: AtomicU64,
    /// Malformed transaction records skipped across all scans
    pub records_skipped: AtomicU64,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            disputes_classified: AtomicU64::new(0),
            classification_failures: AtomicU64::new(0),
            by_category: RwLock::new(HashMap::new()),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            scans_run: AtomicU64::new(0),
            pairs_flagged: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one successful classification
    pub fn record_classification(
        &self,
        processing_time: Duration,
        category: DisputeCategory,
        confidence: f64,
    ) {
        self.disputes_classified.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_category) = self.by_category.write() {
            *by_category.entry(category.as_str()).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_millis() as u64);
            // Keep only the most recent window for memory efficiency
            if times.len() > 10_000 {
                times.drain(0..5_000);
            }
        }

        let bucket = (confidence * 10.0).min(9.0).max(0.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record one failed classification, keyed by error kind
    pub fn record_failure(&self, kind: &str) {
        self.classification_failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Record one duplicate scan
    pub fn record_scan(&self, pairs: usize, skipped: usize) {
        self.scans_run.fetch_add(1, Ordering::Relaxed);
        self.pairs_flagged.fetch_add(pairs as u64, Ordering::Relaxed);
        self.records_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self.processing_times.read().unwrap();
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_ms: sum / count as u64,
            p50_ms: sorted[count / 2],
            p95_ms: sorted[(count as f64 * 0.95) as usize],
            p99_ms: sorted[(count as f64 * 0.99) as usize],
            max_ms: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (disputes per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.disputes_classified.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get confidence distribution
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        *self.confidence_buckets.read().unwrap()
    }

    /// Get classifications per category
    pub fn get_by_category(&self) -> HashMap<&'static str, u64> {
        self.by_category.read().unwrap().clone()
    }

    /// Get failures per error kind
    pub fn get_failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind.read().unwrap().clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let classified = self.disputes_classified.load(Ordering::Relaxed);
        let failed = self.classification_failures.load(Ordering::Relaxed);
        let total = classified + failed;
        let failure_rate = if total > 0 {
            (failed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let by_category = self.get_by_category();
        let failures = self.get_failures_by_kind();
        let confidence = self.get_confidence_distribution();

        info!("==== DISPUTE TRIAGE PIPELINE - METRICS SUMMARY ====");
        info!(
            "Disputes classified: {} | Failures: {} ({:.1}%) | Throughput: {:.2}/s",
            classified, failed, failure_rate, throughput
        );
        info!(
            "Processing time (ms): mean={} p50={} p95={} p99={} max={}",
            processing.mean_ms, processing.p50_ms, processing.p95_ms, processing.p99_ms,
            processing.max_ms
        );

        info!("Classifications by category:");
        for category in DisputeCategory::ALL {
            let count = by_category.get(category.as_str()).copied().unwrap_or(0);
            let pct = if classified > 0 {
                (count as f64 / classified as f64) * 100.0
            } else {
                0.0
            };
            info!("  {:<20} {:>6} ({:>5.1}%)", category.as_str(), count, pct);
        }

        if !failures.is_empty() {
            info!("Failures by kind:");
            for (kind, count) in &failures {
                info!("  {:<24} {:>6}", kind, count);
            }
        }

        info!("Confidence distribution:");
        let bucket_total: u64 = confidence.iter().sum();
        for (i, &count) in confidence.iter().enumerate() {
            let pct = if bucket_total > 0 {
                (count as f64 / bucket_total as f64) * 100.0
            } else {
                0.0
            };
            let bar_len = (pct / 2.0) as usize;
            let bar: String = "#".repeat(bar_len.min(40));
            info!(
                "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }

        info!(
            "Duplicate scans: {} | Pairs flagged: {} | Records skipped: {}",
            self.scans_run.load(Ordering::Relaxed),
            self.pairs_flagged.load(Ordering::Relaxed),
            self.records_skipped.load(Ordering::Relaxed)
        );
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
