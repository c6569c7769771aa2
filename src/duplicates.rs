//! Fuzzy duplicate-transaction detection.
//!
//! Flags pairs of transactions likely to represent the same charge made
//! twice: identical customer, amount and merchant, settled within a short
//! window of each other.

use crate::types::{DuplicateCandidatePair, ScanReport, TransactionRecord};
use chrono::Duration;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default matching window: 5 minutes.
pub const DEFAULT_WINDOW_SECS: i64 = 300;

/// Stateless duplicate scanner over a transaction set.
///
/// A pure, read-only computation: safe to run concurrently with
/// classification, no locking required.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    window: Duration,
}

impl DuplicateDetector {
    /// Create a detector with the given matching window in seconds.
    pub fn new(window_secs: i64) -> Self {
        Self {
            window: Duration::seconds(window_secs.max(0)),
        }
    }

    /// Scan a transaction set for likely duplicate charges.
    ///
    /// Transactions are grouped by exact `(customer_id, amount, merchant)`
    /// match (merchant name case-folded), each group is ordered by
    /// timestamp, and consecutive entries no further apart than the window
    /// become one candidate pair per adjacent gap. Malformed records are
    /// skipped and counted, never fatal. Empty input yields an empty
    /// report.
    pub fn scan(&self, transactions: &[TransactionRecord]) -> ScanReport {
        let mut skipped = 0usize;
        let mut groups: HashMap<(String, String, u64), Vec<&TransactionRecord>> = HashMap::new();

        for tx in transactions {
            if !is_well_formed(tx) {
                warn!(txn_id = %tx.txn_id, "skipping malformed transaction record");
                skipped += 1;
                continue;
            }
            // Bitwise equality is the exact-match reading of "same amount":
            // amounts group together only if they are the identical f64.
            let key = (
                tx.customer_id.clone(),
                normalize_merchant(&tx.merchant),
                tx.amount.to_bits(),
            );
            groups.entry(key).or_default().push(tx);
        }

        let mut pairs = Vec::new();
        for group in groups.values_mut() {
            if group.len() < 2 {
                continue;
            }
            // txn_id as secondary key keeps equal-timestamp output stable.
            group.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.txn_id.cmp(&b.txn_id))
            });

            for pair in group.windows(2) {
                let (first, second) = (pair[0], pair[1]);
                let gap = second.timestamp - first.timestamp;
                if gap <= self.window {
                    pairs.push(DuplicateCandidatePair {
                        original_txn_id: first.txn_id.clone(),
                        duplicate_txn_id: second.txn_id.clone(),
                        customer_id: first.customer_id.clone(),
                        amount: first.amount,
                        merchant: first.merchant.clone(),
                        time_diff_seconds: gap.num_seconds(),
                    });
                }
            }
        }

        // HashMap iteration order is arbitrary; order the output by
        // customer then time so identical inputs give identical reports.
        pairs.sort_by(|a, b| {
            (&a.customer_id, &a.original_txn_id, &a.duplicate_txn_id)
                .cmp(&(&b.customer_id, &b.original_txn_id, &b.duplicate_txn_id))
        });

        debug!(
            scanned = transactions.len(),
            pairs = pairs.len(),
            skipped,
            "duplicate scan complete"
        );

        ScanReport { pairs, skipped }
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}

/// Scan with the default 5-minute window.
pub fn scan_duplicates(transactions: &[TransactionRecord]) -> Vec<DuplicateCandidatePair> {
    DuplicateDetector::default().scan(transactions).pairs
}

fn is_well_formed(tx: &TransactionRecord) -> bool {
    !tx.customer_id.trim().is_empty()
        && !tx.txn_id.trim().is_empty()
        && !tx.merchant.trim().is_empty()
        && tx.amount.is_finite()
        && tx.amount > 0.0
}

fn normalize_merchant(merchant: &str) -> String {
    merchant.trim().to_lowercase()
}
