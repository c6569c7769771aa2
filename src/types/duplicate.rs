//! Duplicate-candidate output structures

use serde::{Deserialize, Serialize};

/// A pair of transactions likely to represent the same charge made twice.
///
/// Transient: recomputed on every scan, never persisted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCandidatePair {
    /// The earlier of the two transactions
    pub original_txn_id: String,

    /// The later, suspected-duplicate transaction
    pub duplicate_txn_id: String,

    pub customer_id: String,
    pub amount: f64,
    pub merchant: String,

    /// Actual gap between the two timestamps, in seconds
    pub time_diff_seconds: i64,
}

/// Result of one duplicate scan over a transaction set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Candidate pairs, in group order then timestamp order
    pub pairs: Vec<DuplicateCandidatePair>,

    /// Number of malformed input records dropped during validation
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_serialization() {
        let pair = DuplicateCandidatePair {
            original_txn_id: "tx_001".to_string(),
            duplicate_txn_id: "tx_002".to_string(),
            customer_id: "c_001".to_string(),
            amount: 4.75,
            merchant: "corner cafe".to_string(),
            time_diff_seconds: 250,
        };

        let json = serde_json::to_string(&pair).unwrap();
        let parsed: DuplicateCandidatePair = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.original_txn_id, "tx_001");
        assert_eq!(parsed.duplicate_txn_id, "tx_002");
        assert_eq!(parsed.time_diff_seconds, 250);
    }
}
