//! Dispute data structures for the triage pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five dispute categories the classifier can predict.
///
/// Declaration order is the canonical ordering used to break exact
/// probability ties: the variant declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeCategory {
    DuplicateCharge,
    FailedTransaction,
    Fraud,
    Others,
    RefundPending,
}

impl DisputeCategory {
    /// All categories in canonical (tie-break) order.
    pub const ALL: [DisputeCategory; 5] = [
        DisputeCategory::DuplicateCharge,
        DisputeCategory::FailedTransaction,
        DisputeCategory::Fraud,
        DisputeCategory::Others,
        DisputeCategory::RefundPending,
    ];

    /// Wire label, matching the training data labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeCategory::DuplicateCharge => "DUPLICATE_CHARGE",
            DisputeCategory::FailedTransaction => "FAILED_TRANSACTION",
            DisputeCategory::Fraud => "FRAUD",
            DisputeCategory::Others => "OTHERS",
            DisputeCategory::RefundPending => "REFUND_PENDING",
        }
    }

    /// Parse a wire label into a category.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// The resolution action an agent should take next for this category.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            DisputeCategory::DuplicateCharge => "Auto-refund",
            DisputeCategory::FailedTransaction => "Manual review",
            DisputeCategory::Fraud => "Mark as potential fraud",
            DisputeCategory::RefundPending => "Ask for more info",
            DisputeCategory::Others => "Manual review",
        }
    }
}

impl std::fmt::Display for DisputeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a dispute case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    InReview,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "OPEN",
            DisputeStatus::InReview => "IN_REVIEW",
            DisputeStatus::Resolved => "RESOLVED",
            DisputeStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispute submission as received on the intake subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeSubmission {
    /// Opaque external customer reference
    pub customer_id: String,

    /// Opaque external transaction reference
    pub txn_id: String,

    /// The customer's free-text description of the problem
    pub description: String,
}

/// A fully classified dispute case.
///
/// `predicted_category`, `confidence`, `explanation`, `suggested_action`,
/// and `justification` are set together by one pipeline run and never
/// partially populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRecord {
    /// Unique case identifier, assigned at creation
    pub dispute_id: String,

    pub customer_id: String,
    pub txn_id: String,

    /// Raw input text, immutable once created
    pub description: String,

    /// Winning category from the classifier
    pub predicted_category: DisputeCategory,

    /// Probability mass assigned to the winning category (0.0 - 1.0)
    pub confidence: f64,

    /// Evidence-quoting explanation of the classification
    pub explanation: String,

    /// Recommended next step for the handling agent
    pub suggested_action: String,

    /// Why the suggested action fits this complaint
    pub justification: String,

    /// Case status, `OPEN` at creation
    pub status: DisputeStatus,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl DisputeRecord {
    /// Move the case to a new status, emitting the audit entry for the
    /// change. Returns `None` (and changes nothing) if the status is
    /// already `new_status`.
    pub fn update_status(&mut self, new_status: DisputeStatus) -> Option<HistoryEntry> {
        if self.status == new_status {
            return None;
        }
        let entry = HistoryEntry {
            dispute_id: self.dispute_id.clone(),
            field_changed: "status".to_string(),
            old_value: self.status.as_str().to_string(),
            new_value: new_status.as_str().to_string(),
            timestamp: Utc::now(),
        };
        self.status = new_status;
        Some(entry)
    }
}

/// Append-only audit record of a field change on a dispute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub dispute_id: String,
    pub field_changed: String,
    pub old_value: String,
    pub new_value: String,
    pub timestamp: DateTime<Utc>,
}
