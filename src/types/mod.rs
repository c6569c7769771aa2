//! Type definitions for the dispute triage pipeline

pub mod dispute;
pub mod duplicate;
pub mod transaction;

pub use dispute::{DisputeCategory, DisputeRecord, DisputeStatus, DisputeSubmission, HistoryEntry};
pub use duplicate::{DuplicateCandidatePair, ScanReport};
pub use transaction::TransactionRecord;
