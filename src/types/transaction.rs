//! Transaction data structures for duplicate-charge detection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A settled card transaction, as provided by the transaction data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Opaque external customer reference
    pub customer_id: String,

    /// Unique transaction identifier
    pub txn_id: String,

    /// Charged amount in the account currency
    pub amount: f64,

    /// Merchant name as it appears on the statement
    pub merchant: String,

    /// Settlement timestamp
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        customer_id: impl Into<String>,
        txn_id: impl Into<String>,
        amount: f64,
        merchant: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            txn_id: txn_id.into(),
            amount,
            merchant: merchant.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_serialization() {
        let tx = TransactionRecord::new("c_001", "tx_001", 12.50, "Blue Bottle Coffee", Utc::now());

        let json = serde_json::to_string(&tx).unwrap();
        let parsed: TransactionRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.customer_id, tx.customer_id);
        assert_eq!(parsed.txn_id, tx.txn_id);
        assert_eq!(parsed.amount, tx.amount);
        assert_eq!(parsed.merchant, tx.merchant);
    }
}
