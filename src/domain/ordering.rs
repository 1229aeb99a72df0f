//! Stable transaction ordering for deterministic processing.

use crate::domain::Transaction;
use chrono::NaiveDateTime;

/// Stable ordering key for transactions.
///
/// Ordering: datetime -> position in the input log -> fragment index.
/// Rows with identical timestamps keep the order in which the log listed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionOrderingKey {
    /// Timestamp (primary sort).
    pub datetime: NaiveDateTime,
    /// Position in the chronologically sorted input (secondary sort).
    pub seq: usize,
    /// Fragment index for rows synthesized from one input row.
    pub sub: u8,
}

impl TransactionOrderingKey {
    pub fn new(datetime: NaiveDateTime, seq: usize) -> Self {
        Self {
            datetime,
            seq,
            sub: 0,
        }
    }

    /// Key for the n-th row derived from the same input row.
    pub fn fragment(&self, sub: u8) -> Self {
        Self { sub, ..*self }
    }
}

/// A transaction tagged with its position in the global log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequenced {
    pub key: TransactionOrderingKey,
    pub txn: Transaction,
}

/// Sort transactions chronologically, preserving input order for equal timestamps.
pub fn sort_transactions_stable(transactions: &mut [Transaction]) {
    transactions.sort_by_key(|t| t.datetime);
}

/// Sort transactions and tag each with its ordering key.
pub fn sequence(mut transactions: Vec<Transaction>) -> Vec<Sequenced> {
    sort_transactions_stable(&mut transactions);
    transactions
        .into_iter()
        .enumerate()
        .map(|(seq, txn)| Sequenced {
            key: TransactionOrderingKey::new(txn.datetime, seq),
            txn,
        })
        .collect()
}
