//! Input checks applied before any matching.

use crate::domain::{RowType, Transaction};
use crate::engine::{RunReport, Warning};
use crate::error::EngineError;
use std::collections::{HashMap, HashSet};

/// Drop identical duplicate rows; reject conflicting ones.
///
/// The first occurrence of an id wins and keeps its position in the log.
pub fn dedupe_transactions(
    transactions: Vec<Transaction>,
    report: &mut RunReport,
) -> Result<Vec<Transaction>, EngineError> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(transactions.len());
    let mut output: Vec<Transaction> = Vec::with_capacity(transactions.len());

    for txn in transactions {
        match seen.get(&txn.transaction_id) {
            Some(&i) if output[i] == txn => {
                report.warn(Warning::DuplicateIgnored {
                    transaction_id: txn.transaction_id,
                });
            }
            Some(_) => return Err(EngineError::DuplicateTransaction(txn.transaction_id)),
            None => {
                seen.insert(txn.transaction_id.clone(), output.len());
                output.push(txn);
            }
        }
    }
    Ok(output)
}

/// Reject any id that occurs more than once.
///
/// Runs over the final row set, after manual splits and position seeding, where
/// every repeat is a collision rather than a re-imported row.
pub fn ensure_unique_ids(transactions: &[Transaction]) -> Result<(), EngineError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(transactions.len());
    for txn in transactions {
        if !seen.insert(txn.transaction_id.as_str()) {
            return Err(EngineError::DuplicateTransaction(txn.transaction_id.clone()));
        }
    }
    Ok(())
}

/// Trade and opening rows must carry an instruction and a nonzero quantity.
pub fn validate_transaction(txn: &Transaction) -> Result<(), EngineError> {
    if !matches!(txn.row_type, RowType::Trade | RowType::Open) {
        return Ok(());
    }
    let reason = if txn.instruction.is_none() {
        "missing instruction"
    } else if txn.quantity.is_zero() {
        "zero quantity"
    } else if txn.quantity.is_negative() {
        "negative quantity"
    } else {
        return Ok(());
    };
    Err(EngineError::InvalidTransaction {
        transaction_id: txn.transaction_id.clone(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, Decimal, Instruction, Symbol};
    use chrono::NaiveDate;

    fn txn(id: &str, qty: i64) -> Transaction {
        Transaction::new(
            Account::new("x1"),
            id,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            RowType::Trade,
            Symbol::new("XYZ"),
            Some(Instruction::Buy),
            Decimal::from(qty),
            Decimal::from(-qty),
        )
    }

    #[test]
    fn test_identical_duplicate_dropped() {
        let mut report = RunReport::new();
        let rows = dedupe_transactions(vec![txn("t1", 1), txn("t2", 2), txn("t1", 1)], &mut report)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            report.warnings,
            vec![Warning::DuplicateIgnored {
                transaction_id: "t1".to_string()
            }]
        );
    }

    #[test]
    fn test_conflicting_duplicate_is_fatal() {
        let err = dedupe_transactions(vec![txn("t1", 1), txn("t1", 3)], &mut RunReport::new())
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateTransaction("t1".to_string()));
    }

    #[test]
    fn test_repeated_id_after_expansion_is_fatal() {
        assert!(ensure_unique_ids(&[txn("t1", 1), txn("t2", 1)]).is_ok());
        let err = ensure_unique_ids(&[txn("t1", 1), txn("t2", 1), txn("t1", 1)]).unwrap_err();
        assert_eq!(err, EngineError::DuplicateTransaction("t1".to_string()));
    }

    #[test]
    fn test_trade_without_instruction_rejected() {
        let mut bad = txn("t1", 1);
        bad.instruction = None;
        assert!(matches!(
            validate_transaction(&bad),
            Err(EngineError::InvalidTransaction { reason, .. }) if reason == "missing instruction"
        ));
        assert!(validate_transaction(&txn("t2", 0)).is_err());
        assert!(validate_transaction(&txn("t3", 4)).is_ok());

        let mut expire = txn("t4", 0);
        expire.row_type = RowType::Expire;
        expire.instruction = None;
        assert!(validate_transaction(&expire).is_ok());
    }
}
