//! Manual split directives: user-requested partitions of a transaction.
//!
//! Used to isolate part of a fill, e.g. to separate tax lots. Applied before
//! effect resolution.

use super::report::{RunReport, Warning};
use super::splitter::apportion;
use crate::domain::{Decimal, SplitDirective, Transaction};
use crate::error::EngineError;
use std::collections::{HashMap, HashSet};

/// Split a single transaction according to a directive.
pub fn split_transaction(
    txn: &Transaction,
    directive: &SplitDirective,
) -> Result<Vec<Transaction>, EngineError> {
    if let Some(part) = directive.parts.iter().find(|p| !p.quantity.is_positive()) {
        return Err(EngineError::InvalidTransaction {
            transaction_id: part.id.clone(),
            reason: format!("split part of {} has quantity {}", txn.transaction_id, part.quantity),
        });
    }
    let quantities: Vec<Decimal> = directive.parts.iter().map(|p| p.quantity).collect();
    let total: Decimal = quantities.iter().sum();
    if total != txn.quantity || directive.parts.is_empty() {
        return Err(EngineError::SplitQuantityMismatch {
            transaction_id: txn.transaction_id.clone(),
            parts: total,
            quantity: txn.quantity,
        });
    }

    let costs = apportion(txn.cost, &quantities);
    let commissions = apportion(txn.commissions, &quantities);
    let fees = apportion(txn.fees, &quantities);

    Ok(directive
        .parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut row = txn.clone();
            row.transaction_id = part.id.clone();
            row.quantity = part.quantity;
            row.cost = costs[i];
            row.commissions = commissions[i];
            row.fees = fees[i];
            row
        })
        .collect())
}

/// Apply every directive to the log, keeping the position of split rows.
///
/// Directives naming unknown transactions are reported and skipped.
pub fn apply_split_directives(
    transactions: Vec<Transaction>,
    directives: &[SplitDirective],
    report: &mut RunReport,
) -> Result<Vec<Transaction>, EngineError> {
    if directives.is_empty() {
        return Ok(transactions);
    }

    let by_id: HashMap<&str, &SplitDirective> =
        directives.iter().map(|d| (d.id.as_str(), d)).collect();
    let present: HashSet<&str> = transactions
        .iter()
        .map(|t| t.transaction_id.as_str())
        .collect();
    for directive in directives {
        if !present.contains(directive.id.as_str()) {
            report.warn(Warning::UnknownSplitTransaction {
                transaction_id: directive.id.clone(),
            });
        }
    }

    let mut output = Vec::with_capacity(transactions.len() + directives.len());
    for txn in &transactions {
        match by_id.get(txn.transaction_id.as_str()) {
            Some(directive) => {
                let parts = split_transaction(txn, directive)?;
                tracing::debug!(
                    "Manually split {} into {} parts",
                    txn.transaction_id,
                    parts.len()
                );
                output.extend(parts);
            }
            None => output.push(txn.clone()),
        }
    }
    Ok(output)
}
