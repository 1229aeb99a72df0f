//! Initial position snapshot used to seed inventory before the log window.

use crate::domain::transaction::synthetic_id;
use crate::domain::{Account, Decimal, Effect, Instruction, RowType, Symbol, Transaction};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A position held at the start of the transactions log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPosition {
    pub account: Account,
    pub symbol: Symbol,
    pub instruction: Instruction,
    pub quantity: Decimal,
    pub cost: Decimal,
    /// Date the snapshot was taken.
    pub as_of: NaiveDateTime,
}

impl InitialPosition {
    /// Stable id for the synthetic opening row of this position.
    pub fn transaction_id(&self) -> String {
        synthetic_id("open", &[self.account.as_str(), self.symbol.as_str()])
    }

    /// Convert into a synthetic `Open` transaction dated at `datetime`.
    pub fn to_transaction(&self, datetime: NaiveDateTime) -> Transaction {
        let transaction_id = self.transaction_id();
        Transaction::new(
            self.account.clone(),
            transaction_id.clone(),
            datetime,
            RowType::Open,
            self.symbol.clone(),
            Some(self.instruction),
            self.quantity,
            self.cost,
        )
        .with_effect(Effect::Opening)
        .with_order_id(format!("o{}", transaction_id))
        .with_description(format!("Opening balance for {}", self.symbol))
    }
}

/// Convert a snapshot into synthetic opening rows dated before the log start.
///
/// Each row is dated at its `as_of` time, or one second before the first logged
/// transaction when that is earlier.
pub fn seed_transactions(
    positions: &[InitialPosition],
    log_start: Option<NaiveDateTime>,
) -> Vec<Transaction> {
    positions
        .iter()
        .map(|position| {
            let datetime = match log_start {
                Some(start) => {
                    let before = start - chrono::Duration::seconds(1);
                    position.as_of.min(before)
                }
                None => position.as_of,
            };
            position.to_transaction(datetime)
        })
        .collect()
}
