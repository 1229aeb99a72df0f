//! Transaction type representing one normalized ledger event.

use crate::domain::{Account, Decimal, Effect, InstrumentKey, Instruction, RowType, Symbol};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single ledger event, as produced by an upstream adapter and annotated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account the event belongs to.
    pub account: Account,
    /// Globally unique identifier.
    pub transaction_id: String,
    /// Local, naive timestamp.
    pub datetime: NaiveDateTime,
    /// Kind of row.
    pub row_type: RowType,
    /// Order the event was part of, if any.
    pub order_id: Option<String>,
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Position effect; `Unknown` until resolved.
    #[serde(default)]
    pub effect: Effect,
    /// Buy or Sell. May be missing on expiration-type rows.
    pub instruction: Option<Instruction>,
    /// Unsigned quantity; the sign is carried by `instruction`.
    pub quantity: Decimal,
    /// Price per unit.
    pub price: Decimal,
    /// Signed cost (negative for debits).
    pub cost: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    #[serde(default)]
    pub description: String,
    /// Match id, filled in by the inventory matcher.
    pub match_id: Option<String>,
    /// Chain id, filled in by the chain reconciler.
    pub chain_id: Option<String>,
    /// True if this row is one of the opening legs of its chain.
    #[serde(default)]
    pub init: bool,
}

impl Transaction {
    /// Create a new Transaction with zero commissions and fees.
    ///
    /// The price is derived from cost and quantity.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account: Account,
        transaction_id: impl Into<String>,
        datetime: NaiveDateTime,
        row_type: RowType,
        symbol: Symbol,
        instruction: Option<Instruction>,
        quantity: Decimal,
        cost: Decimal,
    ) -> Self {
        let price = if quantity.is_zero() {
            Decimal::zero()
        } else {
            (cost / quantity).abs()
        };
        Transaction {
            account,
            transaction_id: transaction_id.into(),
            datetime,
            row_type,
            order_id: None,
            symbol,
            effect: Effect::Unknown,
            instruction,
            quantity,
            price,
            cost,
            commissions: Decimal::zero(),
            fees: Decimal::zero(),
            description: String::new(),
            match_id: None,
            chain_id: None,
            init: false,
        }
    }

    /// Set the reported position effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Set the order id.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Set commissions and fees.
    pub fn with_charges(mut self, commissions: Decimal, fees: Decimal) -> Self {
        self.commissions = commissions;
        self.fees = fees;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The inventory partition this transaction belongs to.
    pub fn instrument_key(&self) -> InstrumentKey {
        InstrumentKey::new(self.account.clone(), self.symbol.clone())
    }

    /// The underlying of the traded symbol.
    pub fn underlying(&self) -> &str {
        self.symbol.underlying()
    }

    /// Signed quantity: Buy = +quantity, Sell = -quantity, zero without instruction.
    pub fn signed_quantity(&self) -> Decimal {
        match self.instruction {
            Some(Instruction::Buy) => self.quantity,
            Some(Instruction::Sell) => -self.quantity,
            None => Decimal::zero(),
        }
    }

    /// Signed quantity counted toward positions.
    ///
    /// Only rows with a resolved effect move inventory; cash and mark rows never do.
    pub fn position_delta(&self) -> Decimal {
        if matches!(self.row_type, RowType::Cash | RowType::Mark) {
            return Decimal::zero();
        }
        match self.effect {
            Effect::Opening | Effect::Closing => self.signed_quantity(),
            Effect::Unknown => Decimal::zero(),
        }
    }
}

/// Derive a stable synthetic identifier from a prefix and key parts.
pub fn synthetic_id(prefix: &str, parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let hash = hasher.finalize();
    format!("{}-{}", prefix, hex::encode(&hash[..6]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_transaction_creation_derives_price() {
        let txn = Transaction::new(
            Account::new("x1"),
            "t1",
            at(10),
            RowType::Trade,
            Symbol::new("XYZ"),
            Some(Instruction::Buy),
            d("10"),
            d("-25"),
        );

        assert_eq!(txn.price, d("2.5"));
        assert_eq!(txn.effect, Effect::Unknown);
        assert_eq!(txn.signed_quantity(), d("10"));
        assert_eq!(txn.position_delta(), Decimal::zero());
        assert_eq!(txn.instrument_key().to_string(), "x1/XYZ");
    }

    #[test]
    fn test_sell_is_negative() {
        let txn = Transaction::new(
            Account::new("x1"),
            "t1",
            at(10),
            RowType::Trade,
            Symbol::new("XYZ"),
            Some(Instruction::Sell),
            d("3"),
            d("30"),
        )
        .with_effect(Effect::Closing);

        assert_eq!(txn.signed_quantity(), d("-3"));
        assert_eq!(txn.position_delta(), d("-3"));
    }

    #[test]
    fn test_synthetic_id_deterministic() {
        let a = synthetic_id("open", &["x1", "XYZ"]);
        let b = synthetic_id("open", &["x1", "XYZ"]);
        let c = synthetic_id("open", &["x1", "XY", "Z"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("open-"));
        assert_eq!(a.len(), "open-".len() + 12);
    }

    #[test]
    fn test_transaction_serialization() {
        let txn = Transaction::new(
            Account::new("x1"),
            "t1",
            at(10),
            RowType::Trade,
            Symbol::new("XYZ"),
            Some(Instruction::Buy),
            d("10"),
            d("-25"),
        )
        .with_order_id("o1");

        let json = serde_json::to_string(&txn).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(txn, back);
    }
}
