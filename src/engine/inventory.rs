//! FIFO lot inventory for one (account, symbol) pair.
//!
//! Opening rows push lots to the back of the queue; closing rows consume from
//! the front, partially or fully. The inventory also tracks the match id of the
//! current episode: the id of the row that opened the position from flat.

use crate::domain::{Account, Decimal, InstrumentKey, Symbol, Transaction};
use serde::Serialize;
use std::collections::VecDeque;

/// An open lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub transaction_id: String,
    /// Remaining signed quantity.
    pub quantity: Decimal,
    /// Remaining cost basis.
    pub cost: Decimal,
}

/// The part of one lot consumed by a closing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotConsumption {
    pub opening_id: String,
    pub quantity: Decimal,
    /// Cost basis released from the lot.
    pub cost: Decimal,
}

/// A closing row linked to the lots it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub match_id: String,
    pub account: Account,
    pub symbol: Symbol,
    pub closing_id: String,
    pub quantity: Decimal,
    pub consumed: Vec<LotConsumption>,
}

/// Residual open position at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentPosition {
    pub account: Account,
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub match_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FifoInventory {
    key: InstrumentKey,
    lots: VecDeque<Lot>,
    match_id: Option<String>,
}

impl FifoInventory {
    pub fn new(key: InstrumentKey) -> Self {
        Self {
            key,
            lots: VecDeque::new(),
            match_id: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.lots.is_empty()
    }

    /// Match id of the current episode, if a position is open.
    pub fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    /// Net signed quantity held.
    pub fn quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    /// Push a lot for an opening row and return the episode match id.
    pub fn open(&mut self, txn: &Transaction) -> String {
        let match_id = match &self.match_id {
            Some(id) if !self.lots.is_empty() => id.clone(),
            _ => format!("&{}", txn.transaction_id),
        };
        self.match_id = Some(match_id.clone());

        let quantity = txn.signed_quantity();
        if !quantity.is_zero() {
            self.lots.push_back(Lot {
                transaction_id: txn.transaction_id.clone(),
                quantity,
                cost: txn.cost,
            });
        }
        match_id
    }

    /// Consume lots for a closing row.
    ///
    /// Consumes at most the open quantity; callers split crossing rows first.
    /// Returns None when the inventory is flat.
    pub fn close(&mut self, txn: &Transaction) -> Option<Match> {
        let match_id = self.match_id.clone()?;
        let mut remaining = txn.quantity;
        let mut consumed = Vec::new();

        while !remaining.is_zero() {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            let held = front.quantity.abs();
            if remaining >= held {
                consumed.push(LotConsumption {
                    opening_id: front.transaction_id.clone(),
                    quantity: held,
                    cost: front.cost,
                });
                remaining -= held;
                self.lots.pop_front();
            } else {
                let cost = front.cost.share(remaining, held);
                let signed = if front.quantity.is_negative() {
                    -remaining
                } else {
                    remaining
                };
                consumed.push(LotConsumption {
                    opening_id: front.transaction_id.clone(),
                    quantity: remaining,
                    cost,
                });
                front.quantity -= signed;
                front.cost -= cost;
                remaining = Decimal::zero();
            }
        }

        if self.lots.is_empty() {
            self.match_id = None;
        }

        let quantity = consumed.iter().map(|c| c.quantity).sum();
        Some(Match {
            match_id,
            account: self.key.account.clone(),
            symbol: self.key.symbol.clone(),
            closing_id: txn.transaction_id.clone(),
            quantity,
            consumed,
        })
    }

    /// Residual position, or None when flat.
    pub fn position(&self) -> Option<InstrumentPosition> {
        if self.is_flat() {
            return None;
        }
        Some(InstrumentPosition {
            account: self.key.account.clone(),
            symbol: self.key.symbol.clone(),
            quantity: self.quantity(),
            cost: self.lots.iter().map(|lot| lot.cost).sum(),
            match_id: self.match_id.clone(),
        })
    }
}
