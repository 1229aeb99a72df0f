//! Effect resolution against a running signed position.

use super::report::{RunReport, Warning};
use crate::domain::{Decimal, Effect, InstrumentKey, Instruction, Transaction};
use std::collections::BTreeMap;

/// How a trade row was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The row opens or augments a position.
    Opening,
    /// The row reduces a position holding `available` units (zero when flat).
    Closing { available: Decimal },
}

/// Running signed quantity per instrument.
#[derive(Debug, Clone, Default)]
pub struct EffectResolver {
    positions: BTreeMap<InstrumentKey, Decimal>,
}

impl EffectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current signed position of an instrument.
    pub fn position(&self, key: &InstrumentKey) -> Decimal {
        self.positions.get(key).copied().unwrap_or_default()
    }

    /// Resolve the effect of a trade row, writing it into `txn`.
    ///
    /// Unknown effects are inferred from the sign of the position. A reported
    /// effect that contradicts a nonzero position is replaced by the inferred one.
    pub fn resolve(&self, txn: &mut Transaction, report: &mut RunReport) -> Resolution {
        let key = txn.instrument_key();
        let position = self.position(&key);
        let delta = txn.signed_quantity();

        let inferred = if position.opposes(&delta) {
            Effect::Closing
        } else {
            Effect::Opening
        };

        let effect = match txn.effect {
            Effect::Unknown => inferred,
            reported if position.is_zero() => reported,
            reported if reported != inferred => {
                report.warn(Warning::EffectConflict {
                    instrument: key,
                    transaction_id: txn.transaction_id.clone(),
                });
                inferred
            }
            reported => reported,
        };

        txn.effect = effect;
        match effect {
            Effect::Closing => Resolution::Closing {
                available: position.abs(),
            },
            _ => Resolution::Opening,
        }
    }

    /// Rewrite an expire/assign/exercise row to close the whole position.
    ///
    /// Returns false when the instrument is flat; the row then carries zero quantity.
    pub fn resolve_expiration(&self, txn: &mut Transaction, report: &mut RunReport) -> bool {
        let key = txn.instrument_key();
        let position = self.position(&key);

        txn.effect = Effect::Closing;
        txn.cost = Decimal::zero();
        txn.price = Decimal::zero();

        if position.is_zero() {
            txn.quantity = Decimal::zero();
            report.warn(Warning::EmptyExpiration {
                instrument: key,
                transaction_id: txn.transaction_id.clone(),
            });
            return false;
        }

        txn.instruction = Some(if position.is_positive() {
            Instruction::Sell
        } else {
            Instruction::Buy
        });
        txn.quantity = position.abs();
        true
    }

    /// Move the running position by a resolved row.
    pub fn apply(&mut self, txn: &Transaction) {
        let delta = txn.position_delta();
        if delta.is_zero() {
            return;
        }
        let entry = self.positions.entry(txn.instrument_key()).or_default();
        *entry += delta;
    }
}
