//! Per-instrument processing: effect resolution, zero-crossing splits and FIFO matching.
//!
//! Each (account, symbol) partition is processed by one worker that owns its
//! running position and lot queue.

use super::effect::{EffectResolver, Resolution};
use super::inventory::{FifoInventory, InstrumentPosition, Match};
use super::report::{RunReport, Warning};
use super::splitter::{split_zero_crossing, SplitOutcome};
use crate::domain::transaction::synthetic_id;
use crate::domain::{
    Decimal, Effect, InstrumentKey, RowType, Sequenced, Transaction, TransactionOrderingKey,
};

/// Everything produced for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentOutput {
    pub key: InstrumentKey,
    /// Annotated rows, including split fragments and synthesized opens.
    pub rows: Vec<Sequenced>,
    pub matches: Vec<Match>,
    pub position: Option<InstrumentPosition>,
    pub report: RunReport,
}

struct InstrumentProcessor {
    key: InstrumentKey,
    resolver: EffectResolver,
    inventory: FifoInventory,
    rows: Vec<Sequenced>,
    matches: Vec<Match>,
    report: RunReport,
}

/// Process the chronologically ordered rows of a single instrument.
pub fn process_instrument(key: InstrumentKey, rows: Vec<Sequenced>) -> InstrumentOutput {
    let mut processor = InstrumentProcessor {
        key: key.clone(),
        resolver: EffectResolver::new(),
        inventory: FifoInventory::new(key),
        rows: Vec::with_capacity(rows.len()),
        matches: Vec::new(),
        report: RunReport::new(),
    };
    for row in rows {
        processor.process(row);
    }

    let position = processor.inventory.position();
    if let Some(position) = &position {
        tracing::debug!(
            "Residual position in {}: {}",
            processor.key,
            position.quantity
        );
    }

    InstrumentOutput {
        key: processor.key,
        rows: processor.rows,
        matches: processor.matches,
        position,
        report: processor.report,
    }
}

impl InstrumentProcessor {
    fn process(&mut self, row: Sequenced) {
        let Sequenced { key, mut txn } = row;

        match txn.row_type {
            RowType::Cash | RowType::Mark => {
                txn.match_id = self.inventory.match_id().map(str::to_string);
                self.rows.push(Sequenced { key, txn });
                return;
            }
            RowType::Expire | RowType::Assign | RowType::Exercise => {
                if !self.resolver.resolve_expiration(&mut txn, &mut self.report) {
                    self.rows.push(Sequenced { key, txn });
                    return;
                }
                let available = self.inventory.quantity().abs();
                self.close(key, txn, available);
                return;
            }
            RowType::Trade | RowType::Open => {}
        }

        match self.resolver.resolve(&mut txn, &mut self.report) {
            Resolution::Opening => self.open(key, txn),
            Resolution::Closing { available } if available.is_zero() => {
                self.close_unmatched(key, txn)
            }
            Resolution::Closing { available } => self.close(key, txn, available),
        }
    }

    fn open(&mut self, key: TransactionOrderingKey, mut txn: Transaction) {
        let match_id = self.inventory.open(&txn);
        txn.match_id = Some(match_id);
        self.resolver.apply(&txn);
        self.rows.push(Sequenced { key, txn });
    }

    fn close(
        &mut self,
        key: TransactionOrderingKey,
        txn: Transaction,
        available: Decimal,
    ) {
        match split_zero_crossing(txn, available) {
            SplitOutcome::Unchanged(txn) => self.consume(key, txn),
            SplitOutcome::Crossed { closing, opening } => {
                self.consume(key.fragment(1), closing);
                self.open(key.fragment(2), opening);
            }
        }
    }

    fn consume(&mut self, key: TransactionOrderingKey, mut txn: Transaction) {
        if let Some(matched) = self.inventory.close(&txn) {
            txn.match_id = Some(matched.match_id.clone());
            self.matches.push(matched);
        }
        self.resolver.apply(&txn);
        self.rows.push(Sequenced { key, txn });
    }

    /// Synthesize a zero-cost opening row so an unmatched close has a lot to consume.
    fn close_unmatched(&mut self, key: TransactionOrderingKey, txn: Transaction) {
        self.report.warn(Warning::UnmatchedClose {
            instrument: self.key.clone(),
            transaction_id: txn.transaction_id.clone(),
            quantity: txn.quantity,
        });
        self.report.flag(self.key.clone());

        let instruction = txn.instruction.map(|i| i.opposite());
        let synthetic = Transaction::new(
            txn.account.clone(),
            synthetic_id("synth", &[txn.transaction_id.as_str()]),
            txn.datetime,
            RowType::Open,
            txn.symbol.clone(),
            instruction,
            txn.quantity,
            Decimal::zero(),
        )
        .with_effect(Effect::Opening)
        .with_description(format!("Synthetic opening for {}", txn.transaction_id));

        self.open(key, synthetic);
        self.consume(key.fragment(1), txn);
    }
}
