//! Run-level report of recoverable conditions.

use crate::domain::{Decimal, InstrumentKey};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A recoverable condition detected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A closing transaction found no open inventory; a zero-cost lot was synthesized.
    UnmatchedClose {
        instrument: InstrumentKey,
        transaction_id: String,
        quantity: Decimal,
    },
    /// A reported effect contradicted the running position and was re-inferred.
    EffectConflict {
        instrument: InstrumentKey,
        transaction_id: String,
    },
    /// An expiration-type row arrived while the instrument was flat.
    EmptyExpiration {
        instrument: InstrumentKey,
        transaction_id: String,
    },
    /// A time-proximity link was skipped because it would merge different underlyings.
    AmbiguousUnderlying {
        first_id: String,
        second_id: String,
        underlyings: Vec<String>,
    },
    /// A split directive names a transaction not present in the log.
    UnknownSplitTransaction { transaction_id: String },
    /// A persisted chain references a transaction not present in the log.
    UnknownChainTransaction {
        chain_id: String,
        transaction_id: String,
    },
    /// A persisted chain no longer matches any transaction.
    OrphanedChain { chain_id: String },
    /// Transactions curated into different chains ended up linked together.
    /// The first chain id keeps the group; the others keep only their own `ids`.
    CuratedChainConflict { chain_ids: Vec<String> },
    /// A transaction appeared twice with identical content; the copy was dropped.
    DuplicateIgnored { transaction_id: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnmatchedClose {
                instrument,
                transaction_id,
                quantity,
            } => write!(
                f,
                "Unmatched close of {} by {} in {}; synthesized opening lot",
                quantity, transaction_id, instrument
            ),
            Warning::EffectConflict {
                instrument,
                transaction_id,
            } => write!(
                f,
                "Effect of {} in {} contradicts the position; re-inferred",
                transaction_id, instrument
            ),
            Warning::EmptyExpiration {
                instrument,
                transaction_id,
            } => write!(
                f,
                "Expiration {} in {} with no open position",
                transaction_id, instrument
            ),
            Warning::AmbiguousUnderlying {
                first_id,
                second_id,
                underlyings,
            } => write!(
                f,
                "Not linking {} and {}: would merge underlyings {}",
                first_id,
                second_id,
                underlyings.join(",")
            ),
            Warning::UnknownSplitTransaction { transaction_id } => {
                write!(f, "Split directive for unknown transaction {}", transaction_id)
            }
            Warning::UnknownChainTransaction {
                chain_id,
                transaction_id,
            } => write!(
                f,
                "Chain {} references unknown transaction {}",
                chain_id, transaction_id
            ),
            Warning::OrphanedChain { chain_id } => {
                write!(f, "Chain {} no longer matches any transaction", chain_id)
            }
            Warning::CuratedChainConflict { chain_ids } => write!(
                f,
                "Curated chains {} are linked; keeping {} as the group",
                chain_ids.join(","),
                chain_ids.first().map(String::as_str).unwrap_or_default()
            ),
            Warning::DuplicateIgnored { transaction_id } => {
                write!(f, "Dropped identical duplicate of {}", transaction_id)
            }
        }
    }
}

/// Warnings and flagged instruments collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub warnings: Vec<Warning>,
    /// Instruments that need manual review.
    pub flagged: BTreeSet<InstrumentKey>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Flag an instrument for manual review.
    pub fn flag(&mut self, instrument: InstrumentKey) {
        self.flagged.insert(instrument);
    }

    /// Append another report, keeping order.
    pub fn extend(&mut self, other: RunReport) {
        self.warnings.extend(other.warnings);
        self.flagged.extend(other.flagged);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.flagged.is_empty()
    }
}
