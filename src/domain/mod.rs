//! Domain types and determinism layer for the matching engine.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Account, Symbol, Instruction, Effect, RowType
//! - Transaction, initial position and chain database records
//! - Stable transaction ordering for deterministic processing

pub mod chain;
pub mod decimal;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod transaction;

pub use chain::{Chain, ChainDatabase, ChainMetadata, ChainStatus, SplitDirective, SplitPart};
pub use decimal::Decimal;
pub use ordering::{Sequenced, TransactionOrderingKey};
pub use position::InitialPosition;
pub use primitives::{Account, Effect, InstrumentKey, Instruction, RowType, Symbol};
pub use transaction::Transaction;
