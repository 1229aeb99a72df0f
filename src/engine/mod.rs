//! Pure computation engine(s) for deterministic matching and chaining.
//!
//! Per-instrument stages (effect resolution, zero-crossing splits, FIFO
//! matching) live in `instrument`; the global stages (chain building and
//! reconciliation) need the whole log.

pub mod chain_builder;
pub mod effect;
pub mod instrument;
pub mod inventory;
pub mod manual_split;
pub mod reconcile;
pub mod report;
pub mod splitter;
pub mod status;
pub mod union_find;

pub use chain_builder::{unique_name, CandidateChain, ChainBuilder, DEFAULT_CHAIN_WINDOW_SECS};
pub use effect::{EffectResolver, Resolution};
pub use instrument::{process_instrument, InstrumentOutput};
pub use inventory::{FifoInventory, InstrumentPosition, Lot, LotConsumption, Match};
pub use manual_split::apply_split_directives;
pub use reconcile::chain_transactions;
pub use report::{RunReport, Warning};
pub use splitter::{apportion, split_zero_crossing, SplitOutcome};
pub use status::{accept_chain, finalize_chain, ignore_chain, net_quantities};
pub use union_find::DisjointSet;
