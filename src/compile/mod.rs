//! Compile pipeline for transforming a normalized transactions log into
//! matches and reconciled chains.
//!
//! This module provides:
//! - Input validation and duplicate handling
//! - Manual splits and initial position seeding
//! - Per-instrument matching on a rayon pool
//! - Chain building and reconciliation against the persisted database

use crate::domain::{ChainDatabase, Transaction};
use crate::engine::{InstrumentPosition, Match, RunReport, DEFAULT_CHAIN_WINDOW_SECS};
use serde::Serialize;

pub mod pipeline;
pub mod validate;

pub use pipeline::Compiler;

/// Tunables for a compile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Proximity window for heuristic chain links, in seconds.
    pub chain_window_secs: i64,
    /// Worker threads for per-instrument processing; 0 uses the global pool.
    pub workers: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            chain_window_secs: DEFAULT_CHAIN_WINDOW_SECS,
            workers: 0,
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    /// Annotated transactions in global chronological order.
    pub transactions: Vec<Transaction>,
    pub matches: Vec<Match>,
    /// The database to persist.
    pub chains: ChainDatabase,
    /// Residual open positions, in instrument order.
    pub positions: Vec<InstrumentPosition>,
    pub report: RunReport,
}
