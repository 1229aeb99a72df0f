//! End-to-end compilation of a transactions log into matches and chains.

use super::validate::{dedupe_transactions, ensure_unique_ids, validate_transaction};
use super::{CompileOptions, RunOutput};
use crate::domain::ordering::sequence;
use crate::domain::position::seed_transactions;
use crate::domain::{ChainDatabase, InitialPosition, InstrumentKey, Sequenced, Transaction};
use crate::engine::{
    apply_split_directives, chain_transactions, process_instrument, InstrumentOutput, RunReport,
};
use crate::error::EngineError;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Compiler for full-log processing.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile a transactions log against the persisted chain database.
    ///
    /// # Arguments
    /// * `transactions` - Normalized log, in any order
    /// * `positions` - Snapshot of positions held before the log starts
    /// * `db` - Persisted chain database; never modified
    ///
    /// # Errors
    /// Returns an error on conflicting duplicates, invalid rows, bad split
    /// directives or a FINAL chain that is not flat.
    pub fn run(
        &self,
        transactions: Vec<Transaction>,
        positions: &[InitialPosition],
        db: &ChainDatabase,
    ) -> Result<RunOutput, EngineError> {
        let mut report = RunReport::new();
        let input_len = transactions.len();

        let transactions = dedupe_transactions(transactions, &mut report)?;
        let transactions =
            apply_split_directives(transactions, &db.split_transactions, &mut report)?;

        let log_start = transactions.iter().map(|t| t.datetime).min();
        let mut rows = seed_transactions(positions, log_start);
        rows.extend(transactions);

        // Split parts and seeded rows must not collide with logged ids.
        ensure_unique_ids(&rows)?;
        for txn in &rows {
            validate_transaction(txn)?;
        }

        let mut partitions: BTreeMap<InstrumentKey, Vec<Sequenced>> = BTreeMap::new();
        for row in sequence(rows) {
            partitions
                .entry(row.txn.instrument_key())
                .or_default()
                .push(row);
        }
        tracing::info!(
            "Matching {} transactions across {} instruments",
            input_len,
            partitions.len()
        );

        let outputs = self.process_partitions(partitions.into_iter().collect());

        let mut rows: Vec<Sequenced> = Vec::new();
        let mut matches = Vec::new();
        let mut open_positions = Vec::new();
        for output in outputs {
            rows.extend(output.rows);
            matches.extend(output.matches);
            open_positions.extend(output.position);
            report.extend(output.report);
        }
        rows.sort_by_key(|row| row.key);

        let mut transactions: Vec<Transaction> = rows.into_iter().map(|row| row.txn).collect();
        let chains = chain_transactions(
            &mut transactions,
            db,
            chrono::Duration::seconds(self.options.chain_window_secs),
            &mut report,
        )?;

        tracing::info!(
            "Compiled {} rows: {} matches, {} open positions, {} chains, {} warnings",
            transactions.len(),
            matches.len(),
            open_positions.len(),
            chains.chains.len(),
            report.warnings.len()
        );

        Ok(RunOutput {
            transactions,
            matches,
            chains,
            positions: open_positions,
            report,
        })
    }

    /// Run the per-instrument stages in parallel; results come back in key order.
    fn process_partitions(
        &self,
        partitions: Vec<(InstrumentKey, Vec<Sequenced>)>,
    ) -> Vec<InstrumentOutput> {
        let work = move || {
            partitions
                .into_par_iter()
                .map(|(key, rows)| process_instrument(key, rows))
                .collect::<Vec<_>>()
        };

        if self.options.workers == 0 {
            return work();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                tracing::warn!("Falling back to the global thread pool: {}", e);
                work()
            }
        }
    }
}
