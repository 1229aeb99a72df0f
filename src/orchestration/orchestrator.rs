use crate::compile::{CompileOptions, Compiler, RunOutput};
use crate::datasource::{write_transactions_csv, TransactionSource};
use crate::db::ChainStore;
use crate::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

/// Knobs the orchestrator needs beyond the compile options.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub compile: CompileOptions,
    /// Annotated transactions CSV to write after a successful run.
    pub output_path: Option<PathBuf>,
    /// Compute everything but leave the chain database untouched.
    pub dry_run: bool,
}

#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn TransactionSource>,
    store: Arc<dyn ChainStore>,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        store: Arc<dyn ChainStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Read inputs, compile, and persist the chain database.
    ///
    /// The database is read once and written once, only after every stage
    /// succeeded. The annotated CSV is written only after the database save.
    /// Nothing is written on error, and the database is left alone in dry-run mode.
    pub async fn run(&self) -> Result<RunOutput, AppError> {
        let transactions = self.source.fetch_transactions().await?;
        let positions = self.source.fetch_initial_positions().await?;
        let db = self.store.load().await?;

        let compiler = Compiler::new(self.settings.compile);
        let output = compiler.run(transactions, &positions, &db)?;

        if self.settings.dry_run {
            tracing::info!("Dry run: chain database left unchanged");
        } else if output.chains == db {
            tracing::info!("Chain database unchanged");
        } else {
            self.store.save(&output.chains).await?;
        }

        // Annotations carry chain ids, so they follow the database.
        if let Some(path) = &self.settings.output_path {
            write_transactions_csv(path, &output.transactions).await?;
        }

        Ok(output)
    }
}
