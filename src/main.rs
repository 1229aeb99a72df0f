use std::sync::Arc;
use tradechains::{
    config::Config, ChainStore, CsvTransactionSource, JsonChainStore, Orchestrator,
    TransactionSource,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let mut source = CsvTransactionSource::new(config.transactions_path.clone());
    if let Some(path) = &config.positions_path {
        source = source.with_positions(path.clone());
    }
    let source: Arc<dyn TransactionSource> = Arc::new(source);
    let store: Arc<dyn ChainStore> = Arc::new(JsonChainStore::new(config.chains_db_path.clone()));

    let orchestrator = Orchestrator::new(source, store, config.run_settings());
    let output = match orchestrator.run().await {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    };

    for position in &output.positions {
        tracing::info!(
            "Open position {}/{}: {}",
            position.account,
            position.symbol,
            position.quantity
        );
    }
    for instrument in &output.report.flagged {
        tracing::warn!("Needs review: {}", instrument);
    }
    tracing::info!(
        "Done: {} transactions, {} chains, {} warnings",
        output.transactions.len(),
        output.chains.chains.len(),
        output.report.warnings.len()
    );
}
