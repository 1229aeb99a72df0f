use crate::config::ConfigError;
use crate::datasource::DataSourceError;
use crate::db::StoreError;
use crate::domain::Decimal;
use thiserror::Error;

/// Fatal conditions that abort a run before any output is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("chain {chain_id} is FINAL but holds {quantity} of {symbol}")]
    FinalChainNotFlat {
        chain_id: String,
        symbol: String,
        quantity: Decimal,
    },
    #[error("split of transaction {transaction_id}: parts sum to {parts} but the transaction has {quantity}")]
    SplitQuantityMismatch {
        transaction_id: String,
        parts: Decimal,
        quantity: Decimal,
    },
    #[error("duplicate transaction id {0} with differing content")]
    DuplicateTransaction(String),
    #[error("invalid transaction {transaction_id}: {reason}")]
    InvalidTransaction {
        transaction_id: String,
        reason: String,
    },
    #[error("chain not found: {0}")]
    ChainNotFound(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("Chain store error: {0}")]
    Store(#[from] StoreError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
