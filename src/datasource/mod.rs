//! Data source abstraction for fetching normalized transactions and position snapshots.

use crate::domain::{InitialPosition, Transaction};
use async_trait::async_trait;
use std::fmt;

pub mod csv;
pub mod mock;

pub use self::csv::{
    parse_positions_csv, parse_transactions_csv, transactions_to_csv, write_transactions_csv,
    CsvTransactionSource,
};
pub use mock::MockDataSource;

/// Source of an already normalized transactions log.
///
/// Broker-specific adapters live upstream; implementations only read their output.
#[async_trait]
pub trait TransactionSource: Send + Sync + fmt::Debug {
    /// Fetch the full transactions log, in any order.
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, DataSourceError>;

    /// Fetch the positions held before the log starts. Empty if unavailable.
    async fn fetch_initial_positions(&self) -> Result<Vec<InitialPosition>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// File could not be read or written
    Io(String),
    /// Parsing error (malformed CSV row or field)
    ParseError { line: u64, message: String },
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::Io(msg) => write!(f, "IO error: {}", msg),
            DataSourceError::ParseError { line, message } => {
                write!(f, "Parse error at line {}: {}", line, message)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

impl From<std::io::Error> for DataSourceError {
    fn from(err: std::io::Error) -> Self {
        DataSourceError::Io(err.to_string())
    }
}
