//! Mock data source for testing without files.

use super::{DataSourceError, TransactionSource};
use crate::domain::{InitialPosition, Transaction};
use async_trait::async_trait;

/// Mock data source that returns predefined test data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    transactions: Vec<Transaction>,
    positions: Vec<InitialPosition>,
    failure: Option<String>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction to the mock data source.
    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Add multiple transactions to the mock data source.
    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    /// Add an initial position.
    pub fn with_position(mut self, position: InitialPosition) -> Self {
        self.positions.push(position);
        self
    }

    /// Make every fetch fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn check(&self) -> Result<(), DataSourceError> {
        match &self.failure {
            Some(message) => Err(DataSourceError::Other(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransactionSource for MockDataSource {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, DataSourceError> {
        self.check()?;
        Ok(self.transactions.clone())
    }

    async fn fetch_initial_positions(&self) -> Result<Vec<InitialPosition>, DataSourceError> {
        self.check()?;
        Ok(self.positions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, Decimal, Instruction, RowType, Symbol};
    use chrono::NaiveDate;

    fn make_test_transaction() -> Transaction {
        Transaction::new(
            Account::new("x1"),
            "t1",
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            RowType::Trade,
            Symbol::new("XYZ"),
            Some(Instruction::Buy),
            Decimal::from(1),
            Decimal::from(-10),
        )
    }

    #[tokio::test]
    async fn test_mock_datasource_fetch_transactions() {
        let txn = make_test_transaction();
        let mock = MockDataSource::new().with_transaction(txn.clone());
        let txns = mock.fetch_transactions().await.unwrap();
        assert_eq!(txns, vec![txn]);
        assert!(mock.fetch_initial_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_datasource_failure() {
        let mock = MockDataSource::new().with_failure("offline");
        let err = mock.fetch_transactions().await.unwrap_err();
        assert_eq!(err.to_string(), "Error: offline");
    }
}
