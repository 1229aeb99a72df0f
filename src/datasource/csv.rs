//! CSV files in the normalized transactions format.
//!
//! Transactions columns: `account, transaction_id, datetime, row_type, order_id,
//! symbol, effect, instruction, quantity, price, cost, commissions, fees,
//! description`. Positions columns: `account, symbol, instruction, quantity,
//! cost, as_of`. Blank optional fields are allowed.

use super::{DataSourceError, TransactionSource};
use crate::domain::{
    Account, Decimal, Effect, InitialPosition, Instruction, RowType, Symbol, Transaction,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Reads the transactions log and optional positions snapshot from disk.
#[derive(Debug, Clone)]
pub struct CsvTransactionSource {
    transactions_path: PathBuf,
    positions_path: Option<PathBuf>,
}

impl CsvTransactionSource {
    pub fn new(transactions_path: impl Into<PathBuf>) -> Self {
        Self {
            transactions_path: transactions_path.into(),
            positions_path: None,
        }
    }

    pub fn with_positions(mut self, positions_path: impl Into<PathBuf>) -> Self {
        self.positions_path = Some(positions_path.into());
        self
    }
}

#[async_trait]
impl TransactionSource for CsvTransactionSource {
    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, DataSourceError> {
        let bytes = read_file(&self.transactions_path).await?;
        let transactions = parse_transactions_csv(&bytes)?;
        tracing::info!(
            "Read {} transactions from {}",
            transactions.len(),
            self.transactions_path.display()
        );
        Ok(transactions)
    }

    async fn fetch_initial_positions(&self) -> Result<Vec<InitialPosition>, DataSourceError> {
        let Some(path) = &self.positions_path else {
            return Ok(Vec::new());
        };
        let bytes = read_file(path).await?;
        let positions = parse_positions_csv(&bytes)?;
        tracing::info!("Read {} initial positions from {}", positions.len(), path.display());
        Ok(positions)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, DataSourceError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| DataSourceError::Io(format!("{}: {}", path.display(), e)))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_row_type(s: &str) -> Option<RowType> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trade" => Some(RowType::Trade),
        "expire" => Some(RowType::Expire),
        "assign" => Some(RowType::Assign),
        "exercise" => Some(RowType::Exercise),
        "mark" => Some(RowType::Mark),
        "open" => Some(RowType::Open),
        "cash" => Some(RowType::Cash),
        _ => None,
    }
}

fn parse_effect(s: &str) -> Option<Effect> {
    match s.trim().to_ascii_lowercase().as_str() {
        "opening" => Some(Effect::Opening),
        "closing" => Some(Effect::Closing),
        "" | "unknown" => Some(Effect::Unknown),
        _ => None,
    }
}

fn parse_instruction(s: &str) -> Option<Instruction> {
    match s.trim().to_ascii_lowercase().as_str() {
        "buy" => Some(Instruction::Buy),
        "sell" => Some(Instruction::Sell),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

struct LineParser {
    line: u64,
}

impl LineParser {
    fn error(&self, message: String) -> DataSourceError {
        DataSourceError::ParseError {
            line: self.line,
            message,
        }
    }

    fn decimal(&self, field: &str, value: &str) -> Result<Decimal, DataSourceError> {
        Decimal::from_str_canonical(value.trim())
            .map_err(|e| self.error(format!("invalid {}: {}", field, e)))
    }

    fn optional_decimal(
        &self,
        field: &str,
        value: Option<String>,
    ) -> Result<Option<Decimal>, DataSourceError> {
        non_empty(value)
            .map(|v| self.decimal(field, &v))
            .transpose()
    }

    fn datetime(&self, value: &str) -> Result<NaiveDateTime, DataSourceError> {
        parse_datetime(value).ok_or_else(|| self.error(format!("invalid datetime: {}", value)))
    }

    fn instruction(&self, value: &str) -> Result<Instruction, DataSourceError> {
        parse_instruction(value).ok_or_else(|| self.error(format!("invalid instruction: {}", value)))
    }
}

/// Parse a normalized transactions CSV.
pub fn parse_transactions_csv(csv_bytes: &[u8]) -> Result<Vec<Transaction>, DataSourceError> {
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        account: String,
        transaction_id: String,
        datetime: String,
        row_type: String,
        order_id: Option<String>,
        symbol: String,
        effect: Option<String>,
        instruction: Option<String>,
        quantity: Option<String>,
        price: Option<String>,
        cost: Option<String>,
        commissions: Option<String>,
        fees: Option<String>,
        description: Option<String>,
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(csv_bytes);

    let mut transactions = Vec::new();
    for record in reader.deserialize::<Row>() {
        let row = record.map_err(|e| DataSourceError::ParseError {
            line: e.position().map(|p| p.line()).unwrap_or_default(),
            message: e.to_string(),
        })?;
        let parser = LineParser {
            line: transactions.len() as u64 + 2,
        };

        let row_type = parse_row_type(&row.row_type)
            .ok_or_else(|| parser.error(format!("invalid row_type: {}", row.row_type)))?;
        let effect = parse_effect(row.effect.as_deref().unwrap_or_default())
            .ok_or_else(|| parser.error(format!("invalid effect: {:?}", row.effect)))?;
        let instruction = non_empty(row.instruction)
            .map(|s| parser.instruction(&s))
            .transpose()?;
        let quantity = parser
            .optional_decimal("quantity", row.quantity)?
            .unwrap_or_default()
            .abs();
        let cost = parser.optional_decimal("cost", row.cost)?.unwrap_or_default();
        let price = parser.optional_decimal("price", row.price)?;
        let commissions = parser
            .optional_decimal("commissions", row.commissions)?
            .unwrap_or_default();
        let fees = parser.optional_decimal("fees", row.fees)?.unwrap_or_default();

        let mut txn = Transaction::new(
            Account::new(row.account),
            row.transaction_id,
            parser.datetime(&row.datetime)?,
            row_type,
            Symbol::new(row.symbol),
            instruction,
            quantity,
            cost,
        )
        .with_effect(effect)
        .with_charges(commissions, fees)
        .with_description(row.description.unwrap_or_default());
        if let Some(order_id) = non_empty(row.order_id) {
            txn = txn.with_order_id(order_id);
        }
        if let Some(price) = price {
            txn.price = price;
        }
        transactions.push(txn);
    }

    Ok(transactions)
}

/// Parse a positions snapshot CSV.
pub fn parse_positions_csv(csv_bytes: &[u8]) -> Result<Vec<InitialPosition>, DataSourceError> {
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        account: String,
        symbol: String,
        instruction: String,
        quantity: String,
        cost: Option<String>,
        as_of: String,
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(csv_bytes);

    let mut positions = Vec::new();
    for record in reader.deserialize::<Row>() {
        let row = record.map_err(|e| DataSourceError::ParseError {
            line: e.position().map(|p| p.line()).unwrap_or_default(),
            message: e.to_string(),
        })?;
        let parser = LineParser {
            line: positions.len() as u64 + 2,
        };

        positions.push(InitialPosition {
            account: Account::new(row.account),
            symbol: Symbol::new(row.symbol),
            instruction: parser.instruction(&row.instruction)?,
            quantity: parser.decimal("quantity", &row.quantity)?.abs(),
            cost: parser.optional_decimal("cost", row.cost)?.unwrap_or_default(),
            as_of: parser.datetime(&row.as_of)?,
        });
    }

    Ok(positions)
}

/// Serialize annotated transactions to CSV bytes.
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<Vec<u8>, DataSourceError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    for txn in transactions {
        writer
            .serialize(txn)
            .map_err(|e| DataSourceError::Other(format!("csv write: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| DataSourceError::Other(format!("csv flush: {}", e)))
}

/// Write annotated transactions, including match and chain ids, to a CSV file.
pub async fn write_transactions_csv(
    path: &Path,
    transactions: &[Transaction],
) -> Result<(), DataSourceError> {
    let bytes = transactions_to_csv(transactions)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| DataSourceError::Io(format!("{}: {}", path.display(), e)))?;
    tracing::info!(
        "Wrote {} annotated transactions to {}",
        transactions.len(),
        path.display()
    );
    Ok(())
}
