//! Domain primitives: Account, Symbol, Instruction, Effect, RowType.

use serde::{Deserialize, Serialize};

/// Account identifier as reported by the upstream adapter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account(pub String);

impl Account {
    /// Create an Account from a string.
    pub fn new(account: impl Into<String>) -> Self {
        Account(account.into())
    }

    /// Get the account as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized instrument symbol (e.g. "SPY", "SPY_240119_C450", "/ESZ23").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a Symbol from a string.
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into())
    }

    /// Get the symbol as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The underlying instrument: everything before the first `_`.
    pub fn underlying(&self) -> &str {
        match self.0.split_once('_') {
            Some((underlying, _)) => underlying,
            None => &self.0,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inventory partition key: one FIFO queue per (account, symbol).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub account: Account,
    pub symbol: Symbol,
}

impl InstrumentKey {
    pub fn new(account: Account, symbol: Symbol) -> Self {
        Self { account, symbol }
    }
}

impl std::fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.symbol)
    }
}

/// Trade instruction: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instruction {
    Buy,
    Sell,
}

impl Instruction {
    /// Get the signed multiplier for this instruction (+1 for Buy, -1 for Sell).
    pub fn sign(&self) -> i64 {
        match self {
            Instruction::Buy => 1,
            Instruction::Sell => -1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Instruction::Buy => Instruction::Sell,
            Instruction::Sell => Instruction::Buy,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Buy => write!(f, "BUY"),
            Instruction::Sell => write!(f, "SELL"),
        }
    }
}

/// Position effect of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Increases the position.
    Opening,
    /// Decreases the position.
    Closing,
    /// Not reported by the source; resolved from inventory.
    #[default]
    Unknown,
}

/// Kind of ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowType {
    Trade,
    Expire,
    Assign,
    Exercise,
    Mark,
    Open,
    Cash,
}

impl RowType {
    /// Rows whose reported quantity is ignored in favor of closing the whole position.
    pub fn is_expiration(&self) -> bool {
        matches!(self, RowType::Expire | RowType::Assign | RowType::Exercise)
    }

    /// Rows that change inventory through their own quantity.
    pub fn is_inventory(&self) -> bool {
        matches!(self, RowType::Trade | RowType::Open)
    }
}
