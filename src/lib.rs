pub mod compile;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use compile::{CompileOptions, Compiler, RunOutput};
pub use config::Config;
pub use datasource::{CsvTransactionSource, DataSourceError, MockDataSource, TransactionSource};
pub use db::{ChainStore, JsonChainStore, MemoryChainStore, StoreError};
pub use domain::{
    Account, Chain, ChainDatabase, ChainMetadata, ChainStatus, Decimal, Effect, InitialPosition,
    InstrumentKey, Instruction, RowType, SplitDirective, SplitPart, Symbol, Transaction,
};
pub use error::{AppError, EngineError};
pub use orchestration::{Orchestrator, RunSettings};
