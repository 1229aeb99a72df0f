//! Chain database persistence.
//!
//! This module provides:
//! - The `ChainStore` seam the orchestrator reads from and writes to
//! - A pretty-printed JSON file store with atomic replace
//! - An in-memory store for tests

use crate::domain::ChainDatabase;
use async_trait::async_trait;
use thiserror::Error;

pub mod json;
pub mod memory;

pub use json::JsonChainStore;
pub use memory::MemoryChainStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid chain database {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted chain database, read once per run and written once at the end.
#[async_trait]
pub trait ChainStore: Send + Sync + std::fmt::Debug {
    /// Load the database. A store that has never been written yields an empty database.
    async fn load(&self) -> Result<ChainDatabase, StoreError>;

    /// Replace the stored database.
    async fn save(&self, db: &ChainDatabase) -> Result<(), StoreError>;
}
