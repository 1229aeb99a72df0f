//! In-memory chain store.

use super::{ChainStore, StoreError};
use crate::domain::ChainDatabase;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct MemoryChainStore {
    db: Arc<Mutex<ChainDatabase>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryChainStore {
    pub fn new(db: ChainDatabase) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            saves: Arc::default(),
        }
    }

    /// Current contents.
    pub async fn snapshot(&self) -> ChainDatabase {
        self.db.lock().await.clone()
    }

    /// Number of times `save` has been called.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn load(&self) -> Result<ChainDatabase, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, db: &ChainDatabase) -> Result<(), StoreError> {
        *self.db.lock().await = db.clone();
        *self.saves.lock().await += 1;
        Ok(())
    }
}
