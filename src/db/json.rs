//! JSON file chain store.

use super::{ChainStore, StoreError};
use crate::domain::ChainDatabase;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stores the chain database as pretty-printed JSON.
///
/// Output is byte-stable for equal databases so the file diffs cleanly under
/// version control. Writes go to a sibling temporary file that is then renamed
/// over the target.
#[derive(Debug, Clone)]
pub struct JsonChainStore {
    path: PathBuf,
}

impl JsonChainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Serialize a database the way it is stored on disk.
pub fn to_json(db: &ChainDatabase) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(db)?;
    text.push('\n');
    Ok(text)
}

#[async_trait]
impl ChainStore for JsonChainStore {
    async fn load(&self) -> Result<ChainDatabase, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "No chain database at {}, starting empty",
                    self.path.display()
                );
                return Ok(ChainDatabase::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let db: ChainDatabase = serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        tracing::info!(
            "Loaded {} chains from {}",
            db.chains.len(),
            self.path.display()
        );
        Ok(db)
    }

    async fn save(&self, db: &ChainDatabase) -> Result<(), StoreError> {
        let text = to_json(db).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, text.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::info!(
            "Saved {} chains to {}",
            db.chains.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chain, ChainStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_database() {
        let dir = TempDir::new().unwrap();
        let store = JsonChainStore::new(dir.path().join("chains.json"));
        assert_eq!(store.load().await.unwrap(), ChainDatabase::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonChainStore::new(dir.path().join("chains.json"));
        let db = ChainDatabase::new(vec![
            Chain::new("c1", ChainStatus::Final).with_ids(["t1", "t2"]),
        ]);

        store.save(&db).await.unwrap();
        assert_eq!(store.load().await.unwrap(), db);
        assert!(!store.temp_path().exists());

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"status\": \"FINAL\""));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chains.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonChainStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Json { .. })));
    }
}
