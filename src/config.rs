use crate::compile::CompileOptions;
use crate::engine::DEFAULT_CHAIN_WINDOW_SECS;
use crate::orchestration::RunSettings;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub transactions_path: PathBuf,
    pub positions_path: Option<PathBuf>,
    pub chains_db_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub chain_window_secs: i64,
    pub workers: usize,
    pub dry_run: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let transactions_path = env_map
            .get("TRANSACTIONS_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("TRANSACTIONS_PATH".to_string()))?;

        let chains_db_path = env_map
            .get("CHAINS_DB_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("CHAINS_DB_PATH".to_string()))?;

        let positions_path = optional_path(&env_map, "POSITIONS_PATH");
        let output_path = optional_path(&env_map, "OUTPUT_PATH");

        let default_window = DEFAULT_CHAIN_WINDOW_SECS.to_string();
        let chain_window_secs = env_map
            .get("CHAIN_WINDOW_SECS")
            .unwrap_or(&default_window)
            .parse::<i64>()
            .ok()
            .filter(|secs| *secs >= 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CHAIN_WINDOW_SECS".to_string(),
                    "must be a non-negative number of seconds".to_string(),
                )
            })?;

        let workers = env_map
            .get("WORKERS")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue("WORKERS".to_string(), "must be a valid usize".to_string())
            })?;

        let dry_run = match env_map
            .get("DRY_RUN")
            .map(|s| s.as_str())
            .unwrap_or("false")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DRY_RUN".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            transactions_path,
            positions_path,
            chains_db_path,
            output_path,
            chain_window_secs,
            workers,
            dry_run,
        })
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            chain_window_secs: self.chain_window_secs,
            workers: self.workers,
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            compile: self.compile_options(),
            output_path: self.output_path.clone(),
            dry_run: self.dry_run,
        }
    }
}

fn optional_path(env_map: &HashMap<String, String>, key: &str) -> Option<PathBuf> {
    env_map
        .get(key)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "TRANSACTIONS_PATH".to_string(),
            "/tmp/transactions.csv".to_string(),
        );
        map.insert("CHAINS_DB_PATH".to_string(), "/tmp/chains.json".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.chain_window_secs, 300);
        assert_eq!(config.workers, 0);
        assert!(!config.dry_run);
        assert!(config.positions_path.is_none());
        assert!(config.output_path.is_none());
    }

    #[test]
    fn test_missing_transactions_path() {
        let mut env_map = setup_required_env();
        env_map.remove("TRANSACTIONS_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TRANSACTIONS_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_chains_db_path() {
        let mut env_map = setup_required_env();
        env_map.remove("CHAINS_DB_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "CHAINS_DB_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_chain_window() {
        let mut env_map = setup_required_env();
        env_map.insert("CHAIN_WINDOW_SECS".to_string(), "-5".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CHAIN_WINDOW_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_workers() {
        let mut env_map = setup_required_env();
        env_map.insert("WORKERS".to_string(), "many".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "WORKERS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_dry_run() {
        let mut env_map = setup_required_env();
        env_map.insert("DRY_RUN".to_string(), "maybe".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DRY_RUN"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_optional_paths_and_flags() {
        let mut env_map = setup_required_env();
        env_map.insert("POSITIONS_PATH".to_string(), "/tmp/positions.csv".to_string());
        env_map.insert("OUTPUT_PATH".to_string(), "".to_string());
        env_map.insert("DRY_RUN".to_string(), "true".to_string());
        env_map.insert("WORKERS".to_string(), "4".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.positions_path,
            Some(PathBuf::from("/tmp/positions.csv"))
        );
        assert!(config.output_path.is_none());
        assert!(config.dry_run);
        assert_eq!(config.compile_options().workers, 4);
        assert!(config.run_settings().dry_run);
    }
}
