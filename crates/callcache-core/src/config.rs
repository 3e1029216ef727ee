//! Application configuration management.
//!
//! Configuration is stored at `~/.config/callcache/config.json`. Every field
//! is optional; `CALLCACHE_DATASET_URL` and `CALLCACHE_DB` in the environment
//! take precedence over the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

use crate::loader::DEFAULT_BATCH_SIZE;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "callcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Database file name inside the cache directory
const DATABASE_FILE: &str = "callsigns.db";

/// Public dataset of licensed operators: `callsign,first,last` with a header row.
pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/payne/ham-radio-data/refs/heads/main/people.csv";

pub const DATASET_URL_ENV: &str = "CALLCACHE_DATASET_URL";
pub const DATABASE_ENV: &str = "CALLCACHE_DB";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub dataset_url: Option<String>,
    pub batch_size: Option<usize>,
    pub database_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Fully resolved settings for a `CallsignLookup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub dataset_url: String,
    pub batch_size: usize,
    pub database_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply environment overrides and defaults.
    pub fn resolve(&self) -> Result<LookupConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<LookupConfig> {
        let dataset_url = env(DATASET_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.dataset_url.clone())
            .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string());

        let database_path = match env(DATABASE_ENV).filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => match &self.database_path {
                Some(path) => path.clone(),
                None => Self::cache_dir()?.join(DATABASE_FILE),
            },
        };

        Ok(LookupConfig {
            dataset_url,
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            database_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = Config {
            database_path: Some(PathBuf::from("/tmp/calls.db")),
            ..Config::default()
        };
        let resolved = config.resolve_with(|_| None).unwrap();
        assert_eq!(resolved.dataset_url, DEFAULT_DATASET_URL);
        assert_eq!(resolved.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(resolved.database_path, PathBuf::from("/tmp/calls.db"));
    }

    #[test]
    fn test_resolve_env_overrides_file() {
        let config = Config {
            dataset_url: Some("https://file.example/people.csv".to_string()),
            batch_size: Some(0),
            database_path: Some(PathBuf::from("/tmp/file.db")),
            log_dir: None,
        };
        let resolved = config
            .resolve_with(|name| match name {
                DATASET_URL_ENV => Some("https://env.example/people.csv".to_string()),
                DATABASE_ENV => Some("/tmp/env.db".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(resolved.dataset_url, "https://env.example/people.csv");
        assert_eq!(resolved.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(resolved.batch_size, 1);
    }

    #[test]
    fn test_resolve_database_defaults_to_cache_dir() {
        let resolved = Config::default().resolve_with(|_| None).unwrap();
        assert_eq!(resolved.database_path, Config::cache_dir().unwrap().join(DATABASE_FILE));
        assert!(resolved.database_path.ends_with("callcache/callsigns.db"));
    }

    #[test]
    fn test_config_json_fields_optional() {
        let config: Config = serde_json::from_str(r#"{"batch_size": 250}"#).unwrap();
        assert_eq!(config.batch_size, Some(250));
        assert!(config.dataset_url.is_none());
    }
}
