/// Configuration for the taskboard client.
/// Reads client.json from ~/.config/taskboard/client.json (or platform equivalent).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use taskboard_core::storage::local::FileCache;
use taskboard_core::storage::{LocalCache, CACHE_KEY_TOKEN};
use taskboard_core::{DefaultLayout, StoreOptions, TieBreak};

pub const ENV_API_URL: &str = "TASKBOARD_API_URL";
pub const ENV_TOKEN: &str = "TASKBOARD_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub default_layout: DefaultLayout,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            cache_dir: None,
            default_layout: DefaultLayout::default(),
            tie_break: TieBreak::default(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            default_layout: self.default_layout,
            tie_break: self.tie_break,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Cache directory, defaulting to ~/.cache/taskboard.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// Apply `TASKBOARD_API_URL` / `TASKBOARD_TOKEN` from the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    /// Configured token, else the one the web app left in the cache.
    pub fn resolve_token(&self, cache: &FileCache) -> Option<String> {
        if self.token.is_some() {
            return self.token.clone();
        }
        match cache.get(CACHE_KEY_TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                log::warn!("[taskboard.config] Failed to read cached token: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to open cache directory {path}: {source}")]
    Cache {
        path: PathBuf,
        source: taskboard_core::storage::CacheError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] crate::api::ApiError),
}

/// Default config path: ~/.config/taskboard/client.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
        .join("client.json")
}

pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
}

/// Load config from path. Returns default if the file doesn't exist or
/// doesn't parse.
pub fn load_config(path: &Path) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(
                "[taskboard.config] Failed to parse config {}: {}",
                path.display(),
                e
            );
            ClientConfig::default()
        }),
        Err(_) => {
            log::info!(
                "[taskboard.config] No config at {}, using defaults",
                path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Open the file cache for `config`.
pub fn open_cache(config: &ClientConfig) -> Result<FileCache, ConfigError> {
    let path = config.cache_dir();
    FileCache::open(&path).map_err(|source| ConfigError::Cache { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("client.json"));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.default_layout, DefaultLayout::WithBlocked);
    }

    #[test]
    fn test_parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(
            &path,
            r#"{"api_url": "https://todo.example", "tie_break": "prefer-lowercase", "default_layout": "basic", "timeout_secs": 5}"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.api_url, "https://todo.example");
        assert_eq!(config.tie_break, TieBreak::PreferLowercase);
        assert_eq!(config.default_layout, DefaultLayout::Basic);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(&path), ClientConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_API_URL, "http://api:9000"), (ENV_TOKEN, "")].into();
        let mut config = ClientConfig {
            token: Some("from-file".into()),
            ..Default::default()
        };
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_url, "http://api:9000");
        assert_eq!(config.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_token_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path()).unwrap();
        let config = ClientConfig::default();
        assert_eq!(config.resolve_token(&cache), None);

        cache.set(CACHE_KEY_TOKEN, "jwt-123").unwrap();
        assert_eq!(config.resolve_token(&cache).as_deref(), Some("jwt-123"));

        let configured = ClientConfig {
            token: Some("explicit".into()),
            ..Default::default()
        };
        assert_eq!(configured.resolve_token(&cache).as_deref(), Some("explicit"));
    }
}
