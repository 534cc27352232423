pub mod api;
pub mod config;
pub mod logging;

use taskboard_core::storage::local::FileCache;
use taskboard_core::{BoardHandle, ColumnStore};

use api::ApiClient;
use config::{ClientConfig, ConfigError};

/// Everything a front end needs to drive one board.
pub struct Session {
    pub api: ApiClient,
    pub board: BoardHandle,
}

impl Session {
    /// Open the cache, resolve the token and start the board queue.
    /// Must be called inside a tokio runtime.
    pub fn open(config: &ClientConfig) -> Result<Self, ConfigError> {
        let cache = config::open_cache(config)?;
        let token = config.resolve_token(&cache);
        if token.is_none() {
            log::warn!("[taskboard.session] No token configured, requests are unauthenticated");
        }
        let api = ApiClient::new(&config.api_url, token, config.timeout())?;
        Ok(Self::with_cache(config, cache, api))
    }

    pub fn with_cache(config: &ClientConfig, cache: FileCache, api: ApiClient) -> Self {
        let store = ColumnStore::new(cache, api.clone(), config.store_options());
        let board = BoardHandle::spawn(store, api.clone());
        Self { api, board }
    }
}
