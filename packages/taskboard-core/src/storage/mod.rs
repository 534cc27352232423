pub mod local;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use crate::settings::{RemoteSettings, SettingsPayload};
use crate::types::{Task, TaskId};

/// Cache key holding the JSON column map.
pub const CACHE_KEY_COLUMNS: &str = "todoColumns";
/// Cache key holding the JSON column order array.
pub const CACHE_KEY_COLUMN_ORDER: &str = "todoColumnOrder";
/// Cache key holding the bearer token.
pub const CACHE_KEY_TOKEN: &str = "token";

/// Fast local key/value cache.
/// Implementations: FileCache (one file per key), MemoryCache.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Authoritative remote store for column settings.
pub trait SettingsBackend: Send + Sync {
    /// Fetch the stored record. `Ok(None)` means the server has none (404).
    fn fetch(&self) -> impl Future<Output = Result<Option<RemoteSettings>, RemoteError>> + Send;

    /// Create or replace the stored record.
    fn upsert(
        &self,
        settings: &SettingsPayload,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Source of task records and sink for status updates.
pub trait TaskSource: Send + Sync {
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Push a task's column assignment back to the server.
    fn update_status(
        &self,
        task_id: TaskId,
        status: &str,
        is_completed: bool,
    ) -> impl Future<Output = Result<Task, RemoteError>> + Send;
}

impl<T: LocalCache + ?Sized> LocalCache for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

impl<T: SettingsBackend> SettingsBackend for Arc<T> {
    fn fetch(&self) -> impl Future<Output = Result<Option<RemoteSettings>, RemoteError>> + Send {
        (**self).fetch()
    }

    fn upsert(
        &self,
        settings: &SettingsPayload,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send {
        (**self).upsert(settings)
    }
}

impl<T: TaskSource> TaskSource for Arc<T> {
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, RemoteError>> + Send {
        (**self).list_tasks()
    }

    fn update_status(
        &self,
        task_id: TaskId,
        status: &str,
        is_completed: bool,
    ) -> impl Future<Output = Result<Task, RemoteError>> + Send {
        (**self).update_status(task_id, status, is_completed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote record not found")]
    NotFound,

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}
