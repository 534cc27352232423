/// In-process cache and backends. Used by tests and by embedders that keep
/// board state without a server.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{CacheError, LocalCache, RemoteError, SettingsBackend, TaskSource};
use crate::settings::{RemoteSettings, SettingsPayload};
use crate::types::{Task, TaskId};

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Settings backend holding at most one record.
#[derive(Default)]
pub struct MemorySettings {
    record: Mutex<Option<RemoteSettings>>,
    failing: Mutex<Option<RemoteError>>,
    upserts: Mutex<usize>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: RemoteSettings) -> Self {
        let backend = Self::new();
        *backend.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record);
        backend
    }

    /// Make every subsequent call fail with `error`; `None` heals the backend.
    pub fn set_failure(&self, error: Option<RemoteError>) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    pub fn record(&self) -> Option<RemoteSettings> {
        self.record.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self) -> Result<(), RemoteError> {
        match self.failing.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl SettingsBackend for MemorySettings {
    async fn fetch(&self) -> Result<Option<RemoteSettings>, RemoteError> {
        self.check_failure()?;
        Ok(self.record())
    }

    async fn upsert(&self, settings: &SettingsPayload) -> Result<(), RemoteError> {
        self.check_failure()?;
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        let id = record.as_ref().and_then(|r| r.id).unwrap_or(1);
        *record = Some(settings.to_remote(id));
        *self.upserts.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Task source over a fixed task list; status updates are applied in place.
#[derive(Default)]
pub struct MemoryTasks {
    tasks: Mutex<Vec<Task>>,
    updates: Mutex<Vec<(TaskId, String)>>,
}

impl MemoryTasks {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn replace(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap_or_else(|e| e.into_inner()) = tasks;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Status updates pushed so far, in order.
    pub fn updates(&self) -> Vec<(TaskId, String)> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TaskSource for MemoryTasks {
    async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        Ok(self.tasks())
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        status: &str,
        is_completed: bool,
    ) -> Result<Task, RemoteError> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(RemoteError::NotFound)?;
        task.status = Some(status.to_string());
        task.is_completed = is_completed;
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((task_id, status.to_string()));
        Ok(task.clone())
    }
}
