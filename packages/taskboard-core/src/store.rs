/// Column store: the board's columns and their order, persisted to a local
/// cache and a remote settings backend.
///
/// Loading prefers the remote record, then the cache, then a hard-coded
/// layout. Every save writes the cache first and the remote second, so a
/// remote outage degrades to cache-only operation.
///
/// Mutators never raise. Each returns a `ColumnOutcome` carrying the
/// resulting board and, when something went wrong, the error:
/// - validation failures leave the board untouched
/// - remote save failures keep the mutation (the cache already has it)

use serde::Serialize;

use crate::normalize::{default_board, normalize_order, validate_columns, DefaultLayout, TieBreak};
use crate::settings::{decode_cached, decode_remote, SettingsError, SettingsPayload};
use crate::storage::{
    CacheError, LocalCache, RemoteError, SettingsBackend, CACHE_KEY_COLUMNS,
    CACHE_KEY_COLUMN_ORDER,
};
use crate::types::{column_id_from_title, Column, ColumnBoard, ColumnMap, ColumnMapExt, TaskId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub default_layout: DefaultLayout,
    pub tie_break: TieBreak,
}

/// Where a loaded board came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadSource {
    Remote,
    /// The remote record holds no columns; kept empty on purpose.
    RemoteEmpty,
    Cache,
    Defaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub board: ColumnBoard,
    pub source: LoadSource,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnError {
    #[error("Column title cannot be empty")]
    EmptyTitle,

    #[error("A column named \"{0}\" already exists")]
    AlreadyExists(String),

    #[error("A column with title \"{0}\" already exists")]
    TitleTaken(String),

    #[error("Column with ID {0} not found")]
    NotFound(String),

    #[error("Cannot delete a column that contains tasks. Move tasks to another column first.")]
    NotEmpty(String),

    #[error("Column position {index} out of range ({len} columns)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Column {id} is not at position {index}")]
    OrderMismatch { index: usize, id: String },

    #[error("Invalid column settings: {0}")]
    Invalid(String),

    #[error("Failed to save column settings to the server")]
    SaveFailed,

    #[error("Failed to load tasks: {0}")]
    TasksUnavailable(String),

    #[error("Failed to update task {0} on the server")]
    TaskUpdateFailed(TaskId),
}

impl ColumnError {
    /// Validation errors are reported before anything is changed.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            ColumnError::SaveFailed
                | ColumnError::TasksUnavailable(_)
                | ColumnError::TaskUpdateFailed(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to encode column settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Cache write failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Remote save failed: {0}")]
    Remote(#[from] RemoteError),
}

/// Result of a column mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOutcome {
    pub board: ColumnBoard,
    pub error: Option<ColumnError>,
}

impl ColumnOutcome {
    pub fn ok(board: ColumnBoard) -> Self {
        Self { board, error: None }
    }

    pub fn failed(board: ColumnBoard, error: ColumnError) -> Self {
        Self {
            board,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ColumnStore<C, R> {
    cache: C,
    remote: R,
    options: StoreOptions,
    board: ColumnBoard,
}

impl<C: LocalCache, R: SettingsBackend> ColumnStore<C, R> {
    pub fn new(cache: C, remote: R, options: StoreOptions) -> Self {
        Self {
            cache,
            remote,
            options,
            board: ColumnBoard::default(),
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// The board as of the last load or mutation.
    pub fn board(&self) -> &ColumnBoard {
        &self.board
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Load from remote, falling back to the cache, falling back to defaults.
    pub async fn load(&mut self) -> Loaded {
        let loaded = match self.remote.fetch().await {
            Ok(Some(record)) => match decode_remote(&record) {
                Ok(mut board) if board.is_empty() => {
                    log::info!(
                        "[taskboard.store.load] Remote holds no columns, keeping the board empty"
                    );
                    normalize_order(&mut board);
                    self.write_cache_logged(&board);
                    Loaded {
                        board,
                        source: LoadSource::RemoteEmpty,
                    }
                }
                Ok(mut board) => {
                    if normalize_order(&mut board) {
                        log::info!("[taskboard.store.load] Repaired remote column order");
                    }
                    self.write_cache_logged(&board);
                    Loaded {
                        board,
                        source: LoadSource::Remote,
                    }
                }
                Err(SettingsError::Invalid(reason)) => {
                    log::warn!(
                        "[taskboard.store.load] Remote column settings invalid ({}), using defaults",
                        reason
                    );
                    let board = default_board(self.options.default_layout);
                    self.write_cache_logged(&board);
                    Loaded {
                        board,
                        source: LoadSource::Defaults,
                    }
                }
                Err(e) => {
                    log::warn!("[taskboard.store.load] Unusable remote settings: {}", e);
                    self.load_cached()
                }
            },
            Ok(None) => {
                log::info!("[taskboard.store.load] No remote column settings, trying cache");
                self.load_cached()
            }
            Err(e) => {
                log::warn!(
                    "[taskboard.store.load] Failed to fetch remote column settings: {}",
                    e
                );
                self.load_cached()
            }
        };

        self.board = loaded.board.clone();
        loaded
    }

    /// Load from the local cache only, falling back to defaults.
    pub fn load_cached(&self) -> Loaded {
        let defaults = || Loaded {
            board: default_board(self.options.default_layout),
            source: LoadSource::Defaults,
        };

        let (columns, order) = match self.read_cache_entries() {
            Ok(Some(entries)) => entries,
            Ok(None) => return defaults(),
            Err(e) => {
                log::warn!("[taskboard.store.cache] Failed to read cache: {}", e);
                return defaults();
            }
        };

        match decode_cached(&columns, &order) {
            Ok(mut board) => {
                if normalize_order(&mut board) {
                    if let Err(e) = self.write_order(&board.column_order) {
                        log::warn!("[taskboard.store.cache] Failed to write repaired order: {}", e);
                    }
                }
                Loaded {
                    board,
                    source: LoadSource::Cache,
                }
            }
            Err(e) => {
                log::warn!("[taskboard.store.cache] Ignoring cached columns: {}", e);
                defaults()
            }
        }
    }

    /// Validate, normalize, write the cache, then upsert remotely. The
    /// in-memory board is updated once the cache step is reached, even if
    /// the remote step fails.
    pub async fn save(
        &mut self,
        columns: ColumnMap,
        column_order: Vec<String>,
    ) -> Result<ColumnBoard, StoreError> {
        validate_columns(&columns).map_err(StoreError::Validation)?;
        let mut board = ColumnBoard::new(columns, column_order);
        normalize_order(&mut board);
        let payload = SettingsPayload::from_board(&board)?;

        self.write_cache_logged(&board);
        self.board = board.clone();

        self.remote.upsert(&payload).await?;
        Ok(board)
    }

    pub async fn add_column(&mut self, title: &str) -> ColumnOutcome {
        let title = title.trim();
        if title.is_empty() {
            return self.reject(ColumnError::EmptyTitle);
        }

        let id = column_id_from_title(title);
        if self.board.columns.find_key_ignore_case(&id).is_some() {
            return self.reject(ColumnError::AlreadyExists(title.to_string()));
        }
        if let Some(key) = self.board.columns.find_key_by_title(title) {
            let existing = self
                .board
                .columns
                .get(key)
                .map(|c| c.title.clone())
                .unwrap_or_default();
            return self.reject(ColumnError::TitleTaken(existing));
        }

        let mut next = self.board.clone();
        next.columns.insert(id.clone(), Column::new(id.clone(), title));
        if !next.column_order.contains(&id) {
            next.column_order.push(id);
        }
        self.commit(next).await
    }

    /// Delete an empty column.
    pub async fn delete_column(&mut self, id: &str) -> ColumnOutcome {
        let Some(column) = self.board.columns.get(id) else {
            return self.reject(ColumnError::NotFound(id.to_string()));
        };
        if !column.task_ids.is_empty() {
            return self.reject(ColumnError::NotEmpty(id.to_string()));
        }

        let mut next = self.board.clone();
        next.columns.shift_remove(id);
        next.column_order.retain(|c| c != id);
        self.commit(next).await
    }

    pub async fn rename_column(&mut self, id: &str, title: &str) -> ColumnOutcome {
        if !self.board.columns.contains_key(id) {
            return self.reject(ColumnError::NotFound(id.to_string()));
        }
        let title = title.trim();
        if title.is_empty() {
            return self.reject(ColumnError::EmptyTitle);
        }

        let mut next = self.board.clone();
        if let Some(column) = next.columns.get_mut(id) {
            column.title = title.to_string();
        }
        self.commit(next).await
    }

    /// Move `id` from `source` to `dest` in the display order.
    pub async fn reorder_columns(&mut self, source: usize, dest: usize, id: &str) -> ColumnOutcome {
        let len = self.board.column_order.len();
        for index in [source, dest] {
            if index >= len {
                return self.reject(ColumnError::IndexOutOfRange { index, len });
            }
        }
        if self.board.column_order[source] != id {
            return self.reject(ColumnError::OrderMismatch {
                index: source,
                id: id.to_string(),
            });
        }

        let mut next = self.board.clone();
        let moved = next.column_order.remove(source);
        next.column_order.insert(dest, moved);
        self.commit(next).await
    }

    /// Replace the board with the configured default layout.
    pub async fn restore_defaults(&mut self) -> ColumnOutcome {
        log::info!("[taskboard.store] Restoring default columns");
        self.commit(default_board(self.options.default_layout)).await
    }

    /// Move a task into `column_id` at `index` (clamped), removing it from
    /// whichever column held it.
    pub async fn move_task(&mut self, task_id: TaskId, column_id: &str, index: usize) -> ColumnOutcome {
        if !self.board.columns.contains_key(column_id) {
            return self.reject(ColumnError::NotFound(column_id.to_string()));
        }

        let mut next = self.board.clone();
        for column in next.columns.values_mut() {
            column.task_ids.retain(|t| *t != task_id);
        }
        if let Some(column) = next.columns.get_mut(column_id) {
            let index = index.min(column.task_ids.len());
            column.task_ids.insert(index, task_id);
        }
        self.commit(next).await
    }

    /// Persist a board computed elsewhere (e.g. by reconciliation).
    pub async fn replace(&mut self, board: ColumnBoard) -> ColumnOutcome {
        self.commit(board).await
    }

    async fn commit(&mut self, next: ColumnBoard) -> ColumnOutcome {
        match self.save(next.columns, next.column_order).await {
            Ok(board) => ColumnOutcome::ok(board),
            Err(StoreError::Validation(reason)) => self.reject(ColumnError::Invalid(reason)),
            Err(e) => {
                log::error!("[taskboard.store.save] {}", e);
                ColumnOutcome::failed(self.board.clone(), ColumnError::SaveFailed)
            }
        }
    }

    fn reject(&self, error: ColumnError) -> ColumnOutcome {
        log::debug!("[taskboard.store] Rejected column change: {}", error);
        ColumnOutcome::failed(self.board.clone(), error)
    }

    fn read_cache_entries(&self) -> Result<Option<(String, String)>, CacheError> {
        let Some(columns) = self.cache.get(CACHE_KEY_COLUMNS)? else {
            return Ok(None);
        };
        let Some(order) = self.cache.get(CACHE_KEY_COLUMN_ORDER)? else {
            return Ok(None);
        };
        Ok(Some((columns, order)))
    }

    fn write_order(&self, order: &[String]) -> Result<(), StoreError> {
        self.cache
            .set(CACHE_KEY_COLUMN_ORDER, &serde_json::to_string(order)?)?;
        Ok(())
    }

    fn write_cache(&self, board: &ColumnBoard) -> Result<(), StoreError> {
        self.cache
            .set(CACHE_KEY_COLUMNS, &serde_json::to_string(&board.columns)?)?;
        self.write_order(&board.column_order)
    }

    fn write_cache_logged(&self, board: &ColumnBoard) {
        if let Err(e) = self.write_cache(board) {
            log::warn!("[taskboard.store.cache] Failed to write cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RemoteSettings;
    use crate::storage::memory::{MemoryCache, MemorySettings};
    use crate::types::column_map;
    use serde_json::json;
    use std::sync::Arc;

    type TestStore = ColumnStore<Arc<MemoryCache>, Arc<MemorySettings>>;

    fn store_with(remote: MemorySettings) -> (TestStore, Arc<MemoryCache>, Arc<MemorySettings>) {
        let cache = Arc::new(MemoryCache::new());
        let remote = Arc::new(remote);
        let store = ColumnStore::new(cache.clone(), remote.clone(), StoreOptions::default());
        (store, cache, remote)
    }

    fn record(columns: serde_json::Value, order: serde_json::Value) -> RemoteSettings {
        RemoteSettings {
            id: Some(1),
            columns_config: Some(json!(columns.to_string())),
            column_order: Some(json!(order.to_string())),
        }
    }

    fn assert_consistent(board: &ColumnBoard) {
        let mut keys: Vec<_> = board.columns.keys().map(String::from).collect();
        let mut order = board.column_order.clone();
        keys.sort();
        order.sort();
        assert_eq!(keys, order);
    }

    #[tokio::test]
    async fn test_default_load_without_cache_or_remote() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Defaults);
        assert_eq!(loaded.board.column_order, vec!["todo", "inProgress", "blocked", "done"]);
        assert!(loaded.board.columns.values().all(|c| c.task_ids.is_empty()));
    }

    #[tokio::test]
    async fn test_basic_layout_option() {
        let cache = MemoryCache::new();
        let options = StoreOptions {
            default_layout: DefaultLayout::Basic,
            ..Default::default()
        };
        let mut store = ColumnStore::new(cache, MemorySettings::new(), options);
        let loaded = store.load().await;
        assert_eq!(loaded.board.column_order, vec!["todo", "inProgress", "done"]);
    }

    #[tokio::test]
    async fn test_remote_load_repairs_order_and_caches() {
        let remote = MemorySettings::with_record(record(
            json!({
                "todo": {"id": "todo", "title": "To Do", "taskIds": []},
                "qa": {"id": "qa", "title": "QA", "taskIds": [4]}
            }),
            json!(["ghost", "qa"]),
        ));
        let (mut store, cache, _) = store_with(remote);

        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Remote);
        assert_eq!(loaded.board.column_order, vec!["qa", "todo"]);
        assert_eq!(
            cache.get(CACHE_KEY_COLUMN_ORDER).unwrap().as_deref(),
            Some(r#"["qa","todo"]"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_remote_falls_back_to_defaults() {
        let remote = MemorySettings::with_record(record(
            json!({"todo": {"id": "todo", "title": "", "taskIds": []}}),
            json!(["todo"]),
        ));
        let (mut store, _, _) = store_with(remote);
        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Defaults);
        assert_eq!(loaded.board.columns.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_remote_is_preserved() {
        let remote = MemorySettings::with_record(record(json!({}), json!(["todo"])));
        let (mut store, cache, _) = store_with(remote);
        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::RemoteEmpty);
        assert!(loaded.board.is_empty());
        assert!(loaded.board.column_order.is_empty());
        assert_eq!(cache.get(CACHE_KEY_COLUMNS).unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_remote_failure_uses_cache() {
        let (mut store, cache, remote) = store_with(MemorySettings::new());
        cache
            .set(
                CACHE_KEY_COLUMNS,
                r#"{"done":{"id":"done","title":"Completed","taskIds":[]},"todo":{"id":"todo","title":"To Do","taskIds":[]}}"#,
            )
            .unwrap();
        cache.set(CACHE_KEY_COLUMN_ORDER, r#"["todo"]"#).unwrap();
        remote.set_failure(Some(RemoteError::Transport("offline".into())));

        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Cache);
        assert_eq!(loaded.board.column_order, vec!["todo", "done"]);
        assert_eq!(
            cache.get(CACHE_KEY_COLUMN_ORDER).unwrap().as_deref(),
            Some(r#"["todo","done"]"#)
        );
    }

    #[tokio::test]
    async fn test_malformed_remote_uses_cache_then_defaults() {
        let remote = MemorySettings::with_record(RemoteSettings {
            id: Some(1),
            columns_config: Some(json!("{broken")),
            column_order: Some(json!("[]")),
        });
        let (mut store, cache, _) = store_with(remote);
        cache.set(CACHE_KEY_COLUMNS, "also broken").unwrap();
        cache.set(CACHE_KEY_COLUMN_ORDER, "[]").unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Defaults);
    }

    #[tokio::test]
    async fn test_add_column_and_duplicate() {
        let (mut store, _, remote) = store_with(MemorySettings::new());
        store.load().await;

        let outcome = store.add_column("Code Review").await;
        assert!(outcome.is_ok());
        let column = outcome.board.columns.get("code-review").unwrap();
        assert_eq!(column.title, "Code Review");
        assert!(column.task_ids.is_empty());
        assert_eq!(outcome.board.column_order.last().map(String::as_str), Some("code-review"));
        assert_eq!(remote.upsert_count(), 1);

        let again = store.add_column("code review").await;
        let error = again.error.unwrap();
        assert!(error.to_string().contains("already exists"));
        assert_eq!(again.board, outcome.board);
        assert_eq!(remote.upsert_count(), 1);
    }

    #[tokio::test]
    async fn test_add_column_title_collision() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;
        // "To Do" derives id "to-do", which is free, but the title is taken.
        let outcome = store.add_column("to do").await;
        assert_eq!(outcome.error, Some(ColumnError::TitleTaken("To Do".into())));
    }

    #[tokio::test]
    async fn test_add_column_empty_title() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;
        let outcome = store.add_column("   ").await;
        assert_eq!(outcome.error, Some(ColumnError::EmptyTitle));
    }

    #[tokio::test]
    async fn test_delete_column_refuses_non_empty() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;
        store.move_task(9, "blocked", 0).await;

        let before = store.board().clone();
        let outcome = store.delete_column("blocked").await;
        assert!(matches!(outcome.error, Some(ColumnError::NotEmpty(_))));
        assert_eq!(outcome.board, before);
        assert_eq!(store.board(), &before);

        let outcome = store.delete_column("inProgress").await;
        assert!(outcome.is_ok());
        assert!(!outcome.board.columns.contains_key("inProgress"));
        assert!(!outcome.board.column_order.contains(&"inProgress".to_string()));

        let outcome = store.delete_column("nope").await;
        assert_eq!(outcome.error, Some(ColumnError::NotFound("nope".into())));
    }

    #[tokio::test]
    async fn test_rename_column() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;
        store.move_task(3, "todo", 0).await;

        let outcome = store.rename_column("todo", "  Backlog ").await;
        let column = outcome.board.columns.get("todo").unwrap();
        assert_eq!(column.title, "Backlog");
        assert_eq!(column.task_ids, vec![3]);

        let outcome = store.rename_column("todo", "").await;
        assert_eq!(outcome.error, Some(ColumnError::EmptyTitle));
    }

    #[tokio::test]
    async fn test_reorder_columns() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;

        let outcome = store.reorder_columns(3, 0, "done").await;
        assert_eq!(outcome.board.column_order, vec!["done", "todo", "inProgress", "blocked"]);

        let outcome = store.reorder_columns(0, 9, "done").await;
        assert_eq!(outcome.error, Some(ColumnError::IndexOutOfRange { index: 9, len: 4 }));

        let outcome = store.reorder_columns(1, 2, "done").await;
        assert!(matches!(outcome.error, Some(ColumnError::OrderMismatch { .. })));
        assert_eq!(store.board().column_order, vec!["done", "todo", "inProgress", "blocked"]);
    }

    #[tokio::test]
    async fn test_move_task_between_columns() {
        let (mut store, _, _) = store_with(MemorySettings::new());
        store.load().await;
        store.move_task(1, "todo", 0).await;
        store.move_task(2, "todo", 5).await;
        let outcome = store.move_task(1, "done", 0).await;

        assert_eq!(outcome.board.columns.get("todo").unwrap().task_ids, vec![2]);
        assert_eq!(outcome.board.columns.get("done").unwrap().task_ids, vec![1]);

        let outcome = store.move_task(1, "missing", 0).await;
        assert_eq!(outcome.error, Some(ColumnError::NotFound("missing".into())));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_mutation() {
        let (mut store, cache, remote) = store_with(MemorySettings::new());
        store.load().await;
        remote.set_failure(Some(RemoteError::Status {
            status: 500,
            message: "boom".into(),
        }));

        let outcome = store.add_column("Review").await;
        assert_eq!(outcome.error, Some(ColumnError::SaveFailed));
        assert!(outcome.board.columns.contains_key("review"));
        assert!(store.board().columns.contains_key("review"));
        assert!(cache.get(CACHE_KEY_COLUMNS).unwrap().unwrap().contains("review"));
    }

    #[tokio::test]
    async fn test_mismatched_remote_key_falls_back_to_defaults() {
        let remote = MemorySettings::with_record(record(
            json!({
                "a": {"id": "b", "title": "A", "taskIds": [1]},
                "b": {"id": "b", "title": "B", "taskIds": []}
            }),
            json!(["a", "b"]),
        ));
        let (mut store, _, _) = store_with(remote);
        let loaded = store.load().await;
        assert_eq!(loaded.source, LoadSource::Defaults);
        assert!(!loaded.board.columns.contains_key("a"));
        assert!(loaded.board.columns.iter().all(|(k, c)| *k == c.id));
    }

    #[tokio::test]
    async fn test_save_rejects_malformed_columns() {
        let (mut store, _, remote) = store_with(MemorySettings::new());
        let columns = column_map(vec![Column::new("x", "")]);
        let result = store.save(columns, vec!["x".into()]).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(remote.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_save_normalizes_order_before_upsert() {
        let (mut store, _, remote) = store_with(MemorySettings::new());
        let columns = column_map(vec![Column::new("a", "A"), Column::new("b", "B")]);
        let board = store.save(columns, vec!["b".into(), "zzz".into()]).await.unwrap();
        assert_eq!(board.column_order, vec!["b", "a"]);

        let stored = remote.record().unwrap();
        let decoded = decode_remote(&stored).unwrap();
        assert_eq!(decoded.column_order, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_restore_defaults_after_emptying() {
        let remote = MemorySettings::with_record(record(json!({}), json!([])));
        let (mut store, _, _) = store_with(remote);
        assert!(store.load().await.board.is_empty());

        let outcome = store.restore_defaults().await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.board.columns.len(), 4);
        assert_consistent(&outcome.board);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(String),
            Delete(usize),
            Rename(usize, String),
            Reorder(usize, usize),
            Move(i64, usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                "[A-Za-z ]{0,8}".prop_map(Op::Add),
                (0usize..8).prop_map(Op::Delete),
                ((0usize..8), "[A-Za-z]{0,6}").prop_map(|(i, t)| Op::Rename(i, t)),
                ((0usize..8), (0usize..8)).prop_map(|(a, b)| Op::Reorder(a, b)),
                ((1i64..6), (0usize..8)).prop_map(|(t, i)| Op::Move(t, i)),
            ]
        }

        fn pick(board: &ColumnBoard, i: usize) -> String {
            if board.column_order.is_empty() {
                "missing".to_string()
            } else {
                board.column_order[i % board.column_order.len()].clone()
            }
        }

        proptest! {
            #[test]
            fn test_order_is_permutation_of_columns(ops in prop::collection::vec(op(), 0..25)) {
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                runtime.block_on(async {
                    let (mut store, _, _) = store_with(MemorySettings::new());
                    store.load().await;
                    for op in ops {
                        let board = store.board().clone();
                        let before = board.clone();
                        let outcome = match op {
                            Op::Add(title) => store.add_column(&title).await,
                            Op::Delete(i) => store.delete_column(&pick(&board, i)).await,
                            Op::Rename(i, t) => store.rename_column(&pick(&board, i), &t).await,
                            Op::Reorder(a, b) => {
                                let id = pick(&board, a);
                                store.reorder_columns(a % board.column_order.len().max(1), b, &id).await
                            }
                            Op::Move(task, i) => store.move_task(task, &pick(&board, i), 0).await,
                        };
                        assert_consistent(&outcome.board);
                        assert_consistent(store.board());
                        let unique: std::collections::HashSet<_> = outcome.board.column_order.iter().collect();
                        assert_eq!(unique.len(), outcome.board.column_order.len());
                        if let Some(error) = &outcome.error {
                            if error.is_validation() {
                                assert_eq!(store.board(), &before);
                            }
                        }
                    }
                    let reloaded = store.load().await;
                    assert_consistent(&reloaded.board);
                });
            }
        }
    }
}
