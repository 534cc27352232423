use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Task identifiers are the backend's integer primary keys.
pub type TaskId = i64;

/// Built-in status tokens.
pub const STATUS_TODO: &str = "todo";
pub const STATUS_IN_PROGRESS: &str = "inProgress";
pub const STATUS_BLOCKED: &str = "blocked";
pub const STATUS_DONE: &str = "done";

/// Statuses the reconciler never mints a column for. Tasks carrying one of
/// these without a matching column fall back to `todo`.
pub const PROTECTED_STATUSES: &[&str] = &[STATUS_TODO, STATUS_IN_PROGRESS, STATUS_DONE];

/// A kanban lane. `task_ids` is the ordered membership of the lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "taskIds")]
    pub task_ids: Vec<TaskId>,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            task_ids: Vec::new(),
        }
    }

    /// A column is well-formed when both id and title are non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// Map from column id to column, in payload order. Serialized as a JSON
/// object; a repeated key replaces the earlier value in place.
pub type ColumnMap = IndexMap<String, Column>;

/// Build a map keyed by each column's id.
pub fn column_map(columns: impl IntoIterator<Item = Column>) -> ColumnMap {
    columns.into_iter().map(|c| (c.id.clone(), c)).collect()
}

/// Case-insensitive lookups over a [`ColumnMap`].
pub trait ColumnMapExt {
    /// Find the key that equals `id` ignoring case.
    fn find_key_ignore_case(&self, id: &str) -> Option<&str>;

    /// Find the key of the first column whose title equals `title` ignoring case.
    fn find_key_by_title(&self, title: &str) -> Option<&str>;
}

impl ColumnMapExt for ColumnMap {
    fn find_key_ignore_case(&self, id: &str) -> Option<&str> {
        let wanted = id.to_lowercase();
        self.keys()
            .find(|k| k.to_lowercase() == wanted)
            .map(String::as_str)
    }

    fn find_key_by_title(&self, title: &str) -> Option<&str> {
        let wanted = title.trim().to_lowercase();
        self.iter()
            .find(|(_, c)| c.title.trim().to_lowercase() == wanted)
            .map(|(k, _)| k.as_str())
    }
}

/// Columns plus their display order. This is the unit the store persists and
/// hands to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnBoard {
    pub columns: ColumnMap,
    pub column_order: Vec<String>,
}

impl ColumnBoard {
    pub fn new(columns: ColumnMap, column_order: Vec<String>) -> Self {
        Self {
            columns,
            column_order,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in display order.
    pub fn ordered_columns(&self) -> Vec<&Column> {
        self.column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .collect()
    }
}

/// Photo attached to a task. Owned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub url: String,
}

/// Task record as served by `/todos/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl Task {
    /// Effective status: the explicit status, or one derived from the legacy
    /// completion flag when the status is absent or blank.
    pub fn effective_status(&self) -> String {
        match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ if self.is_completed => STATUS_DONE.to_string(),
            _ => STATUS_TODO.to_string(),
        }
    }

    /// Set status and keep the completion flag in sync with it.
    pub fn assign_status(&mut self, status: &str) {
        self.status = Some(status.to_string());
        self.is_completed = status == STATUS_DONE;
    }
}

/// Derive a column id from a user-entered title: trimmed, lowercased,
/// whitespace runs collapsed to a single hyphen.
pub fn column_id_from_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive a display title from a status token: hyphens become spaces and the
/// first letter is capitalized (`"code-review"` -> `"Code review"`).
pub fn title_from_status(status: &str) -> String {
    let spaced = status.replace('-', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn is_protected_status(status: &str) -> bool {
    PROTECTED_STATUSES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(status))
}
