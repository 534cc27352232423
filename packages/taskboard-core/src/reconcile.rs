/// Redistribution of tasks into columns by status.
///
/// Given the authoritative task list and the current board:
/// 1. Case-colliding column ids are merged (see `cleanup_collisions`)
/// 2. Every column's membership is cleared
/// 3. Each task is placed by its effective status:
///    - column id equal ignoring case
///    - else column title equal to the status-derived title, ignoring case
///    - else a new column is minted, unless the status is a protected built-in
///    - else the `todo` column (created if missing)
/// 4. Minted columns are appended to the display order
///
/// Each placed task's status is rewritten to the id of the column it landed
/// in, and its completion flag follows (`done` means completed).

use std::collections::HashSet;

use crate::normalize::{cleanup_collisions, normalize_order, TieBreak};
use crate::types::{
    is_protected_status, title_from_status, Column, ColumnBoard, ColumnMap, ColumnMapExt, Task,
    TaskId, STATUS_TODO,
};

/// Output of a reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub board: ColumnBoard,
    /// Columns created for statuses that had none, in creation order.
    pub minted: Vec<String>,
    /// Column ids removed by collision cleanup.
    pub merged: Vec<String>,
    /// Tasks whose status or completion flag was rewritten.
    pub normalized: Vec<TaskId>,
}

pub fn reconcile(tasks: &mut [Task], board: &ColumnBoard, tie_break: TieBreak) -> Reconciliation {
    let mut next = board.clone();
    let merged = cleanup_collisions(&mut next, tie_break);

    for column in next.columns.values_mut() {
        column.task_ids.clear();
    }

    let mut minted = Vec::new();
    let mut normalized = Vec::new();
    let mut placed = HashSet::new();

    for task in tasks.iter_mut() {
        if !placed.insert(task.id) {
            log::warn!("[taskboard.reconcile] Task {} listed twice, keeping the first", task.id);
            continue;
        }

        let status = task.effective_status();
        let key = resolve_column(&mut next.columns, &status, &mut minted);
        if let Some(column) = next.columns.get_mut(&key) {
            column.task_ids.push(task.id);
        }

        let before = (task.status.clone(), task.is_completed);
        task.assign_status(&key);
        if before != (task.status.clone(), task.is_completed) {
            normalized.push(task.id);
        }
    }

    for id in &minted {
        if !next.column_order.contains(id) {
            next.column_order.push(id.clone());
        }
    }
    normalize_order(&mut next);

    if !minted.is_empty() {
        log::info!("[taskboard.reconcile] Created columns for new statuses: {:?}", minted);
    }

    Reconciliation {
        board: next,
        minted,
        merged,
        normalized,
    }
}

fn resolve_column(columns: &mut ColumnMap, status: &str, minted: &mut Vec<String>) -> String {
    if let Some(key) = columns.find_key_ignore_case(status) {
        return key.to_string();
    }

    let title = title_from_status(status);
    if let Some(key) = columns.find_key_by_title(&title) {
        return key.to_string();
    }

    if !is_protected_status(status) {
        columns.insert(status.to_string(), Column::new(status, title));
        minted.push(status.to_string());
        return status.to_string();
    }

    if let Some(key) = columns.find_key_ignore_case(STATUS_TODO) {
        return key.to_string();
    }
    columns.insert(STATUS_TODO.to_string(), Column::new(STATUS_TODO, "To Do"));
    minted.push(STATUS_TODO.to_string());
    STATUS_TODO.to_string()
}
