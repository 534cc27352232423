/// Structural repairs applied to every board the store loads or saves.
///
/// - `normalize_order`: order becomes a permutation of the map's keys
/// - `validate_columns`: every column has an id and a title
/// - `cleanup_collisions`: one column per case-insensitive id
/// - `default_board`: hard-coded starting layouts

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{
    column_map, Column, ColumnBoard, ColumnMap, STATUS_BLOCKED, STATUS_DONE, STATUS_IN_PROGRESS, STATUS_TODO,
};

/// Which hard-coded layout to fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultLayout {
    /// `todo, inProgress, done`
    Basic,
    /// `todo, inProgress, blocked, done`
    #[default]
    WithBlocked,
}

/// Which member of a case-colliding id group survives cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// First id in map enumeration order.
    #[default]
    FirstSeen,
    /// An all-lowercase id when the group has one, else first-seen.
    PreferLowercase,
}

pub fn default_board(layout: DefaultLayout) -> ColumnBoard {
    let mut columns = vec![
        Column::new(STATUS_TODO, "To Do"),
        Column::new(STATUS_IN_PROGRESS, "In Progress"),
    ];
    if layout == DefaultLayout::WithBlocked {
        columns.push(Column::new(STATUS_BLOCKED, "Blocked"));
    }
    columns.push(Column::new(STATUS_DONE, "Completed"));

    let order = columns.iter().map(|c| c.id.clone()).collect();
    ColumnBoard::new(column_map(columns), order)
}

/// Every column must carry a non-empty id and title, and sit under its own id.
pub fn validate_columns(columns: &ColumnMap) -> Result<(), String> {
    for (key, column) in columns.iter() {
        if key.trim().is_empty() {
            return Err("column with empty key".to_string());
        }
        if !column.is_well_formed() {
            return Err(format!("invalid column structure for {}", key));
        }
        if *key != column.id {
            return Err(format!("column key {} does not match id {}", key, column.id));
        }
    }
    Ok(())
}

/// Drop order entries with no column and duplicate entries, then append
/// columns missing from the order in map order. Returns true if the order
/// changed.
pub fn normalize_order(board: &mut ColumnBoard) -> bool {
    let mut seen = HashSet::new();
    let mut order: Vec<String> = board
        .column_order
        .iter()
        .filter(|id| board.columns.contains_key(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect();

    for key in board.columns.keys() {
        if !seen.contains(key.as_str()) {
            order.push(key.to_string());
        }
    }

    let changed = order != board.column_order;
    board.column_order = order;
    changed
}

/// Remove columns whose id collides case-insensitively with another
/// column's. Survivors inherit the task ids of the columns they absorb
/// (appended, without duplicates); redistribution recomputes membership
/// afterwards anyway. Returns the removed ids.
pub fn cleanup_collisions(board: &mut ColumnBoard, tie_break: TieBreak) -> Vec<String> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for key in board.columns.keys() {
        let folded = key.to_lowercase();
        match index.get(&folded) {
            Some(&i) => groups[i].1.push(key.to_string()),
            None => {
                index.insert(folded.clone(), groups.len());
                groups.push((folded, vec![key.to_string()]));
            }
        }
    }

    let mut removed = Vec::new();
    for (folded, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
        let canonical = match tie_break {
            TieBreak::FirstSeen => members[0].clone(),
            TieBreak::PreferLowercase => members
                .iter()
                .find(|m| **m == folded)
                .unwrap_or(&members[0])
                .clone(),
        };

        let mut absorbed = Vec::new();
        for member in members.iter().filter(|m| **m != canonical) {
            if let Some(column) = board.columns.shift_remove(member) {
                absorbed.extend(column.task_ids);
            }
            removed.push(member.clone());
        }
        if let Some(survivor) = board.columns.get_mut(&canonical) {
            for task_id in absorbed {
                if !survivor.task_ids.contains(&task_id) {
                    survivor.task_ids.push(task_id);
                }
            }
        }
        log::info!(
            "[taskboard.normalize] Merged case-colliding columns {:?} into {}",
            members,
            canonical
        );
    }

    if !removed.is_empty() {
        normalize_order(board);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(ids: &[&str], order: &[&str]) -> ColumnBoard {
        ColumnBoard::new(
            column_map(ids.iter().map(|id| Column::new(*id, id.to_uppercase()))),
            order.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_default_layouts() {
        let basic = default_board(DefaultLayout::Basic);
        assert_eq!(basic.column_order, vec!["todo", "inProgress", "done"]);
        assert!(basic.columns.values().all(|c| c.task_ids.is_empty()));

        let full = default_board(DefaultLayout::WithBlocked);
        assert_eq!(full.column_order, vec!["todo", "inProgress", "blocked", "done"]);
        assert_eq!(full.columns.get("done").unwrap().title, "Completed");
    }

    #[test]
    fn test_normalize_order_repairs_both_directions() {
        let mut b = board(&["todo", "done", "qa"], &["done", "ghost", "todo", "done"]);
        assert!(normalize_order(&mut b));
        assert_eq!(b.column_order, vec!["done", "todo", "qa"]);
        assert!(!normalize_order(&mut b));
    }

    #[test]
    fn test_validate_columns() {
        let good = board(&["todo"], &["todo"]);
        assert!(validate_columns(&good.columns).is_ok());

        let mut bad = good.clone();
        bad.columns.get_mut("todo").unwrap().title = "  ".into();
        assert!(validate_columns(&bad.columns).is_err());
    }

    #[test]
    fn test_validate_columns_rejects_key_id_mismatch() {
        let mut columns = ColumnMap::new();
        columns.insert("a".to_string(), Column::new("b", "B"));
        columns.insert("b".to_string(), Column::new("b", "B"));
        let err = validate_columns(&columns).unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn test_cleanup_collisions_first_seen() {
        let mut b = board(&["Todo", "done", "todo", "TODO"], &["Todo", "done", "todo", "TODO"]);
        b.columns.get_mut("Todo").unwrap().task_ids = vec![1];
        b.columns.get_mut("todo").unwrap().task_ids = vec![2, 1];
        b.columns.get_mut("TODO").unwrap().task_ids = vec![3];

        let removed = cleanup_collisions(&mut b, TieBreak::FirstSeen);
        assert_eq!(removed, vec!["todo", "TODO"]);
        assert_eq!(b.column_order, vec!["Todo", "done"]);
        assert_eq!(b.columns.get("Todo").unwrap().task_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_cleanup_collisions_prefer_lowercase() {
        let mut b = board(&["Todo", "todo"], &["Todo", "todo"]);
        let removed = cleanup_collisions(&mut b, TieBreak::PreferLowercase);
        assert_eq!(removed, vec!["Todo"]);
        assert_eq!(b.column_order, vec!["todo"]);
    }

    #[test]
    fn test_cleanup_without_collisions_is_noop() {
        let mut b = board(&["todo", "done"], &["done", "todo"]);
        assert!(cleanup_collisions(&mut b, TieBreak::FirstSeen).is_empty());
        assert_eq!(b.column_order, vec!["done", "todo"]);
    }
}
