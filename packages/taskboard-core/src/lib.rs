pub mod normalize;
pub mod queue;
pub mod reconcile;
pub mod settings;
pub mod storage;
pub mod store;
pub mod types;

pub use normalize::{DefaultLayout, TieBreak};
pub use queue::{BoardCommand, BoardEvent, BoardHandle, QueueError};
pub use reconcile::{reconcile, Reconciliation};
pub use store::{ColumnError, ColumnOutcome, ColumnStore, LoadSource, StoreOptions};
pub use types::{column_map, Column, ColumnBoard, ColumnMap, ColumnMapExt, Photo, Task, TaskId};
