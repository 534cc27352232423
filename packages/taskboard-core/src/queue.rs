/// Board command queue.
///
/// One worker task owns the column store and the task source. Commands are
/// applied strictly in submission order against the latest state, so no
/// caller ever acts on a stale copy of the board.
///
/// - Consecutive pending `Refresh` commands are coalesced into one cycle
/// - Subscribers get a `BoardEvent` after each applied change
/// - `shutdown()` abandons in-flight work; pending callers get `QueueError::Closed`

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::reconcile::reconcile;
use crate::storage::{LocalCache, SettingsBackend, TaskSource};
use crate::store::{ColumnError, ColumnOutcome, ColumnStore, LoadSource, Loaded};
use crate::types::{TaskId, STATUS_DONE};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    /// Load settings, fetch tasks, reconcile, persist.
    Refresh,
    AddColumn { title: String },
    DeleteColumn { id: String },
    RenameColumn { id: String, title: String },
    ReorderColumns { source: usize, dest: usize, id: String },
    MoveTask { task_id: TaskId, column_id: String, index: usize },
    RestoreDefaults,
    /// Current board without changes.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum BoardEvent {
    Loaded { source: LoadSource },
    Reconciled { minted: Vec<String>, merged: Vec<String> },
    Changed { column_order: Vec<String> },
    SaveFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Board queue is closed")]
    Closed,
}

struct Envelope {
    command: BoardCommand,
    reply: oneshot::Sender<ColumnOutcome>,
}

/// Cloneable handle to a running board worker.
#[derive(Clone)]
pub struct BoardHandle {
    commands: mpsc::Sender<Envelope>,
    events: broadcast::Sender<BoardEvent>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl BoardHandle {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<C, R, T>(store: ColumnStore<C, R>, tasks: T) -> Self
    where
        C: LocalCache + 'static,
        R: SettingsBackend + 'static,
        T: TaskSource + 'static,
    {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = BoardWorker {
            store,
            tasks,
            events: events.clone(),
            loaded: false,
        };
        tokio::spawn(worker.run(rx, shutdown_rx));

        Self {
            commands,
            events,
            shutdown: Arc::new(shutdown),
        }
    }

    pub async fn send(&self, command: BoardCommand) -> Result<ColumnOutcome, QueueError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| QueueError::Closed)?;
        response.await.map_err(|_| QueueError::Closed)
    }

    pub async fn refresh(&self) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::Refresh).await
    }

    pub async fn add_column(&self, title: impl Into<String>) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::AddColumn {
            title: title.into(),
        })
        .await
    }

    pub async fn delete_column(&self, id: impl Into<String>) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::DeleteColumn { id: id.into() }).await
    }

    pub async fn rename_column(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::RenameColumn {
            id: id.into(),
            title: title.into(),
        })
        .await
    }

    pub async fn reorder_columns(
        &self,
        source: usize,
        dest: usize,
        id: impl Into<String>,
    ) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::ReorderColumns {
            source,
            dest,
            id: id.into(),
        })
        .await
    }

    pub async fn move_task(
        &self,
        task_id: TaskId,
        column_id: impl Into<String>,
        index: usize,
    ) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::MoveTask {
            task_id,
            column_id: column_id.into(),
            index,
        })
        .await
    }

    pub async fn restore_defaults(&self) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::RestoreDefaults).await
    }

    pub async fn snapshot(&self) -> Result<ColumnOutcome, QueueError> {
        self.send(BoardCommand::Snapshot).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Stop the worker. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

struct BoardWorker<C, R, T> {
    store: ColumnStore<C, R>,
    tasks: T,
    events: broadcast::Sender<BoardEvent>,
    loaded: bool,
}

impl<C, R, T> BoardWorker<C, R, T>
where
    C: LocalCache,
    R: SettingsBackend,
    T: TaskSource,
{
    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>, mut shutdown: watch::Receiver<bool>) {
        let mut carried: Option<Envelope> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let envelope = match carried.take() {
                Some(envelope) => envelope,
                None => tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    next = rx.recv() => match next {
                        Some(envelope) => envelope,
                        None => break,
                    },
                },
            };

            let Envelope { command, reply } = envelope;
            let mut replies = vec![reply];
            if command == BoardCommand::Refresh {
                while let Ok(next) = rx.try_recv() {
                    if next.command == BoardCommand::Refresh {
                        replies.push(next.reply);
                    } else {
                        carried = Some(next);
                        break;
                    }
                }
                if replies.len() > 1 {
                    log::debug!("[taskboard.queue] Coalesced {} refresh requests", replies.len());
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                outcome = self.handle(command) => outcome,
            };

            for reply in replies {
                let _ = reply.send(outcome.clone());
            }
        }

        log::info!("[taskboard.queue] Board queue stopped");
    }

    async fn handle(&mut self, command: BoardCommand) -> ColumnOutcome {
        if command != BoardCommand::Refresh && !self.loaded {
            self.load().await;
        }

        let outcome = match command {
            BoardCommand::Refresh => return self.refresh().await,
            BoardCommand::Snapshot => return ColumnOutcome::ok(self.store.board().clone()),
            BoardCommand::AddColumn { title } => self.store.add_column(&title).await,
            BoardCommand::DeleteColumn { id } => self.store.delete_column(&id).await,
            BoardCommand::RenameColumn { id, title } => self.store.rename_column(&id, &title).await,
            BoardCommand::ReorderColumns { source, dest, id } => {
                self.store.reorder_columns(source, dest, &id).await
            }
            BoardCommand::MoveTask {
                task_id,
                column_id,
                index,
            } => self.move_task(task_id, &column_id, index).await,
            BoardCommand::RestoreDefaults => self.store.restore_defaults().await,
        };
        self.announce(&outcome);
        outcome
    }

    async fn load(&mut self) -> Loaded {
        let loaded = self.store.load().await;
        self.loaded = true;
        self.emit(BoardEvent::Loaded {
            source: loaded.source,
        });
        loaded
    }

    async fn refresh(&mut self) -> ColumnOutcome {
        let loaded = self.load().await;

        let mut tasks = match self.tasks.list_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                log::warn!("[taskboard.queue] Failed to fetch tasks: {}", e);
                return ColumnOutcome::failed(loaded.board, ColumnError::TasksUnavailable(e.to_string()));
            }
        };

        let result = reconcile(&mut tasks, &loaded.board, self.store.options().tie_break);
        for task_id in &result.normalized {
            let Some(task) = tasks.iter().find(|t| t.id == *task_id) else {
                continue;
            };
            let status = task.effective_status();
            if let Err(e) = self
                .tasks
                .update_status(task.id, &status, task.is_completed)
                .await
            {
                log::warn!(
                    "[taskboard.queue] Failed to push status {} for task {}: {}",
                    status,
                    task.id,
                    e
                );
            }
        }

        let outcome = self.store.replace(result.board).await;
        self.emit(BoardEvent::Reconciled {
            minted: result.minted,
            merged: result.merged,
        });
        self.announce(&outcome);
        outcome
    }

    /// The board only changes once the server has accepted the new status.
    async fn move_task(&mut self, task_id: TaskId, column_id: &str, index: usize) -> ColumnOutcome {
        let board = self.store.board();
        if !board.columns.contains_key(column_id) {
            return ColumnOutcome::failed(
                board.clone(),
                ColumnError::NotFound(column_id.to_string()),
            );
        }

        if let Err(e) = self
            .tasks
            .update_status(task_id, column_id, column_id == STATUS_DONE)
            .await
        {
            log::warn!(
                "[taskboard.queue] Failed to move task {} to {} on the server: {}",
                task_id,
                column_id,
                e
            );
            return ColumnOutcome::failed(
                self.store.board().clone(),
                ColumnError::TaskUpdateFailed(task_id),
            );
        }
        self.store.move_task(task_id, column_id, index).await
    }

    fn announce(&self, outcome: &ColumnOutcome) {
        match &outcome.error {
            None => self.emit(BoardEvent::Changed {
                column_order: outcome.board.column_order.clone(),
            }),
            Some(ColumnError::SaveFailed) => self.emit(BoardEvent::SaveFailed {
                message: ColumnError::SaveFailed.to_string(),
            }),
            Some(_) => {}
        }
    }

    fn emit(&self, event: BoardEvent) {
        let _ = self.events.send(event);
    }
}
