use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use taskboard_core::{ColumnBoard, ColumnOutcome};

use taskboard_client::config::{default_config_path, load_config};
use taskboard_client::{logging, Session};

#[derive(Parser)]
#[command(name = "taskboard", about = "Kanban columns for the todo backend")]
struct Cli {
    /// Config file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the board as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current board.
    Show,
    /// Reload settings and tasks, then redistribute tasks into columns.
    Refresh,
    AddColumn { title: String },
    DeleteColumn { id: String },
    RenameColumn { id: String, title: String },
    /// Move a column within the display order.
    Reorder { source: usize, dest: usize, id: String },
    MoveTask {
        task_id: i64,
        column: String,
        #[arg(default_value_t = 0)]
        index: usize,
    },
    RestoreDefaults,
    /// Ask the server to reset its stored column settings.
    ServerReset,
    UploadPhoto { task_id: i64, path: PathBuf },
    DeletePhoto { task_id: i64, photo_id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    config.apply_env(|key| std::env::var(key).ok());

    let session = match Session::open(&config) {
        Ok(session) => session,
        Err(e) => {
            log::error!("[taskboard] {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&session, cli.command, cli.json).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("[taskboard] {}", message);
            ExitCode::FAILURE
        }
    };
    session.board.shutdown();
    code
}

async fn run(session: &Session, command: Command, json: bool) -> Result<(), String> {
    let board = &session.board;
    let outcome = match command {
        Command::Show => board.snapshot().await,
        Command::Refresh => board.refresh().await,
        Command::AddColumn { title } => board.add_column(title).await,
        Command::DeleteColumn { id } => board.delete_column(id).await,
        Command::RenameColumn { id, title } => board.rename_column(id, title).await,
        Command::Reorder { source, dest, id } => board.reorder_columns(source, dest, id).await,
        Command::MoveTask {
            task_id,
            column,
            index,
        } => board.move_task(task_id, column, index).await,
        Command::RestoreDefaults => board.restore_defaults().await,
        Command::ServerReset => {
            session
                .api
                .reset_column_settings()
                .await
                .map_err(|e| e.to_string())?;
            board.refresh().await
        }
        Command::UploadPhoto { task_id, path } => {
            let photo = session
                .api
                .upload_photo(task_id, &path)
                .await
                .map_err(|e| e.to_string())?;
            println!("Uploaded {} as photo {} ({})", photo.filename, photo.id, photo.url);
            return Ok(());
        }
        Command::DeletePhoto { task_id, photo_id } => {
            session
                .api
                .delete_photo(task_id, photo_id)
                .await
                .map_err(|e| e.to_string())?;
            println!("Deleted photo {}", photo_id);
            return Ok(());
        }
    }
    .map_err(|e| e.to_string())?;

    report(&outcome, json)
}

fn report(outcome: &ColumnOutcome, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(&outcome.board).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        print_board(&outcome.board);
    }
    match &outcome.error {
        Some(error) => Err(error.to_string()),
        None => Ok(()),
    }
}

fn print_board(board: &ColumnBoard) {
    if board.is_empty() {
        println!("(no columns; run `taskboard restore-defaults`)");
        return;
    }
    for column in board.ordered_columns() {
        let ids: Vec<String> = column.task_ids.iter().map(|id| id.to_string()).collect();
        println!("{} [{}]: {}", column.title, column.id, ids.join(", "));
    }
}
