//! `Taskboard` client — show and reorder a task board from the terminal.
//!
//! ```bash
//! # Print the board of workspace w1
//! taskboard --server-url ws://127.0.0.1:9100/ws --user alice --workspace w1 show
//!
//! # Drag the first todo task to the second slot of done
//! taskboard --user alice --workspace w1 move todo 0 done 1
//!
//! # Or via environment variables
//! BOARD_USER=alice BOARD_WORKSPACE=w1 taskboard show --json
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::board::{Board, ColumnSlot, MoveIntent};
use taskboard::config::{CliArgs, ClientConfig, Command, ConfigError};
use taskboard::sync::{BoardSession, SyncError, SyncReport};
use taskboard::transport::TransportError;
use taskboard::transport::ws::WsTransport;
use taskboard_proto::task::{NewTask, Task, TaskStatus};

/// Errors that end a CLI invocation.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not connect: {0}")]
    Connect(#[from] TransportError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr, or to `file_path` when given.
///
/// Returns a [`WorkerGuard`] when logging to a file; it must be held until
/// shutdown so buffered entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(cli: &CliArgs, config: &ClientConfig) -> Result<(), CliError> {
    let user_id = config.user_id()?;
    let filter = config.task_filter()?;
    let transport =
        WsTransport::connect_with_timeout(&config.server_url, user_id, config.request_timeout)
            .await?;
    let session = BoardSession::new(transport, filter);
    session.refresh().await?;

    match &cli.command {
        Command::Show => print_board(&session.board(), cli.json)?,
        Command::Move {
            from,
            from_index,
            to,
            to_index,
        } => {
            let intent = MoveIntent::new(
                ColumnSlot::new(*from, *from_index),
                ColumnSlot::new(*to, *to_index),
            );
            match session.drag(&intent).await? {
                Some(report) => print_report(&report, cli.json)?,
                None => println!("nothing to move"),
            }
            print_board(&session.board(), cli.json)?;
        }
        Command::Create {
            name,
            status,
            project,
        } => {
            let project_id = project
                .clone()
                .or_else(|| config.project.clone())
                .ok_or(ConfigError::Missing("project"))?;
            let new = NewTask {
                workspace_id: session.filter().workspace_id.clone(),
                project_id,
                name: name.clone(),
                status: *status,
                assignee_id: config.assignee.clone(),
                due_date: None,
                description: None,
            };
            let task = session.create_task(&new).await?;
            println!("created {} at {} in {}", task.id, task.position, task.status);
            print_board(&session.board(), cli.json)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ColumnView<'a> {
    status: TaskStatus,
    tasks: &'a [Task],
}

fn print_board(board: &Board, json: bool) -> Result<(), serde_json::Error> {
    if json {
        let columns: Vec<ColumnView<'_>> = board
            .columns()
            .map(|(status, tasks)| ColumnView { status, tasks })
            .collect();
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }
    for (status, tasks) in board.columns() {
        println!("{status} ({})", tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            println!("  {index:>3} [{:>7}] {}  {}", task.position, task.id, task.name);
        }
    }
    Ok(())
}

fn print_report(report: &SyncReport, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.invalidated)?);
        return Ok(());
    }
    println!("updated {} task(s)", report.updated.len());
    for task in &report.updated {
        println!("  {} -> {} @ {}", task.id, task.status, task.position);
    }
    if !report.refreshed {
        println!("warning: board could not be reloaded; showing local order");
    }
    Ok(())
}
