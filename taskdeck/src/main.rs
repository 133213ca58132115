//! `taskdeck` command-line client.
//!
//! Logs go to a file so stdout carries only command output.

use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::api::http::HttpTaskApi;
use taskdeck::api::loopback::LoopbackTaskApi;
use taskdeck::api::{RequestError, TaskApi};
use taskdeck::auth::{AuthError, FileTokenStorage, SessionManager};
use taskdeck::config::{CliArgs, ClientConfig, Command, ConfigError};
use taskdeck::forms::TaskForm;
use taskdeck::tasks::{StoreError, TaskStore};
use taskdeck::view::{ListView, render_card, render_list};
use taskdeck_proto::task::UpdateTaskInput;

/// User that `--offline` runs are scoped to unless one is configured.
const OFFLINE_USER: &str = "offline";

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("{0}")]
    Form(String),
    #[error("not signed in; run `taskdeck login` or pass --user-id")]
    NotSignedIn,
    #[error("nothing to change; pass --title or --description")]
    NothingToUpdate,
    #[error("sessions are not available with --offline")]
    OfflineSession,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(offline = cli.offline, "taskdeck starting");

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a guard that must be held until the program exits so buffered
/// log lines are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdeck.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(cli: &CliArgs, config: &ClientConfig) -> Result<(), AppError> {
    let command = cli.command.clone().unwrap_or(Command::List);

    if cli.offline {
        let user_id = config
            .user_id
            .clone()
            .unwrap_or_else(|| OFFLINE_USER.to_string());
        return execute(LoopbackTaskApi::new(), user_id, config, command).await;
    }

    let sessions = SessionManager::new(FileTokenStorage::new(config.session_path()?));
    match command {
        Command::Login { token, user_id } => {
            let session = sessions.sign_in(&token, &user_id, Utc::now())?;
            println!(
                "Signed in as {} until {}",
                session.user_id,
                session.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
            return Ok(());
        }
        Command::Logout => {
            sessions.clear()?;
            println!("Signed out");
            return Ok(());
        }
        _ => {}
    }

    let session = sessions.current(Utc::now())?;
    let user_id = config
        .user_id
        .clone()
        .or_else(|| session.as_ref().map(|s| s.user_id.clone()))
        .ok_or(AppError::NotSignedIn)?;

    let mut api = HttpTaskApi::new(&config.api_base_url)?;
    api.set_bearer_token(session.map(|s| s.token));
    tracing::debug!(base_url = %api.base_url(), %user_id, "using remote task API");

    execute(api, user_id, config, command).await
}

async fn execute<A: TaskApi>(
    api: A,
    user_id: String,
    config: &ClientConfig,
    command: Command,
) -> Result<(), AppError> {
    let (store, _events) = TaskStore::new(api, user_id, config.event_buffer);

    match command {
        Command::List => {
            store.fetch().await?;
            println!("{}", render_list(ListView::from_snapshot(&store.snapshot())));
        }
        Command::Add { title, description } => {
            let mut form = TaskForm::new();
            form.set_title(title);
            if let Some(description) = description {
                form.set_description(description);
            }
            let input = form.submit().map_err(|errors| {
                let messages: Vec<&str> = errors.iter().map(|(_, m)| m).collect();
                AppError::Form(messages.join("; "))
            })?;
            let task = store.create(input).await?;
            println!("{}", render_card(&task));
        }
        Command::Edit {
            id,
            title,
            description,
        } => {
            let input = edit_input(title, description)?;
            let task = store.update(id, input).await?;
            println!("{}", render_card(&task));
        }
        Command::Toggle { id } => {
            let task = store.toggle_complete(id).await?;
            println!("{}", render_card(&task));
        }
        Command::Rm { id } => {
            store.delete(id).await?;
            println!("Deleted task {id}");
        }
        Command::Login { .. } | Command::Logout => return Err(AppError::OfflineSession),
    }

    Ok(())
}

/// Builds the patch for `edit`. Blank descriptions count as absent.
fn edit_input(
    title: Option<String>,
    description: Option<String>,
) -> Result<UpdateTaskInput, AppError> {
    let input = UpdateTaskInput { title, description }.normalized();
    if input.is_empty() {
        return Err(AppError::NothingToUpdate);
    }
    Ok(input)
}
