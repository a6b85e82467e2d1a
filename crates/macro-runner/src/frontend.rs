//! Command-line front end: turns subcommands into `AppCommand`s and waits
//! for the matching `AppEvent`s.

use crate::{
    App, AppCommand, AppError, AppEvent, AppResult, Cli, Command,
    config::{CONFIG_ENV, Config},
    worker_main,
};

use macro_runner_core::{
    ActionLog, Completion, RecordedAction, Synthesizer, WorkerSpec, save_script,
};

use std::{
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, instrument};

const STDIN_PATH: &str = "-";

/// Run one subcommand to completion.
pub(crate) async fn run(cli: Cli) -> AppResult<()> {
    let config_path = Config::resolve_path(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;

    match cli.command {
        Command::Record {
            input,
            output,
            document_context,
            log,
        } => {
            record(
                &config,
                &config_path,
                &input,
                output,
                document_context,
                log.as_deref(),
            )
            .await
        }
        Command::Render {
            log,
            output,
            document_context,
        } => render(&config, &log, output.as_deref(), document_context).await,
        Command::Play { path, iterations } => {
            let iterations = iterations.unwrap_or(config.playback.default_iterations);
            play(&config, &config_path, &path, iterations).await
        }
        Command::Worker { launch } => worker_main::run_worker(&launch, &config)
            .await
            .map(|_| ()),
    }
}

/// Build the worker launch spec from config.
///
/// The worker is this executable unless `worker.program` says otherwise, and
/// it is pointed at the same config file as the host.
#[track_caller]
pub(crate) fn worker_spec(config: &Config, config_path: &Path) -> AppResult<WorkerSpec> {
    let program = match &config.worker.program {
        Some(program) => program.clone(),
        None => std::env::current_exe()?,
    };
    let config_path = std::path::absolute(config_path)?;

    let mut spec = WorkerSpec::new(program);
    spec.args = vec!["worker".to_string()];
    spec.envs = vec![(CONFIG_ENV.to_string(), config_path.display().to_string())];
    spec.host_version = config.engine.host_version.clone();
    spec.connect_timeout = config.worker.connect_timeout();

    Ok(spec)
}

/// Parse a newline-delimited JSON action stream. Blank lines are skipped.
#[track_caller]
pub(crate) fn parse_actions(text: &str) -> AppResult<Vec<RecordedAction>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| AppError::InvalidInput {
                reason: format!("line {}: {}", index + 1, e),
                location: ErrorLocation::from(Location::caller()),
            })
        })
        .collect()
}

#[instrument(skip(config, config_path))]
async fn record(
    config: &Config,
    config_path: &Path,
    input: &Path,
    output: PathBuf,
    document_context: bool,
    log_path: Option<&Path>,
) -> AppResult<()> {
    let actions = parse_actions(&read_input(input).await?)?;
    let (command_tx, mut event_rx, app) = start_app(config, config_path)?;

    send(
        &command_tx,
        AppCommand::StartRecording {
            context_was_document: document_context,
        },
    )
    .await?;
    for action in actions {
        send(&command_tx, AppCommand::Record(action)).await?;
    }
    send(&command_tx, AppCommand::StopRecording { path: output }).await?;

    let outcome = loop {
        match event_rx.recv().await {
            Some(AppEvent::RecordingStarted { session_id }) => {
                debug!(%session_id, "Recording session open");
            }
            Some(AppEvent::MacroSaved { path, log }) => break Ok((path, log)),
            Some(AppEvent::CommandFailed { message }) => break Err(message),
            Some(AppEvent::PlaybackFinished(_)) => {}
            None => break Err("Application stopped before saving the macro".to_string()),
        }
    };

    finish(command_tx, app).await?;

    let (path, log) = outcome.map_err(|message| AppError::CommandFailed {
        message,
        location: ErrorLocation::from(Location::caller()),
    })?;

    if let Some(log_path) = log_path {
        write_log(log_path, &log).await?;
    }

    info!(path = ?path, action_count = log.len(), "Recording saved");

    Ok(())
}

#[instrument(skip(config))]
async fn render(
    config: &Config,
    log_path: &Path,
    output: Option<&Path>,
    document_context: bool,
) -> AppResult<()> {
    let text = tokio::fs::read_to_string(log_path).await?;
    let log: ActionLog = serde_json::from_str(&text).map_err(|e| AppError::InvalidInput {
        reason: format!("Failed to parse action log {}: {}", log_path.display(), e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let script =
        Synthesizer::new(config.recording.reference_path.clone()).render(&log, document_context);

    match output {
        Some(path) => save_script(path, &script)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(script.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[instrument(skip(config, config_path))]
async fn play(config: &Config, config_path: &Path, path: &Path, iterations: u32) -> AppResult<()> {
    let path = std::path::absolute(path)?;
    let (command_tx, mut event_rx, app) = start_app(config, config_path)?;

    send(&command_tx, AppCommand::Playback { path, iterations }).await?;

    let outcome = loop {
        match event_rx.recv().await {
            Some(AppEvent::PlaybackFinished(completion)) => break Ok(completion),
            Some(AppEvent::CommandFailed { message }) => break Err(message),
            Some(other) => debug!(event = ?other, "Ignoring event"),
            None => break Err("Application stopped before the macro finished".to_string()),
        }
    };

    finish(command_tx, app).await?;

    match outcome {
        Ok(Completion::Finished) => {
            info!("Macro finished");
            Ok(())
        }
        Ok(Completion::Silent) => {
            info!("Worker went away without reporting a result");
            Ok(())
        }
        Ok(completion) => Err(AppError::PlaybackFailed {
            message: completion.error_message().unwrap_or_default().to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),
        Err(message) => Err(AppError::CommandFailed {
            message,
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

#[track_caller]
fn start_app(
    config: &Config,
    config_path: &Path,
) -> AppResult<(
    mpsc::Sender<AppCommand>,
    mpsc::Receiver<AppEvent>,
    JoinHandle<AppResult<()>>,
)> {
    let spec = worker_spec(config, config_path)?;
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);

    let app = App::new(config, spec, command_rx, event_tx);

    Ok((command_tx, event_rx, tokio::spawn(app.run())))
}

async fn finish(command_tx: mpsc::Sender<AppCommand>, app: JoinHandle<AppResult<()>>) -> AppResult<()> {
    // The app also stops once every sender is gone.
    let _ = command_tx.send(AppCommand::Shutdown).await;
    drop(command_tx);

    app.await.map_err(|e| AppError::CommandFailed {
        message: format!("Application task failed: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?
}

async fn send(command_tx: &mpsc::Sender<AppCommand>, cmd: AppCommand) -> AppResult<()> {
    command_tx
        .send(cmd)
        .await
        .map_err(|e| AppError::ChannelSendFailed {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}

async fn read_input(input: &Path) -> AppResult<String> {
    if input.as_os_str() != STDIN_PATH {
        return Ok(tokio::fs::read_to_string(input).await?);
    }

    let text = tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
        .await
        .map_err(|e| AppError::InvalidInput {
            reason: format!("stdin reader failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })??;

    Ok(text)
}

async fn write_log(path: &Path, log: &ActionLog) -> AppResult<()> {
    let json = serde_json::to_string_pretty(log).map_err(|e| AppError::SerializationError {
        reason: format!("Failed to serialize action log: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    tokio::fs::write(path, json).await?;
    debug!(path = ?path, "Action log written");

    Ok(())
}
