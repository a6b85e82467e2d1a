//! Macro-Runner: record editor actions into macro scripts and play them back
//! in a supervised worker process.

mod app;
mod app_command;
mod cli;
mod config;
mod error;
mod frontend;
mod interpreter_host;
mod logging;
mod worker_main;

pub(crate) use {
    app::App,
    app_command::{AppCommand, AppEvent},
    cli::{Cli, Command},
    error::{AppError, Result as AppResult},
    interpreter_host::InterpreterScriptHost,
};

use crate::config::Config;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

/// Application entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Dropping the guard flushes buffered worker logs.
    let _log_guard = if cli.command.is_worker() {
        match Config::log_dir().and_then(|dir| logging::init_worker(&dir)) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Worker logging disabled: {}", e);
                None
            }
        }
    } else {
        logging::init_host();
        None
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(frontend::run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Macro-runner failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
