use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Record editor actions into macro scripts and play them back in a supervised worker.
#[derive(Debug, Parser)]
#[command(name = "macro-runner", version, about)]
pub struct Cli {
    /// Config file. Defaults to $MACRO_RUNNER_CONFIG, then the platform config dir.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a stream of actions (one JSON object per line) into a macro.
    Record {
        /// Action stream, or `-` for stdin.
        #[arg(long, default_value = "-", value_name = "FILE")]
        input: PathBuf,

        /// Where to write the macro script.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// A document had focus when recording started.
        #[arg(long)]
        document_context: bool,

        /// Also write the recorded action log as JSON.
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },

    /// Render a saved action log to macro script text.
    Render {
        /// Action log written by `record --log`.
        log: PathBuf,

        /// Write the script here instead of stdout.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// A document had focus when recording started.
        #[arg(long)]
        document_context: bool,
    },

    /// Run a macro in a worker process and wait for it to finish.
    Play {
        /// Macro script to run.
        path: PathBuf,

        /// How many times to run it. Defaults to the configured count.
        #[arg(long, short = 'n')]
        iterations: Option<u32>,
    },

    /// Worker process entry point, launched by the host.
    #[command(hide = true)]
    Worker {
        /// `{correlation_id}|{host_pid}|{host_version}`
        launch: String,
    },
}

impl Command {
    /// True for the hidden worker entry point.
    pub fn is_worker(&self) -> bool {
        matches!(self, Command::Worker { .. })
    }
}
