//! Macro-runner Core Library
//!
//! Records editor actions, compresses them into macro script text, and plays
//! macros back in a supervised worker process over a framed control channel.
//!
//! # Example
//!
//! ```no_run
//! use macro_runner_core::{Completion, CoreResult, Recorder, Synthesizer, WorkerSpec, WorkerSupervisor};
//!
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> CoreResult<()> {
//! let mut recorder = Recorder::new(vec!["Macro Explorer".to_string()]);
//! recorder.start_recording()?;
//! for c in "hello".chars() {
//!     recorder.add_command(uuid::Uuid::nil(), 1, "", Some(c));
//! }
//! let log = recorder.stop_recording()?;
//!
//! let script = Synthesizer::default().render(&log, true);
//! macro_runner_core::save_script(std::path::Path::new("hello.js"), &script)?;
//!
//! let (events_tx, mut events_rx) = mpsc::channel(32);
//! let supervisor = WorkerSupervisor::new(WorkerSpec::new("macro-runner"), events_tx);
//! supervisor.run_script("hello.js", 1).await?;
//!
//! if let Some(Completion::ScriptFailed { message }) = events_rx.recv().await {
//!     eprintln!("{message}");
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod error;
mod protocol;
mod recording;
mod supervisor;
mod synthesis;
mod worker;

pub use {
    channel::{
        ChannelListener, HostReader, HostStream, HostWriter, WorkerReader, WorkerStream,
        WorkerWriter, connect_to_host, endpoint_name, split_stream,
    },
    error::CoreError,
    error::Result as CoreResult,
    protocol::{
        Incoming, LAUNCH_ARG_DELIMITER, LaunchArgs, MAX_FRAME_LEN, Packet, PacketReader,
        PacketWriter, decode, encode,
    },
    recording::{
        ActionLog, KEYBOARD_COMMAND, RecordedAction, Recorder, RecordingState, is_valid_input,
    },
    supervisor::{
        COMMAND_NOT_VALID_MESSAGE, Completion, ConnectionStatus, DEFAULT_CONNECT_TIMEOUT,
        ListenerExit, NO_ACTIVE_DOCUMENT_MESSAGE, ProcessGroup, SupervisorState, WorkerProbe,
        WorkerSpec, WorkerSupervisor, format_critical_error, format_script_error,
        friendly_description, validate_transition,
    },
    synthesis::{
        AUTOMATION_ROOT, COMMAND_HELPER, CommandTarget, DEFAULT_REFERENCE_PATH, Statement,
        Synthesizer, compress, save_script,
    },
    worker::{
        AdapterExit, DEFAULT_IDLE_TIMEOUT, ExecutionFailure, HostFault, ScriptHost,
        ScriptHostAdapter, ScriptRuntimeError,
    },
};

#[cfg(test)]
mod tests;
