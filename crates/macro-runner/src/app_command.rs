use macro_runner_core::{ActionLog, Completion, RecordedAction};

use std::path::PathBuf;

use uuid::Uuid;

/// Commands sent from the front end to the main application.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start a new recording session.
    StartRecording {
        /// Whether a document had focus when recording began.
        context_was_document: bool,
    },
    /// Append one action to the current recording.
    Record(RecordedAction),
    /// Stop recording and save the macro.
    StopRecording {
        /// Destination of the macro script.
        path: PathBuf,
    },
    /// Run a saved macro.
    Playback {
        /// Macro script to run.
        path: PathBuf,
        /// How many times to run it.
        iterations: u32,
    },
    /// Kill the worker running the current macro.
    StopPlayback,
    /// Request application shutdown.
    Shutdown,
}

/// Notifications sent from the main application back to the front end.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A recording session started.
    RecordingStarted {
        /// Unique session ID for this recording.
        session_id: Uuid,
    },
    /// The recording was rendered and written to disk.
    MacroSaved {
        /// Where the script was written.
        path: PathBuf,
        /// The actions the script was rendered from.
        log: ActionLog,
    },
    /// A macro run ended.
    PlaybackFinished(Completion),
    /// A command could not be carried out.
    CommandFailed {
        /// Human-readable reason.
        message: String,
    },
}
