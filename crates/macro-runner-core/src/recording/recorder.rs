use crate::{
    CoreError, CoreResult,
    recording::{ActionLog, RecordedAction, RecordingState},
};

use std::{panic::Location, time::Instant};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Owns the action log for the lifetime of a recording session.
///
/// The host's command and selection hooks push into the recorder while a
/// session is active; everything they report while idle is dropped.
/// `stop_recording` hands the finished log to the caller, which is the only
/// way the synthesizer ever sees it.
#[derive(Debug)]
pub struct Recorder {
    log: ActionLog,
    state: RecordingState,
    ignored_captions: Vec<String>,
    current_window: Option<Uuid>,
}

impl Recorder {
    /// Create a recorder that never records tool windows with the given captions.
    pub fn new(ignored_captions: Vec<String>) -> Self {
        Self {
            log: ActionLog::new(),
            state: RecordingState::Idle,
            ignored_captions,
            current_window: None,
        }
    }

    /// Current recording state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// True while a session is active.
    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecordingState::Recording { .. })
    }

    /// Clear the log and begin a new session.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start_recording(&mut self) -> CoreResult<Uuid> {
        if self.is_recording() {
            return Err(CoreError::AlreadyRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.log.clear();
        self.current_window = None;

        let session_id = Uuid::new_v4();
        self.state = RecordingState::Recording {
            started_at: Instant::now(),
            session_id,
        };

        info!(session_id = %session_id, "Recording started");

        Ok(session_id)
    }

    /// End the session and hand over the recorded log.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self) -> CoreResult<ActionLog> {
        let RecordingState::Recording {
            started_at,
            session_id,
        } = self.state
        else {
            return Err(CoreError::NotRecording {
                location: ErrorLocation::from(Location::caller()),
            });
        };

        self.state = RecordingState::Idle;
        let log = std::mem::take(&mut self.log);

        info!(
            session_id = %session_id,
            duration_ms = started_at.elapsed().as_millis(),
            action_count = log.len(),
            "Recording stopped"
        );

        Ok(log)
    }

    /// Record a command invocation.
    pub fn add_command(
        &mut self,
        command_group_id: Uuid,
        command_id: u32,
        command_name: impl Into<String>,
        input_char: Option<char>,
    ) {
        self.push(RecordedAction::Command {
            command_group_id,
            command_id,
            command_name: command_name.into(),
            input_char,
        });
    }

    /// Record a tool window gaining focus.
    pub fn add_window_activation(&mut self, tool_window_id: Uuid, caption: impl Into<String>) {
        let caption = caption.into();
        if self.ignored_captions.iter().any(|c| *c == caption) {
            debug!(caption = %caption, "Ignoring activation of excluded window");
            return;
        }

        if self.current_window == Some(tool_window_id) {
            return;
        }

        self.push(RecordedAction::WindowActivation {
            tool_window_id,
            caption,
        });
    }

    /// Record a document gaining focus.
    pub fn add_document_activation(&mut self, path: impl Into<String>) {
        self.push(RecordedAction::DocumentActivation { path: path.into() });
    }

    /// Append any kind of action, applying the same filters as the typed helpers.
    pub fn record(&mut self, action: RecordedAction) {
        match action {
            RecordedAction::WindowActivation {
                tool_window_id,
                caption,
            } => self.add_window_activation(tool_window_id, caption),
            other => self.push(other),
        }
    }

    fn push(&mut self, action: RecordedAction) {
        if !self.is_recording() {
            return;
        }

        self.current_window = match &action {
            RecordedAction::WindowActivation { tool_window_id, .. } => Some(*tool_window_id),
            RecordedAction::DocumentActivation { .. } => None,
            RecordedAction::Command { .. } => self.current_window,
        };

        self.log.push(action);
    }
}
