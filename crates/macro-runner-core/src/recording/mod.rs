mod action;
mod recorder;
mod recording_state;

pub use {
    action::{ActionLog, KEYBOARD_COMMAND, RecordedAction, is_valid_input},
    recorder::Recorder,
    recording_state::RecordingState,
};
