use std::time::Instant;

use uuid::Uuid;

/// Recording state owned by the [`Recorder`](crate::Recorder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Not currently recording.
    Idle,
    /// Currently appending to the action log.
    Recording {
        /// When recording started.
        started_at: Instant,
        /// Unique session ID for log correlation.
        session_id: Uuid,
    },
}
