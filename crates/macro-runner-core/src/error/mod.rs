use error_location::ErrorLocation;
use thiserror::Error;

/// Recorder, protocol and supervisor errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A recording session is already active.
    #[error("Recording already in progress {location}")]
    AlreadyRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Stop was requested while no recording session was active.
    #[error("No recording in progress {location}")]
    NotRecording {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A script run is still waiting for its terminal packet.
    #[error("A macro is already running {location}")]
    RunInProgress {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The worker process could not be started.
    #[error("Failed to launch worker: {reason} {location}")]
    LaunchFailed {
        /// Description of the launch failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The control channel could not be bound, connected or written.
    #[error("Control channel error: {reason} {location}")]
    ChannelError {
        /// Description of the channel failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A frame could not be encoded or exceeded the size limit.
    #[error("Protocol error: {reason} {location}")]
    ProtocolError {
        /// Description of the protocol failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The worker launch argument string was malformed.
    #[error("Invalid launch arguments: {reason} {location}")]
    InvalidLaunchArgs {
        /// Description of what was wrong with the argument string.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Supervisor state machine rejected a transition.
    #[error("Illegal supervisor transition: {reason} {location}")]
    IllegalTransition {
        /// The rejected edge.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from filesystem or socket operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::IoError {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
