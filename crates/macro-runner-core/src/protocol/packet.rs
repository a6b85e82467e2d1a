use serde::{Deserialize, Serialize};

/// One message exchanged on the control channel.
///
/// The host sends `RunScript` and `Close`; the worker answers every
/// `RunScript` with exactly one of `Success`, `ScriptError` or
/// `CriticalError` before it reads the next message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    /// Worker has nothing to run and is going idle.
    Empty,
    /// Orderly shutdown request, or its acknowledgement.
    Close,
    /// Run the macro at `path` `iterations` times.
    RunScript {
        /// Path of the macro file on disk.
        path: String,
        /// Number of consecutive runs.
        iterations: u32,
    },
    /// The macro completed without error.
    Success,
    /// The macro raised a runtime error at a known source position.
    ScriptError {
        /// 1-based line of the failing statement, 0 when unknown.
        line: u32,
        /// Column of the failing statement, 0 when unknown.
        column: u32,
        /// Error text reported by the script host.
        description: String,
    },
    /// The worker itself failed and is about to close the channel.
    CriticalError {
        /// Fault message.
        message: String,
        /// Stack trace captured at the fault, possibly empty.
        stack_trace: String,
        /// Component that raised the fault, possibly empty.
        target_site: String,
    },
}

impl Packet {
    /// True for the packets that end an outstanding `RunScript`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Packet::Success | Packet::ScriptError { .. } | Packet::CriticalError { .. }
        )
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Empty => "empty",
            Packet::Close => "close",
            Packet::RunScript { .. } => "run_script",
            Packet::Success => "success",
            Packet::ScriptError { .. } => "script_error",
            Packet::CriticalError { .. } => "critical_error",
        }
    }
}
