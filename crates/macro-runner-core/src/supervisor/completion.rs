use crate::protocol::Packet;

/// Shown in place of the script host's "Object required".
pub const NO_ACTIVE_DOCUMENT_MESSAGE: &str =
    "There is no active document. Open a document before running this macro";

/// Shown when the script host reports an error without a description.
pub const COMMAND_NOT_VALID_MESSAGE: &str =
    "The command is not valid in the current context";

/// Outcome of a `RunScript`, raised once per run on the supervisor's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The worker reported `Success`.
    Finished,
    /// The worker went away without an error: `Empty`, a closed channel, or process exit.
    Silent,
    /// The macro failed. The worker stays usable.
    ScriptFailed {
        /// User-facing message.
        message: String,
    },
    /// The worker failed and has been torn down.
    WorkerFailed {
        /// User-facing message.
        message: String,
    },
}

impl Completion {
    /// Error text carried by the event, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Finished | Self::Silent => None,
            Self::ScriptFailed { message } | Self::WorkerFailed { message } => Some(message),
        }
    }

    /// Build the event for a terminal packet. Non-terminal packets yield `None`.
    pub fn from_packet(packet: &Packet, macro_name: &str) -> Option<Self> {
        match packet {
            Packet::Success => Some(Self::Finished),
            Packet::ScriptError {
                line,
                column,
                description,
            } => Some(Self::ScriptFailed {
                message: format_script_error(macro_name, *line, *column, description),
            }),
            Packet::CriticalError {
                message,
                stack_trace,
                target_site,
            } => Some(Self::WorkerFailed {
                message: format_critical_error(message, stack_trace, target_site),
            }),
            Packet::Empty | Packet::Close | Packet::RunScript { .. } => None,
        }
    }
}

/// Replace script host descriptions that make no sense to a macro author.
pub fn friendly_description(description: &str) -> &str {
    match description.trim() {
        "Object required" => NO_ACTIVE_DOCUMENT_MESSAGE,
        "" => COMMAND_NOT_VALID_MESSAGE,
        _ => description,
    }
}

/// Message for a `ScriptError` raised by macro `macro_name`.
pub fn format_script_error(macro_name: &str, line: u32, column: u32, description: &str) -> String {
    let description = friendly_description(description);
    let period = if description.ends_with(['.', '!', '?']) {
        ""
    } else {
        "."
    };

    let position = if column > 0 {
        format!("Line {line}, column {column}")
    } else {
        format!("Line {line}")
    };

    format!("Error in macro '{macro_name}'\n\n{position}: {description}{period}")
}

/// Message for a `CriticalError`.
pub fn format_critical_error(message: &str, stack_trace: &str, target_site: &str) -> String {
    format!("{message}\nStack Trace: {stack_trace}\n\nTargetSite: {target_site}")
}
