use crate::protocol::Packet;

use std::future::Future;

use thiserror::Error;

/// The script failed at a known source position. The host stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}, column {column}: {description}")]
pub struct ScriptRuntimeError {
    /// 1-based line, 0 when unknown.
    pub line: u32,
    /// Column, 0 when unknown.
    pub column: u32,
    /// Error text from the script engine.
    pub description: String,
}

/// The script host itself broke. The worker must not be reused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostFault {
    /// Fault message.
    pub message: String,
    /// Stack trace, possibly empty.
    pub stack_trace: String,
    /// Component that raised the fault, possibly empty.
    pub target_site: String,
}

/// Why [`ScriptHost::execute`] did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    /// Recoverable error raised by the script.
    #[error("script error at {0}")]
    Runtime(#[from] ScriptRuntimeError),
    /// Unrecoverable host fault.
    #[error("host fault: {0}")]
    Fatal(#[from] HostFault),
}

impl ExecutionFailure {
    /// Wire packet reporting this failure.
    pub fn into_packet(self) -> Packet {
        match self {
            Self::Runtime(error) => Packet::ScriptError {
                line: error.line,
                column: error.column,
                description: error.description,
            },
            Self::Fatal(fault) => Packet::CriticalError {
                message: fault.message,
                stack_trace: fault.stack_trace,
                target_site: fault.target_site,
            },
        }
    }
}

/// Capability that executes script text inside the worker.
pub trait ScriptHost: Send {
    /// Run `script` to completion.
    fn execute(&mut self, script: &str) -> impl Future<Output = Result<(), ExecutionFailure>> + Send;
}
