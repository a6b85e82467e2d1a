use crate::config::{default_host_version, default_interpreter, default_interpreter_args};

use serde::{Deserialize, Serialize};

/// Script interpreter used by the worker.
///
/// The macro text is written to the interpreter's stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interpreter executable.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Interpreter arguments.
    #[serde(default = "default_interpreter_args")]
    pub args: Vec<String>,
    /// Version of the automation surface reported to macros.
    #[serde(default = "default_host_version")]
    pub host_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            args: default_interpreter_args(),
            host_version: default_host_version(),
        }
    }
}
