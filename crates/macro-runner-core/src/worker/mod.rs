mod adapter;
mod script_host;

pub use {
    adapter::{AdapterExit, DEFAULT_IDLE_TIMEOUT, ScriptHostAdapter},
    script_host::{ExecutionFailure, HostFault, ScriptHost, ScriptRuntimeError},
};
