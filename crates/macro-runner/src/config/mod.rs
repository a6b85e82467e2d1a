mod engine_config;
#[allow(clippy::module_inception)]
mod config;
mod playback_config;
mod recording_config;
mod worker_config;

pub(crate) use {
    config::{CONFIG_ENV, Config},
    engine_config::EngineConfig,
    playback_config::PlaybackConfig,
    recording_config::RecordingConfig,
    worker_config::WorkerConfig,
};

use macro_runner_core::DEFAULT_REFERENCE_PATH;

pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub(crate) const DEFAULT_INTERPRETER: &str = "node";
pub(crate) const DEFAULT_ITERATIONS: u32 = 1;
pub(crate) const MACRO_BROWSER_CAPTION: &str = "Macro Explorer";

pub(crate) fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

pub(crate) fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

pub(crate) fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

pub(crate) fn default_interpreter_args() -> Vec<String> {
    vec!["-".to_string()]
}

pub(crate) fn default_host_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_reference_path() -> String {
    DEFAULT_REFERENCE_PATH.to_string()
}

pub(crate) fn default_ignored_captions() -> Vec<String> {
    vec![MACRO_BROWSER_CAPTION.to_string()]
}

pub(crate) fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
