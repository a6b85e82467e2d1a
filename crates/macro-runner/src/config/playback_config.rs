use crate::config::default_iterations;

use serde::{Deserialize, Serialize};

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Iterations used when `play` is given no count.
    #[serde(default = "default_iterations")]
    pub default_iterations: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_iterations: default_iterations(),
        }
    }
}
