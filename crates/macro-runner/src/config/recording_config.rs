use crate::config::{default_ignored_captions, default_reference_path};

use serde::{Deserialize, Serialize};

/// Recording and rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Declaration file referenced at the top of every macro.
    #[serde(default = "default_reference_path")]
    pub reference_path: String,
    /// Tool windows that are never recorded.
    #[serde(default = "default_ignored_captions")]
    pub ignored_captions: Vec<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            reference_path: default_reference_path(),
            ignored_captions: default_ignored_captions(),
        }
    }
}
