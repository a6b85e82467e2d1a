use crate::CoreError;

use std::{fmt, panic::Location, str::FromStr};

use error_location::ErrorLocation;
use uuid::Uuid;

/// Separator between the fields of the worker launch argument.
pub const LAUNCH_ARG_DELIMITER: char = '|';

/// Channel identity handed to the worker on its command line.
///
/// Rendered as `{correlation_id}|{host_pid}|{host_version}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    /// Names the control channel endpoint.
    pub correlation_id: Uuid,
    /// Process id of the host that launched the worker.
    pub host_pid: u32,
    /// Version string of the host automation surface.
    pub host_version: String,
}

impl LaunchArgs {
    /// Launch arguments for a worker of the current process.
    pub fn for_current_process(correlation_id: Uuid, host_version: impl Into<String>) -> Self {
        Self {
            correlation_id,
            host_pid: std::process::id(),
            host_version: host_version.into(),
        }
    }
}

impl fmt::Display for LaunchArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{LAUNCH_ARG_DELIMITER}{}{LAUNCH_ARG_DELIMITER}{}",
            self.correlation_id, self.host_pid, self.host_version
        )
    }
}

impl FromStr for LaunchArgs {
    type Err = CoreError;

    #[track_caller]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CoreError::InvalidLaunchArgs {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let mut parts = s.splitn(3, LAUNCH_ARG_DELIMITER);
        let (Some(id), Some(pid), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid(format!("expected 3 fields in {s:?}")));
        };

        let correlation_id = Uuid::parse_str(id)
            .map_err(|e| invalid(format!("bad correlation id {id:?}: {e}")))?;
        let host_pid = pid
            .parse::<u32>()
            .map_err(|e| invalid(format!("bad host pid {pid:?}: {e}")))?;

        Ok(Self {
            correlation_id,
            host_pid,
            host_version: version.to_string(),
        })
    }
}
