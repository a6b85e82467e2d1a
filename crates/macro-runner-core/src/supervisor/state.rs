use crate::{CoreError, CoreResult};

use std::{fmt, panic::Location};

use error_location::ErrorLocation;

/// Lifecycle of the worker owned by a [`WorkerSupervisor`](crate::WorkerSupervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    /// No worker process.
    #[default]
    Idle,
    /// Endpoint created, worker process being spawned.
    Launching,
    /// Worker spawned, waiting for it to connect.
    AwaitingConnection,
    /// Worker connected and idle.
    Ready,
    /// A `RunScript` is outstanding.
    Running,
    /// Worker torn down. Always followed by `Idle`.
    Terminated,
}

impl SupervisorState {
    /// True while a worker process exists.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Launching | Self::AwaitingConnection | Self::Ready | Self::Running
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Launching => "launching",
            Self::AwaitingConnection => "awaiting_connection",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Check one edge of the supervisor state machine.
#[track_caller]
pub fn validate_transition(from: SupervisorState, to: SupervisorState) -> CoreResult<()> {
    use SupervisorState as S;

    let allowed = match from {
        S::Idle => matches!(to, S::Launching | S::Terminated),
        S::Launching => matches!(to, S::AwaitingConnection | S::Terminated),
        S::AwaitingConnection => matches!(to, S::Ready | S::Terminated),
        S::Ready => matches!(to, S::Running | S::Terminated),
        S::Running => matches!(to, S::Ready | S::Terminated),
        S::Terminated => matches!(to, S::Idle),
    };

    if !allowed {
        return Err(CoreError::IllegalTransition {
            reason: format!("{from} -> {to}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(())
}
