use crate::{
    CoreResult,
    channel::HostWriter,
    supervisor::{ProcessGroup, SupervisorState, validate_transition},
};

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};
use uuid::Uuid;

/// Progress of the worker's connection to the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Worker spawned, not yet connected.
    Pending,
    /// Worker connected; packets can be sent.
    Connected,
    /// Worker never connected.
    Failed(String),
}

/// The one live worker of a supervisor.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub(crate) correlation_id: Uuid,
    pub(crate) group: Arc<ProcessGroup>,
    pub(crate) writer: Option<HostWriter>,
    pub(crate) connection: watch::Receiver<ConnectionStatus>,
}

/// State owned by one supervisor and lent to its listener loop.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) state: SupervisorState,
    /// Display name of the macro whose `RunScript` is outstanding.
    pub(crate) current_macro: Option<String>,
    pub(crate) worker: Option<WorkerHandle>,
}

pub(crate) type SharedState = Arc<Mutex<Shared>>;

impl Shared {
    pub(crate) fn transition(&mut self, to: SupervisorState) -> CoreResult<()> {
        validate_transition(self.state, to)?;
        debug!(from = %self.state, to = %to, "Supervisor transition");
        self.state = to;
        Ok(())
    }

    /// True if the live worker is the one launched with `correlation_id`.
    pub(crate) fn owns(&self, correlation_id: Uuid) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.correlation_id == correlation_id)
    }

    /// End the outstanding run, if any, and return its macro name.
    pub(crate) fn finish_run(&mut self) -> Option<String> {
        if self.state == SupervisorState::Running {
            if let Err(e) = self.transition(SupervisorState::Ready) {
                warn!(error = %e, "Failed to leave running state");
            }
        }
        self.current_macro.take()
    }

    /// Release the worker and return to `Idle` through `Terminated`.
    ///
    /// The caller kills the returned worker's process group.
    pub(crate) fn terminate(&mut self) -> Option<WorkerHandle> {
        self.current_macro = None;
        let worker = self.worker.take();

        if self.state == SupervisorState::Idle && worker.is_none() {
            return None;
        }

        for next in [SupervisorState::Terminated, SupervisorState::Idle] {
            if let Err(e) = self.transition(next) {
                warn!(error = %e, "Forcing supervisor state");
                self.state = next;
            }
        }

        worker
    }
}
