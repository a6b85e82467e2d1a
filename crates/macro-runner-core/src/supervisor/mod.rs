mod completion;
mod listener;
mod process_group;
mod shared;
mod state;
mod worker_supervisor;

#[cfg(test)]
pub(crate) use {listener::Listener, shared::Shared};

pub use {
    completion::{
        COMMAND_NOT_VALID_MESSAGE, Completion, NO_ACTIVE_DOCUMENT_MESSAGE, format_critical_error,
        format_script_error, friendly_description,
    },
    listener::ListenerExit,
    process_group::{ProcessGroup, WorkerProbe},
    shared::ConnectionStatus,
    state::{SupervisorState, validate_transition},
    worker_supervisor::{DEFAULT_CONNECT_TIMEOUT, WorkerSpec, WorkerSupervisor},
};
