use crate::{
    CoreError, CoreResult,
    channel::ChannelListener,
    protocol::{LaunchArgs, Packet},
    supervisor::{
        Completion, ProcessGroup, SupervisorState, WorkerProbe,
        listener::Listener,
        shared::{ConnectionStatus, Shared, SharedState, WorkerHandle},
    },
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Default time a worker has to connect after it is spawned.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// How to start a worker process.
///
/// The launch string is appended after `args`.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Worker executable.
    pub program: PathBuf,
    /// Arguments placed before the launch string.
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one.
    pub envs: Vec<(String, String)>,
    /// Version reported to the worker in the launch string.
    pub host_version: String,
    /// How long the worker has to connect.
    pub connect_timeout: Duration,
}

impl WorkerSpec {
    /// Spec for `program` with no extra arguments and default timeouts.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            host_version: env!("CARGO_PKG_VERSION").to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Owns the worker process, its control channel and its listener loop.
///
/// Completion events for `run_script` are delivered on the channel passed
/// to [`WorkerSupervisor::new`], one per run.
#[derive(Debug)]
pub struct WorkerSupervisor {
    spec: WorkerSpec,
    shared: SharedState,
    events: mpsc::Sender<Completion>,
}

impl WorkerSupervisor {
    /// Create a supervisor with no worker.
    pub fn new(spec: WorkerSpec, events: mpsc::Sender<Completion>) -> Self {
        Self {
            spec,
            shared: Arc::new(Mutex::new(Shared::default())),
            events,
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SupervisorState {
        self.shared.lock().await.state
    }

    /// Correlation id of the live worker.
    pub async fn correlation_id(&self) -> Option<Uuid> {
        self.shared
            .lock()
            .await
            .worker
            .as_ref()
            .map(|worker| worker.correlation_id)
    }

    /// Process id of the live worker.
    pub async fn worker_pid(&self) -> Option<u32> {
        self.shared
            .lock()
            .await
            .worker
            .as_ref()
            .and_then(|worker| worker.group.pid())
    }

    /// True while a `RunScript` has no terminal packet yet.
    pub async fn is_running(&self) -> bool {
        self.shared.lock().await.current_macro.is_some()
    }

    /// Start a worker unless one is already live. Returns its correlation id.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint cannot be created or the process cannot be spawned.
    #[instrument(skip(self))]
    pub async fn launch(&self) -> CoreResult<Uuid> {
        let mut shared = self.shared.lock().await;
        self.launch_locked(&mut shared)
    }

    fn launch_locked(&self, shared: &mut Shared) -> CoreResult<Uuid> {
        if let Some(worker) = &shared.worker {
            if shared.state.is_live() {
                debug!(correlation_id = %worker.correlation_id, "Worker already live");
                return Ok(worker.correlation_id);
            }
        }

        let correlation_id = Uuid::new_v4();
        shared.transition(SupervisorState::Launching)?;

        let spawned = ChannelListener::bind(correlation_id).and_then(|endpoint| {
            let launch_args =
                LaunchArgs::for_current_process(correlation_id, self.spec.host_version.as_str());
            let mut args = self.spec.args.clone();
            args.push(launch_args.to_string());

            ProcessGroup::spawn(&self.spec.program, &args, &self.spec.envs)
                .map(|group| (endpoint, Arc::new(group)))
        });

        let (endpoint, group) = match spawned {
            Ok(spawned) => spawned,
            Err(e) => {
                shared.terminate();
                return Err(e);
            }
        };

        shared.transition(SupervisorState::AwaitingConnection)?;

        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Pending);
        shared.worker = Some(WorkerHandle {
            correlation_id,
            group: Arc::clone(&group),
            writer: None,
            connection: status_rx,
        });

        tokio::spawn(serve_worker(
            Arc::clone(&self.shared),
            self.events.clone(),
            endpoint,
            group,
            self.spec.connect_timeout,
            status_tx,
        ));

        info!(%correlation_id, "Worker launched");

        Ok(correlation_id)
    }

    /// Ask the worker to run the macro at `path` `iterations` times.
    ///
    /// Launches a worker if needed and returns without waiting for it to
    /// connect. The outcome arrives later as a [`Completion`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RunInProgress`] while another run is outstanding,
    /// or a launch or channel error.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn run_script(&self, path: impl AsRef<Path>, iterations: u32) -> CoreResult<()> {
        let path = path.as_ref();
        let packet = Packet::RunScript {
            path: path.to_string_lossy().into_owned(),
            iterations,
        };

        let mut shared = self.shared.lock().await;

        if shared.current_macro.is_some() {
            return Err(CoreError::RunInProgress {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if shared.state == SupervisorState::Ready {
            shared.transition(SupervisorState::Running)?;
            shared.current_macro = Some(macro_display_name(path));

            if let Err(e) = send_packet(&mut shared, &packet).await {
                shared.finish_run();
                return Err(e);
            }

            info!("Macro sent to worker");
            return Ok(());
        }

        let correlation_id = self.launch_locked(&mut shared)?;
        shared.current_macro = Some(macro_display_name(path));
        let connection = shared
            .worker
            .as_ref()
            .map(|worker| worker.connection.clone());
        drop(shared);

        if let Some(connection) = connection {
            tokio::spawn(send_when_connected(
                Arc::clone(&self.shared),
                self.events.clone(),
                correlation_id,
                connection,
                packet,
            ));
        }

        info!(%correlation_id, "Macro queued until worker connects");

        Ok(())
    }

    /// Kill the worker and all of its descendants.
    ///
    /// An outstanding run completes as [`Completion::Silent`].
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let (worker, queued_run) = {
            let mut shared = self.shared.lock().await;
            // Without a writer no listener is running to report the run.
            let queued_run = shared.current_macro.is_some()
                && shared
                    .worker
                    .as_ref()
                    .is_some_and(|worker| worker.writer.is_none());
            (shared.terminate(), queued_run)
        };

        if let Some(worker) = worker {
            worker.group.kill_all().await;
            info!(correlation_id = %worker.correlation_id, "Worker stopped");
        }

        if queued_run {
            debug!("Queued run stopped before the worker connected");
            if self.events.send(Completion::Silent).await.is_err() {
                debug!("Completion receiver dropped");
            }
        }
    }

    /// Ask the worker to exit, then [`stop`](Self::stop) it if it has not.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let group = {
            let mut shared = self.shared.lock().await;
            match send_packet(&mut shared, &Packet::Close).await {
                Ok(()) => shared.worker.as_ref().map(|worker| Arc::clone(&worker.group)),
                Err(e) => {
                    debug!(error = %e, "Close not sent");
                    None
                }
            }
        };

        if let Some(group) = group {
            if tokio::time::timeout(SHUTDOWN_GRACE, group.exited())
                .await
                .is_ok()
            {
                debug!("Worker exited after close");
            } else {
                warn!("Worker ignored close");
            }
        }

        self.stop().await;
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.try_lock() {
            if let Some(worker) = shared.terminate() {
                worker.group.kill_now();
            }
            return;
        }

        // Another task holds the lock; tear down once it lets go.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                runtime.spawn(async move {
                    let worker = shared.lock().await.terminate();
                    if let Some(worker) = worker {
                        worker.group.kill_all().await;
                        debug!(correlation_id = %worker.correlation_id, "Worker stopped after drop");
                    }
                });
            }
            Err(_) => warn!("Supervisor dropped outside a runtime while busy; worker left running"),
        }
    }
}

#[cfg(test)]
impl WorkerSupervisor {
    pub(crate) fn shared_state(&self) -> SharedState {
        Arc::clone(&self.shared)
    }
}

/// Name shown to the user for the macro at `path`.
fn macro_display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[track_caller]
fn not_connected() -> CoreError {
    CoreError::ChannelError {
        reason: "worker is not connected".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

async fn send_packet(shared: &mut Shared, packet: &Packet) -> CoreResult<()> {
    match shared
        .worker
        .as_mut()
        .and_then(|worker| worker.writer.as_mut())
    {
        Some(writer) => writer.send(packet).await,
        None => Err(not_connected()),
    }
}

/// Accept the worker's connection, then run its listener loop to the end.
async fn serve_worker(
    shared: SharedState,
    events: mpsc::Sender<Completion>,
    endpoint: ChannelListener,
    group: Arc<ProcessGroup>,
    connect_timeout: Duration,
    status: watch::Sender<ConnectionStatus>,
) {
    let correlation_id = endpoint.correlation_id();

    let accepted = tokio::select! {
        result = endpoint.accept() => result.map_err(|e| e.to_string()),
        () = tokio::time::sleep(connect_timeout) => Err(format!(
            "worker did not connect within {} ms",
            connect_timeout.as_millis()
        )),
        () = group.exited() => Err("worker exited before connecting".to_string()),
    };

    let reader = match accepted {
        Ok((reader, writer)) => {
            let mut guard = shared.lock().await;
            if !guard.owns(correlation_id) {
                debug!(%correlation_id, "Worker connected after it was released");
                return;
            }
            if let Err(e) = guard.transition(SupervisorState::Ready) {
                warn!(error = %e, "Unexpected state on connect");
            }
            if let Some(worker) = guard.worker.as_mut() {
                worker.writer = Some(writer);
            }
            reader
        }
        Err(reason) => {
            warn!(%correlation_id, reason = %reason, "Worker connection failed");
            let _ = status.send(ConnectionStatus::Failed(reason.clone()));

            let pending_run = {
                let mut guard = shared.lock().await;
                if guard.owns(correlation_id) {
                    let pending_run = guard.current_macro.is_some();
                    guard.terminate();
                    pending_run
                } else {
                    false
                }
            };

            group.kill_all().await;

            if pending_run {
                let completion = Completion::WorkerFailed {
                    message: format!("Failed to start the macro worker: {reason}"),
                };
                if events.send(completion).await.is_err() {
                    debug!("Completion receiver dropped");
                }
            }
            return;
        }
    };

    let _ = status.send(ConnectionStatus::Connected);
    info!(%correlation_id, "Worker connected");

    let exit = Listener::new(
        reader,
        Arc::clone(&group),
        Arc::clone(&shared),
        events,
        correlation_id,
    )
    .run()
    .await;

    debug!(%correlation_id, ?exit, "Listener stopped");

    {
        let mut guard = shared.lock().await;
        if guard.owns(correlation_id) {
            guard.terminate();
        }
    }

    // Already released when stopped or idle; the group still has to go.
    group.kill_all().await;
}

/// Send `packet` once the worker behind `connection` connects.
async fn send_when_connected(
    shared: SharedState,
    events: mpsc::Sender<Completion>,
    correlation_id: Uuid,
    mut connection: watch::Receiver<ConnectionStatus>,
    packet: Packet,
) {
    let connected = connection
        .wait_for(|status| *status != ConnectionStatus::Pending)
        .await
        .map(|status| *status == ConnectionStatus::Connected)
        .unwrap_or(false);

    // Connection failures are reported by the connection task.
    if !connected {
        return;
    }

    let failure = {
        let mut guard = shared.lock().await;
        if !guard.owns(correlation_id) || guard.current_macro.is_none() {
            debug!(%correlation_id, "Run abandoned before worker connected");
            return;
        }

        let sent = match guard.transition(SupervisorState::Running) {
            Ok(()) => send_packet(&mut guard, &packet).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => None,
            Err(e) => {
                guard.finish_run();
                Some(e)
            }
        }
    };

    match failure {
        None => info!(%correlation_id, "Macro sent to worker"),
        Some(e) => {
            let completion = Completion::WorkerFailed {
                message: e.to_string(),
            };
            if events.send(completion).await.is_err() {
                debug!("Completion receiver dropped");
            }
        }
    }
}
