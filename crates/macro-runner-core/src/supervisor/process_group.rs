use crate::{CoreError, CoreResult};

use std::{future::Future, panic::Location, path::Path, process::Stdio, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    process::{Child, Command},
    sync::Mutex,
};
use tracing::{debug, instrument, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness and teardown of a worker, as seen by the listener loop.
pub trait WorkerProbe: Send + Sync {
    /// True once the worker process is gone.
    fn has_exited(&self) -> impl Future<Output = bool> + Send;

    /// Resolve when the worker process is gone.
    fn exited(&self) -> impl Future<Output = ()> + Send;

    /// Kill the worker and every process it started. Best effort.
    fn kill_all(&self) -> impl Future<Output = ()> + Send;
}

/// The worker process and all of its descendants, torn down as one.
///
/// On Unix the worker leads a fresh process group, so its children inherit
/// membership and `kill_all` reaches them with a single `killpg`. Elsewhere
/// only the leader is killed. Dropping the group kills the leader.
#[derive(Debug)]
pub struct ProcessGroup {
    leader_pid: Option<u32>,
    leader: Mutex<Child>,
}

impl ProcessGroup {
    /// Start `program` as the leader of a new group.
    #[track_caller]
    #[instrument(skip(args, envs), fields(program = %program.display()))]
    pub fn spawn(
        program: &Path,
        args: &[String],
        envs: &[(String, String)],
    ) -> CoreResult<Self> {
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| CoreError::LaunchFailed {
            reason: format!("{}: {}", program.display(), e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let leader_pid = child.id();
        debug!(pid = ?leader_pid, "Worker process group started");

        Ok(Self {
            leader_pid,
            leader: Mutex::new(child),
        })
    }

    /// Process id of the group leader.
    pub fn pid(&self) -> Option<u32> {
        self.leader_pid
    }

    /// Kill without waiting. Used where no runtime is available to await `kill_all`.
    pub fn kill_now(&self) {
        #[cfg(unix)]
        self.signal_group();

        if let Ok(mut leader) = self.leader.try_lock() {
            let _ = leader.start_kill();
        }
    }

    #[cfg(unix)]
    fn signal_group(&self) {
        let Some(pid) = self.leader_pid else {
            return;
        };
        let Ok(pgid) = libc::pid_t::try_from(pid) else {
            return;
        };

        // SAFETY: killpg takes plain integers and has no memory effects.
        let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if result == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pgid, error = %err, "Failed to signal worker process group");
            }
        }
    }
}

impl WorkerProbe for ProcessGroup {
    async fn has_exited(&self) -> bool {
        let mut leader = self.leader.lock().await;
        !matches!(leader.try_wait(), Ok(None))
    }

    async fn exited(&self) {
        let mut interval = tokio::time::interval(EXIT_POLL_INTERVAL);
        loop {
            interval.tick().await;
            if self.has_exited().await {
                return;
            }
        }
    }

    #[instrument(skip(self), fields(pid = ?self.leader_pid))]
    async fn kill_all(&self) {
        #[cfg(unix)]
        self.signal_group();

        let mut leader = self.leader.lock().await;
        if let Err(e) = leader.start_kill() {
            debug!(error = %e, "Leader already gone");
        }

        if tokio::time::timeout(REAP_TIMEOUT, leader.wait())
            .await
            .is_err()
        {
            warn!("Worker did not exit after kill");
        }

        debug!("Worker process group killed");
    }
}
