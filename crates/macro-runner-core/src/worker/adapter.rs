use crate::{
    CoreResult,
    protocol::{Incoming, Packet, PacketReader, PacketWriter},
    worker::ScriptHost,
};

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, instrument, warn};

/// Default time the worker waits for a `RunScript` before going idle.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Why the adapter loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterExit {
    /// No request within the idle timeout; `Empty` was sent.
    Idle,
    /// Host asked to close; the close was acknowledged.
    Closed,
    /// Host went away.
    Disconnected,
    /// The script host faulted; `CriticalError` was sent.
    Fatal,
}

/// Worker side of the control channel: runs requested macros on a [`ScriptHost`].
pub struct ScriptHostAdapter<H, R, W> {
    host: H,
    reader: PacketReader<R>,
    writer: PacketWriter<W>,
    idle_timeout: Duration,
}

impl<H, R, W> ScriptHostAdapter<H, R, W>
where
    H: ScriptHost,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Adapter with the default idle timeout.
    pub fn new(host: H, reader: PacketReader<R>, writer: PacketWriter<W>) -> Self {
        Self {
            host,
            reader,
            writer,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Replace the idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Serve requests until idle, closed, disconnected or a fatal fault.
    ///
    /// # Errors
    ///
    /// Returns error if a reply cannot be written to the channel.
    #[instrument(skip(self), fields(idle_timeout_ms = self.idle_timeout.as_millis()))]
    pub async fn run(mut self) -> CoreResult<AdapterExit> {
        loop {
            let incoming =
                match tokio::time::timeout(self.idle_timeout, self.reader.read_incoming()).await {
                    Ok(incoming) => incoming,
                    Err(_) => {
                        info!("Idle timeout reached");
                        self.writer.send(&Packet::Empty).await?;
                        self.writer.close().await;
                        return Ok(AdapterExit::Idle);
                    }
                };

            let packet = match incoming {
                Incoming::Packet(packet) => packet,
                Incoming::Noise => continue,
                Incoming::Closed => {
                    info!("Host disconnected");
                    return Ok(AdapterExit::Disconnected);
                }
            };

            match packet {
                Packet::RunScript { path, iterations } => {
                    let reply = self.run_script(&path, iterations).await;
                    let fatal = matches!(reply, Packet::CriticalError { .. });
                    self.writer.send(&reply).await?;

                    if fatal {
                        self.writer.close().await;
                        return Ok(AdapterExit::Fatal);
                    }
                }
                Packet::Close => {
                    self.writer.send(&Packet::Close).await?;
                    self.writer.close().await;
                    return Ok(AdapterExit::Closed);
                }
                other => warn!(packet = other.kind(), "Ignoring unexpected packet"),
            }
        }
    }

    /// Run the macro at `path` up to `iterations` times and build the single reply.
    #[instrument(skip(self))]
    async fn run_script(&mut self, path: &str, iterations: u32) -> Packet {
        for iteration in 1..=iterations {
            let script = match tokio::fs::read_to_string(path).await {
                Ok(script) => script,
                Err(e) => {
                    warn!(error = %e, "Failed to read macro");
                    return Packet::ScriptError {
                        line: 0,
                        column: 0,
                        description: format!("Cannot read macro file {path}: {e}"),
                    };
                }
            };

            if let Err(failure) = self.host.execute(&script).await {
                warn!(iteration, error = %failure, "Macro failed");
                return failure.into_packet();
            }

            debug!(iteration, "Iteration complete");
        }

        info!(iterations, "Macro complete");
        Packet::Success
    }
}
