//! Private, ordered byte stream between the host and one worker.
//!
//! The endpoint is named after the worker's correlation id: a Unix domain
//! socket in the temp directory, or a named pipe on Windows. Each side splits
//! its stream into a [`PacketReader`] and a [`PacketWriter`].

use crate::{
    CoreError, CoreResult,
    protocol::{PacketReader, PacketWriter},
};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tracing::{debug, instrument};
use uuid::Uuid;

#[cfg(unix)]
mod platform {
    pub type HostStream = tokio::net::UnixStream;
    pub type WorkerStream = tokio::net::UnixStream;
}

#[cfg(windows)]
mod platform {
    pub type HostStream = tokio::net::windows::named_pipe::NamedPipeServer;
    pub type WorkerStream = tokio::net::windows::named_pipe::NamedPipeClient;
}

pub use platform::{HostStream, WorkerStream};

/// Host-side reader of the control channel.
pub type HostReader = PacketReader<ReadHalf<HostStream>>;
/// Host-side writer of the control channel.
pub type HostWriter = PacketWriter<WriteHalf<HostStream>>;
/// Worker-side reader of the control channel.
pub type WorkerReader = PacketReader<ReadHalf<WorkerStream>>;
/// Worker-side writer of the control channel.
pub type WorkerWriter = PacketWriter<WriteHalf<WorkerStream>>;

/// OS name of the endpoint for `correlation_id`.
#[cfg(unix)]
pub fn endpoint_name(correlation_id: &Uuid) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("macro-runner-{correlation_id}.sock"))
}

/// OS name of the endpoint for `correlation_id`.
#[cfg(windows)]
pub fn endpoint_name(correlation_id: &Uuid) -> String {
    format!(r"\\.\pipe\macro-runner-{correlation_id}")
}

/// Split a connected stream into framed halves.
pub fn split_stream<S>(stream: S) -> (PacketReader<ReadHalf<S>>, PacketWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read, write) = tokio::io::split(stream);
    (PacketReader::new(read), PacketWriter::new(write))
}

/// Host end of a channel that has been created but not yet connected.
#[derive(Debug)]
pub struct ChannelListener {
    correlation_id: Uuid,
    #[cfg(unix)]
    listener: tokio::net::UnixListener,
    #[cfg(unix)]
    path: std::path::PathBuf,
    #[cfg(windows)]
    server: tokio::net::windows::named_pipe::NamedPipeServer,
}

impl ChannelListener {
    /// Create the endpoint for `correlation_id`. Must run inside a tokio runtime.
    #[track_caller]
    #[instrument]
    pub fn bind(correlation_id: Uuid) -> CoreResult<Self> {
        let location = Location::caller();
        let channel_error = move |e: std::io::Error| CoreError::ChannelError {
            reason: format!("Failed to create endpoint for {correlation_id}: {e}"),
            location: ErrorLocation::from(location),
        };

        #[cfg(unix)]
        {
            let path = endpoint_name(&correlation_id);
            // A stale socket file from a crashed host blocks bind.
            let _ = std::fs::remove_file(&path);
            let listener = tokio::net::UnixListener::bind(&path).map_err(channel_error)?;
            debug!(path = ?path, "Control channel endpoint created");
            Ok(Self {
                correlation_id,
                listener,
                path,
            })
        }

        #[cfg(windows)]
        {
            let name = endpoint_name(&correlation_id);
            let server = tokio::net::windows::named_pipe::ServerOptions::new()
                .first_pipe_instance(true)
                .create(&name)
                .map_err(channel_error)?;
            debug!(name = %name, "Control channel endpoint created");
            Ok(Self {
                correlation_id,
                server,
            })
        }
    }

    /// Correlation id the endpoint was created for.
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Wait for the worker to connect.
    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    pub async fn accept(self) -> CoreResult<(HostReader, HostWriter)> {
        #[cfg(unix)]
        let stream = {
            let (stream, _) =
                self.listener
                    .accept()
                    .await
                    .map_err(|e| CoreError::ChannelError {
                        reason: format!("Failed to accept worker connection: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
            stream
        };

        #[cfg(windows)]
        let stream = {
            let mut this = self;
            this.server
                .connect()
                .await
                .map_err(|e| CoreError::ChannelError {
                    reason: format!("Failed to accept worker connection: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            this.server
        };

        debug!("Worker connected");

        Ok(split_stream(stream))
    }
}

#[cfg(unix)]
impl Drop for ChannelListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Connect the worker end of the channel for `correlation_id`.
#[instrument]
pub async fn connect_to_host(correlation_id: Uuid) -> CoreResult<(WorkerReader, WorkerWriter)> {
    let name = endpoint_name(&correlation_id);

    #[cfg(unix)]
    let stream = tokio::net::UnixStream::connect(&name).await;

    #[cfg(windows)]
    let stream = tokio::net::windows::named_pipe::ClientOptions::new().open(&name);

    let stream = stream.map_err(|e| CoreError::ChannelError {
        reason: format!("Failed to connect to {name:?}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    debug!("Connected to host");

    Ok(split_stream(stream))
}
