//! Length-prefixed framing for [`Packet`]s.
//!
//! Every frame is a big-endian `u32` body length followed by the packet as
//! JSON. Frames are independent: a body that fails to parse is reported as
//! noise and the next frame is still readable.

use crate::{CoreError, CoreResult, protocol::Packet};

use std::{future::Future, panic::Location};

use error_location::ErrorLocation;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Outcome of one read from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A well-formed packet.
    Packet(Packet),
    /// A complete frame whose body did not decode.
    Noise,
    /// The peer closed the stream or the stream can no longer be framed.
    Closed,
}

/// Encode `packet` as a complete frame, length prefix included.
#[track_caller]
pub fn encode(packet: &Packet) -> CoreResult<Vec<u8>> {
    let body = serde_json::to_vec(packet).map_err(|e| CoreError::ProtocolError {
        reason: format!("Failed to encode {} packet: {}", packet.kind(), e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_LEN)
        .ok_or_else(|| CoreError::ProtocolError {
            reason: format!("Frame of {} bytes exceeds {MAX_FRAME_LEN}", body.len()),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode one complete frame produced by [`encode`].
#[track_caller]
pub fn decode(frame: &[u8]) -> CoreResult<Packet> {
    let (prefix, body) = frame.split_at_checked(LEN_PREFIX).ok_or_else(|| {
        CoreError::ProtocolError {
            reason: format!("Frame of {} bytes has no length prefix", frame.len()),
            location: ErrorLocation::from(Location::caller()),
        }
    })?;

    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(prefix);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len != body.len() {
        return Err(CoreError::ProtocolError {
            reason: format!("Length prefix {len} does not match body of {}", body.len()),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    serde_json::from_slice(body).map_err(|e| CoreError::ProtocolError {
        reason: format!("Failed to decode packet: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Reads frames from one half of the control channel.
#[derive(Debug)]
pub struct PacketReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    /// Wrap a byte stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Wait for the next frame.
    ///
    /// This is the only suspension point of a channel reader. It resolves
    /// when a frame arrives, the peer closes, or the stream fails.
    pub async fn read_incoming(&mut self) -> Incoming {
        let len = match self.inner.read_u32().await {
            Ok(len) => len as usize,
            Err(e) => {
                trace!(error = %e, "Channel read ended");
                return Incoming::Closed;
            }
        };

        // An oversized prefix means the stream is out of step with the framing.
        if len > MAX_FRAME_LEN {
            return Incoming::Closed;
        }

        let mut body = vec![0u8; len];
        if let Err(e) = self.inner.read_exact(&mut body).await {
            trace!(error = %e, "Channel closed mid-frame");
            return Incoming::Closed;
        }

        match serde_json::from_slice(&body) {
            Ok(packet) => Incoming::Packet(packet),
            Err(e) => {
                trace!(error = %e, len, "Discarding malformed frame");
                Incoming::Noise
            }
        }
    }
}

/// Writes frames to one half of the control channel.
#[derive(Debug)]
pub struct PacketWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    /// Wrap a byte stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one packet and flush it.
    ///
    /// Errors carry the location of the call, not of the write.
    #[track_caller]
    pub fn send<'a>(
        &'a mut self,
        packet: &'a Packet,
    ) -> impl Future<Output = CoreResult<()>> + 'a {
        let location = ErrorLocation::from(Location::caller());
        let frame = encode(packet);

        async move {
            let frame = frame?;

            self.inner
                .write_all(&frame)
                .await
                .map_err(|e| CoreError::ChannelError {
                    reason: format!("Failed to send {} packet: {}", packet.kind(), e),
                    location,
                })?;

            self.inner
                .flush()
                .await
                .map_err(|e| CoreError::ChannelError {
                    reason: format!("Failed to flush {} packet: {}", packet.kind(), e),
                    location,
                })?;

            trace!(packet = packet.kind(), "Packet sent");

            Ok(())
        }
    }

    /// Write raw bytes without framing. Used to exercise noise handling.
    #[cfg(test)]
    pub(crate) async fn send_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(bytes).await?;
        self.inner.flush().await
    }

    /// Close the write half.
    pub async fn close(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}
