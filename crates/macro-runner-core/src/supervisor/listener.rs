use crate::{
    protocol::{Incoming, Packet, PacketReader},
    supervisor::{Completion, WorkerProbe, shared::SharedState},
};

use std::sync::Arc;

use tokio::{io::AsyncRead, sync::mpsc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const UNKNOWN_MACRO: &str = "<unknown>";

/// Why a listener loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// Worker announced it is going idle.
    WorkerIdle,
    /// Worker acknowledged `Close`.
    Closed,
    /// Worker reported a critical error and was killed.
    WorkerFailed,
    /// Channel ended or the worker process exited.
    WorkerGone,
}

/// Reads packets from one worker and turns terminal packets into completion events.
pub(crate) struct Listener<R, P> {
    reader: PacketReader<R>,
    probe: Arc<P>,
    shared: SharedState,
    events: mpsc::Sender<Completion>,
    correlation_id: Uuid,
}

impl<R, P> Listener<R, P>
where
    R: AsyncRead + Unpin + Send,
    P: WorkerProbe,
{
    pub(crate) fn new(
        reader: PacketReader<R>,
        probe: Arc<P>,
        shared: SharedState,
        events: mpsc::Sender<Completion>,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            reader,
            probe,
            shared,
            events,
            correlation_id,
        }
    }

    /// Run until the worker goes idle, closes, fails or disappears.
    #[instrument(skip(self), fields(correlation_id = %self.correlation_id))]
    pub(crate) async fn run(mut self) -> ListenerExit {
        loop {
            if self.probe.has_exited().await {
                info!("Worker exited");
                self.raise(Completion::Silent).await;
                return ListenerExit::WorkerGone;
            }

            let incoming = tokio::select! {
                biased;
                incoming = self.reader.read_incoming() => Some(incoming),
                () = self.probe.exited() => None,
            };

            let packet = match incoming {
                Some(Incoming::Packet(packet)) => packet,
                Some(Incoming::Noise) => continue,
                None => {
                    info!("Worker exited during read");
                    self.raise(Completion::Silent).await;
                    return ListenerExit::WorkerGone;
                }
                Some(Incoming::Closed) => {
                    info!("Control channel closed");
                    self.raise(Completion::Silent).await;
                    return ListenerExit::WorkerGone;
                }
            };

            debug!(packet = packet.kind(), "Packet received");

            match packet {
                Packet::Empty => {
                    {
                        let mut shared = self.shared.lock().await;
                        shared.finish_run();
                        // An idle worker takes no more runs; the next one relaunches.
                        if shared.owns(self.correlation_id) {
                            shared.terminate();
                        }
                    }
                    self.raise(Completion::Silent).await;
                    return ListenerExit::WorkerIdle;
                }
                Packet::Close => return ListenerExit::Closed,
                Packet::Success | Packet::ScriptError { .. } | Packet::CriticalError { .. } => {
                    let name = self.shared.lock().await.finish_run();
                    if let Some(completion) =
                        Completion::from_packet(&packet, name.as_deref().unwrap_or(UNKNOWN_MACRO))
                    {
                        self.raise(completion).await;
                    }

                    if matches!(packet, Packet::CriticalError { .. }) {
                        self.probe.kill_all().await;
                        return ListenerExit::WorkerFailed;
                    }
                }
                Packet::RunScript { .. } => {
                    warn!("Ignoring run request sent by worker");
                }
            }
        }
    }

    async fn raise(&self, completion: Completion) {
        match &completion {
            Completion::ScriptFailed { message } | Completion::WorkerFailed { message } => {
                warn!(message = %message, "Macro failed");
            }
            Completion::Finished | Completion::Silent => {}
        }

        if self.events.send(completion).await.is_err() {
            debug!("Completion receiver dropped");
        }
    }
}
