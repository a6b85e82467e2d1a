use crate::{
    Completion, ListenerExit, NO_ACTIVE_DOCUMENT_MESSAGE, Packet, PacketWriter, SupervisorState,
    WorkerProbe, split_stream,
    supervisor::{Listener, Shared},
};

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf},
    sync::{Mutex, mpsc},
};
use uuid::Uuid;

#[derive(Default)]
struct FakeProbe {
    exited: AtomicBool,
    kills: AtomicUsize,
}

impl FakeProbe {
    fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}

impl WorkerProbe for FakeProbe {
    async fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    async fn exited(&self) {
        while !self.exited.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn kill_all(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.exit();
    }
}

struct Fixture {
    listener: Listener<ReadHalf<DuplexStream>, FakeProbe>,
    probe: Arc<FakeProbe>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::Receiver<Completion>,
    worker: PacketWriter<WriteHalf<DuplexStream>>,
    _keep_alive: (
        crate::PacketWriter<WriteHalf<DuplexStream>>,
        crate::PacketReader<ReadHalf<DuplexStream>>,
    ),
}

/// Listener mid-run of macro "FormatDocument", with the test playing the worker.
fn running_fixture() -> Fixture {
    let (host, worker) = tokio::io::duplex(4096);
    let (host_reader, host_writer) = split_stream(host);
    let (worker_reader, worker_writer) = split_stream(worker);

    let probe = Arc::new(FakeProbe::default());
    let shared = Arc::new(Mutex::new(Shared {
        state: SupervisorState::Running,
        current_macro: Some("FormatDocument".to_string()),
        worker: None,
    }));
    let (events_tx, events_rx) = mpsc::channel(8);

    let listener = Listener::new(
        host_reader,
        Arc::clone(&probe),
        Arc::clone(&shared),
        events_tx,
        Uuid::new_v4(),
    );

    Fixture {
        listener,
        probe,
        shared,
        events: events_rx,
        worker: worker_writer,
        _keep_alive: (host_writer, worker_reader),
    }
}

/// WHAT: "Object required" at line 12 becomes a friendly error naming the line
/// WHY: Users see this message directly when a macro needs an open document
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_script_error_when_listening_then_completion_carries_line_and_friendly_text() {
    // Given: Worker reports a script error, then acknowledges close
    let mut fixture = running_fixture();
    fixture
        .worker
        .send(&Packet::ScriptError {
            line: 12,
            column: 4,
            description: "Object required".to_string(),
        })
        .await
        .unwrap();
    fixture.worker.send(&Packet::Close).await.unwrap();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: One ScriptFailed event with the mapped text, worker back to Ready
    assert_eq!(exit, ListenerExit::Closed);
    let event = fixture.events.recv().await;
    assert!(matches!(event, Some(Completion::ScriptFailed { .. })));
    let message = event.as_ref().and_then(Completion::error_message).unwrap();
    assert!(message.contains("Line 12"));
    assert!(message.contains(NO_ACTIVE_DOCUMENT_MESSAGE));
    assert!(message.contains("'FormatDocument'"));
    assert_eq!(fixture.events.recv().await, None);

    let shared = fixture.shared.lock().await;
    assert_eq!(shared.state, SupervisorState::Ready);
    assert_eq!(shared.current_macro, None);
}

/// WHAT: A worker that is already dead yields exactly one silent completion
/// WHY: A killed worker never sends Empty, so the pre-read check must catch it
#[tokio::test]
async fn given_worker_exited_before_read_when_listening_then_one_silent_completion() {
    // Given: The worker process is gone
    let mut fixture = running_fixture();
    fixture.probe.exit();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: One Silent event, then the channel closes
    assert_eq!(exit, ListenerExit::WorkerGone);
    assert_eq!(fixture.events.recv().await, Some(Completion::Silent));
    assert_eq!(fixture.events.recv().await, None);
}

/// WHAT: A worker that dies while the listener waits ends the read
/// WHY: A dead worker's channel may never report EOF on its own
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_worker_killed_during_read_when_listening_then_silent_completion() {
    // Given: A listener blocked on a read
    let mut fixture = running_fixture();
    let probe = Arc::clone(&fixture.probe);
    let handle = tokio::spawn(fixture.listener.run());

    // When: The worker dies
    tokio::time::sleep(Duration::from_millis(50)).await;
    probe.exit();

    // Then: Loop stops with one Silent event
    assert_eq!(handle.await.unwrap(), ListenerExit::WorkerGone);
    assert_eq!(fixture.events.recv().await, Some(Completion::Silent));
    assert_eq!(fixture.events.recv().await, None);
}

/// WHAT: Empty ends the loop with a silent completion and clears the run
/// WHY: An idle worker exits; the host must stop showing a running macro
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_packet_when_listening_then_silent_and_not_running() {
    // Given: Worker announces it is idle
    let mut fixture = running_fixture();
    fixture.worker.send(&Packet::Empty).await.unwrap();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: Silent event and no outstanding run
    assert_eq!(exit, ListenerExit::WorkerIdle);
    assert_eq!(fixture.events.recv().await, Some(Completion::Silent));
    assert_eq!(fixture.shared.lock().await.current_macro, None);
}

/// WHAT: Malformed frames are skipped and later packets still arrive
/// WHY: Noise is transient and must not end the session
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_noise_before_success_when_listening_then_finished() {
    // Given: Garbage, then Success, then Close
    let mut fixture = running_fixture();
    fixture.worker.send_raw(&[0, 0, 0, 3, b'{', b'{', b'{']).await.unwrap();
    fixture.worker.send(&Packet::Success).await.unwrap();
    fixture.worker.send(&Packet::Close).await.unwrap();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: Exactly one Finished event
    assert_eq!(exit, ListenerExit::Closed);
    assert_eq!(fixture.events.recv().await, Some(Completion::Finished));
    assert_eq!(fixture.events.recv().await, None);
}

/// WHAT: A critical error raises WorkerFailed and kills the process group
/// WHY: A faulted worker must never be reused
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_critical_error_when_listening_then_worker_failed_and_group_killed() {
    // Given: Worker reports a fault
    let mut fixture = running_fixture();
    fixture
        .worker
        .send(&Packet::CriticalError {
            message: "engine crashed".to_string(),
            stack_trace: "at execute".to_string(),
            target_site: "ScriptHost".to_string(),
        })
        .await
        .unwrap();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: WorkerFailed with details, one kill
    assert_eq!(exit, ListenerExit::WorkerFailed);
    let event = fixture.events.recv().await;
    assert!(matches!(event, Some(Completion::WorkerFailed { .. })));
    let message = event.as_ref().and_then(Completion::error_message).unwrap();
    assert!(message.starts_with("engine crashed\nStack Trace: at execute"));
    assert_eq!(fixture.probe.kills.load(Ordering::SeqCst), 1);
}

/// WHAT: Close ends the loop without any event
/// WHY: Orderly shutdown is not a macro outcome
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_close_when_listening_then_no_event() {
    // Given: Worker acknowledges close
    let mut fixture = running_fixture();
    fixture.worker.send(&Packet::Close).await.unwrap();

    // When: Running the listener
    let exit = fixture.listener.run().await;

    // Then: No events
    assert_eq!(exit, ListenerExit::Closed);
    assert_eq!(fixture.events.recv().await, None);
}
