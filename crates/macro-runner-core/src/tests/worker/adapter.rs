use crate::{
    AdapterExit, ExecutionFailure, HostFault, Incoming, Packet, PacketReader, PacketWriter,
    ScriptHost, ScriptHostAdapter, ScriptRuntimeError, split_stream,
};

use std::{
    collections::VecDeque,
    fs,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf},
    task::JoinHandle,
};

/// Script host that records every script and replays scripted outcomes.
#[derive(Default)]
struct FakeHost {
    outcomes: VecDeque<Result<(), ExecutionFailure>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptHost for FakeHost {
    async fn execute(&mut self, script: &str) -> Result<(), ExecutionFailure> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(script.to_string());
        }
        self.outcomes.pop_front().unwrap_or(Ok(()))
    }
}

struct Host {
    reader: PacketReader<ReadHalf<DuplexStream>>,
    writer: PacketWriter<WriteHalf<DuplexStream>>,
    adapter: JoinHandle<crate::CoreResult<AdapterExit>>,
}

fn start(host: FakeHost, idle_timeout: Duration) -> Host {
    let (host_side, worker_side) = tokio::io::duplex(4096);
    let (reader, writer) = split_stream(host_side);
    let (worker_reader, worker_writer) = split_stream(worker_side);

    let adapter = ScriptHostAdapter::new(host, worker_reader, worker_writer)
        .with_idle_timeout(idle_timeout);

    Host {
        reader,
        writer,
        adapter: tokio::spawn(adapter.run()),
    }
}

#[allow(clippy::unwrap_used)]
fn macro_file(dir: &tempfile::TempDir, text: &str) -> String {
    let path = dir.path().join("Current.js");
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

/// WHAT: All iterations run and exactly one Success is sent
/// WHY: The host expects one terminal packet per RunScript
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_three_iterations_when_all_succeed_then_one_success() {
    // Given: A macro file and a host that always succeeds
    let dir = tempfile::tempdir().unwrap();
    let path = macro_file(&dir, "dte.ExecuteCommand(\"Edit.LineDown\");");
    let fake = FakeHost::default();
    let executed = Arc::clone(&fake.executed);
    let mut host = start(fake, Duration::from_secs(30));

    // When: Requesting three iterations
    host.writer
        .send(&Packet::RunScript {
            path,
            iterations: 3,
        })
        .await
        .unwrap();

    // Then: One Success after three executions
    assert_eq!(
        host.reader.read_incoming().await,
        Incoming::Packet(Packet::Success)
    );
    assert_eq!(executed.lock().unwrap().len(), 3);

    host.writer.send(&Packet::Close).await.unwrap();
    assert_eq!(host.adapter.await.unwrap().unwrap(), AdapterExit::Closed);
}

/// WHAT: The first failing iteration aborts the run with a ScriptError
/// WHY: Later iterations would act on a document in an unknown state
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_failure_on_second_iteration_when_running_then_script_error_and_abort() {
    // Given: A host that fails on its second execution
    let dir = tempfile::tempdir().unwrap();
    let path = macro_file(&dir, "x.y();");
    let fake = FakeHost {
        outcomes: VecDeque::from([
            Ok(()),
            Err(ExecutionFailure::Runtime(ScriptRuntimeError {
                line: 1,
                column: 0,
                description: "Object required".to_string(),
            })),
        ]),
        ..FakeHost::default()
    };
    let executed = Arc::clone(&fake.executed);
    let mut host = start(fake, Duration::from_secs(30));

    // When: Requesting five iterations
    host.writer
        .send(&Packet::RunScript {
            path,
            iterations: 5,
        })
        .await
        .unwrap();

    // Then: ScriptError after two executions, worker still serving
    assert_eq!(
        host.reader.read_incoming().await,
        Incoming::Packet(Packet::ScriptError {
            line: 1,
            column: 0,
            description: "Object required".to_string(),
        })
    );
    assert_eq!(executed.lock().unwrap().len(), 2);

    host.writer.send(&Packet::Close).await.unwrap();
    assert_eq!(
        host.reader.read_incoming().await,
        Incoming::Packet(Packet::Close)
    );
    assert_eq!(host.adapter.await.unwrap().unwrap(), AdapterExit::Closed);
}

/// WHAT: A host fault becomes a CriticalError and the adapter stops
/// WHY: A faulted script host cannot run anything else
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_host_fault_when_running_then_critical_error_and_exit() {
    // Given: A host that faults
    let dir = tempfile::tempdir().unwrap();
    let path = macro_file(&dir, "while (true) {}");
    let fake = FakeHost {
        outcomes: VecDeque::from([Err(ExecutionFailure::Fatal(HostFault {
            message: "interpreter crashed".to_string(),
            stack_trace: String::new(),
            target_site: "node".to_string(),
        }))]),
        ..FakeHost::default()
    };
    let mut host = start(fake, Duration::from_secs(30));

    // When: Running the macro
    host.writer
        .send(&Packet::RunScript {
            path,
            iterations: 1,
        })
        .await
        .unwrap();

    // Then: CriticalError and a Fatal exit
    assert_eq!(
        host.reader.read_incoming().await,
        Incoming::Packet(Packet::CriticalError {
            message: "interpreter crashed".to_string(),
            stack_trace: String::new(),
            target_site: "node".to_string(),
        })
    );
    assert_eq!(host.adapter.await.unwrap().unwrap(), AdapterExit::Fatal);
}

/// WHAT: An unreadable macro file is a recoverable script error at line 0
/// WHY: A deleted file is the user's problem, not a worker fault
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_missing_file_when_running_then_script_error_at_line_zero() {
    // Given: A path that does not exist
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Gone.js").to_string_lossy().into_owned();
    let mut host = start(FakeHost::default(), Duration::from_secs(30));

    // When: Running it
    host.writer
        .send(&Packet::RunScript {
            path,
            iterations: 1,
        })
        .await
        .unwrap();

    // Then: ScriptError at line 0, column 0
    let incoming = host.reader.read_incoming().await;
    assert!(matches!(
        incoming,
        Incoming::Packet(Packet::ScriptError {
            line: 0,
            column: 0,
            ..
        })
    ));
}

/// WHAT: With no request before the idle timeout the worker sends Empty and exits
/// WHY: Idle workers must not linger after the host stops using them
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_no_requests_when_idle_timeout_elapses_then_empty_sent() {
    // Given: An adapter with a short idle timeout
    let mut host = start(FakeHost::default(), Duration::from_millis(50));

    // When: Waiting for it
    let incoming = host.reader.read_incoming().await;

    // Then: Empty, then the adapter reports idle
    assert_eq!(incoming, Incoming::Packet(Packet::Empty));
    assert_eq!(host.adapter.await.unwrap().unwrap(), AdapterExit::Idle);
}

/// WHAT: Noise from the host is ignored and a closed channel ends the loop
/// WHY: The adapter must survive partial frames and exit when the host dies
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_noise_then_disconnect_when_serving_then_disconnected() {
    // Given: An adapter receiving a malformed frame
    let host = start(FakeHost::default(), Duration::from_secs(30));
    let Host {
        reader,
        mut writer,
        adapter,
    } = host;
    writer.send_raw(&[0, 0, 0, 2, b'[', b'[']).await.unwrap();

    // When: The host goes away
    drop(writer);
    drop(reader);

    // Then: Disconnected
    assert_eq!(adapter.await.unwrap().unwrap(), AdapterExit::Disconnected);
}
