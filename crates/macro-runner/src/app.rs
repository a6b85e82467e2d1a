use crate::{AppCommand, AppEvent, AppResult, config::Config};

use macro_runner_core::{
    Completion, Recorder, Synthesizer, WorkerSpec, WorkerSupervisor, save_script,
};

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// Main application state.
///
/// Owns the recorder and the worker supervisor. Commands arrive on
/// `command_rx`, run outcomes on `completion_rx`, and everything the front
/// end needs to know leaves on `event_tx`.
pub struct App {
    recorder: Recorder,
    synthesizer: Synthesizer,
    supervisor: WorkerSupervisor,
    context_was_document: bool,
    command_rx: mpsc::Receiver<AppCommand>,
    completion_rx: mpsc::Receiver<Completion>,
    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    /// Build the application around a worker launched from `worker_spec`.
    pub(crate) fn new(
        config: &Config,
        worker_spec: WorkerSpec,
        command_rx: mpsc::Receiver<AppCommand>,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(32);

        Self {
            recorder: Recorder::new(config.recording.ignored_captions.clone()),
            synthesizer: Synthesizer::new(config.recording.reference_path.clone()),
            supervisor: WorkerSupervisor::new(worker_spec, completion_tx),
            context_was_document: false,
            command_rx,
            completion_rx,
            event_tx,
        }
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Macro-runner starting");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Command channel closed, shutting down");
                        break;
                    };

                    match cmd {
                        AppCommand::StartRecording { context_was_document } => {
                            self.start_recording(context_was_document).await;
                        }
                        AppCommand::Record(action) => {
                            self.recorder.record(action);
                        }
                        AppCommand::StopRecording { path } => {
                            self.stop_recording(&path).await;
                        }
                        AppCommand::Playback { path, iterations } => {
                            self.playback(&path, iterations).await;
                        }
                        AppCommand::StopPlayback => {
                            info!("Stopping playback");
                            self.supervisor.stop().await;
                        }
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                Some(completion) = self.completion_rx.recv() => {
                    info!(completion = ?completion, "Macro run ended");
                    self.emit(AppEvent::PlaybackFinished(completion)).await;
                }
            }
        }

        self.supervisor.shutdown().await;

        info!("Macro-runner shut down successfully");

        Ok(())
    }

    /// Start a recording session.
    #[instrument(skip(self))]
    async fn start_recording(&mut self, context_was_document: bool) {
        match self.recorder.start_recording() {
            Ok(session_id) => {
                self.context_was_document = context_was_document;
                self.emit(AppEvent::RecordingStarted { session_id }).await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to start recording");
                self.emit_failure(e.to_string()).await;
            }
        }
    }

    /// Stop recording, render the log and save the script.
    #[instrument(skip(self))]
    async fn stop_recording(&mut self, path: &Path) {
        let log = match self.recorder.stop_recording() {
            Ok(log) => log,
            Err(e) => {
                error!(error = ?e, "Failed to stop recording");
                self.emit_failure(e.to_string()).await;
                return;
            }
        };

        let script = self.synthesizer.render(&log, self.context_was_document);

        match save_script(path, &script) {
            Ok(()) => {
                info!(path = ?path, action_count = log.len(), "Macro saved");
                self.emit(AppEvent::MacroSaved {
                    path: path.to_path_buf(),
                    log,
                })
                .await;
            }
            Err(e) => {
                error!(path = ?path, error = ?e, "Failed to save macro");
                self.emit_failure(e.to_string()).await;
            }
        }
    }

    /// Hand a macro to the worker supervisor.
    #[instrument(skip(self))]
    async fn playback(&mut self, path: &Path, iterations: u32) {
        if self.recorder.is_recording() {
            warn!("Playback requested while recording");
            self.emit_failure("Cannot run a macro while recording".to_string())
                .await;
            return;
        }

        if let Err(e) = self.supervisor.run_script(path, iterations).await {
            error!(path = ?path, error = ?e, "Failed to start macro");
            self.emit_failure(e.to_string()).await;
        }
    }

    async fn emit_failure(&self, message: String) {
        self.emit(AppEvent::CommandFailed { message }).await;
    }

    async fn emit(&self, event: AppEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("Front end stopped listening for events");
        }
    }
}
