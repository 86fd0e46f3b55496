use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use transcript_core::{AppConfig, EventSink, Job, LogLevel};
use transcript_logging::{transcript_info, transcript_warn};

use crate::pipeline::PipelineRunner;
use crate::sink::ChannelSink;
use crate::EngineEvent;

/// Message stored on jobs that were in flight when a run was cancelled.
pub const CANCELLED_MESSAGE: &str = "cancelled";

enum EngineCommand {
    Run {
        config: AppConfig,
        jobs: Vec<Job>,
        cancel: CancellationToken,
    },
}

/// Runs batches on a background thread that owns its own tokio runtime.
///
/// Commands are handled one after another, so at most one run is active.
/// Events are polled by the owner with `recv_timeout`.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    current: Arc<Mutex<CancellationToken>>,
}

impl EngineHandle {
    pub fn new(runner: PipelineRunner) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::Builder::new()
            .name("transcript-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    runtime.block_on(handle_command(&runner, command, &event_tx));
                }
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            current: Arc::new(Mutex::new(CancellationToken::new())),
        })
    }

    /// Queues a run over `jobs`. The final job list comes back in `EngineEvent::RunFinished`.
    pub fn start_run(&self, config: AppConfig, jobs: Vec<Job>) {
        let cancel = CancellationToken::new();
        if let Ok(mut current) = self.current.lock() {
            *current = cancel.clone();
        }
        let _ = self.cmd_tx.send(EngineCommand::Run {
            config,
            jobs,
            cancel,
        });
    }

    /// Cancels the most recently started run.
    pub fn cancel(&self) {
        if let Ok(current) = self.current.lock() {
            current.cancel();
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    runner: &PipelineRunner,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Run {
            config,
            mut jobs,
            cancel,
        } => {
            let sink = ChannelSink::new(event_tx.clone());
            let outcome = tokio::select! {
                result = runner.run(&config, &mut jobs, &sink) => Some(result),
                _ = cancel.cancelled() => None,
            };

            let (summary, error) = match outcome {
                Some(Ok(summary)) => (Some(summary), None),
                Some(Err(err)) => {
                    transcript_warn!("Run failed: {}", err);
                    (None, Some(err.to_string()))
                }
                None => {
                    cancel_in_flight(&mut jobs, &sink);
                    (None, Some("run cancelled".to_string()))
                }
            };
            let _ = event_tx.send(EngineEvent::RunFinished {
                jobs,
                summary,
                error,
            });
        }
    }
}

/// Jobs caught mid-step by a cancellation end in `Error`; untouched ones stay `Pending`.
pub fn cancel_in_flight(jobs: &mut [Job], sink: &dyn EventSink) {
    for job in jobs.iter_mut().filter(|job| job.status.is_in_flight()) {
        job.fail(CANCELLED_MESSAGE);
        sink.job_status_changed(job);
        sink.log(
            &format!("Error: {} - {}", job.file_name(), CANCELLED_MESSAGE),
            LogLevel::Error,
        );
    }
    sink.status_label("Cancelled");
    transcript_info!("Run cancelled");
}
