//! Drives the dashboard state machine against a background engine.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use transcript_core::{
    update, AppConfig, AppState, FileSelection, Job, JobStatus, Msg, Severity,
};
use transcript_engine::{EngineHandle, RunSummary};
use transcript_logging::{transcript_info, transcript_warn};

use super::effects::EffectRunner;
use super::render::Renderer;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit status used when the user interrupts twice.
const INTERRUPTED_EXIT: i32 = 130;

/// What a finished run handed back.
#[derive(Debug)]
pub struct RunOutcome {
    pub jobs: Vec<Job>,
    /// Set when the run failed as a whole or was cancelled.
    pub run_error: Option<String>,
    pub summary: Option<RunSummary>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.run_error.is_none() && self.jobs.iter().all(|job| job.status != JobStatus::Error)
    }
}

pub struct Dashboard<W: Write> {
    state: AppState,
    effects: EffectRunner,
    renderer: Renderer<W>,
}

impl<W: Write> Dashboard<W> {
    pub fn new(engine: EngineHandle, config: AppConfig, renderer: Renderer<W>) -> Self {
        Self {
            state: AppState::new(),
            effects: EffectRunner::new(engine, config),
            renderer,
        }
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let (state, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = state;
        self.effects.enqueue(effects, &mut self.renderer);
        if self.state.consume_dirty() {
            let view = self.state.view();
            self.renderer.render(&view);
        }
    }

    /// Queues `selections`, starts a run and blocks until it is over.
    ///
    /// A non-zero `interrupts` count cancels the run once.
    pub fn run(
        mut self,
        selections: Vec<FileSelection>,
        interrupts: &AtomicUsize,
    ) -> (RunOutcome, Renderer<W>) {
        self.dispatch(Msg::FilesSelected(selections));
        self.dispatch(Msg::StartClicked);

        let mut run_error = None;
        let mut cancel_sent = false;
        while self.state.is_processing() {
            if !cancel_sent && interrupts.load(Ordering::SeqCst) > 0 {
                transcript_info!("Interrupt received, cancelling run");
                self.renderer
                    .notice("Cancelling... (press Ctrl-C again to quit)", Severity::Warning);
                self.effects.cancel();
                cancel_sent = true;
            }
            if let Some(msg) = self.effects.poll(POLL_INTERVAL) {
                if let Msg::RunFinished { error, .. } = &msg {
                    run_error = error.clone();
                }
                self.dispatch(msg);
            }
        }

        let view = self.state.view();
        self.renderer.summary(&view);
        let outcome = RunOutcome {
            jobs: self.state.jobs().to_vec(),
            run_error,
            summary: self.effects.last_summary(),
        };
        (outcome, self.renderer)
    }
}

/// Counts Ctrl-C presses on a helper thread; the second one exits the process.
pub fn watch_interrupts() -> io::Result<Arc<AtomicUsize>> {
    let interrupts = Arc::new(AtomicUsize::new(0));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let counter = Arc::clone(&interrupts);
    thread::Builder::new()
        .name("transcript-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if counter.fetch_add(1, Ordering::SeqCst) > 0 {
                        transcript_warn!("Second interrupt, exiting");
                        std::process::exit(INTERRUPTED_EXIT);
                    }
                }
            })
        })?;
    Ok(interrupts)
}
