use std::io::Write;
use std::time::Duration;

use transcript_core::{AppConfig, Effect, Msg};
use transcript_engine::{EngineEvent, EngineHandle, RunSummary};
use transcript_logging::{transcript_info, transcript_warn};

use super::render::Renderer;

/// Carries effects from `update` to the engine and engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
    config: AppConfig,
    last_summary: Option<RunSummary>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, config: AppConfig) -> Self {
        Self {
            engine,
            config,
            last_summary: None,
        }
    }

    pub fn enqueue<W: Write>(&self, effects: Vec<Effect>, renderer: &mut Renderer<W>) {
        for effect in effects {
            match effect {
                Effect::StartRun { jobs } => {
                    transcript_info!(
                        "StartRun jobs={} destination={}",
                        jobs.len(),
                        self.config.destination()
                    );
                    self.engine.start_run(self.config.clone(), jobs);
                }
                Effect::Notify { message, severity } => renderer.notice(&message, severity),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn poll(&mut self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        Some(match event {
            EngineEvent::Pipeline(event) => Msg::Pipeline(event),
            EngineEvent::RunFinished {
                jobs,
                summary,
                error,
            } => {
                if let Some(message) = &error {
                    transcript_warn!("Run ended early: {}", message);
                }
                self.last_summary = summary;
                Msg::RunFinished { jobs, error }
            }
        })
    }

    pub fn cancel(&self) {
        self.engine.cancel();
    }

    /// Counts reported by the most recent run that completed normally.
    pub fn last_summary(&self) -> Option<RunSummary> {
        self.last_summary
    }
}
