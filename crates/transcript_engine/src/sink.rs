use std::sync::mpsc;

use tokio::sync::mpsc::UnboundedSender;
use transcript_core::{EventSink, Job, LogLevel, PipelineEvent};
use transcript_logging::{transcript_debug, transcript_error, transcript_info, transcript_warn};

use crate::EngineEvent;

/// Default sink: run log lines go to the diagnostic logger, everything else is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Error => transcript_error!("{}", message),
            LogLevel::Warning => transcript_warn!("{}", message),
            LogLevel::Dim => transcript_debug!("{}", message),
            LogLevel::Info | LogLevel::Highlight | LogLevel::Success => {
                transcript_info!("{}", message)
            }
        }
    }

    fn job_status_changed(&self, job: &Job) {
        transcript_debug!("Job {} is now {}", job.id, job.status);
    }

    fn progress_advance(&self, _steps: u32) {}

    fn status_label(&self, _label: &str) {}
}

/// Forwards run events to a thread that polls an `EngineHandle`.
pub struct ChannelSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(EngineEvent::Pipeline(event));
    }
}

impl EventSink for ChannelSink {
    fn log(&self, message: &str, level: LogLevel) {
        self.emit(PipelineEvent::Log {
            message: message.to_string(),
            level,
        });
    }

    fn job_status_changed(&self, job: &Job) {
        self.emit(PipelineEvent::JobStatus { job: job.clone() });
    }

    fn progress_advance(&self, steps: u32) {
        self.emit(PipelineEvent::Progress { steps });
    }

    fn status_label(&self, label: &str) {
        self.emit(PipelineEvent::StatusLabel {
            label: label.to_string(),
        });
    }
}

/// Feeds an async consumer such as a server-sent event stream.
///
/// Sends never block; events are dropped once the receiver is gone.
#[derive(Clone)]
pub struct StreamSink {
    tx: UnboundedSender<PipelineEvent>,
}

impl StreamSink {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }

    /// Marks the end of the stream.
    pub fn finish(&self) {
        let _ = self.tx.send(PipelineEvent::Done);
    }

    pub fn fail(&self, message: impl Into<String>) {
        let _ = self.tx.send(PipelineEvent::Error {
            message: message.into(),
        });
    }
}

impl EventSink for StreamSink {
    fn log(&self, message: &str, level: LogLevel) {
        let _ = self.tx.send(PipelineEvent::Log {
            message: message.to_string(),
            level,
        });
    }

    fn job_status_changed(&self, job: &Job) {
        let _ = self.tx.send(PipelineEvent::JobStatus { job: job.clone() });
    }

    fn progress_advance(&self, steps: u32) {
        let _ = self.tx.send(PipelineEvent::Progress { steps });
    }

    fn status_label(&self, label: &str) {
        let _ = self.tx.send(PipelineEvent::StatusLabel {
            label: label.to_string(),
        });
    }
}

/// Delivers every notification to both sinks, `primary` first.
pub struct TeeSink<A, B> {
    primary: A,
    secondary: B,
}

impl<A: EventSink, B: EventSink> TeeSink<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: EventSink, B: EventSink> EventSink for TeeSink<A, B> {
    fn log(&self, message: &str, level: LogLevel) {
        self.primary.log(message, level);
        self.secondary.log(message, level);
    }

    fn job_status_changed(&self, job: &Job) {
        self.primary.job_status_changed(job);
        self.secondary.job_status_changed(job);
    }

    fn progress_advance(&self, steps: u32) {
        self.primary.progress_advance(steps);
        self.secondary.progress_advance(steps);
    }

    fn status_label(&self, label: &str) {
        self.primary.status_label(label);
        self.secondary.status_label(label);
    }
}
