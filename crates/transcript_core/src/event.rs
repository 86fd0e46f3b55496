use serde::{Deserialize, Serialize};

use crate::Job;

/// Presentation hint attached to every run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Info,
    /// Key actions (starting a transcription, starting an upload, skips).
    Highlight,
    Success,
    Warning,
    Error,
    Dim,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Highlight => "highlight",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Dim => "dim",
        }
    }
}

/// Receiver of run notifications.
///
/// Calls are synchronous and purely observational: a sink cannot veto or
/// alter what the runner does, and must not block it for long.
pub trait EventSink: Send + Sync {
    fn log(&self, message: &str, level: LogLevel);
    /// Fired on every status transition with a snapshot of the job.
    fn job_status_changed(&self, job: &Job);
    /// Advances the overall progress counter; `steps` is not always 1.
    fn progress_advance(&self, steps: u32);
    /// Replaces the one-line human-readable summary.
    fn status_label(&self, label: &str);
}

/// Discrete messages of the progress stream consumed by front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Log { message: String, level: LogLevel },
    JobStatus { job: Job },
    Progress { steps: u32 },
    StatusLabel { label: String },
    /// The run is over, whatever its outcome.
    Done,
    /// Keep-alive sent when nothing happened for a while.
    Ping,
    /// Stream-level failure, distinct from job errors.
    Error { message: String },
}

impl PipelineEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PipelineEvent::Log { .. } => "log",
            PipelineEvent::JobStatus { .. } => "job_status",
            PipelineEvent::Progress { .. } => "progress",
            PipelineEvent::StatusLabel { .. } => "status_label",
            PipelineEvent::Done => "done",
            PipelineEvent::Ping => "ping",
            PipelineEvent::Error { .. } => "error",
        }
    }
}
