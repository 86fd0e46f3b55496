use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type JobId = u64;

/// Lifecycle of a job. Only `Pending` jobs are picked up by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Transcribing,
    Uploading,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Uploading => "uploading",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// True while a run is actively working on the job.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Transcribing | JobStatus::Uploading)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media file travelling through transcription and export.
///
/// The caller owns the record; a run mutates its fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source_path: PathBuf,
    pub language: String,
    pub status: JobStatus,
    pub transcript: String,
    /// File path or remote document id, empty until export succeeds.
    pub output_locator: String,
    /// Browser URL of a remote document, empty for local files.
    pub output_url: String,
    pub error_message: String,
}

impl Job {
    pub fn new(id: JobId, source_path: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            id,
            source_path: source_path.into(),
            language: language.into(),
            status: JobStatus::Pending,
            transcript: String::new(),
            output_locator: String::new(),
            output_url: String::new(),
            error_message: String::new(),
        }
    }

    /// Display name of the source, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error_message = message.into();
    }
}
