use std::io;
use std::path::PathBuf;

use thiserror::Error;
use transcript_core::{ConfigError, Job, PipelineEvent};

use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot create ledger directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create temporary directory: {0}")]
    TempDir(#[source] io::Error),
    #[error("audio extraction failed: {0}")]
    Extraction(String),
    #[error("speech service request failed: {0}")]
    Request(String),
    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected speech service response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("invalid service account key {path:?}: {message}")]
    Credentials { path: PathBuf, message: String },
    #[error("access token request failed: {0}")]
    Auth(String),
    #[error("document service request failed: {0}")]
    Request(String),
    #[error("document service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected document service response: {0}")]
    Decode(String),
    #[error("export task failed: {0}")]
    Task(String),
}

/// Failure of a single job. Contained by the runner; never aborts a run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("cannot read source {path:?}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Failure of a whole run, raised before or outside per-job handling.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot open ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("cannot set up exporter: {0}")]
    Exporter(#[source] ExportError),
}

/// Counts reported by a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Messages delivered by an `EngineHandle` to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Pipeline(PipelineEvent),
    /// The run is over. `jobs` is the final state of every job that was handed in;
    /// `summary` is absent when the run failed or was cancelled.
    RunFinished {
        jobs: Vec<Job>,
        summary: Option<RunSummary>,
        error: Option<String>,
    },
}
