use std::path::PathBuf;

use crate::{Job, JobId, PipelineEvent};

/// A file picked by the user together with the language to transcribe it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    pub path: PathBuf,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked files to add to the job list.
    FilesSelected(Vec<FileSelection>),
    /// User changed the language of a queued job.
    LanguageChanged { job_id: JobId, language: String },
    /// User removed a queued job.
    RemoveJob { job_id: JobId },
    /// User cleared the whole list.
    ClearClicked,
    /// User asked to process every pending job.
    StartClicked,
    /// Notification relayed from a running pipeline.
    Pipeline(PipelineEvent),
    /// The runner handed the job list back.
    RunFinished {
        jobs: Vec<Job>,
        /// Set when the whole run failed before or outside per-job handling.
        error: Option<String>,
    },
}
