use crate::{JobId, JobStatus, LogLine};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub jobs: Vec<JobRowView>,
    pub processing: bool,
    pub progress_done: u32,
    pub progress_total: u32,
    pub status_label: String,
    pub logs: Vec<LogLine>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub name: String,
    pub language: String,
    pub language_label: String,
    pub status: JobStatus,
    pub output: String,
    pub error: String,
}

impl AppViewModel {
    /// Overall completion in percent, 0 when nothing has been started.
    pub fn percent(&self) -> f64 {
        if self.progress_total == 0 {
            return 0.0;
        }
        (self.progress_done.min(self.progress_total) as f64 / self.progress_total as f64) * 100.0
    }
}
