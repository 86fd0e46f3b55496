use crate::view_model::{AppViewModel, JobRowView};
use crate::{language_label, FileSelection, Job, JobId, JobStatus, LogLevel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub message: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    jobs: Vec<Job>,
    next_job_id: JobId,
    processing: bool,
    progress_done: u32,
    progress_total: u32,
    status_label: String,
    logs: Vec<LogLine>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            next_job_id: 1,
            processing: false,
            progress_done: 0,
            progress_total: 0,
            status_label: String::new(),
            logs: Vec::new(),
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            jobs: self
                .jobs
                .iter()
                .map(|job| JobRowView {
                    job_id: job.id,
                    name: job.file_name(),
                    language: job.language.clone(),
                    language_label: language_label(&job.language).to_string(),
                    status: job.status,
                    output: job.output_locator.clone(),
                    error: job.error_message.clone(),
                })
                .collect(),
            processing: self.processing,
            progress_done: self.progress_done,
            progress_total: self.progress_total,
            status_label: self.status_label.clone(),
            logs: self.logs.clone(),
            dirty: self.dirty,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Adds one pending job per path not already listed; returns how many were added.
    pub(crate) fn add_files(&mut self, selections: Vec<FileSelection>) -> usize {
        let mut added = 0;
        for selection in selections {
            if self.jobs.iter().any(|j| j.source_path == selection.path) {
                continue;
            }
            let id = self.next_job_id;
            self.next_job_id += 1;
            self.jobs.push(Job::new(id, selection.path, selection.language));
            added += 1;
        }
        if added > 0 {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn set_language(&mut self, job_id: JobId, language: String) -> bool {
        match self
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Pending)
        {
            Some(job) => {
                job.language = language;
                self.mark_dirty();
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_job(&mut self, job_id: JobId) {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.id != job_id);
        if self.jobs.len() != before {
            self.mark_dirty();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.jobs.clear();
        self.progress_done = 0;
        self.progress_total = 0;
        self.status_label.clear();
        self.logs.clear();
        self.mark_dirty();
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count()
    }

    pub(crate) fn begin_run(&mut self) -> Vec<Job> {
        self.processing = true;
        self.progress_total = self.pending_count() as u32 * 2;
        self.progress_done = 0;
        self.mark_dirty();
        self.jobs.clone()
    }

    pub(crate) fn apply_job_snapshot(&mut self, snapshot: Job) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == snapshot.id) {
            *job = snapshot;
            self.mark_dirty();
        }
    }

    pub(crate) fn advance_progress(&mut self, steps: u32) {
        self.progress_done = self.progress_done.saturating_add(steps);
        self.mark_dirty();
    }

    pub(crate) fn set_status_label(&mut self, label: String) {
        self.status_label = label;
        self.mark_dirty();
    }

    pub(crate) fn push_log(&mut self, message: String, level: LogLevel) {
        self.logs.push(LogLine { message, level });
        self.mark_dirty();
    }

    pub(crate) fn finish_run(&mut self, jobs: Option<Vec<Job>>) {
        if let Some(jobs) = jobs {
            self.jobs = jobs;
        }
        self.processing = false;
        self.mark_dirty();
    }
}
