use crate::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand the job list to the runner. Only pending jobs will be processed.
    StartRun { jobs: Vec<Job> },
    /// Short user-facing notice.
    Notify { message: String, severity: Severity },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
}
