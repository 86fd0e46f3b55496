//! The batch runner: transcribe each pending job, name it, export it, record it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use transcript_core::{
    dedupe_title, language_label, original_title, sequential_title, AppConfig, DestinationMode,
    EventSink, Job, JobStatus, LogLevel, NamingMode,
};
use transcript_logging::{error_chain, transcript_error, transcript_info, transcript_warn};

use crate::export::{exporter_for, DocsEndpoints, Exporter, ExporterFactory, OutputLocator};
use crate::ledger::{Ledger, LedgerRecord};
use crate::transcribe::{megabytes, DeepgramTranscriber, SpeechSettings, Transcriber};
use crate::{JobError, PipelineError, RunSummary, TranscribeError};

/// Progress units a job contributes to a run: one for transcription, one for export.
pub const STEPS_PER_JOB: u32 = 2;

/// Runs batches of jobs against a transcriber, an exporter and the ledger.
///
/// A runner holds no per-run state and can be shared between runs. Running two
/// batches over the same job list at once is the caller's mistake to avoid.
#[derive(Clone)]
pub struct PipelineRunner {
    ledger_path: PathBuf,
    transcriber: Arc<dyn Transcriber>,
    exporters: Arc<ExporterFactory>,
}

enum JobOutcome {
    Completed,
    Skipped,
}

/// Progress units already reported for the current job.
struct StepCounter<'a> {
    sink: &'a dyn EventSink,
    advanced: u32,
}

impl StepCounter<'_> {
    fn advance(&mut self, steps: u32) {
        self.advanced += steps;
        self.sink.progress_advance(steps);
    }

    fn remaining(&self) -> u32 {
        STEPS_PER_JOB.saturating_sub(self.advanced)
    }
}

/// Position of a job inside the run, rendered as `[i/n]`.
#[derive(Clone, Copy)]
struct Slot {
    position: usize,
    total: usize,
}

impl PipelineRunner {
    pub fn new(
        ledger_path: impl Into<PathBuf>,
        transcriber: Arc<dyn Transcriber>,
        exporters: Arc<ExporterFactory>,
    ) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            transcriber,
            exporters,
        }
    }

    /// Deepgram transcription and the exporter derived from each run's config.
    pub fn with_settings(
        ledger_path: impl Into<PathBuf>,
        speech: SpeechSettings,
        docs: DocsEndpoints,
    ) -> Result<Self, TranscribeError> {
        let transcriber = Arc::new(DeepgramTranscriber::new(speech)?);
        let exporters: Arc<ExporterFactory> =
            Arc::new(move |config: &AppConfig| exporter_for(config, &docs));
        Ok(Self::new(ledger_path, transcriber, exporters))
    }

    /// Processes every `Pending` job in list order, mutating the records in place.
    ///
    /// Per-job failures are contained: the job ends in `Error` and the run moves
    /// on. Only a rejected config, a ledger that cannot be opened or an exporter
    /// that cannot be built make the whole run fail, and those happen before any
    /// job is touched.
    pub async fn run(
        &self,
        config: &AppConfig,
        jobs: &mut [Job],
        sink: &dyn EventSink,
    ) -> Result<RunSummary, PipelineError> {
        let pending: Vec<usize> = jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.status == JobStatus::Pending)
            .map(|(idx, _)| idx)
            .collect();
        if pending.is_empty() {
            return Ok(RunSummary::default());
        }

        config.validate()?;
        let exporter = (self.exporters)(config).map_err(PipelineError::Exporter)?;
        let mut ledger = Ledger::open(&self.ledger_path)?;

        let result = self
            .run_pending(config, jobs, &pending, exporter.as_ref(), &mut ledger, sink)
            .await;

        if let Err(err) = ledger.close() {
            transcript_warn!("Closing ledger failed: {}", err);
        }
        result
    }

    async fn run_pending(
        &self,
        config: &AppConfig,
        jobs: &mut [Job],
        pending: &[usize],
        exporter: &dyn Exporter,
        ledger: &mut Ledger,
        sink: &dyn EventSink,
    ) -> Result<RunSummary, PipelineError> {
        let mut next_seq = ledger.next_sequential_number(&config.prefix)?;
        let mut summary = RunSummary::default();
        transcript_info!(
            "Starting run: {} pending job(s), destination={}, naming={}, next number {}",
            pending.len(),
            exporter.destination(),
            config.naming_mode,
            next_seq
        );

        for (i, &idx) in pending.iter().enumerate() {
            let job = &mut jobs[idx];
            let slot = Slot {
                position: i + 1,
                total: pending.len(),
            };
            let mut steps = StepCounter { sink, advanced: 0 };

            let outcome = self
                .process_job(config, job, slot, exporter, ledger, &mut next_seq, &mut steps)
                .await;
            match outcome {
                Ok(JobOutcome::Completed) => summary.completed += 1,
                Ok(JobOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    let message = err.to_string();
                    job.fail(message.as_str());
                    sink.job_status_changed(job);
                    let remaining = steps.remaining();
                    steps.advance(remaining);

                    let chain = error_chain(&err);
                    sink.log(
                        &format!("Error: {} - {}", job.file_name(), message),
                        LogLevel::Error,
                    );
                    sink.log(&chain, LogLevel::Dim);
                    transcript_error!("Job failed for {}: {}", job.file_name(), chain);
                }
            }
        }

        sink.status_label("Done!");
        sink.log("All tasks completed.", LogLevel::Success);
        transcript_info!(
            "Run finished: {} completed, {} skipped, {} failed",
            summary.completed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_job(
        &self,
        config: &AppConfig,
        job: &mut Job,
        slot: Slot,
        exporter: &dyn Exporter,
        ledger: &mut Ledger,
        next_seq: &mut u32,
        steps: &mut StepCounter<'_>,
    ) -> Result<JobOutcome, JobError> {
        let sink = steps.sink;
        let destination = exporter.destination();
        let source = job.source_path.display().to_string();
        let name = job.file_name();

        if ledger.already_processed(&source, &config.prefix, destination)? {
            sink.log(
                &format!(
                    "Skipped: {name} (already processed with prefix '{}')",
                    config.prefix
                ),
                LogLevel::Highlight,
            );
            job.status = JobStatus::Done;
            sink.job_status_changed(job);
            steps.advance(STEPS_PER_JOB);
            return Ok(JobOutcome::Skipped);
        }

        // Transcribe
        job.status = JobStatus::Transcribing;
        sink.job_status_changed(job);
        let size = std::fs::metadata(&job.source_path)
            .map_err(|source| JobError::Source {
                path: job.source_path.clone(),
                source,
            })?
            .len();

        let language = language_label(&job.language);
        let mb = megabytes(size);
        sink.status_label(&format!(
            "Transcribing {name} ({mb:.0} MB, {language}) [{}/{}]...",
            slot.position, slot.total
        ));
        sink.log(
            &format!("Transcribing: {name} ({mb:.0} MB, {language})"),
            LogLevel::Highlight,
        );

        let on_status = |message: &str| sink.log(&format!("  {message}"), LogLevel::Dim);
        job.transcript = self
            .transcriber
            .transcribe(&config.speech_api_key, &job.source_path, &job.language, &on_status)
            .await?;
        steps.advance(1);

        // Title
        let sequential_number = match config.naming_mode {
            NamingMode::Sequential => Some(*next_seq),
            NamingMode::Original => None,
        };
        let title = match sequential_number {
            Some(n) => sequential_title(&config.prefix, n),
            None => {
                let base = original_title(&config.prefix, &job.source_path);
                dedupe_title(&base, |candidate| ledger.title_used(candidate, destination))?
            }
        };

        // Export
        job.status = JobStatus::Uploading;
        sink.job_status_changed(job);
        match destination {
            DestinationMode::DocumentService => {
                sink.status_label(&format!(
                    "Uploading {title} to Google Docs [{}/{}]...",
                    slot.position, slot.total
                ));
                sink.log(&format!("Uploading: {title}"), LogLevel::Highlight);
            }
            DestinationMode::LocalFiles => {
                sink.status_label(&format!(
                    "Saving {title}.md [{}/{}]...",
                    slot.position, slot.total
                ));
                sink.log(&format!("Saving: {title}.md"), LogLevel::Highlight);
            }
        }

        let locator = exporter.deliver(&title, &job.transcript).await?;
        job.output_locator = locator.locator();
        job.output_url = locator.url().unwrap_or_default().to_string();
        match &locator {
            OutputLocator::Document { id, .. } => {
                sink.log(&format!("Created: {title} (ID: {id})"), LogLevel::Success)
            }
            OutputLocator::File(path) => {
                sink.log(&format!("Saved: {}", path.display()), LogLevel::Success)
            }
        }
        steps.advance(1);

        // Recorded before Done so a failed append leaves the job in Error.
        ledger.append(&LedgerRecord {
            source_path: source,
            prefix: config.prefix.clone(),
            naming_mode: config.naming_mode,
            sequential_number,
            output_title: title,
            destination,
            output_locator: Some(job.output_locator.clone()),
            language: Some(job.language.clone()),
            completed_at: Utc::now(),
        })?;

        job.status = JobStatus::Done;
        sink.job_status_changed(job);
        if sequential_number.is_some() {
            *next_seq += 1;
        }
        Ok(JobOutcome::Completed)
    }
}
