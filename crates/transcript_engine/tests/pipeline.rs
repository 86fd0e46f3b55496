use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use transcript_core::{
    AppConfig, DestinationMode, EventSink, Job, JobStatus, LogLevel, NamingMode, PipelineEvent,
};
use transcript_engine::{
    exporter_for, DocsEndpoints, ExportError, Exporter, ExporterFactory, Ledger, LedgerRecord,
    OutputLocator, PipelineError, PipelineRunner, RunSummary, TranscribeError, Transcriber,
};

/// Returns a fixed transcript, failing for file names listed in `fail_on`.
#[derive(Default)]
struct FakeTranscriber {
    text: String,
    fail_on: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    fn saying(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _api_key: &str,
        path: &Path,
        _language: &str,
        on_status: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        on_status("Uploading to Deepgram...");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_on.contains(&name) {
            return Err(TranscribeError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        Ok(self.text.clone())
    }
}

/// Local exporter that refuses the titles it is told to.
struct PickyExporter {
    dir: PathBuf,
    refuse: HashSet<String>,
}

#[async_trait::async_trait]
impl Exporter for PickyExporter {
    fn destination(&self) -> DestinationMode {
        DestinationMode::LocalFiles
    }

    async fn deliver(&self, title: &str, _text: &str) -> Result<OutputLocator, ExportError> {
        if self.refuse.contains(title) {
            return Err(ExportError::Request("disk quota exceeded".to_string()));
        }
        Ok(OutputLocator::File(self.dir.join(format!("{title}.md"))))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    fn progress_total(&self) -> u32 {
        self.events()
            .iter()
            .map(|event| match event {
                PipelineEvent::Progress { steps } => *steps,
                _ => 0,
            })
            .sum()
    }

    fn logs(&self) -> Vec<(String, LogLevel)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Log { message, level } => Some((message, level)),
                _ => None,
            })
            .collect()
    }

    fn labels(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::StatusLabel { label } => Some(label),
                _ => None,
            })
            .collect()
    }

    fn statuses_of(&self, id: u64) -> Vec<JobStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::JobStatus { job } if job.id == id => Some(job.status),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn log(&self, message: &str, level: LogLevel) {
        self.events.lock().unwrap().push(PipelineEvent::Log {
            message: message.to_string(),
            level,
        });
    }

    fn job_status_changed(&self, job: &Job) {
        self.events
            .lock()
            .unwrap()
            .push(PipelineEvent::JobStatus { job: job.clone() });
    }

    fn progress_advance(&self, steps: u32) {
        self.events
            .lock()
            .unwrap()
            .push(PipelineEvent::Progress { steps });
    }

    fn status_label(&self, label: &str) {
        self.events.lock().unwrap().push(PipelineEvent::StatusLabel {
            label: label.to_string(),
        });
    }
}

struct Fixture {
    temp: TempDir,
    config: AppConfig,
}

impl Fixture {
    fn new() -> Self {
        transcript_logging::initialize_for_tests();
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            speech_api_key: "test-key".to_string(),
            prefix: "Test".to_string(),
            output_directory: temp.path().join("output"),
            ..AppConfig::default()
        };
        Self { temp, config }
    }

    fn ledger_path(&self) -> PathBuf {
        self.temp.path().join("ledger").join("history.db")
    }

    fn media(&self, name: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        fs::write(&path, vec![0u8; 2048]).unwrap();
        path
    }

    fn runner(&self, transcriber: Arc<FakeTranscriber>) -> PipelineRunner {
        let factory: Arc<ExporterFactory> =
            Arc::new(|config: &AppConfig| exporter_for(config, &DocsEndpoints::default()));
        PipelineRunner::new(self.ledger_path(), transcriber, factory)
    }

    fn picky_runner(&self, transcriber: Arc<FakeTranscriber>, refuse: &[&str]) -> PipelineRunner {
        let dir = self.config.output_directory.clone();
        let refuse: HashSet<String> = refuse.iter().map(|t| t.to_string()).collect();
        let factory: Arc<ExporterFactory> = Arc::new(
            move |_: &AppConfig| -> Result<Box<dyn Exporter>, ExportError> {
                Ok(Box::new(PickyExporter {
                    dir: dir.clone(),
                    refuse: refuse.clone(),
                }))
            },
        );
        PipelineRunner::new(self.ledger_path(), transcriber, factory)
    }

    fn records(&self) -> Vec<LedgerRecord> {
        Ledger::open(&self.ledger_path())
            .unwrap()
            .records(None)
            .unwrap()
    }
}

fn pending(paths: &[&PathBuf]) -> Vec<Job> {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| Job::new(i as u64 + 1, (*p).clone(), "es"))
        .collect()
}

#[tokio::test]
async fn single_file_ends_as_markdown_with_a_ledger_row() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("hello"));
    let runner = fx.runner(transcriber.clone());
    let sink = RecordingSink::default();
    let mut jobs = pending(&[&clip]);

    let summary = runner.run(&fx.config, &mut jobs, &sink).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            completed: 1,
            skipped: 0,
            failed: 0
        }
    );
    let expected = fx.config.output_directory.join("Test_1.md");
    assert_eq!(jobs[0].status, JobStatus::Done);
    assert_eq!(jobs[0].transcript, "hello");
    assert_eq!(jobs[0].output_locator, expected.display().to_string());
    assert_eq!(jobs[0].error_message, "");
    assert_eq!(fs::read_to_string(&expected).unwrap(), "# Test_1\n\nhello\n");
    assert_eq!(sink.progress_total(), 2);
    assert_eq!(
        sink.statuses_of(1),
        vec![JobStatus::Transcribing, JobStatus::Uploading, JobStatus::Done]
    );

    let records = fx.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_path, clip.display().to_string());
    assert_eq!(records[0].sequential_number, Some(1));
    assert_eq!(records[0].output_title, "Test_1");
    assert_eq!(records[0].destination, DestinationMode::LocalFiles);
    assert_eq!(records[0].language.as_deref(), Some("es"));
}

#[tokio::test]
async fn second_run_over_the_same_file_is_skipped() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("hello"));
    let runner = fx.runner(transcriber.clone());

    let mut first = pending(&[&clip]);
    runner
        .run(&fx.config, &mut first, &RecordingSink::default())
        .await
        .unwrap();

    let sink = RecordingSink::default();
    let mut second = pending(&[&clip]);
    let summary = runner.run(&fx.config, &mut second, &sink).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(second[0].status, JobStatus::Done);
    assert_eq!(second[0].transcript, "");
    assert_eq!(transcriber.calls(), 1);
    assert_eq!(fx.records().len(), 1);
    assert_eq!(sink.progress_total(), 2);
    assert!(sink.logs().contains(&(
        "Skipped: clip.wav (already processed with prefix 'Test')".to_string(),
        LogLevel::Highlight
    )));
}

#[tokio::test]
async fn a_different_prefix_processes_the_file_again() {
    let mut fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("hello"));
    let runner = fx.runner(transcriber.clone());

    runner
        .run(&fx.config, &mut pending(&[&clip]), &RecordingSink::default())
        .await
        .unwrap();
    fx.config.prefix = "Repaso".to_string();
    runner
        .run(&fx.config, &mut pending(&[&clip]), &RecordingSink::default())
        .await
        .unwrap();

    assert_eq!(transcriber.calls(), 2);
    let titles: Vec<String> = fx.records().into_iter().map(|r| r.output_title).collect();
    assert_eq!(titles, vec!["Test_1".to_string(), "Repaso_1".to_string()]);
}

#[tokio::test]
async fn progress_adds_up_to_two_per_pending_job_whatever_happens() {
    let fx = Fixture::new();
    let done = fx.media("done.wav");
    let good = fx.media("good.wav");
    let bad = fx.media("bad.wav");
    let refused = fx.media("refused.wav");
    let missing = fx.temp.path().join("vanished.wav");

    let transcriber = Arc::new(FakeTranscriber::saying("text").failing_on("bad.wav"));
    fx.runner(transcriber.clone())
        .run(&fx.config, &mut pending(&[&done]), &RecordingSink::default())
        .await
        .unwrap();

    // Titles: done=Test_1 already recorded, good=Test_2, refused would be Test_3.
    let runner = fx.picky_runner(transcriber.clone(), &["Test_3"]);
    let sink = RecordingSink::default();
    let mut jobs = pending(&[&done, &good, &bad, &refused, &missing]);
    let summary = runner.run(&fx.config, &mut jobs, &sink).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            completed: 1,
            skipped: 1,
            failed: 3
        }
    );
    assert_eq!(sink.progress_total(), 2 * 5);
    let statuses: Vec<JobStatus> = jobs.iter().map(|j| j.status).collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::Done,
            JobStatus::Done,
            JobStatus::Error,
            JobStatus::Error,
            JobStatus::Error
        ]
    );
}

#[tokio::test]
async fn failed_jobs_do_not_consume_sequential_numbers() {
    let fx = Fixture::new();
    let a = fx.media("a.wav");
    let b = fx.media("b.wav");
    let c = fx.media("c.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("text").failing_on("b.wav"));
    let runner = fx.runner(transcriber);

    let mut jobs = pending(&[&a, &b, &c]);
    runner
        .run(&fx.config, &mut jobs, &RecordingSink::default())
        .await
        .unwrap();

    let numbers: Vec<Option<u32>> = fx.records().iter().map(|r| r.sequential_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2)]);
    assert!(jobs[2].output_locator.ends_with("Test_2.md"));
    assert_eq!(jobs[1].status, JobStatus::Error);
    assert!(jobs[1].error_message.contains("500"));
}

#[tokio::test]
async fn numbering_continues_from_earlier_runs() {
    let fx = Fixture::new();
    let a = fx.media("a.wav");
    let b = fx.media("b.wav");
    let runner = fx.runner(Arc::new(FakeTranscriber::saying("text")));

    runner
        .run(&fx.config, &mut pending(&[&a]), &RecordingSink::default())
        .await
        .unwrap();
    let mut jobs = pending(&[&b]);
    runner
        .run(&fx.config, &mut jobs, &RecordingSink::default())
        .await
        .unwrap();

    assert!(jobs[0].output_locator.ends_with("Test_2.md"));
}

#[tokio::test]
async fn original_naming_appends_a_suffix_on_title_collision() {
    let mut fx = Fixture::new();
    fx.config.naming_mode = NamingMode::Original;
    let first_dir = fx.temp.path().join("monday");
    let second_dir = fx.temp.path().join("tuesday");
    fs::create_dir_all(&first_dir).unwrap();
    fs::create_dir_all(&second_dir).unwrap();
    let first = first_dir.join("talk.mp3");
    let second = second_dir.join("talk.mp3");
    fs::write(&first, b"one").unwrap();
    fs::write(&second, b"two").unwrap();

    let runner = fx.runner(Arc::new(FakeTranscriber::saying("text")));
    let mut jobs = pending(&[&first, &second]);
    runner
        .run(&fx.config, &mut jobs, &RecordingSink::default())
        .await
        .unwrap();

    let records = fx.records();
    let titles: Vec<&str> = records.iter().map(|r| r.output_title.as_str()).collect();
    assert_eq!(titles, vec!["Test_talk", "Test_talk_2"]);
    assert!(records.iter().all(|r| r.sequential_number.is_none()));
    assert!(jobs[1].output_locator.ends_with("Test_talk_2.md"));
}

#[tokio::test]
async fn vanished_source_fails_without_a_record() {
    let fx = Fixture::new();
    let missing = fx.temp.path().join("gone.mp4");
    let transcriber = Arc::new(FakeTranscriber::saying("text"));
    let runner = fx.runner(transcriber.clone());
    let sink = RecordingSink::default();

    let mut jobs = pending(&[&missing]);
    runner.run(&fx.config, &mut jobs, &sink).await.unwrap();

    assert_eq!(jobs[0].status, JobStatus::Error);
    assert_eq!(
        sink.statuses_of(1),
        vec![JobStatus::Transcribing, JobStatus::Error]
    );
    assert!(jobs[0].error_message.contains("gone.mp4"));
    assert_eq!(transcriber.calls(), 0);
    assert!(fx.records().is_empty());
    assert_eq!(sink.progress_total(), 2);

    let logs = sink.logs();
    let error_line = logs
        .iter()
        .find(|(_, level)| *level == LogLevel::Error)
        .unwrap();
    assert!(error_line.0.starts_with("Error: gone.mp4 - "));
    let position = logs.iter().position(|l| l == error_line).unwrap();
    assert_eq!(logs[position + 1].1, LogLevel::Dim);
}

#[tokio::test]
async fn export_failure_after_transcription_advances_the_remaining_step() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let runner = fx.picky_runner(Arc::new(FakeTranscriber::saying("text")), &["Test_1"]);
    let sink = RecordingSink::default();

    let mut jobs = pending(&[&clip]);
    runner.run(&fx.config, &mut jobs, &sink).await.unwrap();

    assert_eq!(jobs[0].status, JobStatus::Error);
    assert_eq!(jobs[0].transcript, "text");
    assert!(jobs[0].error_message.contains("disk quota exceeded"));
    let steps: Vec<u32> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress { steps } => Some(*steps),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 1]);
    assert!(fx.records().is_empty());
}

#[tokio::test]
async fn run_reports_status_lines_and_closing_messages() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let runner = fx.runner(Arc::new(FakeTranscriber::saying("text")));
    let sink = RecordingSink::default();

    runner
        .run(&fx.config, &mut pending(&[&clip]), &sink)
        .await
        .unwrap();

    assert_eq!(
        sink.labels(),
        vec![
            "Transcribing clip.wav (0 MB, Spanish) [1/1]...".to_string(),
            "Saving Test_1.md [1/1]...".to_string(),
            "Done!".to_string(),
        ]
    );
    let logs = sink.logs();
    assert_eq!(
        logs.first().unwrap(),
        &(
            "Transcribing: clip.wav (0 MB, Spanish)".to_string(),
            LogLevel::Highlight
        )
    );
    assert!(logs.contains(&("  Uploading to Deepgram...".to_string(), LogLevel::Dim)));
    assert!(logs.contains(&("Saving: Test_1.md".to_string(), LogLevel::Highlight)));
    assert_eq!(
        logs.last().unwrap(),
        &("All tasks completed.".to_string(), LogLevel::Success)
    );
}

#[tokio::test]
async fn nothing_pending_returns_without_side_effects() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let runner = fx.runner(Arc::new(FakeTranscriber::saying("text")));
    let sink = RecordingSink::default();

    let mut jobs = pending(&[&clip]);
    jobs[0].status = JobStatus::Done;
    let summary = runner.run(&fx.config, &mut jobs, &sink).await.unwrap();

    assert_eq!(summary, RunSummary::default());
    assert!(sink.events().is_empty());
    assert!(!fx.ledger_path().exists());
}

#[tokio::test]
async fn missing_api_key_is_rejected_before_any_job() {
    let mut fx = Fixture::new();
    fx.config.speech_api_key = "  ".to_string();
    let clip = fx.media("clip.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("text"));
    let runner = fx.runner(transcriber.clone());
    let sink = RecordingSink::default();

    let mut jobs = pending(&[&clip]);
    let err = runner.run(&fx.config, &mut jobs, &sink).await.unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert_eq!(jobs[0].status, JobStatus::Pending);
    assert_eq!(transcriber.calls(), 0);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn exporter_construction_failure_aborts_the_run() {
    let fx = Fixture::new();
    let clip = fx.media("clip.wav");
    let transcriber = Arc::new(FakeTranscriber::saying("text"));
    let factory: Arc<ExporterFactory> = Arc::new(
        |_: &AppConfig| -> Result<Box<dyn Exporter>, ExportError> {
            Err(ExportError::Auth("service account disabled".to_string()))
        },
    );
    let runner = PipelineRunner::new(fx.ledger_path(), transcriber.clone(), factory);

    let mut jobs = pending(&[&clip]);
    let err = runner
        .run(&fx.config, &mut jobs, &RecordingSink::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Exporter(_)));
    assert_eq!(jobs[0].status, JobStatus::Pending);
    assert_eq!(transcriber.calls(), 0);
}

#[tokio::test]
async fn only_pending_jobs_are_touched() {
    let fx = Fixture::new();
    let a = fx.media("a.wav");
    let b = fx.media("b.wav");
    let runner = fx.runner(Arc::new(FakeTranscriber::saying("text")));

    let mut jobs = pending(&[&a, &b]);
    jobs[0].fail("earlier failure");
    let before = jobs[0].clone();
    runner
        .run(&fx.config, &mut jobs, &RecordingSink::default())
        .await
        .unwrap();

    assert_eq!(jobs[0], before);
    assert_eq!(jobs[1].status, JobStatus::Done);
    assert!(jobs[1].output_locator.ends_with("Test_1.md"));
}
