//! Transcript engine: ledger, transcription, export and the batch runner.
mod audio;
mod config_store;
mod engine;
mod export;
mod filename;
mod ledger;
mod persist;
mod pipeline;
mod sink;
mod transcribe;
mod types;

pub use audio::{AudioExtractor, SPEECH_SAMPLE_RATE};
pub use config_store::{
    ConfigStore, ConfigStoreError, EnvConfigStore, CONFIG_KEYS, KEY_CREDENTIALS, KEY_FOLDER_ID,
    KEY_NAMING_MODE, KEY_OUTPUT_DIR, KEY_PREFIX, KEY_SPEECH_API_KEY,
};
pub use engine::{cancel_in_flight, EngineHandle, CANCELLED_MESSAGE};
pub use export::{
    exporter_for, render_markdown, DocsEndpoints, Exporter, ExporterFactory, GoogleDocsExporter,
    MarkdownExporter, OutputLocator, ServiceAccountKey,
};
pub use filename::{markdown_filename, safe_file_stem};
pub use ledger::{Ledger, LedgerRecord};
pub use persist::{ensure_output_dir, unique_path, AtomicFileWriter, PersistError};
pub use pipeline::{PipelineRunner, STEPS_PER_JOB};
pub use sink::{ChannelSink, LoggingSink, StreamSink, TeeSink};
pub use transcribe::{DeepgramTranscriber, SpeechSettings, Transcriber};
pub use types::{
    EngineEvent, ExportError, JobError, LedgerError, PipelineError, RunSummary, TranscribeError,
};
