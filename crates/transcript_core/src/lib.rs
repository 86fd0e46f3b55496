//! Transcript core: domain types, event vocabulary and the pure dashboard state machine.
mod config;
mod effect;
mod event;
mod job;
mod media;
mod msg;
mod state;
mod title;
mod update;
mod view_model;

pub use config::{mask_secret, AppConfig, ConfigError, DestinationMode, NamingMode};
pub use effect::{Effect, Severity};
pub use event::{EventSink, LogLevel, PipelineEvent};
pub use job::{Job, JobId, JobStatus};
pub use media::{
    content_type_for, is_audio_file, is_supported_media, language_label, MediaKind,
    AUDIO_EXTENSIONS, LANGUAGES, SUPPORTED_EXTENSIONS,
};
pub use msg::{FileSelection, Msg};
pub use state::{AppState, LogLine};
pub use title::{dedupe_title, original_title, sequential_title};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView};
