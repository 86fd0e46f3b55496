//! Destinations for finished transcripts.
mod google_docs;
mod markdown;

use std::path::PathBuf;

use transcript_core::{AppConfig, DestinationMode};

use crate::ExportError;

pub use google_docs::{DocsEndpoints, GoogleDocsExporter, ServiceAccountKey};
pub use markdown::{render_markdown, MarkdownExporter};

/// Where an exported transcript ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocator {
    File(PathBuf),
    Document { id: String, url: String },
}

impl OutputLocator {
    /// Value stored on the job and in the ledger: the file path or the document id.
    pub fn locator(&self) -> String {
        match self {
            OutputLocator::File(path) => path.display().to_string(),
            OutputLocator::Document { id, .. } => id.clone(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            OutputLocator::File(_) => None,
            OutputLocator::Document { url, .. } => Some(url),
        }
    }
}

#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    fn destination(&self) -> DestinationMode;

    async fn deliver(&self, title: &str, text: &str) -> Result<OutputLocator, ExportError>;
}

/// Builds the exporter a run needs; failures here abort the run before any job starts.
pub type ExporterFactory =
    dyn Fn(&AppConfig) -> Result<Box<dyn Exporter>, ExportError> + Send + Sync;

/// Exporter for the destination derived from `config`.
pub fn exporter_for(
    config: &AppConfig,
    endpoints: &DocsEndpoints,
) -> Result<Box<dyn Exporter>, ExportError> {
    match config.destination() {
        DestinationMode::DocumentService => Ok(Box::new(GoogleDocsExporter::from_key_file(
            config.credentials_path.trim(),
            config.folder_id.trim(),
            endpoints.clone(),
        )?)),
        DestinationMode::LocalFiles => {
            Ok(Box::new(MarkdownExporter::new(&config.output_directory)?))
        }
    }
}
