use std::path::{Path, PathBuf};

use transcript_core::DestinationMode;
use transcript_logging::transcript_debug;

use crate::export::{Exporter, OutputLocator};
use crate::filename::markdown_filename;
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::ExportError;

/// `# {title}`, a blank line, the transcript and a trailing newline.
pub fn render_markdown(title: &str, text: &str) -> String {
    format!("# {title}\n\n{text}\n")
}

/// Writes one `<title>.md` per transcript into a local directory.
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    dir: PathBuf,
}

impl MarkdownExporter {
    /// Creates the output directory up front so a bad path fails before any job runs.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let dir = dir.as_ref().to_path_buf();
        ensure_output_dir(&dir)?;
        Ok(Self { dir })
    }
}

#[async_trait::async_trait]
impl Exporter for MarkdownExporter {
    fn destination(&self) -> DestinationMode {
        DestinationMode::LocalFiles
    }

    async fn deliver(&self, title: &str, text: &str) -> Result<OutputLocator, ExportError> {
        let filename = markdown_filename(title);
        let content = render_markdown(title, text);
        let writer = AtomicFileWriter::new(self.dir.clone());

        let path = tokio::task::spawn_blocking(move || writer.write(&filename, content))
            .await
            .map_err(|err| ExportError::Task(err.to_string()))??;

        transcript_debug!("Wrote markdown transcript {:?}", path);
        Ok(OutputLocator::File(path))
    }
}
