//! FFmpeg audio extraction.
//!
//! Video inputs are shrunk to a mono, 16 kHz, 16-bit PCM WAV before upload,
//! which turns multi-gigabyte recordings into a few tens of megabytes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use transcript_logging::transcript_debug;

use crate::TranscribeError;

/// Sample rate requested from ffmpeg for speech uploads.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone)]
pub struct AudioExtractor {
    program: PathBuf,
}

impl AudioExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// True when the ffmpeg program can be started on this host.
    pub async fn is_available(&self) -> bool {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        matches!(status, Ok(s) if s.success())
    }

    /// Writes the first audio track of `input` to `output` as mono 16 kHz PCM WAV.
    ///
    /// The child is killed if the returned future is dropped.
    pub async fn extract(&self, input: &Path, output: &Path) -> Result<(), TranscribeError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg(SPEECH_SAMPLE_RATE.to_string())
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        transcript_debug!("Running ffmpeg: {:?}", cmd);

        let result = cmd
            .output()
            .await
            .map_err(|e| TranscribeError::Extraction(format!("failed to spawn ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(TranscribeError::Extraction(format!(
                "ffmpeg exited with code {:?}: {tail}",
                result.status.code()
            )));
        }
        Ok(())
    }
}
