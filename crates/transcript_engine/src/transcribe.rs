use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use transcript_core::{content_type_for, MediaKind};
use transcript_logging::{transcript_debug, transcript_info};

use crate::audio::AudioExtractor;
use crate::TranscribeError;

/// Converts one local media file into transcript text.
///
/// `on_status` receives human-readable phase messages along the way.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        api_key: &str,
        path: &Path,
        language: &str,
        on_status: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> Result<String, TranscribeError>;
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub base_url: String,
    pub model: String,
    pub connect_timeout: Duration,
    /// Generous on purpose: uploads of raw video can take many minutes.
    pub request_timeout: Duration,
    pub ffmpeg_program: PathBuf,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepgram.com".to_string(),
            model: "nova-3".to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
            ffmpeg_program: PathBuf::from("ffmpeg"),
        }
    }
}

/// Deepgram pre-recorded transcription over HTTP.
#[derive(Debug, Clone)]
pub struct DeepgramTranscriber {
    settings: SpeechSettings,
    client: reqwest::Client,
    extractor: AudioExtractor,
}

impl DeepgramTranscriber {
    pub fn new(settings: SpeechSettings) -> Result<Self, TranscribeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TranscribeError::Request(err.to_string()))?;
        let extractor = AudioExtractor::new(settings.ffmpeg_program.clone());
        Ok(Self {
            settings,
            client,
            extractor,
        })
    }

    async fn upload(
        &self,
        api_key: &str,
        upload_path: &Path,
        language: &str,
    ) -> Result<String, TranscribeError> {
        let bytes = tokio::fs::read(upload_path)
            .await
            .map_err(|source| TranscribeError::Read {
                path: upload_path.to_path_buf(),
                source,
            })?;
        transcript_info!(
            "Uploading {} bytes from {:?} (language={})",
            bytes.len(),
            upload_path,
            language
        );

        let url = format!("{}/v1/listen", self.settings.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .query(&[
                ("model", self.settings.model.as_str()),
                ("language", language),
                ("smart_format", "true"),
                ("paragraphs", "true"),
                ("diarize", "true"),
            ])
            .header(AUTHORIZATION, format!("Token {api_key}"))
            .header(CONTENT_TYPE, content_type_for(upload_path))
            .body(bytes)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(TranscribeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ListenResponse =
            serde_json::from_str(&body).map_err(|err| TranscribeError::Decode(err.to_string()))?;
        parsed.into_transcript()
    }
}

#[async_trait::async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(
        &self,
        api_key: &str,
        path: &Path,
        language: &str,
        on_status: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> Result<String, TranscribeError> {
        let is_video = MediaKind::of(path) == MediaKind::Video;
        let use_ffmpeg = is_video && self.extractor.is_available().await;

        // Owns the extracted audio; dropping it removes the directory on every exit path.
        let mut scratch: Option<tempfile::TempDir> = None;

        let upload_path = if use_ffmpeg {
            on_status("Extracting audio track (ffmpeg)...");
            let dir = tempfile::Builder::new()
                .prefix("transcript_")
                .tempdir()
                .map_err(TranscribeError::TempDir)?;
            let wav = dir.path().join("audio.wav");
            transcript_debug!("Extracting audio of {:?} into {:?}", path, dir.path());
            scratch = Some(dir);
            self.extractor.extract(path, &wav).await?;
            let size = file_size(&wav).await?;
            on_status(&format!("Audio extracted: {:.1} MB", megabytes(size)));
            wav
        } else {
            let size = file_size(path).await?;
            if is_video {
                on_status(&format!(
                    "ffmpeg not found - sending raw video ({:.0} MB). Install ffmpeg for faster uploads.",
                    megabytes(size)
                ));
            } else {
                on_status(&format!("Sending audio file ({:.1} MB)...", megabytes(size)));
            }
            path.to_path_buf()
        };

        on_status("Uploading to Deepgram...");
        let transcript = self.upload(api_key, &upload_path, language).await;
        drop(scratch);
        transcript
    }
}

pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

async fn file_size(path: &Path) -> Result<u64, TranscribeError> {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .map_err(|source| TranscribeError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn map_reqwest_error(err: reqwest::Error) -> TranscribeError {
    if err.is_timeout() {
        return TranscribeError::Request(format!("timed out: {err}"));
    }
    TranscribeError::Request(err.to_string())
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    paragraphs: Option<Paragraphs>,
}

#[derive(Debug, Deserialize)]
struct Paragraphs {
    #[serde(default)]
    transcript: Option<String>,
}

impl ListenResponse {
    /// Paragraph transcript if present, else the flat transcript, else empty.
    fn into_transcript(self) -> Result<String, TranscribeError> {
        let results = self
            .results
            .ok_or_else(|| TranscribeError::Decode("missing results".to_string()))?;
        let Some(alt) = results
            .channels
            .into_iter()
            .next()
            .and_then(|channel| channel.alternatives.into_iter().next())
        else {
            return Ok(String::new());
        };

        if let Some(text) = alt
            .paragraphs
            .and_then(|p| p.transcript)
            .filter(|t| !t.is_empty())
        {
            return Ok(text);
        }
        Ok(alt.transcript.unwrap_or_default())
    }
}
