use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use transcript_core::{is_supported_media, mask_secret, DestinationMode, Job, PipelineEvent};
use transcript_engine::{unique_path, ConfigStore};
use transcript_logging::{transcript_debug, transcript_info};

use super::error::AppError;
use super::state::{EventQueue, ServerState};

/// Idle time after which the progress stream sends a `ping`.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

const DEFAULT_LANGUAGE: &str = "es";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigResponse {
    pub deepgram_api_key: String,
    pub google_service_account_json: String,
    pub drive_folder_id: String,
    pub naming_mode: String,
    pub prefix: String,
    pub markdown_output_dir: String,
    pub output_mode: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdate {
    pub deepgram_api_key: Option<String>,
    pub google_service_account_json: Option<String>,
    pub drive_folder_id: Option<String>,
    pub naming_mode: Option<String>,
    pub prefix: Option<String>,
    pub markdown_output_dir: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub struct FileSpec {
    pub id: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub files: Vec<FileSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenPathRequest {
    pub path: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn output_mode_name(destination: DestinationMode) -> &'static str {
    match destination {
        DestinationMode::DocumentService => "google_docs",
        DestinationMode::LocalFiles => "markdown",
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Transcript API" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn get_config(State(state): State<ServerState>) -> Result<Json<ConfigResponse>, AppError> {
    let config = state.store().load()?;
    Ok(Json(ConfigResponse {
        deepgram_api_key: mask_secret(&config.speech_api_key),
        google_service_account_json: config.credentials_path.clone(),
        drive_folder_id: config.folder_id.clone(),
        naming_mode: config.naming_mode.as_str().to_string(),
        prefix: config.prefix.clone(),
        markdown_output_dir: config.output_directory.display().to_string(),
        output_mode: output_mode_name(config.destination()).to_string(),
    }))
}

pub async fn put_config(
    State(state): State<ServerState>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<Value>, AppError> {
    let store = state.store();
    let mut config = store.load()?;

    if let Some(key) = update.deepgram_api_key {
        config.speech_api_key = key;
    }
    if let Some(path) = update.google_service_account_json {
        config.credentials_path = path;
    }
    if let Some(folder) = update.drive_folder_id {
        config.folder_id = folder;
    }
    if let Some(mode) = update.naming_mode {
        config.naming_mode = mode
            .parse()
            .map_err(|_| AppError::bad_request(format!("Invalid naming_mode: {mode}")))?;
    }
    if let Some(prefix) = update.prefix {
        config.prefix = prefix;
    }
    if let Some(dir) = update.markdown_output_dir {
        config.output_directory = PathBuf::from(dir);
    }

    store.save(&config)?;
    transcript_info!("Config updated, destination={}", config.destination());
    Ok(Json(json!({ "ok": true })))
}

pub async fn upload_files(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        let Some(original) = field.file_name().map(str::to_owned) else {
            continue;
        };
        // Only the final component is used so a crafted name cannot leave the upload dir.
        let name = Path::new(&original)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| is_supported_media(Path::new(n)))
            .ok_or_else(|| AppError::bad_request(format!("Invalid or unsupported file: {original}")))?;

        let (dest, mut file) = create_upload_file(state.upload_dir(), &name).await?;
        let mut size_bytes = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| AppError::bad_request(err.to_string()))?
        {
            size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let upload = state.add_upload(name, dest, size_bytes);
        transcript_debug!("Stored upload {} ({} bytes) at {:?}", upload.id, size_bytes, upload.path);
        files.push(UploadedFile {
            id: upload.id,
            name: upload.name,
            size_bytes,
        });
    }

    if files.is_empty() {
        return Err(AppError::bad_request("No files provided"));
    }
    Ok(Json(UploadResponse { files }))
}

/// Claims the first free name in `dir`; a concurrent upload that wins a name pushes us to the next.
async fn create_upload_file(dir: &Path, name: &str) -> io::Result<(PathBuf, tokio::fs::File)> {
    loop {
        let dest = unique_path(dir, name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
        {
            Ok(file) => return Ok((dest, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

pub async fn start_transcription(
    State(state): State<ServerState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    if request.files.is_empty() {
        return Err(AppError::bad_request("At least one file is required"));
    }
    let config = state.store().load()?;
    if config.speech_api_key.trim().is_empty() {
        return Err(AppError::bad_request("Deepgram API key not configured"));
    }

    let mut jobs = Vec::with_capacity(request.files.len());
    let mut upload_ids = Vec::with_capacity(request.files.len());
    for (idx, spec) in request.files.into_iter().enumerate() {
        let upload = state
            .upload(&spec.id)
            .ok_or_else(|| AppError::not_found(format!("File not found: {}", spec.id)))?;
        jobs.push(Job::new(idx as u64 + 1, upload.path, spec.language));
        upload_ids.push(spec.id);
    }

    let count = jobs.len();
    let session_id = state.start_session(config, jobs, upload_ids);
    transcript_info!("Started session {} with {} job(s)", session_id, count);
    Ok(Json(StartResponse { session_id }))
}

pub async fn progress(
    State(state): State<ServerState>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let (events, finished) = state
        .session_stream(&session_id)
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(event_stream(events, finished))))
}

/// Drains the session queue until `done`, pinging while the run is quiet.
fn event_stream(
    events: EventQueue,
    finished: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    async_stream::stream! {
        loop {
            let next = {
                let mut rx = events.lock().await;
                tokio::time::timeout(PING_INTERVAL, rx.recv()).await
            };
            match next {
                Ok(Some(event)) => {
                    let done = event == PipelineEvent::Done;
                    yield Ok(sse_event(&event));
                    if done {
                        break;
                    }
                }
                Ok(None) => {
                    yield Ok(sse_event(&PipelineEvent::Error {
                        message: "event stream closed".to_string(),
                    }));
                    break;
                }
                // A reconnecting client may have missed `done`.
                Err(_) if finished.load(Ordering::SeqCst) => {
                    yield Ok(sse_event(&PipelineEvent::Done));
                    break;
                }
                Err(_) => yield Ok(sse_event(&PipelineEvent::Ping)),
            }
        }
    }
}

fn sse_event(event: &PipelineEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .json_data(event)
        .unwrap_or_else(|err| {
            Event::default()
                .event("error")
                .data(json!({ "type": "error", "message": err.to_string() }).to_string())
        })
}

pub async fn delete_session(
    State(state): State<ServerState>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    if !state.remove_session(&session_id) {
        return Err(AppError::not_found("Session not found"));
    }
    Ok(Json(json!({ "ok": true })))
}

pub async fn open_path(Json(request): Json<OpenPathRequest>) -> Result<Json<Value>, AppError> {
    let target = resolve_open_target(&request.path)?;
    let program = file_manager_program();
    let status = tokio::process::Command::new(program)
        .arg(&target)
        .status()
        .await
        .map_err(|err| AppError::internal(format!("Failed to open: {err}")))?;
    if !status.success() {
        return Err(AppError::internal(format!(
            "Failed to open: {program} exited with {status}"
        )));
    }
    Ok(Json(json!({ "ok": true })))
}

/// Expands `~`, makes the path absolute and falls back to the parent of a file.
pub fn resolve_open_target(raw: &str) -> Result<PathBuf, AppError> {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(raw)),
        _ => PathBuf::from(raw),
    };
    let path = std::fs::canonicalize(&expanded)
        .map_err(|_| AppError::bad_request(format!("Path does not exist: {}", expanded.display())))?;
    if path.is_dir() {
        return Ok(path);
    }
    Ok(path.parent().map(Path::to_path_buf).unwrap_or(path))
}

fn file_manager_program() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}
