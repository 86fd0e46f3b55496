//! Uploads and transcription sessions shared by the HTTP handlers.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use transcript_core::{AppConfig, Job, PipelineEvent};
use transcript_engine::{EnvConfigStore, LoggingSink, PipelineRunner, StreamSink, TeeSink};
use transcript_logging::{transcript_info, transcript_warn};
use uuid::Uuid;

/// A file received through the upload endpoint.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

pub type EventQueue = Arc<tokio::sync::Mutex<UnboundedReceiver<PipelineEvent>>>;

/// One background run and the event queue its progress stream reads from.
///
/// The receiver outlives any single HTTP connection so a client can reconnect
/// and pick up where it left off.
pub struct Session {
    events: EventQueue,
    finished: Arc<AtomicBool>,
    upload_ids: Vec<String>,
    task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct ServerState {
    inner: Arc<Inner>,
}

struct Inner {
    store: EnvConfigStore,
    runner: PipelineRunner,
    upload_dir: TempDir,
    uploads: Mutex<HashMap<String, Upload>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl ServerState {
    /// Creates the upload directory; it is removed when the last clone is dropped.
    pub fn new(store: EnvConfigStore, runner: PipelineRunner) -> io::Result<Self> {
        let upload_dir = tempfile::Builder::new()
            .prefix("transcript_uploads_")
            .tempdir()?;
        transcript_info!("Uploads are stored in {:?}", upload_dir.path());
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                runner,
                upload_dir,
                uploads: Mutex::new(HashMap::new()),
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn store(&self) -> &EnvConfigStore {
        &self.inner.store
    }

    pub fn upload_dir(&self) -> &Path {
        self.inner.upload_dir.path()
    }

    pub fn add_upload(&self, name: String, path: PathBuf, size_bytes: u64) -> Upload {
        let upload = Upload {
            id: Uuid::new_v4().to_string(),
            name,
            path,
            size_bytes,
        };
        lock(&self.inner.uploads).insert(upload.id.clone(), upload.clone());
        upload
    }

    pub fn upload(&self, id: &str) -> Option<Upload> {
        lock(&self.inner.uploads).get(id).cloned()
    }

    /// Spawns a run over `jobs` and registers it under a fresh session id.
    pub fn start_session(
        &self,
        config: AppConfig,
        mut jobs: Vec<Job>,
        upload_ids: Vec<String>,
    ) -> String {
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = StreamSink::new(tx);
        let finished = Arc::new(AtomicBool::new(false));

        let runner = self.inner.runner.clone();
        let done = Arc::clone(&finished);
        let id = session_id.clone();
        let task = tokio::spawn(async move {
            // Run log lines also land in the diagnostic log.
            let observed = TeeSink::new(sink.clone(), LoggingSink);
            match runner.run(&config, &mut jobs, &observed).await {
                Ok(summary) => transcript_info!(
                    "Session {} finished: {} completed, {} skipped, {} failed",
                    id,
                    summary.completed,
                    summary.skipped,
                    summary.failed
                ),
                Err(err) => {
                    transcript_warn!("Session {} failed: {}", id, err);
                    sink.fail(format!("Run failed: {err}"));
                }
            }
            sink.finish();
            done.store(true, Ordering::SeqCst);
        });

        lock(&self.inner.sessions).insert(
            session_id.clone(),
            Session {
                events: Arc::new(tokio::sync::Mutex::new(rx)),
                finished,
                upload_ids,
                task,
            },
        );
        session_id
    }

    /// Receiver and completion flag of a live session.
    pub fn session_stream(
        &self,
        session_id: &str,
    ) -> Option<(EventQueue, Arc<AtomicBool>)> {
        lock(&self.inner.sessions)
            .get(session_id)
            .map(|session| (Arc::clone(&session.events), Arc::clone(&session.finished)))
    }

    /// Stops the session's run and deletes the uploads it used. False if unknown.
    pub fn remove_session(&self, session_id: &str) -> bool {
        let Some(session) = lock(&self.inner.sessions).remove(session_id) else {
            return false;
        };
        session.task.abort();

        let removed: Vec<Upload> = {
            let mut uploads = lock(&self.inner.uploads);
            session
                .upload_ids
                .iter()
                .filter_map(|id| uploads.remove(id))
                .collect()
        };
        for upload in removed {
            if let Err(err) = std::fs::remove_file(&upload.path) {
                transcript_warn!("Could not remove upload {:?}: {}", upload.path, err);
            }
        }
        transcript_info!("Session {} removed", session_id);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
