//! HTTP API for the web front end: config, uploads, runs and their progress stream.

pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use transcript_logging::transcript_info;

pub use error::AppError;
pub use state::ServerState;

/// Origins of the local development front ends.
pub const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
];

pub fn router(state: ServerState, max_upload_bytes: usize) -> Router {
    let origins = ALLOWED_ORIGINS.map(HeaderValue::from_static);
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/config", get(routes::get_config).put(routes::put_config))
        .route("/api/files/upload", post(routes::upload_files))
        .route("/api/transcription/start", post(routes::start_transcription))
        .route(
            "/api/transcription/progress/{session_id}",
            get(routes::progress),
        )
        .route(
            "/api/transcription/{session_id}",
            delete(routes::delete_session),
        )
        .route("/api/paths/open", post(routes::open_path))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
}

pub async fn serve(
    addr: SocketAddr,
    state: ServerState,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    transcript_info!("Listening on http://{}", addr);
    println!("Transcript API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            transcript_info!("Shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
