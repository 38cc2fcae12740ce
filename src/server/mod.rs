//! HTTP surface: router, shared state, and the optional stale-upload sweeper.
//!
//! ## Routes
//!
//! | Path | Method | Handler |
//! |------|--------|---------|
//! | `/health` | GET | [`routes::health_check`] |
//! | `/upload` | POST | [`routes::upload_file`] |
//! | `/uploads/{filename}` | GET | [`routes::serve_upload`] |
//! | `/remove-file` | POST | [`routes::remove_file`] |
//! | `/convert` | POST | [`routes::convert_to_pdf`] |
//! | `/preview-size` | POST | [`routes::preview_size`] |
//!
//! Cross-origin requests are allowed from any origin for GET/POST/OPTIONS
//! with a `Content-Type` header. `OPTIONS` on any path answers with an empty
//! 204. Request bodies are capped at [`ServerConfig::max_body_bytes`].

pub mod error;
pub mod routes;

use crate::config::ServerConfig;
use crate::error::ImgPdfError;
use crate::storage::Storage;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Longest pause between two sweeps, whatever the configured age.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// State shared by every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Storage,
}

impl AppState {
    /// Open (and create if needed) the upload directory named by `config`.
    pub async fn init(config: ServerConfig) -> Result<Self, ImgPdfError> {
        let storage = Storage::open(&config.upload_dir).await?;
        Ok(Self {
            config: Arc::new(config),
            storage,
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/upload", post(routes::upload_file))
        .route("/uploads/:filename", get(routes::serve_upload))
        .route("/remove-file", post(routes::remove_file))
        .route("/convert", post(routes::convert_to_pdf))
        .route("/preview-size", post(routes::preview_size))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(options_no_content))
        .with_state(state)
}

/// `CorsLayer` answers every OPTIONS request itself with an empty 200.
/// Rewrite that to 204.
async fn options_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Serve until `shutdown` resolves.
///
/// Starts the stale-upload sweeper when [`ServerConfig::sweep_after`] is set
/// and stops it once the server has drained.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let sweeper = state
        .config
        .sweep_after
        .map(|age| spawn_sweeper(state.storage.clone(), age));

    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    result
}

/// Periodically delete uploads older than `max_age`.
///
/// Runs every `max_age`, but at least every five minutes. Sweep failures are
/// logged and the loop keeps going.
pub fn spawn_sweeper(storage: Storage, max_age: Duration) -> JoinHandle<()> {
    let period = max_age.min(MAX_SWEEP_INTERVAL);
    info!(
        "Sweeping uploads older than {}s every {}s",
        max_age.as_secs(),
        period.as_secs()
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = storage.sweep_stale(max_age).await {
                warn!("Upload sweep failed: {}", e);
            }
        }
    })
}
