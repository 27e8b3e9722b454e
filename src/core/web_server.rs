//! HTTP front end.
//!
//! `POST /analyze` and `POST /download` plus static files from `static_dir`.
//! Every error leaves as JSON `{error, details?}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::core::config::Config;
use crate::core::logging::log_startup_banner;
use crate::core::process::{CommandRunner, ProcessExecutor};
use crate::core::validation::{require_url, validate_audio_format, ValidationError};
use crate::download::format::DownloadKind;
use crate::download::metadata::{AnalyzeResult, Analyzer};
use crate::download::orchestrator::{DownloadOrchestrator, DownloadRequest};
use crate::download::send::stream_download;
use crate::download::tools::check_tools;
use crate::storage::cache::{spawn_cleanup_task, AnalysisCache};
use crate::storage::temp::TemporaryStore;

/// Services shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub orchestrator: Arc<DownloadOrchestrator>,
}

impl AppState {
    /// Wire the services from configuration around one command runner.
    pub fn build(config: &Config, runner: Arc<dyn CommandRunner>) -> std::io::Result<Self> {
        let store = Arc::new(TemporaryStore::init(&config.temp_dir)?);
        let cache = Arc::new(AnalysisCache::new(config.analyze_cache_ttl()));

        let analyzer = Analyzer::new(Arc::clone(&runner), cache, config.ytdlp_bin.clone());
        let orchestrator = DownloadOrchestrator::new(runner, store, config.ytdlp_bin.clone(), config.ffmpeg_bin.clone())
            .with_concurrency_limit(config.max_concurrent_downloads);

        Ok(Self {
            analyzer: Arc::new(analyzer),
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn store(&self) -> &Arc<TemporaryStore> {
        self.orchestrator.store()
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        self.analyzer.cache()
    }
}

/// JSON error body with its status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details: None,
        }
    }

    pub fn internal(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid request body".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    url: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse<'a> {
    success: bool,
    #[serde(flatten)]
    result: &'a AnalyzeResult,
}

#[derive(Debug, Deserialize)]
struct DownloadBody {
    url: Option<String>,
    format_id: Option<String>,
    download_type: Option<DownloadKind>,
    audio_format: Option<String>,
    title: Option<String>,
}

impl DownloadBody {
    fn into_request(self) -> Result<DownloadRequest, ValidationError> {
        let url = require_url(self.url.as_deref())?;
        let kind = self.download_type.unwrap_or_default();
        let audio_format = self.audio_format.filter(|f| !f.is_empty());
        if kind == DownloadKind::Audio {
            if let Some(format) = &audio_format {
                validate_audio_format(format)?;
            }
        }

        Ok(DownloadRequest {
            url,
            format_id: self.format_id.filter(|f| !f.is_empty()),
            kind,
            audio_format,
            title: self.title,
        })
    }
}

/// Build the router: API routes, then static files for everything else.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/download", post(download_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let url = require_url(body.url.as_deref())?;

    let result = state.analyzer.analyze(&url).await.map_err(|e| {
        log::error!("[Analyze Error] {}", e);
        ApiError::internal("Failed to analyze URL", e.message())
    })?;

    Ok(Json(AnalyzeResponse {
        success: true,
        result: &result,
    })
    .into_response())
}

async fn download_handler(
    State(state): State<AppState>,
    body: Result<Json<DownloadBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let request = body.into_request()?;

    let file = state
        .orchestrator
        .download(&request)
        .await
        .map_err(|e| ApiError::internal("Download failed", e.message()))?;

    stream_download(file, request.title.as_deref()).await.map_err(|e| {
        log::error!("[Stream Error] {}", e);
        ApiError::internal("File transmission error", e.to_string())
    })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache().stats().await;
    Json(json!({
        "status": "ok",
        "cache": {
            "size": stats.size,
            "hits": stats.hits,
            "misses": stats.misses,
            "hit_rate": stats.hit_rate,
        }
    }))
}

/// Start the HTTP server and block until Ctrl-C or SIGTERM.
///
/// On shutdown the scratch directory is emptied and the cache sweeper stopped.
pub async fn start_web_server(config: &Config) -> anyhow::Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessExecutor::new(config.max_output_bytes));
    check_tools(runner.as_ref(), &config.ytdlp_bin, &config.ffmpeg_bin).await;

    let state = AppState::build(config, runner)?;
    let store = Arc::clone(state.store());

    let shutdown = CancellationToken::new();
    let sweeper = spawn_cleanup_task(
        Arc::clone(state.cache()),
        config.cache_cleanup_interval(),
        shutdown.clone(),
    );

    let app = router(state, &config.static_dir);
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    log_startup_banner(&addr, store.dir());
    log::info!("  POST /analyze   - Inspect formats");
    log::info!("  POST /download  - Download and stream a file");
    log::info!("  GET  /health    - Health check");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    log::info!("[Shutdown] Cleaning up...");
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        log::warn!("[Shutdown] Cache sweeper ended abnormally: {}", e);
    }
    let removed = store.flush().await;
    log::info!("[Shutdown] Complete, {} file(s) removed", removed);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
