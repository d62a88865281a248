//! HTTP API server.
//!
//! Exposes scanning and analysis over JSON so that a browser front end or
//! another service can drive Issue Lens.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/scan` | Fetch a repository's open issues into the cache |
//! | `POST` | `/analyze` | Analyze cached issues against a prompt |
//! | `GET`  | `/repos` | List scanned repositories |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid repository 'x': expected owner/name" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! Provider failures are not HTTP errors: `/analyze` answers 200 and the
//! failure text is part of the analysis.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analysis;
use crate::cache;
use crate::config::Config;
use crate::db;
use crate::github::{self, GitHubClient};
use crate::llm::Credentials;
use crate::models::ScanRecord;
use crate::scan::{self, ScanError};

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub github: Arc<GitHubClient>,
    /// Snapshot of the provider keys taken when the server starts. Handlers
    /// never re-read the environment, so changing `OPENAI_API_KEY` or any
    /// other provider variable takes effect only after a restart.
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        github: GitHubClient,
        credentials: Credentials,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            github: Arc::new(github),
            credentials: Arc::new(credentials),
        }
    }
}

/// Build the application router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scan", post(handle_scan))
        .route("/analyze", post(handle_analyze))
        .route("/repos", get(handle_repos))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
///
/// The schema is applied on startup, so `lens serve` works against a fresh
/// database without a prior `lens init`. Provider credentials are read from
/// the environment here, once.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::open(config).await?;

    let github = GitHubClient::new(&config.github)?;
    let credentials = Credentials::from_env();
    let provider = crate::llm::select_kind(&credentials);

    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), pool, github, credentials));

    tracing::info!(bind = %bind_addr, provider = %provider, "starting server");
    println!("Issue Lens listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidRepo(msg) => bad_request(msg),
            // Usually a missing or private repository.
            ScanError::Fetch(e) => not_found(format!("{:#}", e)),
            ScanError::Storage(e) => internal(e),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /scan ============

#[derive(Deserialize)]
struct ScanRequest {
    repo: String,
}

#[derive(Serialize)]
struct ScanResponse {
    repo: String,
    issues_fetched: usize,
    cached_successfully: bool,
}

async fn handle_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let report = scan::scan_repo(&state.pool, &state.github, req.repo.trim()).await?;

    Ok(Json(ScanResponse {
        repo: report.repo,
        issues_fetched: report.issues_fetched,
        cached_successfully: true,
    }))
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    repo: String,
    prompt: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    analysis: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let repo = req.repo.trim();
    github::validate_repo(repo).map_err(|e| bad_request(e.to_string()))?;
    if req.prompt.trim().is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }

    let analysis = analysis::analyze_repo(
        &state.pool,
        &state.credentials,
        &state.config.llm,
        repo,
        &req.prompt,
    )
    .await
    .map_err(internal)?;

    Ok(Json(AnalyzeResponse { analysis }))
}

// ============ GET /repos ============

#[derive(Serialize)]
struct ReposResponse {
    repos: Vec<ScanRecord>,
}

async fn handle_repos(State(state): State<AppState>) -> Result<Json<ReposResponse>, AppError> {
    let repos = cache::list_scans(&state.pool).await.map_err(internal)?;
    Ok(Json(ReposResponse { repos }))
}
