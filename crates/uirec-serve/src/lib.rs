use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use uirec_core::ids::{commit_from_segment, parse_range, ProjectRef};
use uirec_core::{BranchStatus, BranchTip, Caller, CommitEvent, CommitStatus, Recording, RecorderError};
use uirec_ledger::{SqliteStore, UirecPaths};
use uirec_status::{RecordOutcome, StatusResolver};

pub use uirec_core::access::USER_HEADER;

// ── Config ──

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
    pub auth_enabled: bool,
    /// Cap applied when a request has no `n` parameter.
    pub max_entries: usize,
}

impl From<&uirec_ledger::RecorderConfig> for ServeConfig {
    fn from(cfg: &uirec_ledger::RecorderConfig) -> Self {
        Self {
            bind: cfg.bind.clone(),
            port: cfg.port,
            auth_enabled: cfg.auth_enabled,
            max_entries: cfg.max_entries,
        }
    }
}

// ── App State ──

struct AppState {
    db_path: PathBuf,
    auth_enabled: bool,
    max_entries: usize,
}

impl AppState {
    fn open_store(&self) -> anyhow::Result<SqliteStore> {
        SqliteStore::open(&self.db_path)
    }

    fn caller(&self, headers: &HeaderMap) -> Caller {
        let user = headers.get(USER_HEADER).and_then(|v| v.to_str().ok());
        Caller::resolve(self.auth_enabled, user)
    }
}

// ── Error Handling ──

struct AppError(RecorderError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<RecorderError> for AppError {
    fn from(err: RecorderError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self(RecorderError::Io(err))
    }
}

// ── Entrypoint ──

pub async fn serve(root: &Path, config: ServeConfig) -> anyhow::Result<()> {
    let paths = UirecPaths::discover(root);
    if !paths.is_initialized() {
        anyhow::bail!("not a uirec workspace (run `uirec init` first)");
    }

    let app = router(root, &config);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, auth_enabled = config.auth_enabled, "uirec HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (for testing without binding to a port).
pub fn router(root: &Path, config: &ServeConfig) -> Router {
    let state = Arc::new(AppState {
        db_path: UirecPaths::discover(root).db_path,
        auth_enabled: config.auth_enabled,
        max_entries: config.max_entries,
    });
    Router::new()
        .route("/api/health", get(health))
        .route("/api/recorder/{owner}/{name}/status/{commit}", get(get_status))
        .route(
            "/api/recorder/{owner}/{name}/branchStatus/{*branch}",
            get(get_branch_status),
        )
        .route(
            "/api/recorder/{owner}/{name}/branchTip/{*branch}",
            get(get_branch_tip),
        )
        .route(
            "/api/recorder/{owner}/{name}/recordings/{range}",
            get(get_recordings),
        )
        .route("/api/recorder/{owner}/{name}/recording", put(put_recording))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Deserialize)]
struct CapQuery {
    n: Option<usize>,
}

// ── GET …/status/{commit} ──

async fn get_status(
    State(state): State<Arc<AppState>>,
    UrlPath((owner, name, commit)): UrlPath<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<CommitStatus>, AppError> {
    let project_id = ProjectRef::new(owner, name).id();
    let store = state.open_store()?;
    let resolver = StatusResolver::new(&store, state.caller(&headers));
    let status = resolver.commit_status(&project_id, &commit_from_segment(&commit))?;
    Ok(Json(status))
}

// ── GET …/branchStatus/{branch} ──

async fn get_branch_status(
    State(state): State<Arc<AppState>>,
    UrlPath((owner, name, branch)): UrlPath<(String, String, String)>,
    Query(params): Query<CapQuery>,
    headers: HeaderMap,
) -> Result<Json<BranchStatus>, AppError> {
    let project_id = ProjectRef::new(owner, name).id();
    let store = state.open_store()?;
    let resolver = StatusResolver::new(&store, state.caller(&headers));
    let max = params.n.unwrap_or(state.max_entries);
    let status = resolver.branch_status(&project_id, &branch, max)?;
    Ok(Json(status))
}

// ── GET …/branchTip/{branch} ──

async fn get_branch_tip(
    State(state): State<Arc<AppState>>,
    UrlPath((owner, name, branch)): UrlPath<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<BranchTip>, AppError> {
    let project_id = ProjectRef::new(owner, name).id();
    let store = state.open_store()?;
    let resolver = StatusResolver::new(&store, state.caller(&headers));
    Ok(Json(resolver.branch_tip(&project_id, &branch)?))
}

// ── GET …/recordings/{start}...{end} ──

async fn get_recordings(
    State(state): State<Arc<AppState>>,
    UrlPath((owner, name, range)): UrlPath<(String, String, String)>,
    Query(params): Query<CapQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Recording>>, AppError> {
    let project_id = ProjectRef::new(owner, name).id();
    let store = state.open_store()?;
    let resolver = StatusResolver::new(&store, state.caller(&headers));
    let (start, end) = parse_range(&range)?;
    let max = params.n.unwrap_or(state.max_entries);
    let recordings = resolver.ranged_recordings(&project_id, &start, &end, max)?;
    Ok(Json(recordings))
}

// ── PUT …/recording ──

#[derive(Serialize)]
struct RecordResponse {
    recorded: bool,
}

async fn put_recording(
    State(state): State<Arc<AppState>>,
    UrlPath((owner, name)): UrlPath<(String, String)>,
    headers: HeaderMap,
    Json(event): Json<CommitEvent>,
) -> Result<Json<RecordResponse>, AppError> {
    let project_id = ProjectRef::new(owner, name).id();
    if event.project_id != project_id {
        return Err(RecorderError::InvalidRequest(format!(
            "event belongs to project '{}', not '{project_id}'",
            event.project_id
        ))
        .into());
    }
    let store = state.open_store()?;
    let resolver = StatusResolver::new(&store, state.caller(&headers));
    let outcome = resolver.record_if_eligible(event)?;
    Ok(Json(RecordResponse {
        recorded: outcome == RecordOutcome::Recorded,
    }))
}

// ── Tests ──
