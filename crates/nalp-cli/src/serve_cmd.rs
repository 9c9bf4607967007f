use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use nalp_core::{IdeaRequest, PlanRequest, PlanResult, SynthesisError, Synthesizer};
use nalp_store::{HistoryRecord, HistoryStore, RecordId, StoreError};

use crate::config::NalpConfig;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }
}

impl From<SynthesisError> for AppError {
    fn from(err: SynthesisError) -> Self {
        let status = match err {
            SynthesisError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SynthesisError::Config(_) | SynthesisError::Model(_) | SynthesisError::Parse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "synthesis failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Io { .. } | StoreError::Json { .. } => {
                tracing::error!(error = %err, "history store failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // `detail` mirrors `error` for clients that read FastAPI-style bodies.
        let body = serde_json::json!({ "error": self.message, "detail": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub status: &'static str,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub synth: Arc<Synthesizer>,
    pub store: HistoryStore,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/analyze_idea", post(analyze_idea))
        .route("/generate_plan", post(generate_plan))
        .route("/save_history", post(save_history))
        .route("/get_history", get(get_history))
        .route("/get_history/{id}", get(get_history_record))
        .route("/delete_history/{id}", delete(delete_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &NalpConfig) -> Result<()> {
    let state = AppState {
        synth: Arc::new(config.synthesizer()?),
        store: config.history_store(),
    };
    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    tracing::info!(
        model = %config.model.name,
        history = %config.store.dir().display(),
        "nalp serve listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("nalp serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online",
        model: state.synth.model_id().to_string(),
    })
}

async fn analyze_idea(
    State(state): State<AppState>,
    Json(request): Json<IdeaRequest>,
) -> Result<Json<QuestionsResponse>, AppError> {
    if request.app_idea.trim().is_empty() {
        return Err(AppError::unprocessable("app_idea must not be empty"));
    }
    let questions = state.synth.generate_questions(&request.app_idea).await?;
    Ok(Json(QuestionsResponse { questions }))
}

async fn generate_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResult>, AppError> {
    let plan = state.synth.generate_plan(&request).await?;
    Ok(Json(plan))
}

async fn save_history(
    State(state): State<AppState>,
    Json(mut record): Json<HistoryRecord>,
) -> Result<Json<SavedResponse>, AppError> {
    if record.id.trim().is_empty() {
        record.id = RecordId::generate().to_string();
    }
    let id = state.store.save(&record).await?;
    Ok(Json(SavedResponse {
        status: "saved",
        id: id.to_string(),
    }))
}

async fn get_history(State(state): State<AppState>) -> Result<Json<Vec<HistoryRecord>>, AppError> {
    Ok(Json(state.store.list().await?))
}

async fn get_history_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryRecord>, AppError> {
    Ok(Json(state.store.get(&id).await?))
}

async fn delete_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    state.store.delete(&id).await?;
    Ok(Json(StatusResponse { status: "deleted" }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
