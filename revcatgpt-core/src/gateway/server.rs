//! Context gateway server built on axum.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::error::PipelineError;
use crate::pipeline::ContextPipeline;

/// Prefix of the query routes.
pub const API_BASE_PATH: &str = "/api/v1";

/// State shared by all handlers.
pub struct AppState {
    pipeline: Arc<ContextPipeline>,
    started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("uptime_secs", &self.uptime_secs())
            .finish()
    }
}

impl AppState {
    pub fn new(pipeline: Arc<ContextPipeline>) -> Self {
        Self {
            pipeline,
            started_at: Instant::now(),
        }
    }

    pub fn pipeline(&self) -> &ContextPipeline {
        &self.pipeline
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Thread-safe shared state reference for axum handlers.
pub type SharedState = Arc<AppState>;

/// Build an axum Router with the query and `/health` routes.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(&format!("{API_BASE_PATH}/{{query}}"), get(context_handler))
        .route(&format!("{API_BASE_PATH}/"), get(empty_query_handler))
        .route(API_BASE_PATH, get(empty_query_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Assemble the context for the (URL-decoded) path segment.
async fn context_handler(
    State(state): State<SharedState>,
    query: Result<Path<String>, PathRejection>,
) -> Result<String, PipelineError> {
    let Path(query) = query.map_err(|rejection| {
        PipelineError::bad_request(format!("cannot decode query: {}", rejection.body_text()))
    })?;
    let context = state.pipeline.assemble(&query).await?;
    Ok(context.text)
}

async fn empty_query_handler() -> PipelineError {
    PipelineError::bad_request("query is empty")
}

/// Health check endpoint.
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "cached_embeddings": state.pipeline.cache().len(),
        "uptime_secs": state.uptime_secs(),
    }))
}

/// Serve plain HTTP on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: SharedState,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, base_path = API_BASE_PATH, "context gateway listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
