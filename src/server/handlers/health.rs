use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let summary = state.orchestrator.summary().await?;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);
    Ok(Json(json!({
        "status": "ok",
        "provider": state.config.llm.provider,
        "chunk_size": state.config.rag.chunk_size,
        "passages": summary.passages,
        "dimension": summary.dimension,
        "sources": summary.sources,
        "ready_for_queries": summary.passages > 0,
        "data_dir": state.paths.user_data_dir,
        "log_dir": state.paths.log_dir,
        "started_at": state.started_at,
        "uptime_secs": uptime_secs,
    })))
}
