use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub path: PathBuf,
}

/// Ingest a document; responds once its passages are in the store.
pub async fn ingest_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    if payload.path.as_os_str().is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".to_string()));
    }

    let report = state.orchestrator.ingest(payload.path).await?;
    Ok(Json(json!({
        "status": "success",
        "report": report,
    })))
}

pub async fn clear_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.orchestrator.clear().await?;
    Ok(Json(json!({
        "status": "success",
        "removed": removed,
    })))
}
