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
pub struct ChatRequest {
    pub query: String,
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let answer = state.orchestrator.answer(payload.query).await?;
    Ok(Json(json!({
        "status": "success",
        "response": answer.formatted(),
        "query": answer.query,
        "answer": answer.answer,
        "passage": answer.passage,
        "source": answer.source,
        "score": answer.score,
    })))
}
