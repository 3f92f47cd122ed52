use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::rag::PipelineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            // Keeps axum's status: 400 for bad syntax, 415 without a JSON
            // content type, 422 for missing or mistyped fields.
            ApiError::InvalidBody(rejection) => (rejection.status(), "bad_request"),
            ApiError::Pipeline(err) => {
                let status = match err {
                    PipelineError::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    PipelineError::Service { .. } => StatusCode::BAD_GATEWAY,
                    PipelineError::EmptyStore => StatusCode::CONFLICT,
                    PipelineError::DimensionMismatch { .. } => StatusCode::CONFLICT,
                    PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    PipelineError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
            ApiError::InvalidBody(rejection) => rejection.body_text(),
            ApiError::Pipeline(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", kind, message);
        } else {
            tracing::warn!("Request rejected ({}): {}", kind, message);
        }

        let body = Json(json!({ "status": "error", "kind": kind, "error": message }));
        (status, body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config at '{path}': {message}")]
    Invalid { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}
