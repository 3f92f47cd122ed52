use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of an ingest or answer flow.
///
/// Every variant is delivered to the caller through the same completion
/// channel as a successful result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("{service} service error: {message}")]
    Service { service: String, message: String },

    #[error("No passages have been ingested yet")]
    EmptyStore,

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Orchestrator is not running")]
    Unavailable,
}

impl PipelineError {
    pub fn extraction(path: impl AsRef<Path>, message: impl std::fmt::Display) -> Self {
        Self::Extraction {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn service(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Service {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Stable tag used by the HTTP layer and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction",
            Self::Service { .. } => "service",
            Self::EmptyStore => "empty_store",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unavailable => "unavailable",
        }
    }
}
